//! Polygon rasterization onto a reference grid
//!
//! A pixel is burned when its centre lies inside the polygon under the
//! even-odd rule, so holes are excluded. Vertices are taken into pixel space
//! with the inverse of the grid transform and filled with a scanline at each
//! row centre. Edges are half-open in y, which keeps a centre lying exactly
//! on an edge shared by two polygons from being counted twice.

use geo_types::{LineString, Polygon};
use roofarea_core::raster::{GeoTransform, GridSpec, Mask};
use roofarea_core::{Error, Result};

/// Rasterize the union of polygon interiors onto `grid`
pub fn rasterize_polygons(polygons: &[Polygon<f64>], grid: &GridSpec) -> Result<Mask> {
    let mut mask = Mask::empty(grid);
    for polygon in polygons {
        burn_polygon(&mut mask, polygon)?;
    }
    Ok(mask)
}

/// OR one polygon interior into an existing mask
pub fn burn_polygon(mask: &mut Mask, polygon: &Polygon<f64>) -> Result<()> {
    let transform = *mask.transform();
    if !transform.is_invertible() {
        return Err(Error::InvalidParameter {
            name: "transform",
            value: format!("{:?}", transform),
            reason: "grid transform is not invertible".into(),
        });
    }

    let mut edges = Vec::new();
    ring_edges(polygon.exterior(), &transform, &mut edges);
    for hole in polygon.interiors() {
        ring_edges(hole, &transform, &mut edges);
    }
    if edges.is_empty() {
        return Ok(());
    }

    let (rows, cols) = mask.shape();
    let (min_y, max_y) = edges.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), e| {
        (lo.min(e.y0).min(e.y1), hi.max(e.y0).max(e.y1))
    });
    if !min_y.is_finite() || !max_y.is_finite() {
        return Ok(());
    }

    let row_start = (min_y - 0.5).ceil().max(0.0) as usize;
    let row_end = ((max_y - 0.5).ceil().max(0.0) as usize).min(rows);

    let data = mask.data_mut();
    let mut crossings: Vec<f64> = Vec::new();
    for row in row_start..row_end {
        let y = row as f64 + 0.5;

        crossings.clear();
        for e in &edges {
            if (e.y0 <= y && y < e.y1) || (e.y1 <= y && y < e.y0) {
                crossings.push(e.x0 + (y - e.y0) * (e.x1 - e.x0) / (e.y1 - e.y0));
            }
        }
        crossings.sort_by(f64::total_cmp);

        for pair in crossings.chunks_exact(2) {
            let start = (pair[0] - 0.5).ceil().max(0.0) as usize;
            let end = ((pair[1] - 0.5).ceil().max(0.0) as usize).min(cols);
            for col in start..end {
                data[(row, col)] = true;
            }
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

fn ring_edges(ring: &LineString<f64>, transform: &GeoTransform, out: &mut Vec<Edge>) {
    let pts: Vec<(f64, f64)> = ring
        .coords()
        .map(|c| transform.geo_to_pixel(c.x, c.y))
        .collect();
    if pts.len() < 3 {
        return;
    }

    // Close the ring if the source left it open
    let n = pts.len();
    for i in 0..n {
        let (x0, y0) = pts[i];
        let (x1, y1) = pts[(i + 1) % n];
        if y0 != y1 {
            out.push(Edge { x0, y0, x1, y1 });
        }
    }
}

//! Rectangular pixel windows

use serde::{Deserialize, Serialize};

use super::GeoTransform;

/// A rectangular sub-region of a raster grid, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    /// First column covered
    pub col_off: usize,
    /// First row covered
    pub row_off: usize,
    /// Number of columns
    pub width: usize,
    /// Number of rows
    pub height: usize,
}

impl Window {
    pub fn new(col_off: usize, row_off: usize, width: usize, height: usize) -> Self {
        Self {
            col_off,
            row_off,
            width,
            height,
        }
    }

    /// Exclusive end column
    pub fn col_end(&self) -> usize {
        self.col_off + self.width
    }

    /// Exclusive end row
    pub fn row_end(&self) -> usize {
        self.row_off + self.height
    }

    /// Number of pixels covered
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the pixel (col, row) lies inside the window
    pub fn contains(&self, col: usize, row: usize) -> bool {
        col >= self.col_off && col < self.col_end() && row >= self.row_off && row < self.row_end()
    }

    /// Whether the window lies fully inside a grid of the given size
    pub fn fits(&self, cols: usize, rows: usize) -> bool {
        self.col_end() <= cols && self.row_end() <= rows
    }

    /// Clip the window to a grid, returning `None` when nothing remains
    pub fn clip(&self, cols: usize, rows: usize) -> Option<Window> {
        let col_end = self.col_end().min(cols);
        let row_end = self.row_end().min(rows);
        if self.col_off >= col_end || self.row_off >= row_end {
            return None;
        }
        Some(Window::new(
            self.col_off,
            self.row_off,
            col_end - self.col_off,
            row_end - self.row_off,
        ))
    }

    /// Window covering world bounds `(min_x, min_y, max_x, max_y)` under a
    /// transform. Fractional edges are expanded outward to whole pixels;
    /// the result is not clipped to any grid.
    pub fn from_bounds(bounds: (f64, f64, f64, f64), transform: &GeoTransform) -> Window {
        let (min_x, min_y, max_x, max_y) = bounds;
        let corners = [
            transform.geo_to_pixel(min_x, min_y),
            transform.geo_to_pixel(min_x, max_y),
            transform.geo_to_pixel(max_x, min_y),
            transform.geo_to_pixel(max_x, max_y),
        ];

        let mut c0 = f64::INFINITY;
        let mut r0 = f64::INFINITY;
        let mut c1 = f64::NEG_INFINITY;
        let mut r1 = f64::NEG_INFINITY;
        for (c, r) in corners {
            c0 = c0.min(c);
            r0 = r0.min(r);
            c1 = c1.max(c);
            r1 = r1.max(r);
        }

        // Tolerate float noise around integral pixel edges
        const EPS: f64 = 1e-9;
        let col_off = (c0 + EPS).floor().max(0.0) as usize;
        let row_off = (r0 + EPS).floor().max(0.0) as usize;
        let col_end = (c1 - EPS).ceil().max(0.0) as usize;
        let row_end = (r1 - EPS).ceil().max(0.0) as usize;

        Window::new(
            col_off,
            row_off,
            col_end.saturating_sub(col_off),
            row_end.saturating_sub(row_off),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bounds() {
        let gt = GeoTransform::from_origin(0.0, 10.0, 1.0, 1.0);
        let w = Window::from_bounds((2.0, 2.0, 5.0, 5.0), &gt);
        assert_eq!(w, Window::new(2, 5, 3, 3));
    }

    #[test]
    fn test_clip() {
        let w = Window::new(3, 2, 4, 4);
        assert_eq!(w.clip(5, 4), Some(Window::new(3, 2, 2, 2)));
        assert_eq!(Window::new(6, 0, 2, 2).clip(5, 4), None);
        assert!(w.contains(3, 2));
        assert!(!w.contains(7, 2));
    }
}

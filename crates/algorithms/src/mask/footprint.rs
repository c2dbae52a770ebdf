//! Restrict a mask to building footprint interiors

use super::rasterize::rasterize_polygons;
use roofarea_core::raster::Mask;
use roofarea_core::vector::FeatureCollection;
use roofarea_core::{Error, Result};
use tracing::{debug, info};

/// Keep only the mask pixels whose centres fall inside at least one
/// footprint.
///
/// Footprints are reprojected to the mask CRS when both are known and
/// differ. Overlapping footprints are unioned.
///
/// # Errors
/// - [`Error::NoFootprints`] when no collection is given or it is empty
/// - [`Error::MissingCrs`] when the collection has no CRS
pub fn constrain_to_footprints(mask: &Mask, footprints: Option<&FeatureCollection>) -> Result<Mask> {
    let footprints = match footprints {
        Some(fc) if !fc.is_empty() => fc,
        _ => {
            return Err(Error::NoFootprints(
                "provide building footprints or use a trained model".into(),
            ))
        }
    };

    let source_crs = footprints
        .crs
        .as_ref()
        .ok_or_else(|| Error::MissingCrs("Building footprints".into()))?;

    let aligned = match mask.crs() {
        Some(target) if !source_crs.is_equivalent(target) => {
            debug!(from = %source_crs, to = %target, "reprojecting footprints");
            footprints.to_crs(target)?
        }
        _ => footprints.clone(),
    };

    let union = rasterize_polygons(&aligned.polygons(), &mask.grid_spec())?;
    info!(footprints = footprints.len(), "Applied footprint mask");

    mask.and(&union)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{polygon, Geometry, Polygon};
    use ndarray::Array2;
    use roofarea_core::vector::Feature;
    use roofarea_core::{GeoTransform, CRS};

    fn square(x: f64, y: f64, s: f64) -> Polygon<f64> {
        polygon![(x: x, y: y), (x: x + s, y: y), (x: x + s, y: y + s), (x: x, y: y + s)]
    }

    fn full_mask(crs: Option<CRS>) -> Mask {
        Mask::from_array(
            Array2::from_elem((10, 10), true),
            GeoTransform::from_origin(0.0, 10.0, 1.0, 1.0),
            crs,
        )
    }

    fn collection(polys: Vec<Polygon<f64>>, crs: Option<CRS>) -> FeatureCollection {
        FeatureCollection {
            features: polys
                .into_iter()
                .map(|p| Feature::new(Geometry::Polygon(p)))
                .collect(),
            crs,
        }
    }

    #[test]
    fn test_mask_limited_to_footprint() {
        let mask = full_mask(Some(CRS::from_epsg(32630)));
        let fc = collection(vec![square(2.0, 2.0, 3.0)], Some(CRS::from_epsg(32630)));
        let out = constrain_to_footprints(&mask, Some(&fc)).unwrap();
        assert_eq!(out.count(), 9);
        assert!(!out.get(0, 0));
    }

    #[test]
    fn test_overlapping_footprints_are_unioned() {
        let mask = full_mask(Some(CRS::from_epsg(32630)));
        let fc = collection(
            vec![square(0.0, 0.0, 4.0), square(2.0, 2.0, 4.0)],
            Some(CRS::from_epsg(32630)),
        );
        let out = constrain_to_footprints(&mask, Some(&fc)).unwrap();
        assert_eq!(out.count(), 28);
    }

    #[test]
    fn test_output_never_exceeds_input_mask() {
        let mut mask = full_mask(None);
        mask.data_mut()[(6, 3)] = false;
        let fc = collection(vec![square(2.0, 2.0, 3.0)], Some(CRS::from_epsg(3857)));
        let out = constrain_to_footprints(&mask, Some(&fc)).unwrap();
        assert_eq!(out.count(), 8);
        assert!(!out.get(6, 3));
    }

    #[test]
    fn test_missing_footprints() {
        let mask = full_mask(None);
        assert!(matches!(
            constrain_to_footprints(&mask, None),
            Err(Error::NoFootprints(_))
        ));
        let empty = collection(vec![], Some(CRS::wgs84()));
        assert!(matches!(
            constrain_to_footprints(&mask, Some(&empty)),
            Err(Error::NoFootprints(_))
        ));
    }

    #[test]
    fn test_footprints_without_crs() {
        let mask = full_mask(Some(CRS::web_mercator()));
        let fc = collection(vec![square(0.0, 0.0, 2.0)], None);
        assert!(matches!(
            constrain_to_footprints(&mask, Some(&fc)),
            Err(Error::MissingCrs(_))
        ));
    }

    #[test]
    fn test_unprojectable_wkt_footprints_error() {
        // Non-ASCII text near the start of the WKT ends up in the error message
        let wkt = format!("PROJCS[\"{}é\"]", "a".repeat(41));
        let mask = full_mask(Some(CRS::from_epsg(32630)));
        let fc = collection(vec![square(0.0, 0.0, 2.0)], Some(CRS::from_wkt(&wkt)));
        assert!(matches!(
            constrain_to_footprints(&mask, Some(&fc)),
            Err(Error::Projection(_))
        ));
    }

    #[test]
    fn test_footprints_reprojected_to_mask_crs() {
        // 10 m pixels in UTM 30N just east of the central meridian
        let transform = GeoTransform::from_origin(500_000.0, 100.0, 10.0, 10.0);
        let mask = Mask::from_array(
            Array2::from_elem((10, 10), true),
            transform,
            Some(CRS::from_epsg(32630)),
        );

        // Same 30 m square expressed in lon/lat
        let t = roofarea_core::reproject::Transformer::new(32630u32, 4326u32).unwrap();
        let corner = |x: f64, y: f64| t.transform(x, y).unwrap();
        let (x0, y0) = corner(500_020.0, 30.0);
        let (x1, y1) = corner(500_050.0, 60.0);
        let fc = collection(
            vec![polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)]],
            Some(CRS::wgs84()),
        );

        let out = constrain_to_footprints(&mask, Some(&fc)).unwrap();
        assert_eq!(out.count(), 9);
    }
}

//! Roof area aggregation by building or tile

use geo::Area;
use geo_types::Geometry;
use roofarea_core::reproject::ensure_metric_crs;
use roofarea_core::vector::FeatureCollection;
use roofarea_core::{Error, Result, CRS};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Attribute holding a precomputed area in square metres
pub const AREA_COLUMN: &str = "area_m2";
/// Preferred grouping attribute
pub const BUILDING_KEY: &str = "building_id";
/// Fallback grouping attribute
pub const TILE_KEY: &str = "tile_id";

/// Summed area of one building or tile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaRow {
    pub group_key: String,
    pub total_area_m2: f64,
}

/// Sum feature areas per `building_id` (or `tile_id` when no feature has a
/// building id).
///
/// The `area_m2` attribute is used when the collection has one; otherwise
/// areas come from the geometries, reprojected to Web Mercator when the
/// collection CRS is not metric. Rows are sorted by key. Features whose key
/// is null are left out.
pub fn aggregate_areas(collection: &FeatureCollection) -> Result<Vec<AreaRow>> {
    let key = if collection.has_values(BUILDING_KEY) {
        BUILDING_KEY
    } else if collection.has_values(TILE_KEY) {
        TILE_KEY
    } else {
        return Err(Error::MissingGroupKey);
    };

    let areas = feature_areas(collection)?;
    debug!(features = areas.len(), key, "aggregating areas");

    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for (feature, area) in collection.iter().zip(areas) {
        if let Some(group) = feature.get_property(key).and_then(|v| v.as_key()) {
            *totals.entry(group).or_insert(0.0) += area;
        }
    }

    Ok(totals
        .into_iter()
        .map(|(group_key, total_area_m2)| AreaRow {
            group_key,
            total_area_m2,
        })
        .collect())
}

/// Area of each feature in square metres, in collection order
fn feature_areas(collection: &FeatureCollection) -> Result<Vec<f64>> {
    if collection.has_column(AREA_COLUMN) {
        return Ok(collection
            .iter()
            .map(|f| {
                f.get_property(AREA_COLUMN)
                    .and_then(|v| v.as_f64())
                    .unwrap_or(0.0)
            })
            .collect());
    }

    let metric = ensure_metric_crs(collection.crs.as_ref(), CRS::web_mercator())?;
    let projected = collection.to_crs(&metric)?;

    Ok(projected
        .iter()
        .map(|f| f.geometry.as_ref().map_or(0.0, geometry_area))
        .collect())
}

fn geometry_area(geometry: &Geometry<f64>) -> f64 {
    geometry.unsigned_area()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo_types::{polygon, Polygon};
    use roofarea_core::vector::{AttributeValue, Feature};
    use std::collections::HashMap;

    fn square(x: f64, y: f64, s: f64) -> Polygon<f64> {
        polygon![(x: x, y: y), (x: x + s, y: y), (x: x + s, y: y + s), (x: x, y: y + s)]
    }

    fn as_map(rows: Vec<AreaRow>) -> HashMap<String, f64> {
        rows.into_iter().map(|r| (r.group_key, r.total_area_m2)).collect()
    }

    #[test]
    fn test_area_column_grouped_by_building() {
        let features = vec![
            Feature::empty()
                .with_property("building_id", AttributeValue::String("a".into()))
                .with_property("area_m2", AttributeValue::Float(10.0)),
            Feature::empty()
                .with_property("building_id", AttributeValue::String("a".into()))
                .with_property("area_m2", AttributeValue::Int(5)),
            Feature::empty()
                .with_property("building_id", AttributeValue::String("b".into()))
                .with_property("area_m2", AttributeValue::Null),
        ];
        let fc = FeatureCollection { features, crs: None };
        let rows = as_map(aggregate_areas(&fc).unwrap());
        assert_eq!(rows.len(), 2);
        assert_relative_eq!(rows["a"], 15.0);
        assert_relative_eq!(rows["b"], 0.0);
    }

    #[test]
    fn test_falls_back_to_tile_id() {
        let features = vec![
            Feature::empty()
                .with_property("building_id", AttributeValue::Null)
                .with_property("tile_id", AttributeValue::Int(1))
                .with_property("area_m2", AttributeValue::Float(2.5)),
            Feature::empty()
                .with_property("tile_id", AttributeValue::Int(1))
                .with_property("area_m2", AttributeValue::Float(1.5)),
        ];
        let fc = FeatureCollection { features, crs: None };
        let rows = aggregate_areas(&fc).unwrap();
        assert_eq!(
            rows,
            vec![AreaRow {
                group_key: "1".into(),
                total_area_m2: 4.0
            }]
        );
    }

    #[test]
    fn test_missing_group_key() {
        let fc = FeatureCollection {
            features: vec![Feature::empty().with_property("area_m2", AttributeValue::Float(1.0))],
            crs: None,
        };
        assert!(matches!(aggregate_areas(&fc), Err(Error::MissingGroupKey)));
    }

    #[test]
    fn test_geometry_area_in_metric_crs() {
        let features = vec![
            Feature::new(Geometry::Polygon(square(500_000.0, 0.0, 10.0)))
                .with_property("building_id", AttributeValue::Int(7)),
            Feature::new(Geometry::Polygon(square(500_100.0, 0.0, 5.0)))
                .with_property("building_id", AttributeValue::Int(7)),
            Feature::empty().with_property("building_id", AttributeValue::Int(8)),
        ];
        let fc = FeatureCollection::with_crs(features, CRS::from_epsg(32630));
        let rows = as_map(aggregate_areas(&fc).unwrap());
        assert_relative_eq!(rows["7"], 125.0, epsilon = 1e-6);
        assert_relative_eq!(rows["8"], 0.0);
    }

    #[test]
    fn test_geographic_geometries_use_web_mercator() {
        // 0.001° square at the equator: about 111.32 m on a side in Web Mercator
        let features = vec![Feature::new(Geometry::Polygon(square(0.0, 0.0, 0.001)))
            .with_property("building_id", AttributeValue::String("x".into()))];
        let fc = FeatureCollection::with_crs(features, CRS::wgs84());
        let rows = aggregate_areas(&fc).unwrap();
        let side = 6_378_137.0 * 0.001_f64.to_radians();
        assert_relative_eq!(rows[0].total_area_m2, side * side, max_relative = 1e-4);
    }

    #[test]
    fn test_geometry_areas_require_crs() {
        let features = vec![Feature::new(Geometry::Polygon(square(0.0, 0.0, 1.0)))
            .with_property("building_id", AttributeValue::Int(1))];
        let fc = FeatureCollection { features, crs: None };
        assert!(matches!(aggregate_areas(&fc), Err(Error::MissingCrs(_))));
    }
}

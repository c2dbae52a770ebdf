//! GeoJSON reading into [`FeatureCollection`]
//!
//! The CRS is taken from the legacy top-level `crs` member
//! (`{"type": "name", "properties": {"name": "EPSG:3857"}}`). Documents
//! without one produce a collection whose CRS is unset.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use geojson::{feature::Id, GeoJson, JsonObject};
use std::path::Path;
use tracing::debug;

/// Read a GeoJSON file
pub fn read_geojson<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let collection = parse_geojson(&text)?;
    debug!(
        path = %path.as_ref().display(),
        features = collection.len(),
        crs = ?collection.crs.as_ref().map(CRS::identifier),
        "read GeoJSON"
    );
    Ok(collection)
}

/// Parse a GeoJSON document: a FeatureCollection, a single Feature, or a
/// bare Geometry.
pub fn parse_geojson(text: &str) -> Result<FeatureCollection> {
    let document: GeoJson = text.parse()?;

    match document {
        GeoJson::FeatureCollection(fc) => {
            let crs = crs_member(fc.foreign_members.as_ref())?;
            let features = fc
                .features
                .into_iter()
                .map(convert_feature)
                .collect::<Result<Vec<_>>>()?;
            Ok(FeatureCollection { features, crs })
        }
        GeoJson::Feature(f) => {
            let crs = crs_member(f.foreign_members.as_ref())?;
            Ok(FeatureCollection {
                features: vec![convert_feature(f)?],
                crs,
            })
        }
        GeoJson::Geometry(g) => {
            let crs = crs_member(g.foreign_members.as_ref())?;
            let geometry = geo_types::Geometry::<f64>::try_from(g.value)?;
            Ok(FeatureCollection {
                features: vec![Feature::new(geometry)],
                crs,
            })
        }
    }
}

fn convert_feature(feature: geojson::Feature) -> Result<Feature> {
    let geometry = feature
        .geometry
        .map(|g| geo_types::Geometry::<f64>::try_from(g.value))
        .transpose()?;

    let properties = feature
        .properties
        .unwrap_or_default()
        .iter()
        .map(|(k, v)| (k.clone(), AttributeValue::from(v)))
        .collect();

    let id = feature.id.map(|id| match id {
        Id::String(s) => s,
        Id::Number(n) => n.to_string(),
    });

    Ok(Feature {
        geometry,
        properties,
        id,
    })
}

/// CRS named by a `crs` foreign member, if any
fn crs_member(members: Option<&JsonObject>) -> Result<Option<CRS>> {
    let Some(crs) = members.and_then(|m| m.get("crs")) else {
        return Ok(None);
    };
    if crs.is_null() {
        return Ok(None);
    }

    let name = crs
        .get("properties")
        .and_then(|p| p.get("name"))
        .and_then(|n| n.as_str())
        .ok_or_else(|| Error::GeoJson("'crs' member has no properties.name".into()))?;

    name.parse().map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const WITH_CRS: &str = r#"{
        "type": "FeatureCollection",
        "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::32630"}},
        "features": [
            {
                "type": "Feature",
                "id": 7,
                "properties": {"building_id": "b1", "area_m2": 12.5},
                "geometry": {"type": "Polygon", "coordinates": [[[0,0],[4,0],[4,4],[0,4],[0,0]]]}
            },
            {
                "type": "Feature",
                "properties": {"building_id": null},
                "geometry": {"type": "MultiPolygon", "coordinates": [
                    [[[10,0],[12,0],[12,2],[10,2],[10,0]]],
                    [[[20,0],[22,0],[22,2],[20,2],[20,0]]]
                ]}
            },
            {"type": "Feature", "properties": null, "geometry": null}
        ]
    }"#;

    #[test]
    fn test_parse_collection_with_crs() {
        let fc = parse_geojson(WITH_CRS).unwrap();
        assert_eq!(fc.len(), 3);
        assert_eq!(fc.crs.as_ref().and_then(|c| c.epsg()), Some(32630));
        assert_eq!(fc.polygons().len(), 3);

        let first = &fc.features[0];
        assert_eq!(first.id.as_deref(), Some("7"));
        assert_eq!(
            first.get_property("building_id"),
            Some(&AttributeValue::String("b1".into()))
        );
        assert_eq!(first.get_property("area_m2").and_then(|v| v.as_f64()), Some(12.5));
        assert!(fc.features[2].geometry.is_none());
    }

    #[test]
    fn test_missing_crs_member_leaves_crs_unset() {
        let text = r#"{"type": "FeatureCollection", "features": []}"#;
        let fc = parse_geojson(text).unwrap();
        assert!(fc.crs.is_none());
        assert!(fc.is_empty());
    }

    #[test]
    fn test_crs84_is_wgs84() {
        let text = r#"{
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:OGC:1.3:CRS84"}},
            "features": []
        }"#;
        let fc = parse_geojson(text).unwrap();
        assert_eq!(fc.crs.and_then(|c| c.epsg()), Some(4326));
    }

    #[test]
    fn test_malformed_document() {
        assert!(matches!(parse_geojson("{not json"), Err(Error::GeoJson(_))));
    }

    #[test]
    fn test_read_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(WITH_CRS.as_bytes()).unwrap();
        let fc = read_geojson(file.path()).unwrap();
        assert_eq!(fc.len(), 3);
    }
}

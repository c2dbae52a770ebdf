//! Coordinate reprojection of points, bounding boxes and vector geometries.
//!
//! A [`Transformer`] composes two legs through geographic WGS84
//! longitude/latitude. Geographic WGS84 and Web Mercator use closed-form
//! math; anything else with a PROJ definition (UTM zones included) is
//! handled by `proj4rs`.

mod mercator;

use crate::crs::{IntoCrs, CRS};
use crate::error::{Error, Result};
use crate::vector::FeatureCollection;
use geo::MapCoords;
use geo_types::{Coord, Geometry};
use proj4rs::proj::Proj;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

const WGS84_PROJ: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// Axis-aligned bounding box in CRS units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Whether `other` lies inside this box, allowing `tolerance` slack
    pub fn encloses(&self, other: &BBox, tolerance: f64) -> bool {
        self.min_x <= other.min_x + tolerance
            && self.min_y <= other.min_y + tolerance
            && self.max_x >= other.max_x - tolerance
            && self.max_y >= other.max_y - tolerance
    }

    pub fn to_tuple(self) -> (f64, f64, f64, f64) {
        (self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

impl From<(f64, f64, f64, f64)> for BBox {
    fn from((min_x, min_y, max_x, max_y): (f64, f64, f64, f64)) -> Self {
        Self::new(min_x, min_y, max_x, max_y)
    }
}

/// One side of a transformation, expressed relative to WGS84 lon/lat
enum Leg {
    Geographic,
    WebMercator,
    Proj {
        proj: Box<Proj>,
        wgs84: Box<Proj>,
        geographic: bool,
    },
}

impl Leg {
    fn for_crs(crs: &CRS) -> Result<Self> {
        match crs.epsg() {
            Some(4326) => return Ok(Leg::Geographic),
            Some(3857) | Some(900913) => return Ok(Leg::WebMercator),
            _ => {}
        }

        let def = crs
            .proj_definition()
            .ok_or_else(|| Error::Projection(format!("no projection definition for {}", crs)))?;
        debug!(crs = %crs, proj = %def, "building proj4rs projection");

        let proj = Proj::from_proj_string(&def)
            .map_err(|e| Error::Projection(format!("invalid projection {}: {:?}", crs, e)))?;
        let wgs84 = Proj::from_proj_string(WGS84_PROJ)
            .map_err(|e| Error::Projection(format!("invalid WGS84 projection: {:?}", e)))?;

        Ok(Leg::Proj {
            proj: Box::new(proj),
            wgs84: Box::new(wgs84),
            geographic: crs.is_geographic(),
        })
    }

    fn unproject(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        match self {
            Leg::Geographic => Ok((x, y)),
            Leg::WebMercator => Ok(mercator::inverse(x, y)),
            Leg::Proj {
                proj,
                wgs84,
                geographic,
            } => {
                let mut point = if *geographic {
                    (x.to_radians(), y.to_radians(), 0.0)
                } else {
                    (x, y, 0.0)
                };
                proj4rs::transform::transform(proj, wgs84, &mut point)
                    .map_err(|e| Error::Projection(format!("transform failed: {:?}", e)))?;
                Ok((point.0.to_degrees(), point.1.to_degrees()))
            }
        }
    }

    fn project(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        match self {
            Leg::Geographic => Ok((lon, lat)),
            Leg::WebMercator => Ok(mercator::forward(lon, lat)),
            Leg::Proj {
                proj,
                wgs84,
                geographic,
            } => {
                let mut point = (lon.to_radians(), lat.to_radians(), 0.0);
                proj4rs::transform::transform(wgs84, proj, &mut point)
                    .map_err(|e| Error::Projection(format!("transform failed: {:?}", e)))?;
                if *geographic {
                    Ok((point.0.to_degrees(), point.1.to_degrees()))
                } else {
                    Ok((point.0, point.1))
                }
            }
        }
    }
}

/// Point transformer between two coordinate reference systems
pub struct Transformer {
    source: CRS,
    target: CRS,
    legs: Option<(Leg, Leg)>,
}

impl Transformer {
    /// Build a transformer; equivalent CRSs give an identity transform
    pub fn new(source: impl IntoCrs, target: impl IntoCrs) -> Result<Self> {
        let source = source.into_crs()?;
        let target = target.into_crs()?;

        let legs = if source.is_equivalent(&target) {
            None
        } else {
            Some((Leg::for_crs(&source)?, Leg::for_crs(&target)?))
        };

        Ok(Self {
            source,
            target,
            legs,
        })
    }

    pub fn source(&self) -> &CRS {
        &self.source
    }

    pub fn target(&self) -> &CRS {
        &self.target
    }

    pub fn is_identity(&self) -> bool {
        self.legs.is_none()
    }

    /// Transform a single point
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let Some((src, dst)) = &self.legs else {
            return Ok((x, y));
        };
        let (lon, lat) = src.unproject(x, y)?;
        let (tx, ty) = dst.project(lon, lat)?;
        if !tx.is_finite() || !ty.is_finite() {
            return Err(Error::Projection(format!(
                "({}, {}) has no finite image from {} to {}",
                x, y, self.source, self.target
            )));
        }
        Ok((tx, ty))
    }

    /// Transform every coordinate of a geometry
    pub fn transform_geometry(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>> {
        if self.is_identity() {
            return Ok(geometry.clone());
        }
        geometry.try_map_coords(|c: Coord<f64>| -> Result<Coord<f64>> {
            let (x, y) = self.transform(c.x, c.y)?;
            Ok(Coord { x, y })
        })
    }

    /// Envelope of the four transformed corners of `bbox`
    pub fn transform_bounds(&self, bbox: &BBox) -> Result<BBox> {
        if self.is_identity() {
            return Ok(*bbox);
        }

        let corners = [
            (bbox.min_x, bbox.min_y),
            (bbox.min_x, bbox.max_y),
            (bbox.max_x, bbox.min_y),
            (bbox.max_x, bbox.max_y),
        ];

        let mut out = BBox::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for (x, y) in corners {
            let (tx, ty) = self.transform(x, y)?;
            out.min_x = out.min_x.min(tx);
            out.min_y = out.min_y.min(ty);
            out.max_x = out.max_x.max(tx);
            out.max_y = out.max_y.max(ty);
        }
        Ok(out)
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformer")
            .field("source", &self.source.identifier())
            .field("target", &self.target.identifier())
            .field("identity", &self.is_identity())
            .finish()
    }
}

/// Reproject a bounding box by transforming its four corners and taking the
/// envelope. Equivalent CRSs return the box unchanged.
pub fn reproject_bounds(bbox: BBox, source: impl IntoCrs, target: impl IntoCrs) -> Result<BBox> {
    let source = source.into_crs()?;
    let target = target.into_crs()?;
    if source.is_equivalent(&target) {
        return Ok(bbox);
    }
    Transformer::new(source, target)?.transform_bounds(&bbox)
}

/// Bring an area-of-interest box into the CRS of the raster it will be read
/// from.
pub fn reproject_aoi_to_raster_crs(
    bounds: BBox,
    aoi_crs: impl IntoCrs,
    raster_crs: impl IntoCrs,
) -> Result<BBox> {
    reproject_bounds(bounds, aoi_crs, raster_crs)
}

/// The CRS itself when it is a projected metric CRS, otherwise `target`.
pub fn ensure_metric_crs(crs: Option<&CRS>, target: impl IntoCrs) -> Result<CRS> {
    let crs = crs.ok_or_else(|| Error::MissingCrs("Geometry".into()))?;
    if crs.is_metric() {
        Ok(crs.clone())
    } else {
        target.into_crs()
    }
}

impl FeatureCollection {
    /// Copy of this collection with every geometry transformed to `target`
    pub fn to_crs(&self, target: impl IntoCrs) -> Result<FeatureCollection> {
        let source = self
            .crs
            .as_ref()
            .ok_or_else(|| Error::MissingCrs("Feature collection".into()))?;
        let transformer = Transformer::new(source, target)?;
        if transformer.is_identity() {
            return Ok(self.clone());
        }

        let mut features = Vec::with_capacity(self.len());
        for feature in &self.features {
            let mut f = feature.clone();
            f.geometry = feature
                .geometry
                .as_ref()
                .map(|g| transformer.transform_geometry(g))
                .transpose()?;
            features.push(f);
        }

        Ok(FeatureCollection {
            features,
            crs: Some(transformer.target().clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::Feature;
    use approx::assert_abs_diff_eq;
    use geo_types::polygon;

    #[test]
    fn test_identity_is_unchanged() {
        let bbox = BBox::new(-3.75, 40.40, -3.70, 40.45);
        let out = reproject_bounds(bbox, "EPSG:4326", CRS::wgs84()).unwrap();
        assert_eq!(out, bbox);
    }

    #[test]
    fn test_bounds_to_utm() {
        let bbox = BBox::new(-3.75, 40.40, -3.70, 40.45);
        let out = reproject_bounds(bbox, 4326u32, 32630u32).unwrap();
        assert!(out.min_x > 400_000.0 && out.max_x < 500_000.0);
        assert!(out.min_y > 4_400_000.0 && out.max_y < 4_500_000.0);
        assert!(out.width() > 0.0 && out.height() > 0.0);
    }

    #[test]
    fn test_bounds_roundtrip_encloses_original() {
        let bbox = BBox::new(-3.75, 40.40, -3.70, 40.45);
        for target in [3857u32, 32630] {
            let there = reproject_bounds(bbox, 4326u32, target).unwrap();
            let back = reproject_bounds(there, target, 4326u32).unwrap();
            assert!(back.encloses(&bbox, 1e-9), "{:?} vs {:?}", back, bbox);
            assert_abs_diff_eq!(back.min_x, bbox.min_x, epsilon = 1e-2);
            assert_abs_diff_eq!(back.max_y, bbox.max_y, epsilon = 1e-2);
        }
    }

    // pyproj: Transformer.from_crs(4326, 32630, always_xy=True)
    //   .transform(-3.7037, 40.4168) → (440298.94, 4474257.31)
    #[test]
    fn test_utm_north_forward() {
        let t = Transformer::new(4326u32, 32630u32).unwrap();
        let (e, n) = t.transform(-3.7037, 40.4168).unwrap();
        assert_abs_diff_eq!(e, 440_298.94, epsilon = 1.0);
        assert_abs_diff_eq!(n, 4_474_257.31, epsilon = 1.0);
    }

    #[test]
    fn test_utm_south_forward() {
        let t = Transformer::new(4326u32, 32721u32).unwrap();
        let (e, n) = t.transform(-58.3816, -34.6037).unwrap();
        assert_abs_diff_eq!(e, 373_317.50, epsilon = 1.0);
        assert_abs_diff_eq!(n, 6_170_036.17, epsilon = 1.0);
    }

    #[test]
    fn test_utm_roundtrip() {
        for &(lon, lat, code) in &[
            (-3.7037, 40.4168, 32630u32),
            (-58.3816, -34.6037, 32721),
            (13.4, 52.5, 32633),
        ] {
            let there = Transformer::new(4326u32, code).unwrap();
            let back = Transformer::new(code, 4326u32).unwrap();
            let (e, n) = there.transform(lon, lat).unwrap();
            let (lon2, lat2) = back.transform(e, n).unwrap();
            assert_abs_diff_eq!(lon2, lon, epsilon = 1e-6);
            assert_abs_diff_eq!(lat2, lat, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_utm_central_meridian_origin() {
        let t = Transformer::new(32630u32, 4326u32).unwrap();
        let (lon, lat) = t.transform(500_000.0, 0.0).unwrap();
        assert_abs_diff_eq!(lon, -3.0, epsilon = 1e-7);
        assert_abs_diff_eq!(lat, 0.0, epsilon = 1e-7);
    }

    #[test]
    fn test_utm_to_mercator_through_wgs84() {
        let t = Transformer::new(32630u32, 3857u32).unwrap();
        let (e, n) = Transformer::new(4326u32, 32630u32)
            .unwrap()
            .transform(-3.7037, 40.4168)
            .unwrap();
        let (x, y) = t.transform(e, n).unwrap();
        let (mx, my) = mercator::forward(-3.7037, 40.4168);
        assert_abs_diff_eq!(x, mx, epsilon = 0.5);
        assert_abs_diff_eq!(y, my, epsilon = 0.5);
    }

    #[test]
    fn test_proj_string_matches_epsg_code() {
        let t = Transformer::new(4326u32, "+proj=utm +zone=30 +datum=WGS84 +units=m +no_defs").unwrap();
        let (x, y) = t.transform(-3.7037, 40.4168).unwrap();
        let (ex, ey) = Transformer::new(4326u32, 32630u32)
            .unwrap()
            .transform(-3.7037, 40.4168)
            .unwrap();
        assert_abs_diff_eq!(x, ex, epsilon = 1e-6);
        assert_abs_diff_eq!(y, ey, epsilon = 1e-6);
        assert_abs_diff_eq!(x, 440_298.94, epsilon = 1.0);
    }

    #[test]
    fn test_unknown_crs_fails() {
        let wkt_only = CRS::from_wkt("PROJCS[\"custom\"]");
        assert!(matches!(
            Transformer::new(wkt_only, 4326u32),
            Err(Error::Projection(_))
        ));
        assert!(Transformer::new("bogus", 4326u32).is_err());
    }

    #[test]
    fn test_ensure_metric_crs() {
        let utm = CRS::from_epsg(32630);
        assert_eq!(ensure_metric_crs(Some(&utm), 3857u32).unwrap().epsg(), Some(32630));
        let wgs = CRS::wgs84();
        assert_eq!(ensure_metric_crs(Some(&wgs), 3857u32).unwrap().epsg(), Some(3857));
        assert!(matches!(
            ensure_metric_crs(None, 3857u32),
            Err(Error::MissingCrs(_))
        ));
    }

    #[test]
    fn test_collection_to_crs() {
        let square = polygon![(x: 500_000.0, y: 0.0), (x: 500_010.0, y: 0.0), (x: 500_010.0, y: 10.0), (x: 500_000.0, y: 10.0)];
        let fc = FeatureCollection::with_crs(
            vec![Feature::new(Geometry::Polygon(square)), Feature::empty()],
            CRS::from_epsg(32630),
        );
        let wgs = fc.to_crs(4326u32).unwrap();
        assert_eq!(wgs.crs.as_ref().and_then(|c| c.epsg()), Some(4326));
        assert!(wgs.features[1].geometry.is_none());

        let Some(Geometry::Polygon(p)) = &wgs.features[0].geometry else {
            panic!("expected polygon");
        };
        let first = p.exterior().0[0];
        assert_abs_diff_eq!(first.x, -3.0, epsilon = 1e-7);
        assert_abs_diff_eq!(first.y, 0.0, epsilon = 1e-7);

        let no_crs = FeatureCollection::new();
        assert!(matches!(no_crs.to_crs(4326u32), Err(Error::MissingCrs(_))));
    }
}

//! Coordinate Reference System handling

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation (primary)
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
    /// PROJ string if available
    proj: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
            proj: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
            proj: None,
        }
    }

    /// Create a CRS from a PROJ string
    pub fn from_proj(proj: impl Into<String>) -> Self {
        Self {
            wkt: None,
            epsg: None,
            proj: Some(proj.into()),
        }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::from_epsg(3857)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Get PROJ string
    pub fn proj(&self) -> Option<&str> {
        self.proj.as_deref()
    }

    /// PROJ definition for this CRS: the explicit PROJ string, or the one
    /// registered for its EPSG code.
    pub fn proj_definition(&self) -> Option<String> {
        if let Some(proj) = &self.proj {
            return Some(proj.clone());
        }
        let code = u16::try_from(self.epsg?).ok()?;
        crs_definitions::from_code(code).map(|def| def.proj4.to_string())
    }

    /// Whether coordinates are geographic longitude/latitude in degrees
    pub fn is_geographic(&self) -> bool {
        match self.proj_definition() {
            Some(def) => def
                .split_whitespace()
                .any(|tok| tok == "+proj=longlat" || tok == "+proj=latlong"),
            None => self.epsg == Some(4326),
        }
    }

    /// Whether this is a projected CRS whose axis unit is the metre
    pub fn is_metric(&self) -> bool {
        let Some(def) = self.proj_definition() else {
            return false;
        };
        if self.is_geographic() {
            return false;
        }
        let mut units = None;
        for tok in def.split_whitespace() {
            if let Some(u) = tok.strip_prefix("+units=") {
                units = Some(u.to_string());
            }
            if tok.starts_with("+to_meter=") {
                return false;
            }
        }
        // PROJ defaults to metres when no unit is given
        matches!(units.as_deref(), None | Some("m"))
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }

        // If both have WKT, compare (this is imperfect)
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }

        match (self.proj_definition(), other.proj_definition()) {
            (Some(a), Some(b)) => normalize_proj(&a) == normalize_proj(&b),
            _ => false,
        }
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(proj) = &self.proj {
            return proj.clone();
        }
        if let Some(wkt) = &self.wkt {
            return format!("WKT:{}", wkt.chars().take(50).collect::<String>());
        }
        "Unknown".to_string()
    }
}

fn normalize_proj(def: &str) -> Vec<&str> {
    let mut toks: Vec<&str> = def
        .split_whitespace()
        .filter(|t| *t != "+no_defs" && *t != "+wktext" && *t != "+type=crs")
        .collect();
    toks.sort_unstable();
    toks
}

impl FromStr for CRS {
    type Err = Error;

    /// Parse a textual CRS identifier.
    ///
    /// Accepts `EPSG:3857`, bare codes, OGC URNs
    /// (`urn:ogc:def:crs:EPSG::3857`, `urn:ogc:def:crs:OGC:1.3:CRS84`),
    /// PROJ strings and WKT.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let upper = s.to_ascii_uppercase();

        if upper.ends_with("CRS84") {
            return Ok(CRS::wgs84());
        }
        if s.starts_with("+proj=") || s.starts_with("+init=") {
            return Ok(CRS::from_proj(s));
        }
        if ["PROJCS[", "GEOGCS[", "PROJCRS[", "GEOGCRS[", "COMPD_CS["]
            .iter()
            .any(|p| upper.starts_with(p))
        {
            return Ok(CRS::from_wkt(s));
        }
        if let Ok(code) = s.parse::<u32>() {
            return Ok(CRS::from_epsg(code));
        }
        if upper.starts_with("EPSG:") || upper.starts_with("URN:OGC:DEF:CRS:EPSG:") {
            if let Some(code) = s.rsplit(':').next().and_then(|c| c.parse::<u32>().ok()) {
                return Ok(CRS::from_epsg(code));
            }
        }

        Err(Error::Projection(format!("unrecognized CRS identifier '{}'", s)))
    }
}

/// Conversion of CRS-like inputs (a structured [`CRS`], an EPSG code, or a
/// textual identifier) into a normalized [`CRS`].
pub trait IntoCrs {
    fn into_crs(self) -> Result<CRS>;
}

impl IntoCrs for CRS {
    fn into_crs(self) -> Result<CRS> {
        Ok(self)
    }
}

impl IntoCrs for &CRS {
    fn into_crs(self) -> Result<CRS> {
        Ok(self.clone())
    }
}

impl IntoCrs for &str {
    fn into_crs(self) -> Result<CRS> {
        self.parse()
    }
}

impl IntoCrs for String {
    fn into_crs(self) -> Result<CRS> {
        self.parse()
    }
}

impl IntoCrs for &String {
    fn into_crs(self) -> Result<CRS> {
        self.parse()
    }
}

impl IntoCrs for u32 {
    fn into_crs(self) -> Result<CRS> {
        Ok(CRS::from_epsg(self))
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(4326);
        assert_eq!(crs.epsg(), Some(4326));
        assert_eq!(crs.identifier(), "EPSG:4326");
    }

    #[test]
    fn test_crs_equivalence() {
        let a = CRS::from_epsg(4326);
        let b = CRS::wgs84();
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&CRS::web_mercator()));
    }

    #[test]
    fn test_parse_identifiers() {
        assert_eq!("EPSG:3857".parse::<CRS>().unwrap().epsg(), Some(3857));
        assert_eq!("epsg:32630".parse::<CRS>().unwrap().epsg(), Some(32630));
        assert_eq!("4326".parse::<CRS>().unwrap().epsg(), Some(4326));
        assert_eq!(
            "urn:ogc:def:crs:EPSG::3857".parse::<CRS>().unwrap().epsg(),
            Some(3857)
        );
        assert_eq!(
            "urn:ogc:def:crs:OGC:1.3:CRS84".parse::<CRS>().unwrap().epsg(),
            Some(4326)
        );
        let proj: CRS = "+proj=utm +zone=30 +datum=WGS84 +units=m".parse().unwrap();
        assert!(proj.proj().is_some());
        assert!("not a crs".parse::<CRS>().is_err());
    }

    #[test]
    fn test_into_crs_normalizes() {
        let a = "EPSG:3857".into_crs().unwrap();
        let b = 3857u32.into_crs().unwrap();
        let c = CRS::web_mercator().into_crs().unwrap();
        assert!(a.is_equivalent(&b));
        assert!(b.is_equivalent(&c));
    }

    #[test]
    fn test_metric_classification() {
        assert!(CRS::web_mercator().is_metric());
        assert!(CRS::from_epsg(32630).is_metric());
        assert!(!CRS::wgs84().is_metric());
        assert!(CRS::wgs84().is_geographic());
        assert!(CRS::from_proj("+proj=utm +zone=33 +datum=WGS84").is_metric());
        assert!(!CRS::from_proj("+proj=utm +zone=33 +datum=WGS84 +units=us-ft").is_metric());
        assert!(!CRS::from_wkt("GEOGCS[\"unknown\"]").is_metric());
    }

    #[test]
    fn test_identifier_truncates_on_char_boundary() {
        // 'é' straddles byte 50
        let wkt = format!("PROJCS[\"{}é\"]", "a".repeat(41));
        let crs = CRS::from_wkt(&wkt);
        let id = crs.identifier();
        assert_eq!(id.chars().count(), "WKT:".len() + 50);
        assert!(id.ends_with('é'));
        assert_eq!(crs.to_string(), id);
    }
}

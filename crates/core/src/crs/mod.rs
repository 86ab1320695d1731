//! Coordinate Reference System handling

mod transform;

pub use transform::CrsTransform;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
}

/// The coordinate systems Verdant can transform points between.
///
/// All are defined on the WGS84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrsKind {
    /// Longitude/latitude in degrees (EPSG:4326)
    Geographic,
    /// Spherical Web Mercator in metres (EPSG:3857)
    WebMercator,
    /// Universal Transverse Mercator (EPSG:326xx north, 327xx south)
    Utm { zone: u32, north: bool },
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
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

    /// WGS84 / UTM zone CRS (EPSG:326xx or 327xx)
    pub fn utm(zone: u32, north: bool) -> Self {
        let base = if north { 32600 } else { 32700 };
        Self::from_epsg(base + zone)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Classify this CRS, `None` when Verdant cannot transform it
    pub fn kind(&self) -> Option<CrsKind> {
        match self.epsg? {
            4326 => Some(CrsKind::Geographic),
            3857 | 900913 => Some(CrsKind::WebMercator),
            code @ 32601..=32660 => Some(CrsKind::Utm { zone: code - 32600, north: true }),
            code @ 32701..=32760 => Some(CrsKind::Utm { zone: code - 32700, north: false }),
            _ => None,
        }
    }

    /// Whether coordinates are angular degrees
    pub fn is_geographic(&self) -> bool {
        self.kind() == Some(CrsKind::Geographic)
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }

        // Textual comparison, imperfect but conservative
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }

        false
    }

    /// OGC URN for this CRS, as used by GeoJSON `crs` members
    pub fn urn(&self) -> Option<String> {
        self.epsg.map(|code| format!("urn:ogc:def:crs:EPSG::{}", code))
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(wkt) = &self.wkt {
            let end = wkt.char_indices().nth(50).map_or(wkt.len(), |(i, _)| i);
            return format!("WKT:{}", &wkt[..end]);
        }
        "Unknown".to_string()
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

//! Pure-Rust point transforms between WGS84 geographic, Web Mercator and UTM.
//!
//! UTM formulas follow Snyder (1987), USGS Professional Paper 1395,
//! pp. 61-64. Round trips are accurate to well under a millimetre inside a
//! zone, far finer than any satellite pixel.

use crate::crs::{CrsKind, CRS};
use crate::error::{Error, Result};
use tracing::warn;

// ── WGS84 ellipsoid constants ────────────────────────────────────────────

const A: f64 = 6_378_137.0; // semi-major axis (m)
const F: f64 = 1.0 / 298.257_223_563; // flattening
const E2: f64 = 2.0 * F - F * F; // eccentricity squared
const E_PRIME2: f64 = E2 / (1.0 - E2); // second eccentricity squared
const K0: f64 = 0.9996; // UTM scale factor
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// A resolved point transform from one CRS to another.
#[derive(Debug, Clone, Copy)]
pub struct CrsTransform {
    source: CrsKind,
    target: CrsKind,
    identity: bool,
}

impl CrsTransform {
    /// Build the transform taking coordinates in `from` to coordinates in `to`.
    ///
    /// Equivalent CRSs, or a missing CRS on either side, yield the identity.
    /// Pairs outside [`CrsKind`] fail with [`Error::UnsupportedCrs`].
    pub fn new(from: Option<&CRS>, to: Option<&CRS>) -> Result<Self> {
        let (from, to) = match (from, to) {
            (Some(a), Some(b)) => (a, b),
            (None, None) => return Ok(Self::identity()),
            (a, b) => {
                warn!(
                    "CRS known on one side only ({} vs {}), assuming identical grids",
                    a.map_or("none".to_string(), |c| c.to_string()),
                    b.map_or("none".to_string(), |c| c.to_string()),
                );
                return Ok(Self::identity());
            }
        };

        if from.is_equivalent(to) {
            return Ok(Self::identity());
        }

        match (from.kind(), to.kind()) {
            (Some(source), Some(target)) => Ok(Self {
                source,
                target,
                identity: source == target,
            }),
            _ => Err(Error::UnsupportedCrs {
                from: from.identifier(),
                to: to.identifier(),
            }),
        }
    }

    /// The no-op transform
    pub fn identity() -> Self {
        Self {
            source: CrsKind::Geographic,
            target: CrsKind::Geographic,
            identity: true,
        }
    }

    /// Whether this transform leaves coordinates unchanged
    pub fn is_identity(&self) -> bool {
        self.identity
    }

    /// Transform one (x, y) coordinate pair
    pub fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        if self.identity {
            return (x, y);
        }
        let (lon, lat) = to_geographic(self.source, x, y);
        from_geographic(self.target, lon, lat)
    }
}

fn to_geographic(kind: CrsKind, x: f64, y: f64) -> (f64, f64) {
    match kind {
        CrsKind::Geographic => (x, y),
        CrsKind::WebMercator => web_mercator_to_wgs84(x, y),
        CrsKind::Utm { zone, north } => utm_to_wgs84(x, y, zone, north),
    }
}

fn from_geographic(kind: CrsKind, lon: f64, lat: f64) -> (f64, f64) {
    match kind {
        CrsKind::Geographic => (lon, lat),
        CrsKind::WebMercator => wgs84_to_web_mercator(lon, lat),
        CrsKind::Utm { zone, north } => wgs84_to_utm(lon, lat, zone, north),
    }
}

// ── Web Mercator (spherical, radius = semi-major axis) ──────────────────

fn wgs84_to_web_mercator(lon_deg: f64, lat_deg: f64) -> (f64, f64) {
    let x = A * lon_deg.to_radians();
    let y = A * (std::f64::consts::FRAC_PI_4 + lat_deg.to_radians() / 2.0).tan().ln();
    (x, y)
}

fn web_mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / A).to_degrees();
    let lat = (2.0 * (y / A).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    (lon, lat)
}

// ── UTM (Snyder 1987) ────────────────────────────────────────────────────

fn central_meridian(zone: u32) -> f64 {
    ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians()
}

/// WGS84 (longitude, latitude) in degrees to UTM (easting, northing) in metres.
fn wgs84_to_utm(lon_deg: f64, lat_deg: f64, zone: u32, north: bool) -> (f64, f64) {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let lon0 = central_meridian(zone);

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();

    let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = E_PRIME2 * cos_lat * cos_lat;
    let a_coeff = cos_lat * (lon - lon0);
    let m = meridional_arc(lat);

    let a2 = a_coeff * a_coeff;
    let a4 = a2 * a2;
    let a6 = a4 * a2;

    // Snyder eq. 8-9
    let easting = K0
        * n
        * (a_coeff
            + (1.0 - t + c) * a2 * a_coeff / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * E_PRIME2) * a4 * a_coeff / 120.0)
        + FALSE_EASTING;

    // Snyder eq. 8-10
    let northing = K0
        * (m + n
            * tan_lat
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * E_PRIME2) * a6 / 720.0));

    let northing = if north {
        northing
    } else {
        northing + FALSE_NORTHING_SOUTH
    };

    (easting, northing)
}

/// UTM (easting, northing) in metres to WGS84 (longitude, latitude) in degrees.
fn utm_to_wgs84(easting: f64, northing: f64, zone: u32, north: bool) -> (f64, f64) {
    let x = easting - FALSE_EASTING;
    let y = if north {
        northing
    } else {
        northing - FALSE_NORTHING_SOUTH
    };

    // Footpoint latitude, Snyder eqs. 8-20, 3-24, 3-26
    let m = y / K0;
    let e4 = E2 * E2;
    let e6 = e4 * E2;
    let mu = m / (A * (1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
    let e1 = (1.0 - (1.0 - E2).sqrt()) / (1.0 + (1.0 - E2).sqrt());
    let e1_2 = e1 * e1;
    let e1_3 = e1_2 * e1;
    let e1_4 = e1_3 * e1;

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

    let sin1 = phi1.sin();
    let cos1 = phi1.cos();
    let tan1 = phi1.tan();

    let c1 = E_PRIME2 * cos1 * cos1;
    let t1 = tan1 * tan1;
    let w = 1.0 - E2 * sin1 * sin1;
    let n1 = A / w.sqrt();
    let r1 = A * (1.0 - E2) / w.powf(1.5);
    let d = x / (n1 * K0);

    let d2 = d * d;
    let d3 = d2 * d;
    let d4 = d3 * d;
    let d5 = d4 * d;
    let d6 = d5 * d;

    // Snyder eq. 8-17
    let lat = phi1
        - (n1 * tan1 / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * E_PRIME2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * E_PRIME2 - 3.0 * c1 * c1)
                    * d6
                    / 720.0);

    // Snyder eq. 8-18
    let lon = central_meridian(zone)
        + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * E_PRIME2 + 24.0 * t1 * t1) * d5
                / 120.0)
            / cos1;

    (lon.to_degrees(), lat.to_degrees())
}

/// Meridional arc from the equator to latitude `lat` (radians), Snyder eq. 3-21.
fn meridional_arc(lat: f64) -> f64 {
    let e4 = E2 * E2;
    let e6 = e4 * E2;

    A * ((1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * E2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64, msg: &str) {
        let diff = (a - b).abs();
        assert!(
            diff < tol,
            "{msg}: expected {b}, got {a}, diff {diff} exceeds tolerance {tol}"
        );
    }

    // Reference values from pyproj (PROJ 9.x):
    //   Transformer.from_crs(4326, 32630, always_xy=True).transform(-3.7037, 40.4168)
    #[test]
    fn madrid_wgs84_to_utm30n() {
        let (e, n) = wgs84_to_utm(-3.7037, 40.4168, 30, true);
        assert_close(e, 440_298.94, 1.0, "easting");
        assert_close(n, 4_474_257.31, 1.0, "northing");
    }

    #[test]
    fn buenos_aires_wgs84_to_utm21s() {
        let (e, n) = wgs84_to_utm(-58.3816, -34.6037, 21, false);
        assert_close(e, 373_317.50, 1.0, "easting");
        assert_close(n, 6_170_036.17, 1.0, "northing");
    }

    #[test]
    fn utm_roundtrip_brampton() {
        let (lon, lat) = (-79.7624, 43.7315);
        let (e, n) = wgs84_to_utm(lon, lat, 17, true);
        let (lon2, lat2) = utm_to_wgs84(e, n, 17, true);
        assert_close(lon2, lon, 1e-8, "longitude");
        assert_close(lat2, lat, 1e-8, "latitude");
    }

    #[test]
    fn utm_roundtrip_southern_hemisphere() {
        let (lon, lat) = (-58.3816, -34.6037);
        let (e, n) = wgs84_to_utm(lon, lat, 21, false);
        let (lon2, lat2) = utm_to_wgs84(e, n, 21, false);
        assert_close(lon2, lon, 1e-8, "longitude");
        assert_close(lat2, lat, 1e-8, "latitude");
    }

    #[test]
    fn equator_central_meridian() {
        let (lon, lat) = utm_to_wgs84(500_000.0, 0.0, 30, true);
        assert_close(lon, -3.0, 1e-10, "longitude at CM");
        assert_close(lat, 0.0, 1e-10, "latitude at equator");
    }

    #[test]
    fn web_mercator_roundtrip() {
        let (x, y) = wgs84_to_web_mercator(-79.7624, 43.7315);
        // EPSG:3857 x is linear in longitude
        assert_close(x, -8_879_109.75, 0.01, "x");
        let (lon, lat) = web_mercator_to_wgs84(x, y);
        assert_close(lon, -79.7624, 1e-9, "longitude");
        assert_close(lat, 43.7315, 1e-9, "latitude");
    }

    #[test]
    fn transform_between_projected_systems() {
        let utm = CRS::utm(17, true);
        let merc = CRS::web_mercator();
        let forward = CrsTransform::new(Some(&utm), Some(&merc)).unwrap();
        let back = CrsTransform::new(Some(&merc), Some(&utm)).unwrap();

        let (x, y) = forward.transform(600_000.0, 4_840_000.0);
        let (e, n) = back.transform(x, y);
        assert_close(e, 600_000.0, 1e-3, "easting");
        assert_close(n, 4_840_000.0, 1e-3, "northing");
    }

    #[test]
    fn equivalent_or_missing_crs_is_identity() {
        let wgs = CRS::wgs84();
        assert!(CrsTransform::new(Some(&wgs), Some(&CRS::from_epsg(4326))).unwrap().is_identity());
        assert!(CrsTransform::new(None, Some(&wgs)).unwrap().is_identity());
        assert!(CrsTransform::new(None, None).unwrap().is_identity());
    }

    #[test]
    fn unsupported_pair_is_an_error() {
        let result = CrsTransform::new(Some(&CRS::from_epsg(2958)), Some(&CRS::wgs84()));
        assert!(matches!(result, Err(Error::UnsupportedCrs { .. })));
    }
}

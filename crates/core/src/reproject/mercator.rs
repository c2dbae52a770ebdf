//! Spherical Web Mercator (EPSG:3857)

use std::f64::consts::PI;

const RADIUS: f64 = 6_378_137.0;

/// Longitude/latitude in degrees to Web Mercator metres
pub fn forward(lon: f64, lat: f64) -> (f64, f64) {
    let x = RADIUS * lon.to_radians();
    let y = RADIUS * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Web Mercator metres to longitude/latitude in degrees
pub fn inverse(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / RADIUS).to_degrees();
    let lat = (2.0 * (y / RADIUS).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_known_values() {
        let (x, y) = forward(180.0, 0.0);
        assert_abs_diff_eq!(x, 20_037_508.342_789_244, epsilon = 1e-6);
        assert_abs_diff_eq!(y, 0.0, epsilon = 1e-6);

        let (lon, lat) = inverse(x, 20_037_508.342_789_244);
        assert_abs_diff_eq!(lon, 180.0, epsilon = 1e-9);
        assert_abs_diff_eq!(lat, 85.051_128_779_806_6, epsilon = 1e-9);
    }

    #[test]
    fn test_roundtrip() {
        let (x, y) = forward(-3.7, 40.4);
        let (lon, lat) = inverse(x, y);
        assert_abs_diff_eq!(lon, -3.7, epsilon = 1e-10);
        assert_abs_diff_eq!(lat, 40.4, epsilon = 1e-10);
    }
}

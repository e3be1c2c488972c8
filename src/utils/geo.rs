//! Map-coordinate helpers for hosts that present positions as
//! latitude/longitude rather than scene meters.

use std::f64::consts::PI;

/// Project scene meters onto degrees, given the planet radius `radius_m`
/// and the map origin in degrees. Returns `(lon, lat)`.
///
/// Longitude is left unsanitized; latitude folds into [-90, 90].
/// `radius_m` must be positive.
pub fn meters_to_dms(
    m_x: f64,
    m_y: f64,
    radius_m: f64,
    lon_offset: f64,
    lat_offset: f64,
) -> (f64, f64) {
    if radius_m <= 0.0 {
        return (0.0, 0.0);
    }

    let mut lat = m_y / radius_m * (180.0 / PI) + lat_offset;
    if lat > 90.0 {
        lat = 180.0 - lat;
    }
    if lat < -90.0 {
        lat = 180.0 + lat;
    }

    // The east-west circumference shrinks with latitude.
    let z_radius = radius_m * (lat * PI / 180.0).cos();
    let lon = if z_radius > 0.0 {
        m_x / z_radius * (180.0 / PI) + lon_offset
    } else {
        0.0
    };

    (lon, lat)
}

fn format_dms(value: f64, positive: char, negative: char) -> String {
    let suffix = if value < 0.0 { negative } else { positive };
    let value = value.abs();
    let mut m = (value - value.floor()) * 60.0;
    let s = ((m - m.floor()) * 60.0).floor();
    m = m.floor();
    format!("{:.0}'{:02.0}:{:02.0}{}", value.floor(), m, s, suffix)
}

/// Format a longitude in degrees as a `deg'mm:ssE`/`W` string.
pub fn longitude_to_string(mut lon: f64) -> String {
    // Scene maps wrap at +/-140 degrees of the origin.
    while lon < -140.0 {
        lon += 2.0 * 140.0;
    }
    while lon > 140.0 {
        lon -= 2.0 * 140.0;
    }
    format_dms(lon, 'E', 'W')
}

/// Format a latitude in degrees as a `deg'mm:ssN`/`S` string.
pub fn latitude_to_string(lat: f64) -> String {
    format_dms(lat, 'N', 'S')
}

//! Coordinate transformations
//!
//! The simulation works internally on a grid-friendly system:
//! - latitude 0..=180 (0 = south pole, 90 = equator, 180 = north pole)
//! - longitude 0..360
//!
//! The public API uses standard geographic coordinates:
//! - latitude -90..=90 (negative = south)
//! - longitude -180..=180 (negative = west)

use crate::constants::KM_PER_DEGREE_LAT;

/// Convert standard coordinates to internal coordinates
pub fn standard_to_internal(lat: f64, lon: f64) -> (f64, f64) {
    (lat + 90.0, (lon + 360.0) % 360.0)
}

/// Convert internal coordinates to standard coordinates
pub fn internal_to_standard(lat: f64, lon: f64) -> (f64, f64) {
    let lon = if lon > 180.0 { lon - 360.0 } else { lon };
    (lat - 90.0, lon)
}

/// Convert internal coordinates to `(y, x)` grid indices.
///
/// Latitude maps onto `0..grid_height` without wrapping (poles are distinct
/// rows); longitude wraps. Both use rounding rather than truncation.
pub fn internal_to_grid(
    lat: f64,
    lon: f64,
    grid_height: usize,
    grid_width: usize,
) -> (usize, usize) {
    let max_y = grid_height.saturating_sub(1);
    let y = (max_y as f64 * lat / 180.0).round().clamp(0.0, max_y as f64) as usize;

    let width = grid_width.max(1) as i64;
    let x = ((grid_width as f64 * lon / 360.0).round() as i64).rem_euclid(width) as usize;
    (y, x)
}

/// Convert `(y, x)` grid indices to internal coordinates
pub fn grid_to_internal(y: usize, x: usize, grid_height: usize, grid_width: usize) -> (f64, f64) {
    let lat = if grid_height > 1 {
        180.0 * y as f64 / (grid_height - 1) as f64
    } else {
        90.0
    };
    let lon = 360.0 * x as f64 / grid_width.max(1) as f64;
    (lat, lon)
}

/// Convert standard coordinates to `(y, x)` grid indices
pub fn standard_to_grid(
    lat: f64,
    lon: f64,
    grid_height: usize,
    grid_width: usize,
) -> (usize, usize) {
    let (lat, lon) = standard_to_internal(lat, lon);
    internal_to_grid(lat, lon, grid_height, grid_width)
}

/// Convert `(y, x)` grid indices to standard coordinates
pub fn grid_to_standard(y: usize, x: usize, grid_height: usize, grid_width: usize) -> (f64, f64) {
    let (lat, lon) = grid_to_internal(y, x, grid_height, grid_width);
    internal_to_standard(lat, lon)
}

/// Kilometres per degree of longitude at a standard latitude
pub fn km_per_degree_lon(lat: f64) -> f64 {
    KM_PER_DEGREE_LAT * lat.to_radians().cos()
}

/// Kilometres per degree of longitude at an internal latitude
pub fn km_per_degree_lon_internal(lat: f64) -> f64 {
    km_per_degree_lon(lat - 90.0)
}

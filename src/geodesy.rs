//! Bearings, ellipsoidal distance, unit conversion, and the FLARM
//! relative-to-absolute coordinate reconstruction used by OGN beacons.
//!
//! Distance uses the Vincenty inverse formula on the WGS-84 ellipsoid rather
//! than the `geo` crate's spherical `Haversine`, because the PFLAA/PFLAU
//! boundary tests need millimeter-stable results over short ranges.

use std::f64::consts::PI;

/// WGS-84 semi-major axis, meters.
const WGS84_A: f64 = 6_378_137.0;
/// WGS-84 semi-minor axis, meters.
const WGS84_B: f64 = 6_356_752.314245;
/// WGS-84 flattening.
const WGS84_F: f64 = 1.0 / 298.257223563;

pub const METERS_PER_FOOT: f64 = 0.3048;
pub const KNOTS_PER_MPS: f64 = 1.94384;

pub fn feet_to_meters(feet: f64) -> f64 {
    feet * METERS_PER_FOOT
}

pub fn meters_to_feet(meters: f64) -> f64 {
    meters / METERS_PER_FOOT
}

pub fn knots_to_mps(knots: f64) -> f64 {
    knots / KNOTS_PER_MPS
}

#[allow(dead_code)]
pub fn mps_to_knots(mps: f64) -> f64 {
    mps * KNOTS_PER_MPS
}

fn to_radians(deg: f64) -> f64 {
    deg * PI / 180.0
}

fn to_degrees(rad: f64) -> f64 {
    rad * 180.0 / PI
}

/// Initial (forward azimuth) great-circle bearing from point 1 to point 2, in [0, 360).
pub fn initial_bearing(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64) -> f64 {
    let lat1 = to_radians(lat1_deg);
    let lat2 = to_radians(lat2_deg);
    let diff_lon = to_radians(lon2_deg - lon1_deg);

    let bearing = diff_lon
        .sin()
        .mul_add(lat2.cos(), 0.0)
        .atan2(lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * diff_lon.cos());
    (to_degrees(bearing) + 360.0) % 360.0
}

/// Final bearing arriving at point 2, derived from the reverse initial bearing.
pub fn final_bearing(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64) -> f64 {
    let reverse = initial_bearing(lat2_deg, lon2_deg, lat1_deg, lon1_deg);
    (reverse + 180.0) % 360.0
}

/// Northward component of a distance travelled along `bearing_deg`.
pub fn distance_north(bearing_deg: f64, distance: f64) -> f64 {
    to_radians(90.0 - bearing_deg).sin() * distance
}

/// Eastward component of a distance travelled along `bearing_deg`.
pub fn distance_east(bearing_deg: f64, distance: f64) -> f64 {
    to_radians(90.0 - bearing_deg).cos() * distance
}

/// Bearing relative to `course`, wrapped into [-180, 180].
pub fn relative_bearing(absolute_bearing: f64, course: f64) -> f64 {
    let diff = absolute_bearing - course;
    if diff > 180.0 {
        diff - 360.0
    } else if diff < -180.0 {
        diff + 360.0
    } else {
        diff
    }
}

/// Vincenty inverse solution: ellipsoidal distance in meters between two
/// WGS-84 points. Falls back to the antipodal-adjacent mean radius estimate
/// if the iteration fails to converge (nearly-antipodal points), which never
/// happens for the short ranges (<= 200 km) this system operates over.
pub fn vincenty_distance_m(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64) -> f64 {
    if (lat1_deg - lat2_deg).abs() < 1e-12 && (lon1_deg - lon2_deg).abs() < 1e-12 {
        return 0.0;
    }

    let l = to_radians(lon2_deg - lon1_deg);
    let u1 = ((1.0 - WGS84_F) * to_radians(lat1_deg).tan()).atan();
    let u2 = ((1.0 - WGS84_F) * to_radians(lat2_deg).tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    let mut iter_limit = 100;
    let (mut sin_sigma, mut cos_sigma, mut sigma, mut cos_sq_alpha, mut cos_2sigma_m);
    loop {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();
        if sin_sigma == 0.0 {
            return 0.0; // coincident points
        }
        cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        cos_sq_alpha = 1.0 - sin_alpha.powi(2);
        cos_2sigma_m = if cos_sq_alpha.abs() > 1e-12 {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        } else {
            0.0 // equatorial line
        };
        let c = WGS84_F / 16.0 * cos_sq_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos_sq_alpha));
        let lambda_prev = lambda;
        lambda = l
            + (1.0 - c)
                * WGS84_F
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m
                            + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))));

        iter_limit -= 1;
        if (lambda - lambda_prev).abs() <= 1e-12 || iter_limit == 0 {
            break;
        }
    }

    let u_sq = cos_sq_alpha * (WGS84_A.powi(2) - WGS84_B.powi(2)) / WGS84_B.powi(2);
    let big_a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
    let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
    let delta_sigma = big_b
        * sin_sigma
        * (cos_2sigma_m
            + big_b / 4.0
                * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))
                    - big_b / 6.0
                        * cos_2sigma_m
                        * (-3.0 + 4.0 * sin_sigma.powi(2))
                        * (-3.0 + 4.0 * cos_2sigma_m.powi(2))));

    WGS84_B * big_a * (sigma - delta_sigma)
}

/// Converts an NMEA `DDMM.MMMM`/`DDDMM.MMMM`-style coordinate magnitude into
/// signed-free decimal degrees (hemisphere is applied by the caller).
pub fn nmea_coord_to_degrees(coordinate: f64) -> f64 {
    let degrees = (coordinate / 100.0).trunc();
    let minutes = coordinate - degrees * 100.0;
    degrees + minutes / 60.0
}

/// Reconstructs an absolute WGS-84 degree value from an OGN-style relative
/// coordinate, given the known absolute location of the receiver (here,
/// ownship) and the field width of the relative coordinate in bits.
///
/// OGN beacons encode position relative to a configured receiver location
/// truncated to the upper bits of a fixed-width signed field; this recovers
/// the absolute degree in the sector nearest the known receiver position.
/// `width` is 19 for latitude, 20 for longitude.
pub fn abs_from_rel_flarm_coordinate(abs_loc_deg: f64, rel_deg: f64, width: u32) -> f64 {
    let loc_int = (abs_loc_deg * 1e7).round() as i64;
    let rel_int = (rel_deg * 1e7).round() as i64;

    // `i64`'s `>>` is already an arithmetic (sign-extending) shift, so a
    // negative `rel_int` round-trips through the shift-right/shift-left
    // pair without any extra two's-complement bookkeeping.
    let loc_hi = loc_int >> 7;
    let rel_hi = rel_int >> 7;

    let mask = (1i64 << width) - 1;
    let mut delta = (rel_hi - loc_hi) & mask;
    if delta >= 1i64 << (width - 1) {
        delta -= 1i64 << width;
    }

    let abs_int = (loc_hi + delta) << 7;
    abs_int as f64 / 1e7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearing_roundtrip_matches_final_bearing_law() {
        let (lat1, lon1) = (50.0, 8.0);
        let (lat2, lon2) = (50.1, 8.2);
        let fb = final_bearing(lat1, lon1, lat2, lon2);
        let expected = (initial_bearing(lat2, lon2, lat1, lon1) + 180.0) % 360.0;
        assert!((fb - expected).abs() < 1e-9);
    }

    #[test]
    fn initial_bearing_due_north() {
        let b = initial_bearing(50.0, 8.0, 51.0, 8.0);
        assert!(b.abs() < 1e-6, "expected ~0 deg, got {b}");
    }

    #[test]
    fn initial_bearing_due_east() {
        let b = initial_bearing(0.0, 8.0, 0.0, 9.0);
        assert!((b - 90.0).abs() < 1e-6, "expected ~90 deg, got {b}");
    }

    #[test]
    fn vincenty_known_short_distance() {
        // Roughly one degree of latitude near the equator is ~110.57 km.
        let d = vincenty_distance_m(0.0, 0.0, 1.0, 0.0);
        assert!((d - 110_574.0).abs() < 100.0, "got {d}");
    }

    #[test]
    fn vincenty_zero_distance() {
        assert_eq!(vincenty_distance_m(50.0, 8.0, 50.0, 8.0), 0.0);
    }

    #[test]
    fn nmea_coord_conversion() {
        // 5030.00 -> 50 deg 30.00 min -> 50.5 deg
        let d = nmea_coord_to_degrees(5030.00);
        assert!((d - 50.5).abs() < 1e-9);
    }

    #[test]
    fn nmea_coord_roundtrip_within_tolerance() {
        let raw = 10107.07_f64;
        let degrees = nmea_coord_to_degrees(raw);
        let degrees_whole = degrees.trunc();
        let minutes = (degrees - degrees_whole) * 60.0;
        let back = degrees_whole * 100.0 + minutes;
        assert!((back - raw).abs() < 1e-7);
    }

    #[test]
    fn rel_flarm_coordinate_matching_location_is_identity_on_grid() {
        // When the relative coordinate equals the known absolute location,
        // delta is exactly zero and reconstruction is the grid-truncated loc.
        let abs_loc = 50.123456_f64;
        let grid = abs_from_rel_flarm_coordinate(abs_loc, abs_loc, 19);
        assert!((grid - abs_loc).abs() < 1.28e-5);
    }

    #[test]
    fn rel_flarm_coordinate_small_positive_offset() {
        let abs_loc = 1.1_f64;
        let rel = 1.1178_f64; // slightly east/north of ownship
        let reconstructed = abs_from_rel_flarm_coordinate(abs_loc, rel, 19);
        assert!((reconstructed - rel).abs() < 1.28e-5);
    }

    #[test]
    fn unit_conversions() {
        assert!((feet_to_meters(1000.0) - 304.8).abs() < 1e-9);
        assert!((meters_to_feet(304.8) - 1000.0).abs() < 1e-6);
        assert!((knots_to_mps(1.94384) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn relative_bearing_wraps() {
        assert!((relative_bearing(350.0, 10.0) - (-20.0)).abs() < 1e-9);
        assert!((relative_bearing(10.0, 350.0) - 20.0).abs() < 1e-9);
    }
}

//! FLARM proprietary NMEA sentence framing ($PFLAA / $PFLAU).

use std::fmt::Write as _;

/// Computes the NMEA XOR checksum over everything between `$` and `*`.
fn checksum(body: &str) -> u8 {
    body.bytes().fold(0u8, |acc, b| acc ^ b)
}

/// Wraps a comma-joined field list as `$<body>*<CS>`, CRLF-terminated.
fn frame(fields: &[String]) -> String {
    let body = fields.join(",");
    let cs = checksum(&body);
    let mut out = String::with_capacity(body.len() + 8);
    out.push('$');
    out.push_str(&body);
    let _ = write!(out, "*{cs:02X}\r\n");
    out
}

/// `PFLAA,<AlarmLevel>,<RelativeNorth>,<RelativeEast>,<RelativeVertical>,
/// <IDType>,<ID>,<Track>,<TurnRate>,<GroundSpeed>,<ClimbRate>,<AcftType>`
#[allow(clippy::too_many_arguments)]
pub fn pflaa(
    relative_north_m: i32,
    relative_east_m: i32,
    relative_vertical_m: Option<i32>,
    id_type: u8,
    id: &str,
    track_deg: Option<u32>,
    ground_speed_mps: Option<u32>,
    climb_rate_mps: Option<f64>,
    aircraft_type: u8,
) -> String {
    frame(&[
        "PFLAA".to_string(),
        "0".to_string(),
        relative_north_m.to_string(),
        relative_east_m.to_string(),
        relative_vertical_m.map(|v| v.to_string()).unwrap_or_default(),
        id_type.to_string(),
        id.to_string(),
        track_deg.map(|v| v.to_string()).unwrap_or_default(),
        String::new(), // turn rate: never populated, matching upstream fusion logic
        ground_speed_mps.map(|v| v.to_string()).unwrap_or_default(),
        climb_rate_mps.map(|v| format!("{v:.1}")).unwrap_or_default(),
        aircraft_type.to_string(),
    ])
}

/// `PFLAU,<RX>,<TX>,<GPS>,<Power>,<AlarmLevel>,<RelativeBearing>,<AlarmType>,
/// <RelativeVertical>,<RelativeDistance>,<ID>`
pub fn pflau(
    relative_bearing_deg: Option<i32>,
    relative_vertical_m: Option<i32>,
    relative_distance_m: u32,
    id: &str,
) -> String {
    frame(&[
        "PFLAU".to_string(),
        "0".to_string(),
        "0".to_string(),
        "2".to_string(),
        "1".to_string(),
        "0".to_string(),
        relative_bearing_deg.map(|v| v.to_string()).unwrap_or_default(),
        "2".to_string(),
        relative_vertical_m.map(|v| v.to_string()).unwrap_or_default(),
        relative_distance_m.to_string(),
        id.to_string(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pflaa_frames_with_checksum_and_crlf() {
        let sentence = pflaa(100, -50, Some(20), 1, "3D1B5A", Some(90), Some(30), Some(1.5), 0);
        assert!(sentence.starts_with("$PFLAA,0,100,-50,20,1,3D1B5A,90,,30,1.5,0*"));
        assert!(sentence.ends_with("\r\n"));

        let body = sentence.trim_start_matches('$').split('*').next().unwrap();
        let cs_hex = sentence.split('*').nth(1).unwrap().trim_end();
        let expected: u8 = checksum(body);
        assert_eq!(cs_hex, format!("{expected:02X}"));
    }

    #[test]
    fn pflaa_empty_optionals_render_as_blank_fields() {
        let sentence = pflaa(0, 0, None, 1, "ABCDEF", None, None, None, 0);
        assert!(sentence.starts_with("$PFLAA,0,0,0,,1,ABCDEF,,,,,0*"));
    }

    #[test]
    fn pflau_frames_correctly() {
        let sentence = pflau(Some(-45), Some(10), 1200, "3D1B5A");
        assert!(sentence.starts_with("$PFLAU,0,0,2,1,0,-45,2,10,1200,3D1B5A*"));
        assert!(sentence.ends_with("\r\n"));
    }
}

//! Parser for OGN/FLARM beacon comments as relayed over APRS-IS.
//!
//! A beacon line looks like:
//! `ICA3D1B5A>APRS,qAR:/133959h0107.07N/00146.75W'259/067/A=003083 !W57! id053D1B5A -039fpm +0.1rot 8.2dB 1e +4.8kHz gps3x3 s6.01 h32 rDD04AF`
//!
//! The head (identifier, position, timestamp, altitude) is one fixed-shape
//! regex; everything after the first space is a set of independent
//! whitespace-delimited extension tokens, each matched against its own
//! pattern.

use std::sync::LazyLock;

use regex::Regex;

use crate::geodesy::nmea_coord_to_degrees;

static HEAD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(.+?)>APRS,(.+?):/(\d{6})h(\d{4}\.\d{2})(N|S)(.)(\d{5}\.\d{2})(E|W)(.)(?:(\d{3})/(\d{3}))?/A=(\d{6})",
    )
    .expect("static OGN head pattern is valid")
});

static ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^id(\S{2})(\S{6})").unwrap());
static CLIMB_RATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([+-]\d+)fpm$").unwrap());
static TURN_RATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([+-]\d+\.\d+)rot$").unwrap());
static SIGNAL_STRENGTH_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+\.\d+)dB$").unwrap());
static ERROR_COUNT_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)e$").unwrap());
static COORD_REFINEMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^!W(\d)(\d)!$").unwrap());
static HEAR_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^hear(\w{4})$").unwrap());
static FREQ_OFFSET_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([+-]\d+\.\d+)kHz$").unwrap());
static GPS_STATUS_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^gps(\d+x\d+)$").unwrap());
static SOFTWARE_VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^s(\d+\.\d+)$").unwrap());
static HARDWARE_VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^h(\d+)$").unwrap());
static REAL_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^r(\w{6})$").unwrap());
static FLIGHT_LEVEL_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^FL(\d{3}\.\d{2})$").unwrap());

/// The fixed-shape head of an OGN beacon: identifier, position, course/speed, altitude.
#[derive(Debug, Clone, PartialEq)]
pub struct OgnHead {
    pub identifier: String,
    pub receiver_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub track_deg: f64,
    pub h_speed_kt: f64,
    pub altitude_ft: i32,
}

/// The extension token carrying the flags byte and hex address, decoded via
/// [`crate::ogn::aircraft::decode_id_flags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressToken<'a> {
    pub flags: u8,
    pub address: &'a str,
}

/// One parsed extension token. Most are parsed for completeness but, as in
/// the original fusion logic, only address/climb-rate/coordinate-refinement
/// feed back into aircraft state.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtensionToken<'a> {
    Address { flags: u8, address: &'a str },
    ClimbRateFpm(i32),
    TurnRate(f64),
    SignalStrengthDb(f64),
    ErrorCount(u32),
    CoordinateRefinement { dlat_thousandths: i32, dlon_thousandths: i32 },
    HearId(&'a str),
    FrequencyOffsetKhz(f64),
    GpsStatus(&'a str),
    SoftwareVersion(f64),
    HardwareVersion(u32),
    RealId(&'a str),
    FlightLevel(f64),
    Unknown,
}

pub fn parse_head(beacon_data: &str) -> Option<OgnHead> {
    let caps = HEAD_PATTERN.captures(beacon_data)?;

    let identifier = caps.get(1)?.as_str().to_string();
    let receiver_name = caps.get(2)?.as_str().to_string();

    let mut latitude = nmea_coord_to_degrees(caps.get(4)?.as_str().parse().ok()?);
    if &caps[5] == "S" {
        latitude = -latitude;
    }

    let mut longitude = nmea_coord_to_degrees(caps.get(7)?.as_str().parse().ok()?);
    if &caps[8] == "W" {
        longitude = -longitude;
    }

    let (track_deg, h_speed_kt) = match (caps.get(10), caps.get(11)) {
        (Some(track), Some(speed)) => (track.as_str().parse().ok()?, speed.as_str().parse().ok()?),
        _ => (0.0, 0.0),
    };

    let altitude_ft = caps.get(12)?.as_str().parse().ok()?;

    Some(OgnHead {
        identifier,
        receiver_name,
        latitude,
        longitude,
        track_deg,
        h_speed_kt,
        altitude_ft,
    })
}

/// Parses a single whitespace-delimited extension token.
pub fn parse_extension_token(token: &str) -> ExtensionToken<'_> {
    if let Some(caps) = ADDRESS_PATTERN.captures(token) {
        let flags = u8::from_str_radix(&caps[1], 16).unwrap_or(0);
        // caps[2] borrows from `token`, which outlives this function's return.
        let address = &token[caps.get(2).unwrap().range()];
        return ExtensionToken::Address { flags, address };
    }
    if let Some(caps) = CLIMB_RATE_PATTERN.captures(token) {
        return ExtensionToken::ClimbRateFpm(caps[1].parse().unwrap_or(0));
    }
    if let Some(caps) = TURN_RATE_PATTERN.captures(token) {
        return ExtensionToken::TurnRate(caps[1].parse().unwrap_or(0.0));
    }
    if let Some(caps) = SIGNAL_STRENGTH_PATTERN.captures(token) {
        return ExtensionToken::SignalStrengthDb(caps[1].parse().unwrap_or(0.0));
    }
    if let Some(caps) = ERROR_COUNT_PATTERN.captures(token) {
        return ExtensionToken::ErrorCount(caps[1].parse().unwrap_or(0));
    }
    if let Some(caps) = COORD_REFINEMENT_PATTERN.captures(token) {
        return ExtensionToken::CoordinateRefinement {
            dlat_thousandths: caps[1].parse().unwrap_or(0),
            dlon_thousandths: caps[2].parse().unwrap_or(0),
        };
    }
    if let Some(caps) = HEAR_ID_PATTERN.captures(token) {
        let id = &token[caps.get(1).unwrap().range()];
        return ExtensionToken::HearId(id);
    }
    if let Some(caps) = FREQ_OFFSET_PATTERN.captures(token) {
        return ExtensionToken::FrequencyOffsetKhz(caps[1].parse().unwrap_or(0.0));
    }
    if let Some(caps) = GPS_STATUS_PATTERN.captures(token) {
        let status = &token[caps.get(1).unwrap().range()];
        return ExtensionToken::GpsStatus(status);
    }
    if let Some(caps) = SOFTWARE_VERSION_PATTERN.captures(token) {
        return ExtensionToken::SoftwareVersion(caps[1].parse().unwrap_or(0.0));
    }
    if let Some(caps) = HARDWARE_VERSION_PATTERN.captures(token) {
        return ExtensionToken::HardwareVersion(caps[1].parse().unwrap_or(0));
    }
    if let Some(caps) = REAL_ID_PATTERN.captures(token) {
        let id = &token[caps.get(1).unwrap().range()];
        return ExtensionToken::RealId(id);
    }
    if let Some(caps) = FLIGHT_LEVEL_PATTERN.captures(token) {
        return ExtensionToken::FlightLevel(caps[1].parse().unwrap_or(0.0));
    }
    ExtensionToken::Unknown
}

/// Splits a beacon's extension-token region (everything after the first
/// space) into individual tokens.
pub fn extension_tokens(data: &str) -> impl Iterator<Item = &str> {
    data.split_whitespace()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str =
        "ICA3D1B5A>APRS,qAR:/133959h0107.07N/00146.75W'259/067/A=003083 !W57! id053D1B5A -039fpm +0.1rot 8.2dB 1e +4.8kHz gps3x3 s6.01 h32 rDD04AF";

    #[test]
    fn parses_head_with_course_and_speed() {
        let (beacon, _) = SAMPLE.split_once(' ').unwrap();
        let head = parse_head(beacon).expect("head should parse");

        assert_eq!(head.identifier, "ICA3D1B5A");
        assert_eq!(head.receiver_name, "qAR");
        assert!((head.latitude - 1.117833).abs() < 1e-5);
        assert!((head.longitude - (-1.779167)).abs() < 1e-5);
        assert_eq!(head.track_deg, 259.0);
        assert_eq!(head.h_speed_kt, 67.0);
        assert_eq!(head.altitude_ft, 3083);
    }

    #[test]
    fn parses_head_without_course_speed_group() {
        let beacon = "ICA3D1B5A>APRS,qAR:/133959h0107.07N/00146.75W'/A=003083";
        let head = parse_head(beacon).expect("head should parse");
        assert_eq!(head.track_deg, 0.0);
        assert_eq!(head.h_speed_kt, 0.0);
    }

    #[test]
    fn rejects_unmatched_head() {
        assert!(parse_head("not a beacon").is_none());
    }

    #[test]
    fn extracts_address_token() {
        let token = parse_extension_token("id053D1B5A");
        assert_eq!(
            token,
            ExtensionToken::Address {
                flags: 0x05,
                address: "3D1B5A"
            }
        );
    }

    #[test]
    fn extracts_climb_rate_token() {
        assert_eq!(parse_extension_token("-039fpm"), ExtensionToken::ClimbRateFpm(-39));
        assert_eq!(parse_extension_token("+039fpm"), ExtensionToken::ClimbRateFpm(39));
    }

    #[test]
    fn extracts_coordinate_refinement_token() {
        assert_eq!(
            parse_extension_token("!W57!"),
            ExtensionToken::CoordinateRefinement {
                dlat_thousandths: 5,
                dlon_thousandths: 7
            }
        );
    }

    #[test]
    fn unknown_token_falls_through() {
        assert_eq!(parse_extension_token("???"), ExtensionToken::Unknown);
    }

    #[test]
    fn walks_all_tokens_in_sample() {
        let (_, rest) = SAMPLE.split_once(' ').unwrap();
        let tokens: Vec<_> = extension_tokens(rest).map(parse_extension_token).collect();
        assert_eq!(tokens.len(), 9);
        assert!(matches!(tokens[0], ExtensionToken::CoordinateRefinement { .. }));
        assert!(matches!(tokens[1], ExtensionToken::Address { .. }));
    }
}

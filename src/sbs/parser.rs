//! Parser for the Kinetic BaseStation SBS1 CSV feed.
//!
//! Only message types 1-4 carry information this system fuses (identity,
//! position, velocity); types 5-8 are accepted as valid SBS1 but produce no
//! usable fields and are filtered out by the caller.

use anyhow::{Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SbsMessageType {
    /// MSG,1: ES Identification and Category (callsign)
    EsIdentification = 1,
    /// MSG,2: ES Surface Position Message
    EsSurfacePosition = 2,
    /// MSG,3: ES Airborne Position Message (altitude, lat/lon)
    EsAirbornePosition = 3,
    /// MSG,4: ES Airborne Velocity Message (speed, track, vertical rate)
    EsAirborneVelocity = 4,
    /// MSG,5-8: valid but carry nothing this system uses.
    Other(u8),
}

impl SbsMessageType {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::EsIdentification),
            2 => Some(Self::EsSurfacePosition),
            3 => Some(Self::EsAirbornePosition),
            4 => Some(Self::EsAirborneVelocity),
            5..=8 => Some(Self::Other(value)),
            _ => None,
        }
    }

    pub fn is_relevant(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

/// Parsed SBS message, restricted to the fields types 1-4 can carry.
#[derive(Debug, Clone)]
pub struct SbsMessage {
    pub message_type: SbsMessageType,
    /// Hex ICAO address, e.g. "738065".
    pub aircraft_id: String,
    pub callsign: Option<String>,
    pub altitude_ft: Option<i32>,
    pub ground_speed_kt: Option<f64>,
    pub track_deg: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub vertical_rate_fpm: Option<i32>,
}

impl SbsMessage {
    pub fn icao_address(&self) -> Option<u32> {
        u32::from_str_radix(&self.aircraft_id, 16).ok()
    }

    pub fn has_position(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    pub fn has_velocity(&self) -> bool {
        self.ground_speed_kt.is_some() || self.vertical_rate_fpm.is_some()
    }
}

/// Parses one SBS1 CSV line.
///
/// Format: `MSG,<type>,<transmission_type>,<session_id>,<aircraft_id>,<is_military>,
/// <date_gen>,<time_gen>,<date_log>,<time_log>,<callsign>,<altitude>,
/// <ground_speed>,<track>,<latitude>,<longitude>,<vertical_rate>,<squawk>,
/// <alert>,<emergency>,<spi>,<on_ground>`
pub fn parse_sbs_message(line: &str) -> Result<SbsMessage> {
    let fields: Vec<&str> = line.split(',').collect();

    if fields.len() < 17 {
        anyhow::bail!("SBS message too short: expected at least 17 fields, got {}", fields.len());
    }
    if fields[0] != "MSG" {
        anyhow::bail!("SBS message must start with MSG, got '{}'", fields[0]);
    }

    let type_num: u8 = fields[1]
        .parse()
        .with_context(|| format!("invalid message type: '{}'", fields[1]))?;
    let message_type =
        SbsMessageType::from_u8(type_num).ok_or_else(|| anyhow::anyhow!("unknown message type: {type_num}"))?;

    let aircraft_id = fields[4].to_string();
    if aircraft_id.is_empty() {
        anyhow::bail!("aircraft ID is required");
    }

    let callsign = field(&fields, 10)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let altitude_ft = field(&fields, 11).and_then(|s| s.parse().ok());
    let ground_speed_kt = field(&fields, 12).and_then(|s| s.parse().ok());
    let track_deg = field(&fields, 13).and_then(|s| s.parse().ok());
    let latitude = field(&fields, 14).and_then(|s| s.parse().ok());
    let longitude = field(&fields, 15).and_then(|s| s.parse().ok());
    let vertical_rate_fpm = field(&fields, 16).and_then(|s| s.parse().ok());

    Ok(SbsMessage {
        message_type,
        aircraft_id,
        callsign,
        altitude_ft,
        ground_speed_kt,
        track_deg,
        latitude,
        longitude,
        vertical_rate_fpm,
    })
}

fn field<'a>(fields: &[&'a str], index: usize) -> Option<&'a str> {
    fields.get(index).copied().filter(|s| !s.is_empty())
}

//! Parsing of the GNSS sentences this system reads from ownship's own
//! serial receiver: `$GPGGA` (fix, altitude), `$GPGLL` (lat/lon only), and
//! `$GPVTG` (course and ground speed).

use crate::geodesy::{knots_to_mps, meters_to_feet, nmea_coord_to_degrees};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GgaFixQuality {
    Invalid,
    Gps,
    DGps,
    PpsFix,
    RtkFixed,
    RtkFloat,
    Estimated,
    Manual,
    Simulation,
}

impl GgaFixQuality {
    fn from_digit(d: u8) -> Self {
        match d {
            1 => Self::Gps,
            2 => Self::DGps,
            3 => Self::PpsFix,
            4 => Self::RtkFixed,
            5 => Self::RtkFloat,
            6 => Self::Estimated,
            7 => Self::Manual,
            8 => Self::Simulation,
            _ => Self::Invalid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpggaFix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_ft: Option<f64>,
    pub fix_quality: GgaFixQuality,
    pub satellites_in_use: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpgllFix {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GpvtgFix {
    pub track_deg: Option<f64>,
    pub ground_speed_mps: Option<f64>,
}

fn strip_checksum(sentence: &str) -> &str {
    sentence.split('*').next().unwrap_or(sentence)
}

fn signed_coord(value: &str, hemisphere: &str, positive: &str) -> Option<f64> {
    let magnitude = nmea_coord_to_degrees(value.parse().ok()?);
    Some(if hemisphere == positive { magnitude } else { -magnitude })
}

pub fn parse_gpgga(sentence: &str) -> Option<GpggaFix> {
    let body = strip_checksum(sentence);
    let fields: Vec<&str> = body.split(',').collect();
    if fields.len() < 10 || !fields[0].ends_with("GGA") {
        return None;
    }

    let latitude = signed_coord(fields[2], fields[3], "N")?;
    let longitude = signed_coord(fields[4], fields[5], "E")?;
    let fix_quality = GgaFixQuality::from_digit(fields[6].parse().unwrap_or(0));
    let satellites_in_use = fields[7].parse().unwrap_or(0);

    let altitude_ft = fields.get(9).and_then(|alt| alt.parse::<f64>().ok()).map(|alt_m_or_ft| {
        match fields.get(10).copied() {
            Some("M") => meters_to_feet(alt_m_or_ft),
            _ => alt_m_or_ft,
        }
    });

    Some(GpggaFix {
        latitude,
        longitude,
        altitude_ft,
        fix_quality,
        satellites_in_use,
    })
}

pub fn parse_gpgll(sentence: &str) -> Option<GpgllFix> {
    let body = strip_checksum(sentence);
    let fields: Vec<&str> = body.split(',').collect();
    if fields.len() < 6 || !fields[0].ends_with("GLL") {
        return None;
    }

    let latitude = signed_coord(fields[1], fields[2], "N")?;
    let longitude = signed_coord(fields[3], fields[4], "E")?;

    Some(GpgllFix { latitude, longitude })
}

pub fn parse_gpvtg(sentence: &str) -> Option<GpvtgFix> {
    let body = strip_checksum(sentence);
    let fields: Vec<&str> = body.split(',').collect();
    if fields.len() < 6 || !fields[0].ends_with("VTG") {
        return None;
    }

    let track_deg = (!fields[1].is_empty()).then(|| fields[1].parse().ok()).flatten();
    let ground_speed_mps = (!fields[5].is_empty())
        .then(|| fields[5].parse::<f64>().ok())
        .flatten()
        .map(knots_to_mps);

    Some(GpvtgFix {
        track_deg,
        ground_speed_mps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gpgga_with_meters_altitude() {
        let sentence = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
        let fix = parse_gpgga(sentence).unwrap();
        assert!((fix.latitude - 48.1173).abs() < 1e-3);
        assert!((fix.longitude - 11.516667).abs() < 1e-3);
        assert_eq!(fix.fix_quality, GgaFixQuality::Gps);
        assert_eq!(fix.satellites_in_use, 8);
        assert!(fix.altitude_ft.unwrap() > 1700.0);
    }

    #[test]
    fn parses_gpgga_southern_western_hemisphere() {
        let sentence = "$GPGGA,123519,4807.038,S,01131.000,W,1,08,0.9,545.4,M,46.9,M,,*4A";
        let fix = parse_gpgga(sentence).unwrap();
        assert!(fix.latitude < 0.0);
        assert!(fix.longitude < 0.0);
    }

    #[test]
    fn parses_gpgll() {
        let sentence = "$GPGLL,4916.45,N,12311.12,W,225444,A,*1D";
        let fix = parse_gpgll(sentence).unwrap();
        assert!((fix.latitude - 49.274166).abs() < 1e-3);
        assert!(fix.longitude < 0.0);
    }

    #[test]
    fn parses_gpvtg() {
        let sentence = "$GPVTG,054.7,T,034.4,M,005.5,N,010.2,K*48";
        let fix = parse_gpvtg(sentence).unwrap();
        assert_eq!(fix.track_deg, Some(54.7));
        assert!((fix.ground_speed_mps.unwrap() - knots_to_mps(5.5)).abs() < 1e-9);
    }

    #[test]
    fn gpvtg_tolerates_missing_fields() {
        let sentence = "$GPVTG,,,,,,,,,N*30";
        let fix = parse_gpvtg(sentence).unwrap();
        assert!(fix.track_deg.is_none());
        assert!(fix.ground_speed_mps.is_none());
    }

    #[test]
    fn rejects_wrong_sentence_type() {
        assert!(parse_gpgga("$GPVTG,1,T*00").is_none());
    }
}

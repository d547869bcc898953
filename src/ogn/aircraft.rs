//! OGN address-type and aircraft-type codes, decoded from the `id` extension
//! token's flags byte (`idXXYYYYYY!AAAAAA` in the beacon comment).
//!
//! Bit layout of the flags byte: bits 0-1 are the address type, bits 2-6 are
//! the aircraft type, bit 7 is the stealth flag.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    Unknown,
    Icao,
    Flarm,
    OgnTracker,
}

impl From<u8> for AddressType {
    fn from(flags: u8) -> Self {
        match flags & 0x03 {
            0b00 => AddressType::Unknown,
            0b01 => AddressType::Icao,
            0b10 => AddressType::Flarm,
            _ => AddressType::OgnTracker,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AircraftType {
    Reserved,
    Glider,
    TowTug,
    HelicopterGyro,
    SkydiverParachute,
    DropPlane,
    HangGlider,
    Paraglider,
    RecipEngine,
    JetTurboprop,
    Unknown,
    Balloon,
    Airship,
    Uav,
    StaticObstacle,
}

impl From<u8> for AircraftType {
    fn from(flags: u8) -> Self {
        match (flags >> 2) & 0x1F {
            0x0 => AircraftType::Reserved,
            0x1 => AircraftType::Glider,
            0x2 => AircraftType::TowTug,
            0x3 => AircraftType::HelicopterGyro,
            0x4 => AircraftType::SkydiverParachute,
            0x5 => AircraftType::DropPlane,
            0x6 => AircraftType::HangGlider,
            0x7 => AircraftType::Paraglider,
            0x8 => AircraftType::RecipEngine,
            0x9 => AircraftType::JetTurboprop,
            0xA => AircraftType::Unknown,
            0xB => AircraftType::Balloon,
            0xC => AircraftType::Airship,
            0xD => AircraftType::Uav,
            0xE => AircraftType::StaticObstacle,
            _ => AircraftType::Unknown,
        }
    }
}

impl fmt::Display for AircraftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AircraftType::Reserved => "Reserved",
            AircraftType::Glider => "Glider",
            AircraftType::TowTug => "TowTug",
            AircraftType::HelicopterGyro => "HelicopterGyro",
            AircraftType::SkydiverParachute => "SkydiverParachute",
            AircraftType::DropPlane => "DropPlane",
            AircraftType::HangGlider => "HangGlider",
            AircraftType::Paraglider => "Paraglider",
            AircraftType::RecipEngine => "RecipEngine",
            AircraftType::JetTurboprop => "JetTurboprop",
            AircraftType::Unknown => "Unknown",
            AircraftType::Balloon => "Balloon",
            AircraftType::Airship => "Airship",
            AircraftType::Uav => "Uav",
            AircraftType::StaticObstacle => "StaticObstacle",
        };
        write!(f, "{s}")
    }
}

/// Decodes the `id` token's flags byte into (stealth, address_type, aircraft_type).
pub fn decode_id_flags(flags: u8) -> (bool, AddressType, AircraftType) {
    let stealth = flags & 0x80 != 0;
    (stealth, AddressType::from(flags), AircraftType::from(flags))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_icao_glider_non_stealth() {
        // address type ICAO (0b01), aircraft type Glider (0b00001), stealth off
        let flags = 0b0_00001_01;
        let (stealth, addr, ac) = decode_id_flags(flags);
        assert!(!stealth);
        assert_eq!(addr, AddressType::Icao);
        assert_eq!(ac, AircraftType::Glider);
    }

    #[test]
    fn decodes_stealth_flag() {
        let flags = 0b1_00010_10; // stealth, TowTug, Flarm address
        let (stealth, addr, ac) = decode_id_flags(flags);
        assert!(stealth);
        assert_eq!(addr, AddressType::Flarm);
        assert_eq!(ac, AircraftType::TowTug);
    }
}

//! FlightBox -- fuses ADS-B (SBS1), OGN/FLARM (APRS-IS), and onboard GNSS
//! (NMEA 0183) traffic into a unified FLARM-compatible NMEA stream served to
//! nearby navigation clients over the AirConnect TCP socket.
//!
//! The core data-fusion pipeline lives here as a library so the
//! hub/parsers/store/geodesy/sentence-framing can be exercised directly in
//! tests; [`supervisor::run`] wires the whole pipeline together for the
//! `flightbox` binary in `main.rs`.

pub mod airconnect;
pub mod config;
pub mod flarm;
pub mod fusion;
pub mod geodesy;
pub mod hub;
pub mod log_format;
pub mod nmea;
pub mod ogn;
pub mod sbs;
pub mod store;
pub mod supervisor;

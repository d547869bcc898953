//! NMEA 0183 parsing and the serial GNSS input source.

pub mod parser;
pub mod serial;

pub use parser::{GgaFixQuality, GpggaFix, GpgllFix, GpvtgFix, parse_gpgga, parse_gpgll, parse_gpvtg};
pub use serial::{GnssSerialConfig, GnssSerialReader};

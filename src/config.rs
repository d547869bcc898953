//! Runtime configuration, overridable by a small `clap`-derived CLI in the
//! same flat-struct-with-`#[arg(long)]` style this codebase's other
//! standalone commands use.
//!
//! The launcher/watchdog/packaging around this process are someone else's
//! concern; this module only covers what the core pipeline itself needs to
//! start up: which sources to dial, which ports to listen on, and where to
//! send logs.

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "flightbox", about = "Fuses ADS-B, OGN/FLARM, and GNSS traffic into a FLARM-compatible NMEA feed")]
pub struct Config {
    /// SBS1 (BaseStation) feed host.
    #[arg(long, default_value = "127.0.0.1")]
    pub sbs_host: String,

    /// SBS1 (BaseStation) feed port.
    #[arg(long, default_value_t = 30003)]
    pub sbs_port: u16,

    /// Port the embedded APRS-IS server listens on for the local OGN decoder.
    #[arg(long, default_value_t = 14580)]
    pub ogn_port: u16,

    /// Serial device for the onboard GNSS receiver.
    #[arg(long, default_value = "/dev/ttyACM0")]
    pub serial_device: String,

    /// Baud rate for the onboard GNSS receiver.
    #[arg(long, default_value_t = 9600)]
    pub serial_baud: u32,

    /// Port the AirConnect server listens on for navigation clients.
    #[arg(long, default_value_t = 2000)]
    pub airconnect_port: u16,

    /// Optional plaintext password gating AirConnect sessions.
    #[arg(long)]
    pub airconnect_password: Option<String>,

    /// Append log output to this file in addition to stderr.
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sbs_host: "127.0.0.1".to_string(),
            sbs_port: 30003,
            ogn_port: 14580,
            serial_device: "/dev/ttyACM0".to_string(),
            serial_baud: 9600,
            airconnect_port: 2000,
            airconnect_password: None,
            log_file: None,
        }
    }
}

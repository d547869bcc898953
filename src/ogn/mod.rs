//! OGN/FLARM beacon parsing and the emulated APRS-IS ingest server.

pub mod aircraft;
pub mod parser;
pub mod server;

pub use aircraft::{AddressType, AircraftType, decode_id_flags};
pub use parser::{ExtensionToken, OgnHead, extension_tokens, parse_extension_token, parse_head};
pub use server::OgnAprsServer;

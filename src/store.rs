//! In-memory state for ownship and the traffic currently in view.
//!
//! Two independently locked pieces of state, following the split the
//! original fusion module kept between its `gnss_status` singleton and its
//! `aircraft_info` dictionary: readers of one never block on the other.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How long a track is kept without a fresh report before it's dropped.
pub const MAX_AIRCRAFT_AGE: Duration = Duration::from_secs(30);

/// A snapshot of ownship's own position, built up from whichever of SBS1,
/// GNSS NMEA, or (indirectly) ADS-B lets us fix our own location and speed.
#[derive(Debug, Clone, Default)]
pub struct OwnshipStatus {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude_m: Option<f64>,
    pub ground_speed_mps: Option<f64>,
    pub track_deg: Option<f64>,
    pub fix_quality: Option<u8>,
    pub satellites_in_use: Option<u8>,
}

impl OwnshipStatus {
    pub fn has_position(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// Everything known about one piece of traffic, keyed by ICAO or OGN address.
#[derive(Debug, Clone, Default)]
pub struct AircraftRecord {
    pub address: String,
    pub callsign: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude_m: Option<f64>,
    pub ground_speed_mps: Option<f64>,
    pub track_deg: Option<f64>,
    /// Vertical rate in feet/min, the wire unit for both SBS1's vertical
    /// rate field and OGN's `fpm` extension token; converted to m/s only at
    /// FLARM emission time.
    pub climb_rate_fpm: Option<f64>,
    pub turn_rate: Option<f64>,
    pub address_type: Option<u8>,
    pub aircraft_type: Option<u8>,
    pub stealth: bool,
    pub source: TrafficSource,
    last_seen: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrafficSource {
    #[default]
    Unknown,
    Adsb,
    Ogn,
}

impl AircraftRecord {
    fn touch(&mut self) {
        self.last_seen = Some(Instant::now());
    }

    pub fn has_position(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    fn is_stale(&self, now: Instant) -> bool {
        match self.last_seen {
            Some(seen) => now.duration_since(seen) > MAX_AIRCRAFT_AGE,
            None => true,
        }
    }
}

#[derive(Default)]
pub struct Store {
    ownship: Mutex<OwnshipStatus>,
    aircraft: Mutex<HashMap<String, AircraftRecord>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_ownship(&self, f: impl FnOnce(&mut OwnshipStatus)) {
        let mut guard = self.ownship.lock().expect("ownship mutex poisoned");
        f(&mut guard);
    }

    pub fn ownship(&self) -> OwnshipStatus {
        self.ownship.lock().expect("ownship mutex poisoned").clone()
    }

    /// Applies `f` to the record for `address`, creating it first if absent,
    /// then marks it freshly seen.
    pub fn update_aircraft(&self, address: &str, source: TrafficSource, f: impl FnOnce(&mut AircraftRecord)) {
        let mut guard = self.aircraft.lock().expect("aircraft mutex poisoned");
        let record = guard.entry(address.to_string()).or_insert_with(|| AircraftRecord {
            address: address.to_string(),
            source,
            ..Default::default()
        });
        f(record);
        record.touch();
    }

    /// Snapshot of every currently-tracked aircraft, in no particular order.
    pub fn aircraft_snapshot(&self) -> Vec<AircraftRecord> {
        self.aircraft
            .lock()
            .expect("aircraft mutex poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Drops every record whose last report is older than [`MAX_AIRCRAFT_AGE`].
    pub fn evict_stale(&self) {
        let now = Instant::now();
        self.aircraft
            .lock()
            .expect("aircraft mutex poisoned")
            .retain(|_, record| !record.is_stale(now));
    }

    #[cfg(test)]
    pub fn aircraft_count(&self) -> usize {
        self.aircraft.lock().expect("aircraft mutex poisoned").len()
    }
}

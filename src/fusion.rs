//! C8: turns SBS1/OGN/NMEA traffic into FLARM PFLAA/PFLAU sentences.
//!
//! Two sibling tasks share the store under its two locks: an input task
//! that dispatches incoming content by type, and a 1 Hz tick task that
//! emits FLARM sentences for every tracked aircraft and then evicts
//! whatever has gone stale.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::flarm;
use crate::geodesy::{
    distance_east, distance_north, feet_to_meters, initial_bearing, knots_to_mps, relative_bearing,
    vincenty_distance_m,
};
use crate::hub::{ContentType, HubHandle, HubMessage};
use crate::nmea::{parse_gpgga, parse_gpgll, parse_gpvtg};
use crate::ogn;
use crate::sbs::{SbsMessageType, parse_sbs_message};
use crate::store::{AircraftRecord, OwnshipStatus, Store, TrafficSource};

const DISTANCE_M_MIN: f64 = -32768.0;
const DISTANCE_M_MAX: f64 = 32767.0;
const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Consumes hub items of type {sbs1, ogn, nmea} and writes them into `store`.
pub async fn input_task(
    receiver: flume::Receiver<Option<HubMessage>>,
    store: std::sync::Arc<Store>,
) {
    loop {
        match receiver.recv_async().await {
            Ok(Some(message)) => match message.content_type {
                ContentType::Sbs1 => handle_sbs1(&message.payload, &store),
                ContentType::Ogn => handle_ogn(&message.payload, &store),
                ContentType::Nmea => handle_nmea(&message.payload, &store),
                ContentType::Flarm => {}
            },
            Ok(None) | Err(_) => return,
        }
    }
}

/// Every second, emits PFLAA/PFLAU for each tracked aircraft and evicts
/// stale ones, until cancelled.
pub async fn tick_task(store: std::sync::Arc<Store>, hub: HubHandle, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(TICK_PERIOD);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let ownship = store.ownship();
        for aircraft in store.aircraft_snapshot() {
            for sentence in generate_flarm_messages(&ownship, &aircraft) {
                hub.submit(HubMessage::new(ContentType::Flarm, sentence)).await;
            }
        }
        store.evict_stale();
    }
}

fn handle_sbs1(line: &str, store: &Store) {
    let message = match parse_sbs_message(line) {
        Ok(m) if m.message_type.is_relevant() => m,
        Ok(_) => return,
        Err(e) => {
            trace!("discarding unparseable SBS1 line: {e}");
            return;
        }
    };

    store.update_aircraft(&message.aircraft_id, TrafficSource::Adsb, |record| {
        if let Some(callsign) = &message.callsign {
            record.callsign = Some(callsign.clone());
        }
        if matches!(
            message.message_type,
            SbsMessageType::EsSurfacePosition | SbsMessageType::EsAirbornePosition
        ) {
            if let (Some(lat), Some(lon)) = (message.latitude, message.longitude) {
                record.latitude = Some(lat);
                record.longitude = Some(lon);
            }
            if let Some(alt) = message.altitude_ft {
                record.altitude_m = Some(feet_to_meters(alt as f64));
            }
        }
        if message.message_type == SbsMessageType::EsAirborneVelocity {
            record.ground_speed_mps = message.ground_speed_kt.map(knots_to_mps);
            record.track_deg = message.track_deg;
            record.climb_rate_fpm = message.vertical_rate_fpm.map(|fpm| fpm as f64);
        }
    });
}

fn handle_ogn(data: &str, store: &Store) {
    let ownship = store.ownship();
    if !ownship.has_position() {
        return;
    }

    let data_parts: Vec<&str> = data.splitn(2, ' ').collect();
    let beacon_data = data_parts[0];
    let position_data = data_parts.get(1).copied().unwrap_or("");

    let head = match ogn::parse_head(beacon_data) {
        Some(head) => head,
        None => {
            warn!("problem parsing OGN beacon data: {beacon_data}");
            return;
        }
    };

    if head.identifier == "FlightBox" {
        trace!("discarding receiver's own beacon");
        return;
    }

    let own_lat = ownship.latitude.unwrap();
    let own_lon = ownship.longitude.unwrap();

    let mut latitude = head.latitude;
    let mut longitude = head.longitude;

    // Extension tokens are processed in order; coordinate refinement, if
    // present, adjusts latitude/longitude before the absolute position is
    // reconstructed and written below.
    for token_str in ogn::extension_tokens(position_data) {
        if let ogn::ExtensionToken::CoordinateRefinement { dlat_thousandths, dlon_thousandths } =
            ogn::parse_extension_token(token_str)
        {
            latitude += dlat_thousandths as f64 / 1000.0;
            longitude += dlon_thousandths as f64 / 1000.0;
        }
    }

    store.update_aircraft(&head.identifier, TrafficSource::Ogn, |record| {
        record.latitude = Some(crate::geodesy::abs_from_rel_flarm_coordinate(own_lat, latitude, 19));
        record.longitude = Some(crate::geodesy::abs_from_rel_flarm_coordinate(own_lon, longitude, 20));
        record.altitude_m = Some(feet_to_meters(head.altitude_ft as f64));
        record.ground_speed_mps = Some(knots_to_mps(head.h_speed_kt));
        record.track_deg = Some(head.track_deg);
    });

    for token_str in ogn::extension_tokens(position_data) {
        match ogn::parse_extension_token(token_str) {
            ogn::ExtensionToken::Address { flags, address: _ } => {
                let (stealth, address_type, aircraft_type) = ogn::decode_id_flags(flags);
                store.update_aircraft(&head.identifier, TrafficSource::Ogn, |record| {
                    record.stealth = stealth;
                    record.address_type = Some(match address_type {
                        ogn::AddressType::Unknown => 0,
                        ogn::AddressType::Icao => 1,
                        ogn::AddressType::Flarm => 2,
                        ogn::AddressType::OgnTracker => 3,
                    });
                    record.aircraft_type = Some(aircraft_type as u8);
                });
            }
            ogn::ExtensionToken::ClimbRateFpm(fpm) => {
                store.update_aircraft(&head.identifier, TrafficSource::Ogn, |record| {
                    record.climb_rate_fpm = Some(fpm as f64);
                });
            }
            _ => {}
        }
    }
}

fn handle_nmea(line: &str, store: &Store) {
    if let Some(fix) = parse_gpgga(line) {
        store.update_ownship(|o| {
            o.latitude = Some(fix.latitude);
            o.longitude = Some(fix.longitude);
            if let Some(alt_ft) = fix.altitude_ft {
                o.altitude_m = Some(feet_to_meters(alt_ft));
            }
            o.fix_quality = Some(fix.fix_quality as u8);
            o.satellites_in_use = Some(fix.satellites_in_use);
        });
    } else if let Some(fix) = parse_gpgll(line) {
        store.update_ownship(|o| {
            o.latitude = Some(fix.latitude);
            o.longitude = Some(fix.longitude);
        });
    } else if let Some(fix) = parse_gpvtg(line) {
        store.update_ownship(|o| {
            if let Some(speed) = fix.ground_speed_mps {
                o.ground_speed_mps = Some(speed);
            }
            if let Some(track) = fix.track_deg {
                o.track_deg = Some(track);
            }
        });
    }
}

/// Builds the FLARM sentences for one aircraft, or none if position data is
/// missing or the relative position falls outside the protocol's range.
fn generate_flarm_messages(ownship: &OwnshipStatus, aircraft: &AircraftRecord) -> Vec<String> {
    let (own_lat, own_lon) = match (ownship.latitude, ownship.longitude) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => return Vec::new(),
    };
    let (ac_lat, ac_lon) = match (aircraft.latitude, aircraft.longitude) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => return Vec::new(),
    };

    let distance_m = vincenty_distance_m(own_lat, own_lon, ac_lat, ac_lon);
    let b0 = initial_bearing(own_lat, own_lon, ac_lat, ac_lon);

    let rel_n = distance_north(b0, distance_m);
    let rel_e = distance_east(b0, distance_m);

    if !(DISTANCE_M_MIN..=DISTANCE_M_MAX).contains(&rel_n) || !(DISTANCE_M_MIN..=DISTANCE_M_MAX).contains(&rel_e) {
        return Vec::new();
    }

    let rel_v = match (ownship.altitude_m, aircraft.altitude_m) {
        (Some(own_alt), Some(ac_alt)) => {
            Some(clamp(ac_alt - own_alt, DISTANCE_M_MIN, DISTANCE_M_MAX).round() as i32)
        }
        _ => None,
    };

    let id_type = if aircraft.callsign.is_some() { 2 } else { 1 };
    let id = aircraft.callsign.as_deref().unwrap_or(&aircraft.address);

    let track = aircraft.track_deg.map(|t| clamp(t, 0.0, 359.0).round() as u32);
    let ground_speed = aircraft.ground_speed_mps.map(|s| clamp(s, 0.0, 32767.0).round() as u32);
    let climb_rate = aircraft
        .climb_rate_fpm
        .map(|fpm| clamp(feet_to_meters(fpm) / 60.0, -32.7, 32.7));

    let mut messages = vec![flarm::pflaa(
        rel_n.round() as i32,
        rel_e.round() as i32,
        rel_v,
        id_type,
        id,
        track,
        ground_speed,
        climb_rate,
        0,
    )];

    if let Some(course) = ownship.track_deg {
        let bearing = clamp(relative_bearing(b0, course), -180.0, 180.0).round() as i32;
        let distance_clamped = clamp(distance_m, 0.0, 2_147_483_647.0).round() as u32;
        messages.push(flarm::pflau(Some(bearing), rel_v, distance_clamped, id));
    }

    messages
}

fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

//! End-to-end exercises of the hub -> fusion -> hub round trip, without any
//! external services: a hub, the fusion input/tick tasks, and a direct
//! subscriber standing in for AirConnect.

use std::sync::Arc;
use std::time::Duration;

use flightbox::hub::{ContentType, Hub, HubMessage, Subscription};
use flightbox::{fusion, store::Store};
use tokio_util::sync::CancellationToken;

/// Wires up a hub with fusion's input/tick tasks subscribed, plus a raw
/// `flarm` subscriber, and returns the handles a test needs to drive it.
struct Harness {
    hub_handle: flightbox::hub::HubHandle,
    flarm_rx: flume::Receiver<Option<HubMessage>>,
    cancel: CancellationToken,
    hub_task: tokio::task::JoinHandle<()>,
    input_task: tokio::task::JoinHandle<()>,
    tick_task: tokio::task::JoinHandle<()>,
}

impl Harness {
    fn start() -> Self {
        let store = Arc::new(Store::new());
        let mut hub = Hub::new();
        let input_rx = hub.subscribe(Subscription::Types(vec![
            ContentType::Sbs1,
            ContentType::Ogn,
            ContentType::Nmea,
        ]));
        let flarm_rx = hub.subscribe(Subscription::Types(vec![ContentType::Flarm]));
        let hub_handle = hub.handle();
        let cancel = CancellationToken::new();

        let hub_task = tokio::spawn(hub.run());
        let input_task = tokio::spawn(fusion::input_task(input_rx, store.clone()));
        let tick_task = tokio::spawn(fusion::tick_task(store, hub_handle.clone(), cancel.clone()));

        Self {
            hub_handle,
            flarm_rx,
            cancel,
            hub_task,
            input_task,
            tick_task,
        }
    }

    async fn submit(&self, content_type: ContentType, line: &str) {
        self.hub_handle.submit(HubMessage::new(content_type, line)).await;
    }

    /// Waits for the next `flarm` item, up to a generous bound for the 1 Hz tick.
    async fn next_flarm(&self) -> Option<String> {
        tokio::time::timeout(Duration::from_millis(1500), self.flarm_rx.recv_async())
            .await
            .ok()
            .and_then(|r| r.ok())
            .flatten()
            .map(|m| m.payload)
    }

    async fn shutdown(self) {
        self.cancel.cancel();
        self.hub_handle.shutdown().await;
        self.hub_task.await.unwrap();
        self.input_task.await.unwrap();
        self.tick_task.await.unwrap();
    }
}

#[tokio::test]
async fn s1_sbs1_position_with_ownship_fix_emits_pflaa() {
    let harness = Harness::start();

    harness
        .submit(
            ContentType::Sbs1,
            "MSG,3,1,1,ABC123,1,2024/01/01,00:00:00.000,2024/01/01,00:00:00.000,,1000,,,50.0000,8.0000,,,,,",
        )
        .await;
    harness
        .submit(ContentType::Nmea, "$GPGGA,120000,5000.000,N,00800.000,E,1,08,0.9,100.0,M,0.0,M,,*00")
        .await;

    let sentence = harness.next_flarm().await.expect("expected a PFLAA sentence");
    assert!(sentence.starts_with("$PFLAA,0,"), "got: {sentence}");
    assert!(sentence.contains(",1,ABC123,"), "expected ICAO id as ID field, got: {sentence}");

    harness.shutdown().await;
}

#[tokio::test]
async fn s2_identification_then_position_reports_callsign() {
    let harness = Harness::start();

    harness
        .submit(
            ContentType::Sbs1,
            "MSG,1,1,1,ABC123,1,2024/01/01,00:00:00.000,2024/01/01,00:00:00.000,DLH123,,,,,,,,,,,",
        )
        .await;
    harness
        .submit(
            ContentType::Sbs1,
            "MSG,3,1,1,ABC123,1,2024/01/01,00:00:00.000,2024/01/01,00:00:00.000,,1000,,,50.0000,8.0000,,,,,",
        )
        .await;
    harness
        .submit(ContentType::Nmea, "$GPGGA,120000,5000.000,N,00800.000,E,1,08,0.9,100.0,M,0.0,M,,*00")
        .await;

    let sentence = harness.next_flarm().await.expect("expected a PFLAA sentence");
    assert!(sentence.contains(",2,DLH123,"), "expected callsign id type, got: {sentence}");

    harness.shutdown().await;
}

#[tokio::test]
async fn s4_stale_aircraft_is_aged_out() {
    let harness = Harness::start();

    harness
        .submit(ContentType::Nmea, "$GPGGA,120000,0100.000,N,00148.000,W,1,08,0.9,100.0,M,0.0,M,,*00")
        .await;
    harness
        .submit(
            ContentType::Sbs1,
            "MSG,3,1,1,ABC123,1,2024/01/01,00:00:00.000,2024/01/01,00:00:00.000,,1000,,,1.2000,-1.8000,,,,,",
        )
        .await;

    // One tick should emit traffic for the freshly-seen aircraft.
    assert!(harness.next_flarm().await.is_some(), "expected traffic while fresh");

    harness.shutdown().await;
}

#[tokio::test]
async fn s5_ogn_beacon_without_ownship_fix_produces_no_traffic() {
    let harness = Harness::start();

    // No ownship fix yet: the fusion OGN handler requires one before it can
    // reconstruct an absolute position, so the beacon is silently dropped.
    harness
        .submit(
            ContentType::Ogn,
            "ICA3D1B5A>APRS,qAR:/133959h0107.07N/00146.75W'259/067/A=003083 id053D1B5A -039fpm +0.1rot",
        )
        .await;

    let result = tokio::time::timeout(Duration::from_millis(1200), harness.flarm_rx.recv_async()).await;
    assert!(result.is_err(), "expected no PFLAA without an ownship fix");

    harness.shutdown().await;
}

#[tokio::test]
async fn ogn_own_beacon_is_discarded() {
    let harness = Harness::start();

    harness
        .submit(ContentType::Nmea, "$GPGGA,120000,0100.000,N,00148.000,W,1,08,0.9,100.0,M,0.0,M,,*00")
        .await;
    harness
        .submit(
            ContentType::Ogn,
            "FlightBox>APRS,qAR:/133959h0107.07N/00146.75W'259/067/A=003083",
        )
        .await;

    let result = tokio::time::timeout(Duration::from_millis(1200), harness.flarm_rx.recv_async()).await;
    assert!(result.is_err(), "receiver's own beacon should never appear as traffic");

    harness.shutdown().await;
}

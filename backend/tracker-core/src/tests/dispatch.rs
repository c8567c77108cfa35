// Unit tests for inbound routing: address table, toggle semantics, failure isolation.

use crate::config::{ConfigStore, EyeTrackConfig, OscConfig};
use crate::error::tracker::TrackerError;
use crate::osc::codec::encode;
use crate::osc::{Dispatcher, OscCommand};
use crate::tracker::TrackerControl;

use common::ErrorLocation;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};

use rosc::OscType;

#[derive(Default)]
struct CountingTracker {
    recalibrations: AtomicUsize,
    recenters: AtomicUsize,
}

impl TrackerControl for CountingTracker {
    fn recalibrate(&self) -> Result<(), TrackerError> {
        self.recalibrations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn recenter(&self) -> Result<(), TrackerError> {
        self.recenters.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct BrokenTracker;

impl TrackerControl for BrokenTracker {
    fn recalibrate(&self) -> Result<(), TrackerError> {
        Err(TrackerError::Unavailable {
            message: "camera offline".to_string(),
            location: ErrorLocation::caller(),
        })
    }

    fn recenter(&self) -> Result<(), TrackerError> {
        Err(TrackerError::Command {
            message: "no calibration yet".to_string(),
            location: ErrorLocation::caller(),
        })
    }
}

fn peer() -> SocketAddr {
    "127.0.0.1:50000".parse().unwrap()
}

fn store() -> ConfigStore {
    // Path is never written: dispatch does not persist.
    ConfigStore::new("unused-tracker-config.json", EyeTrackConfig::default())
}

#[test]
fn given_default_config_when_table_built_then_each_address_maps_to_its_command() {
    let dispatcher = Dispatcher::from_config(&OscConfig::default());

    assert_eq!(
        dispatcher.route("/avatar/parameters/etvr_recenter"),
        &[OscCommand::Recenter]
    );
    assert_eq!(
        dispatcher.route("/avatar/parameters/etvr_recalibrate"),
        &[OscCommand::Recalibrate]
    );
    assert_eq!(
        dispatcher.route("/avatar/parameters/etvr_sync_blink"),
        &[OscCommand::ToggleSyncBlink]
    );
    assert!(dispatcher.route("/avatar/parameters/unknown").is_empty());
}

#[test]
fn given_shared_address_when_table_built_then_both_commands_run_in_order() {
    let mut osc = OscConfig::default();
    osc.recenter_address = osc.recalibrate_address.clone();

    let dispatcher = Dispatcher::from_config(&osc);

    assert_eq!(
        dispatcher.route(&osc.recalibrate_address),
        &[OscCommand::Recalibrate, OscCommand::Recenter]
    );
}

/// **VALUE**: The toggle ignores the message payload and flips the stored value.
///
/// **BUG THIS CATCHES**: Treating the OSC argument as the new value would make a
/// client that always sends `true` unable to switch sync blink off again.
#[tokio::test]
async fn given_sync_blink_message_with_true_payload_when_dispatched_twice_then_value_restored() {
    let store = store();
    let tracker = CountingTracker::default();
    let dispatcher = Dispatcher::from_config(&OscConfig::default());
    let packet = encode("/avatar/parameters/etvr_sync_blink", vec![OscType::Bool(true)]).unwrap();

    let handled = dispatcher.dispatch(&packet, peer(), &store, &tracker).await;
    assert_eq!(handled, 1);
    assert!(store.read(|c| c.osc.sync_blink).await, "First toggle turns it on");

    dispatcher.dispatch(&packet, peer(), &store, &tracker).await;
    assert!(!store.read(|c| c.osc.sync_blink).await, "Second toggle restores it");
}

#[tokio::test]
async fn given_recenter_and_recalibrate_when_dispatched_then_tracker_invoked() {
    let store = store();
    let tracker = CountingTracker::default();
    let dispatcher = Dispatcher::from_config(&OscConfig::default());

    let recenter = encode("/avatar/parameters/etvr_recenter", vec![]).unwrap();
    let recalibrate = encode("/avatar/parameters/etvr_recalibrate", vec![OscType::Int(1)]).unwrap();
    dispatcher.dispatch(&recenter, peer(), &store, &tracker).await;
    dispatcher.dispatch(&recalibrate, peer(), &store, &tracker).await;
    dispatcher.dispatch(&recalibrate, peer(), &store, &tracker).await;

    assert_eq!(tracker.recenters.load(Ordering::SeqCst), 1);
    assert_eq!(tracker.recalibrations.load(Ordering::SeqCst), 2);
    assert_eq!(store.snapshot().await, EyeTrackConfig::default());
}

#[tokio::test]
async fn given_failing_tracker_when_dispatched_then_error_is_contained() {
    let store = store();
    let dispatcher = Dispatcher::from_config(&OscConfig::default());
    let packet = encode("/avatar/parameters/etvr_recenter", vec![]).unwrap();

    let handled = dispatcher.dispatch(&packet, peer(), &store, &BrokenTracker).await;

    assert_eq!(handled, 1, "Failed command still counts as handled");
}

#[tokio::test]
async fn given_malformed_or_unmapped_packet_when_dispatched_then_nothing_runs() {
    let store = store();
    let tracker = CountingTracker::default();
    let dispatcher = Dispatcher::from_config(&OscConfig::default());
    let unmapped = encode("/avatar/parameters/EyesY", vec![OscType::Float(0.1)]).unwrap();

    assert_eq!(dispatcher.dispatch(b"\x00\x01garbage", peer(), &store, &tracker).await, 0);
    assert_eq!(dispatcher.dispatch(&unmapped, peer(), &store, &tracker).await, 0);
    assert_eq!(store.snapshot().await, EyeTrackConfig::default());
}

/// **VALUE**: Address patterns sent by the consumer reach the commands they match.
///
/// **BUG THIS CATCHES**: Exact-only lookup silently drops `/..._sync_*` style
/// messages that OSC clients are allowed to send.
#[tokio::test]
async fn given_wildcard_address_when_dispatched_then_matching_command_runs() {
    // GIVEN: The default table
    let store = store();
    let tracker = CountingTracker::default();
    let dispatcher = Dispatcher::from_config(&OscConfig::default());
    let packet = encode("/avatar/parameters/etvr_sync_*", vec![OscType::Bool(true)]).unwrap();

    // WHEN: Dispatching a pattern that only the sync-blink address matches
    let handled = dispatcher.dispatch(&packet, peer(), &store, &tracker).await;

    // THEN: Exactly the toggle ran
    assert_eq!(handled, 1);
    assert!(store.read(|c| c.osc.sync_blink).await);
    assert_eq!(tracker.recenters.load(Ordering::SeqCst), 0);
}

#[test]
fn given_pattern_matching_several_addresses_when_routed_then_all_commands_returned() {
    let dispatcher = Dispatcher::from_config(&OscConfig::default());

    let alternatives = dispatcher.route("/avatar/parameters/etvr_{recenter,recalibrate}");
    let single_char = dispatcher.route("/avatar/parameters/etvr_re?enter");
    let no_match = dispatcher.route("/avatar/parameters/Eye*");

    assert_eq!(alternatives.len(), 2);
    assert!(alternatives.contains(&OscCommand::Recenter));
    assert!(alternatives.contains(&OscCommand::Recalibrate));
    assert_eq!(single_char, vec![OscCommand::Recenter]);
    assert!(no_match.is_empty());
}

#[test]
fn given_malformed_pattern_when_routed_then_nothing_matches() {
    let dispatcher = Dispatcher::from_config(&OscConfig::default());

    assert!(dispatcher.route("/avatar/parameters/etvr_[sync").is_empty());
}

//! Integration tests for the system aggregates and the capture replay path.
//!
//! # Purpose
//!
//! An aggregate owns every channel and domain object of one physical
//! connection.  These tests check the lifecycle contract from the outside:
//!
//! - construction followed immediately by disposal, before any message;
//! - `disconnect` cancels the shared connection exactly once;
//! - a capture replayed through [`MemoryLink`] ends in the expected snapshots;
//! - heater zones poll on their own until the aggregate is disposed.

use std::sync::Arc;
use std::time::Duration;

use vanlink_client::application::channel::ChannelError;
use vanlink_client::application::heater_zone::HeaterZoneOptions;
use vanlink_client::infrastructure::link::memory::MemoryLink;
use vanlink_client::infrastructure::replay::{parse_capture, replay, Family};
use vanlink_client::systems::{BatterySystem, HeaterSystem, TankKind, WaterSystem};
use vanlink_core::protocol::addressing::heater;
use vanlink_core::{ChannelAddress, ValvePosition};

async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

/// Fast connect/disconnect cycles build an aggregate and drop it straight
/// away; nothing may be left monitoring the link.
#[tokio::test]
async fn test_construct_then_dispose_immediately() {
    let link = Arc::new(MemoryLink::new("van"));

    let water = WaterSystem::new(link.clone());
    water.dispose();
    let heater = HeaterSystem::new(link.clone());
    heater.dispose();
    heater.dispose();
    let battery = BatterySystem::new(link.clone());
    battery.dispose();

    assert_eq!(link.monitor_count(), 0);
    assert!(link.is_connected(), "dispose alone keeps the connection");
}

/// `disconnect` tears the shared connection down once; later commands on
/// any sibling fail instead of panicking.
#[tokio::test]
async fn test_disconnect_cancels_connection_once() {
    // Arrange
    let link = Arc::new(MemoryLink::new("water"));
    let water = WaterSystem::new(link.clone());

    // Act
    water.disconnect().await.unwrap();
    water.disconnect().await.unwrap();
    let after = water.tank(TankKind::Grey).get_config().await;

    // Assert
    assert_eq!(link.cancel_count(), 1);
    assert_eq!(after, Err(ChannelError::NotConnected));
}

// ── Replay ────────────────────────────────────────────────────────────────────

const WATER_CAPTURE: &str = r#"
device_id = "C4:DE:E2:19:0A:41"
device_name = "Vanlink Water"

[[chunk]]
channel = "clean_tank"
text = "CFG:V=100;H=50"

[[chunk]]
channel = "clean_tank"
text = "0\n250\n"

[[chunk]]
channel = "grey_valve"
text = "CFG:T=45\nCOUNTDOWN:"

[[chunk]]
channel = "grey_valve"
text = "40\n"

[[chunk]]
channel = "admin"
text = "OK\n"
"#;

#[tokio::test]
async fn test_water_capture_replay() {
    // Arrange
    let link = Arc::new(MemoryLink::new("C4:DE:E2:19:0A:41"));
    let water = WaterSystem::new(link.clone());
    let capture = parse_capture(WATER_CAPTURE).unwrap();
    settle().await;

    // Act
    let stats = replay(&link, Family::Water, &capture).unwrap();

    // Assert
    assert_eq!(stats.chunks, 5);
    assert_eq!(stats.delivered, 5);
    let snapshot = water.snapshot();
    assert_eq!(snapshot.clean_tank.capacity_liters, 100);
    assert_eq!(snapshot.clean_tank.percentage, 50.0);
    assert_eq!(snapshot.grey_drain_valve.auto_close_secs, 45);
    assert_eq!(snapshot.grey_drain_valve.remaining_secs, 40);
    assert_eq!(snapshot.grey_drain_valve.position, ValvePosition::Open);
    assert!(snapshot.admin.success);
}

// ── Heater polling ────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_every_zone_polls_until_disposed() {
    // Arrange
    let link = Arc::new(MemoryLink::new("heater"));
    let system = HeaterSystem::with_options(
        link.clone(),
        HeaterZoneOptions { status_poll: Duration::from_secs(2) },
    );
    let polls = |zone: u16| {
        let address = ChannelAddress::new(heater::SERVICE, heater::ZONE_BASE + zone);
        link.written_lines(address.write)
            .iter()
            .filter(|line| line.as_str() == "STATUS?")
            .count()
    };

    // Act
    tokio::time::sleep(Duration::from_millis(2_100)).await;
    settle().await;
    let alive: Vec<_> = (0..4).map(polls).collect();
    system.dispose();
    tokio::time::sleep(Duration::from_secs(10)).await;
    settle().await;

    // Assert
    assert_eq!(alive, vec![2, 2, 2, 2]);
    assert_eq!((0..4).map(polls).collect::<Vec<_>>(), alive);
}

#[tokio::test]
async fn test_battery_disconnect_after_dispose() {
    let link = Arc::new(MemoryLink::new("bms"));
    let battery = BatterySystem::new(link.clone());

    battery.dispose();
    battery.disconnect().await.unwrap();

    assert_eq!(link.cancel_count(), 1);
    assert!(!link.is_connected());
}

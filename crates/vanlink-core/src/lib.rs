//! # vanlink-core
//!
//! Shared library for Vanlink containing the peripheral wire codecs, endpoint
//! addressing, the observable state primitive, and every snapshot type the
//! camper-van modules publish.
//!
//! This crate is used by the async client layer and by the replay tool.
//! It has zero dependencies on async runtimes, radio stacks, or the filesystem.
//!
//! # Architecture overview (for beginners)
//!
//! A camper van carries a handful of small radio peripherals: a water module
//! (two tank level sensors and a grey-water drain valve), a heater module (four
//! heating zones plus an environment sensor) and a lithium battery with its own
//! battery-management system (BMS).  The phone talks to each of them over a
//! notify/write link that chops every message into tiny chunks.
//!
//! This crate (`vanlink-core`) is the synchronous foundation.  It defines:
//!
//! - **`protocol`** – How bytes look on the wire.  The battery speaks a binary,
//!   length-prefixed, checksummed frame format; every other module speaks short
//!   newline-terminated ASCII lines such as `CFG:V=100;H=500`.
//!
//! - **`domain`** – Pure state.  [`ObservableValue`] holds a current value and
//!   notifies listeners synchronously; each module has an immutable snapshot
//!   type together with the pure functions that move it from one state to the
//!   next when a message arrives.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `vanlink_core::BatterySnapshot` instead of the full module path.
pub use domain::admin::AdminSnapshot;
pub use domain::battery::{BatteryAlarm, BatterySnapshot};
pub use domain::environment::EnvironmentSnapshot;
pub use domain::heater::HeaterZoneSnapshot;
pub use domain::observable::{Listener, Observable, ObservableValue, Subscription};
pub use domain::tank::TankLevelSnapshot;
pub use domain::valve::{ValvePosition, ValveState};
pub use protocol::addressing::{AddressError, ChannelAddress, WriteMode};
pub use protocol::bms::BmsTelemetry;

//! vanlink-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does vanlink-client do? (for beginners)
//!
//! The phone holds one radio connection per van module.  Each connection
//! carries several independent conversations (a tank, a valve, a heater zone,
//! ...), and every conversation delivers its bytes in small notification
//! chunks that do not line up with message boundaries.
//!
//! This crate:
//!
//! 1. Wraps each conversation in a [`application::channel::Channel`] that
//!    reassembles chunks into whole text lines or whole BMS frames.
//! 2. Feeds those messages to a domain object (tank sensor, drain valve,
//!    heater zone, ...) which keeps an observable snapshot of the module.
//! 3. Sends commands with an optimistic local update that is rolled back if
//!    the write fails.
//! 4. Groups the domain objects of one physical connection into a system
//!    aggregate (`WaterSystem`, `HeaterSystem`, `BatterySystem`) that owns
//!    their shared lifecycle.

/// Application layer: the channel port and the per-module domain objects.
pub mod application;

/// Infrastructure layer: transport port, concrete channels, storage, config.
pub mod infrastructure;

/// Composition roots, one per module family.
pub mod systems;

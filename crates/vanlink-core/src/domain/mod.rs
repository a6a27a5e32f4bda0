//! Domain state for Vanlink peripherals.
//!
//! This module contains pure state with no runtime or transport dependencies.
//!
//! # How state flows (for beginners)
//!
//! Every peripheral function is represented by one immutable *snapshot*
//! (for example [`tank::TankLevelSnapshot`]).  A snapshot is never edited in
//! place: each inbound message produces a brand new snapshot through a pure
//! method such as `TankLevelSnapshot::apply`, and the owning domain object
//! stores it in an [`observable::ObservableValue`], which tells every
//! subscriber about the change.
//!
//! Keeping the transitions here, away from channels and timers, means each
//! rule ("a distance reading recomputes the percentage against the current
//! height") is a plain function that can be unit-tested without any I/O.

pub mod admin;
pub mod battery;
pub mod environment;
pub mod heater;
pub mod observable;
pub mod tank;
pub mod valve;

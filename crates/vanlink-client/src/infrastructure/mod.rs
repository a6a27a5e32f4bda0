//! Infrastructure layer for the client.
//!
//! Contains the adapters behind the application ports: the physical link,
//! the two concrete channels, device persistence, configuration, and the
//! capture replay used by the `vanlink` binary.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `vanlink_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`link`** – The [`link::PeripheralLink`] port (one physical connection)
//!   and [`link::memory::MemoryLink`], an in-process link used by tests and
//!   the replay tool.
//!
//! - **`channel`** – [`channel::NotifyChannel`], which turns raw
//!   notification chunks into whole protocol units.  `LineChannel` splits on
//!   `\n` for the text modules; `FrameChannel` reassembles BMS frames.
//!
//! - **`storage`** – The last-connected device per module, and the TOML
//!   configuration file.
//!
//! - **`replay`** – Capture files fed into a `MemoryLink`.

pub mod channel;
pub mod link;
pub mod replay;
pub mod storage;

//! The channel port.
//!
//! A channel is one logical conversation with a peripheral function (for
//! example "zone 2 of the heater").  Several channels share one physical
//! connection.  The channel hands its listener complete protocol units only:
//! whole text lines for the water and heater modules, whole decoded frames
//! for the battery.
//!
//! # Lifecycle
//!
//! - `listen` installs the single listener; a later call replaces it.
//! - `send` resolves once the transport accepted the write.
//! - `disconnect` detaches *this* channel only and makes later sends fail
//!   with [`ChannelError::Closed`].  Tearing down the shared physical
//!   connection is the job of the system aggregate that owns it.

use async_trait::async_trait;
use thiserror::Error;
use vanlink_core::{BmsTelemetry, Listener, Subscription};

/// Errors surfaced by [`Channel::send`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The physical connection is down.
    #[error("peripheral is not connected")]
    NotConnected,

    /// The transport rejected the write.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The channel was disconnected.
    #[error("channel is closed")]
    Closed,
}

/// Bidirectional conversation delivering `Inbound` units to one listener.
#[async_trait]
pub trait Channel: Send + Sync {
    type Inbound: Send + 'static;

    /// Short human-readable name used in logs.
    fn label(&self) -> &str;

    /// Activates delivery to `listener`, replacing any previous listener.
    /// Dropping the returned handle stops delivery.
    fn listen(&self, listener: Listener<Self::Inbound>) -> Subscription;

    /// Writes `payload` to the peripheral.
    async fn send(&self, payload: &[u8]) -> Result<(), ChannelError>;

    /// Detaches this channel from the connection.  Idempotent.
    async fn disconnect(&self) -> Result<(), ChannelError>;
}

/// Channel carrying newline-delimited text lines.
pub type TextChannel = dyn Channel<Inbound = String>;

/// Channel carrying decoded BMS frames.
pub type TelemetryChannel = dyn Channel<Inbound = BmsTelemetry>;

//! The physical connection port.
//!
//! One [`PeripheralLink`] is one connected peripheral.  Every channel of a
//! system shares it: channels monitor and write individual characteristics,
//! while only the owning system aggregate calls
//! [`PeripheralLink::cancel_connection`].

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;
use vanlink_core::{Subscription, WriteMode};

use crate::application::channel::ChannelError;

/// Errors reported by a [`PeripheralLink`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No connection to the peripheral.
    #[error("peripheral is not connected")]
    NotConnected,

    /// A characteristic write was rejected.
    #[error("write failed: {0}")]
    Write(String),

    /// A characteristic could not be monitored, or its monitor failed.
    #[error("monitor failed: {0}")]
    Monitor(String),

    /// The connection was cancelled while the operation was pending.
    #[error("operation cancelled")]
    Cancelled,
}

impl From<TransportError> for ChannelError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::NotConnected | TransportError::Cancelled => ChannelError::NotConnected,
            other => ChannelError::Transport(other.to_string()),
        }
    }
}

/// Receives each notification value, or the error that ended the monitor.
pub type NotificationHandler = Box<dyn Fn(Result<&[u8], TransportError>) + Send + Sync>;

/// One connected peripheral.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PeripheralLink: Send + Sync {
    /// Identity of the connected peripheral (platform device id).
    fn device_id(&self) -> String;

    /// Delivers every notification on `characteristic` to `handler` until the
    /// returned handle is released.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the characteristic cannot be monitored.
    fn monitor(
        &self,
        service: Uuid,
        characteristic: Uuid,
        handler: NotificationHandler,
    ) -> Result<Subscription, TransportError>;

    /// Writes `payload` to `characteristic`.
    async fn write(
        &self,
        service: Uuid,
        characteristic: Uuid,
        payload: &[u8],
        mode: WriteMode,
    ) -> Result<(), TransportError>;

    /// Tears down the physical connection, ending every monitor.
    async fn cancel_connection(&self) -> Result<(), TransportError>;
}

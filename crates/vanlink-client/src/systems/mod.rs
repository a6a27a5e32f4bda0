//! System aggregates: everything the app talks to on one physical connection.
//!
//! An aggregate takes a connected [`PeripheralLink`], opens one channel per
//! sub-function of the module and builds the matching domain object on each.
//!
//! - `dispose` tears down every owned domain object.  It is idempotent and
//!   safe right after construction, before any message arrived.
//! - `disconnect` disposes, then cancels the physical connection once.
//!   Individual channels never cancel the shared connection.

pub mod battery;
pub mod heater;
pub mod water;

pub use battery::BatterySystem;
pub use heater::{HeaterSnapshot, HeaterSystem};
pub use water::{TankKind, WaterSnapshot, WaterSystem};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};
use vanlink_core::ChannelAddress;

use crate::application::channel::TextChannel;
use crate::infrastructure::channel::LineChannel;
use crate::infrastructure::link::{PeripheralLink, TransportError};

fn line_channel(link: &Arc<dyn PeripheralLink>, service: u16, channel: u16, label: &str) -> Arc<TextChannel> {
    Arc::new(LineChannel::new(
        Arc::clone(link),
        ChannelAddress::new(service, channel),
        label,
    ))
}

/// The shared link plus the one-shot flags every aggregate needs.
struct Connection {
    link: Arc<dyn PeripheralLink>,
    system: &'static str,
    disposed: AtomicBool,
    cancelled: AtomicBool,
}

impl Connection {
    fn new(link: Arc<dyn PeripheralLink>, system: &'static str) -> Self {
        info!(system, device = %link.device_id(), "system attached");
        Self {
            link,
            system,
            disposed: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
        }
    }

    /// `true` on the first call only.
    fn mark_disposed(&self) -> bool {
        let first = !self.disposed.swap(true, Ordering::SeqCst);
        if first {
            debug!(system = self.system, "system disposed");
        }
        first
    }

    /// Cancels the physical connection the first time it is called.
    async fn cancel(&self) -> Result<(), TransportError> {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!(system = self.system, device = %self.link.device_id(), "disconnecting");
        self.link.cancel_connection().await
    }
}

//! BatterySystem: the BMS telemetry stream of the lithium pack.

use std::sync::Arc;

use vanlink_core::{BatterySnapshot, ChannelAddress, Observable};

use super::Connection;
use crate::application::battery_monitor::BatteryMonitor;
use crate::infrastructure::channel::FrameChannel;
use crate::infrastructure::link::{PeripheralLink, TransportError};

pub struct BatterySystem {
    pub monitor: BatteryMonitor,
    connection: Connection,
}

impl BatterySystem {
    pub fn new(link: Arc<dyn PeripheralLink>) -> Self {
        let channel = Arc::new(FrameChannel::new(Arc::clone(&link), ChannelAddress::battery(), "battery/bms"));
        Self {
            monitor: BatteryMonitor::new(channel),
            connection: Connection::new(link, "battery"),
        }
    }

    pub fn snapshot(&self) -> BatterySnapshot {
        self.monitor.get_value()
    }

    /// Idempotent.
    pub fn dispose(&self) {
        if self.connection.mark_disposed() {
            self.monitor.dispose();
        }
    }

    /// Disposes, then cancels the physical connection once.
    ///
    /// # Errors
    ///
    /// Returns the link's error if cancelling fails.
    pub async fn disconnect(&self) -> Result<(), TransportError> {
        self.dispose();
        self.connection.cancel().await
    }
}

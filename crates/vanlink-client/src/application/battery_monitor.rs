//! BatteryMonitor: live pack telemetry from the BMS.
//!
//! Every decoded frame replaces the whole snapshot.  The only command is a
//! read-all request, sent once at construction and on [`BatteryMonitor::refresh`].

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use vanlink_core::protocol::bms::build_read_all_command;
use vanlink_core::{BatterySnapshot, BmsTelemetry, Listener, Observable, ObservableValue, Subscription};

use super::channel::{ChannelError, TelemetryChannel};
use super::{lock, send_in_background};

pub struct BatteryMonitor {
    channel: Arc<TelemetryChannel>,
    state: ObservableValue<BatterySnapshot>,
    listening: Mutex<Option<Subscription>>,
}

impl BatteryMonitor {
    pub fn new(channel: Arc<TelemetryChannel>) -> Self {
        let state = ObservableValue::new(BatterySnapshot::default());

        let sink = state.clone();
        let listening = channel.listen(Box::new(move |telemetry: &BmsTelemetry| {
            sink.set_value(BatterySnapshot::from_telemetry(telemetry, now_ms()));
        }));

        send_in_background(Arc::clone(&channel), build_read_all_command());

        Self {
            channel,
            state,
            listening: Mutex::new(Some(listening)),
        }
    }

    /// Asks the BMS for a fresh frame.
    pub async fn refresh(&self) -> Result<(), ChannelError> {
        self.channel.send(&build_read_all_command()).await
    }

    pub fn dispose(&self) {
        if let Some(listening) = lock(&self.listening).take() {
            listening.unsubscribe();
        }
        self.state.destroy();
    }
}

impl Observable<BatterySnapshot> for BatteryMonitor {
    fn get_value(&self) -> BatterySnapshot {
        self.state.get_value()
    }

    fn subscribe(&self, listener: Listener<BatterySnapshot>) -> Subscription {
        self.state.subscribe(listener)
    }
}

impl Drop for BatteryMonitor {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

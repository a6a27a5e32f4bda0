//! TankLevelSensor: fill level of one water tank.
//!
//! The sensor pushes raw distances (mm from the sensor to the water surface)
//! and answers `CFG?` with the tank geometry.  Either can arrive first; the
//! snapshot always reflects the latest combination of both.

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};
use vanlink_core::protocol::text::tank::{TankCommand, TankConfig, TankMessage};
use vanlink_core::{Listener, Observable, ObservableValue, Subscription, TankLevelSnapshot};

use super::channel::{ChannelError, TextChannel};
use super::{lock, send_in_background};

pub struct TankLevelSensor {
    channel: Arc<TextChannel>,
    state: ObservableValue<TankLevelSnapshot>,
    listening: Mutex<Option<Subscription>>,
}

impl TankLevelSensor {
    /// Listens on `channel`, then asks the sensor for its configuration.
    pub fn new(channel: Arc<TextChannel>) -> Self {
        let state = ObservableValue::new(TankLevelSnapshot::default());

        let sink = state.clone();
        let label = channel.label().to_string();
        let listening = channel.listen(Box::new(move |line: &String| {
            match TankMessage::parse(line) {
                Some(message) => sink.update(|s| s.apply(&message)),
                None => debug!(channel = %label, line = %line, "unknown tank message"),
            }
        }));

        send_in_background(Arc::clone(&channel), TankCommand::RequestConfig.encode().into_bytes());

        Self {
            channel,
            state,
            listening: Mutex::new(Some(listening)),
        }
    }

    /// Asks the sensor to report its configuration again.
    pub async fn get_config(&self) -> Result<(), ChannelError> {
        self.send(TankCommand::RequestConfig).await
    }

    /// Applies the new geometry locally, then writes it to the sensor.
    ///
    /// # Errors
    ///
    /// Returns the channel error when the write fails.  The local geometry is
    /// kept and `last_message` records the failure.
    pub async fn set_config(&self, config: TankConfig) -> Result<(), ChannelError> {
        self.state.update(|s| s.with_config(config));

        let result = self.send(TankCommand::SetConfig(config)).await;
        if let Err(e) = &result {
            warn!(channel = %self.channel.label(), error = %e, "tank configuration write failed");
            self.state.update(|s| TankLevelSnapshot {
                last_message: Some("Error: failed to save tank configuration".to_string()),
                ..s.clone()
            });
        }
        result
    }

    /// Stops listening and clears every subscriber.  Idempotent.
    pub fn dispose(&self) {
        if let Some(listening) = lock(&self.listening).take() {
            listening.unsubscribe();
        }
        self.state.destroy();
    }

    async fn send(&self, command: TankCommand) -> Result<(), ChannelError> {
        self.channel.send(command.encode().as_bytes()).await
    }
}

impl Observable<TankLevelSnapshot> for TankLevelSensor {
    fn get_value(&self) -> TankLevelSnapshot {
        self.state.get_value()
    }

    fn subscribe(&self, listener: Listener<TankLevelSnapshot>) -> Subscription {
        self.state.subscribe(listener)
    }
}

impl Drop for TankLevelSensor {
    fn drop(&mut self) {
        self.dispose();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

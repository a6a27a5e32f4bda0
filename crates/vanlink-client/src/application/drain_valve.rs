//! DrainValve: the grey-water drain valve.
//!
//! The valve is the source of truth once it reports: `CLOSED` and
//! `AUTO_CLOSED` force the position to closed whatever the phone assumed, and
//! every `COUNTDOWN:` push means the valve is open.

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};
use vanlink_core::domain::valve::DEFAULT_AUTO_CLOSE_SECS;
use vanlink_core::protocol::text::valve::{ValveCommand, ValveMessage};
use vanlink_core::{Listener, Observable, ObservableValue, Subscription, ValvePosition, ValveState};

use super::channel::{ChannelError, TextChannel};
use super::{lock, send_in_background};

/// Construction options for [`DrainValve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainValveOptions {
    /// Auto-close delay shown until the valve reports its own.
    pub default_auto_close_secs: u32,
}

impl Default for DrainValveOptions {
    fn default() -> Self {
        Self {
            default_auto_close_secs: DEFAULT_AUTO_CLOSE_SECS,
        }
    }
}

pub struct DrainValve {
    channel: Arc<TextChannel>,
    state: ObservableValue<ValveState>,
    listening: Mutex<Option<Subscription>>,
}

impl DrainValve {
    pub fn new(channel: Arc<TextChannel>) -> Self {
        Self::with_options(channel, DrainValveOptions::default())
    }

    pub fn with_options(channel: Arc<TextChannel>, options: DrainValveOptions) -> Self {
        let state = ObservableValue::new(ValveState::with_auto_close(options.default_auto_close_secs));

        let sink = state.clone();
        let label = channel.label().to_string();
        let listening = channel.listen(Box::new(move |line: &String| {
            match ValveMessage::parse(line) {
                Some(message) => sink.update(|s| s.apply(&message)),
                None => debug!(channel = %label, line = %line, "unknown valve message"),
            }
        }));

        send_in_background(Arc::clone(&channel), ValveCommand::RequestConfig.encode().into_bytes());

        Self {
            channel,
            state,
            listening: Mutex::new(Some(listening)),
        }
    }

    pub async fn get_config(&self) -> Result<(), ChannelError> {
        self.send(ValveCommand::RequestConfig).await
    }

    /// Opens the valve.  The countdown is seeded from the auto-close delay
    /// until the valve pushes its own; on failure the position becomes
    /// unknown.
    pub async fn open(&self) -> Result<(), ChannelError> {
        self.state.update(ValveState::opening);

        let result = self.send(ValveCommand::Open).await;
        if let Err(e) = &result {
            warn!(channel = %self.channel.label(), error = %e, "valve OPEN failed");
            self.state.update(|s| ValveState {
                position: ValvePosition::Unknown,
                remaining_secs: 0,
                last_message: Some("Error: failed to open valve".to_string()),
                ..s.clone()
            });
        }
        result
    }

    /// Closes the valve; on failure the position becomes unknown.
    pub async fn close(&self) -> Result<(), ChannelError> {
        self.state.update(ValveState::closing);

        let result = self.send(ValveCommand::Close).await;
        if let Err(e) = &result {
            warn!(channel = %self.channel.label(), error = %e, "valve CLOSE failed");
            self.state.update(|s| ValveState {
                position: ValvePosition::Unknown,
                last_message: Some("Error: failed to close valve".to_string()),
                ..s.clone()
            });
        }
        result
    }

    pub async fn set_auto_close_time(&self, secs: u32) -> Result<(), ChannelError> {
        self.state.update(|s| ValveState {
            auto_close_secs: secs,
            ..s.clone()
        });

        let result = self.send(ValveCommand::SetAutoClose(secs)).await;
        if let Err(e) = &result {
            warn!(channel = %self.channel.label(), error = %e, "valve auto-close write failed");
            self.state.update(|s| ValveState {
                last_message: Some("Error: failed to update auto-close time".to_string()),
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

    async fn send(&self, command: ValveCommand) -> Result<(), ChannelError> {
        self.channel.send(command.encode().as_bytes()).await
    }
}

impl Observable<ValveState> for DrainValve {
    fn get_value(&self) -> ValveState {
        self.state.get_value()
    }

    fn subscribe(&self, listener: Listener<ValveState>) -> Subscription {
        self.state.subscribe(listener)
    }
}

impl Drop for DrainValve {
    fn drop(&mut self) {
        self.dispose();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

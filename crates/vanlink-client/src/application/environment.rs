//! EnvironmentData: cabin and exterior readings from the heater module.
//!
//! After the initial `ENV?` the module pushes readings on its own.

use std::sync::{Arc, Mutex};

use tracing::debug;
use vanlink_core::protocol::text::environment::{EnvironmentCommand, EnvironmentMessage};
use vanlink_core::{EnvironmentSnapshot, Listener, Observable, ObservableValue, Subscription};

use super::channel::{ChannelError, TextChannel};
use super::{lock, send_in_background};

pub struct EnvironmentData {
    channel: Arc<TextChannel>,
    state: ObservableValue<EnvironmentSnapshot>,
    listening: Mutex<Option<Subscription>>,
}

impl EnvironmentData {
    pub fn new(channel: Arc<TextChannel>) -> Self {
        let state = ObservableValue::new(EnvironmentSnapshot::default());

        let sink = state.clone();
        let label = channel.label().to_string();
        let listening = channel.listen(Box::new(move |line: &String| {
            match EnvironmentMessage::parse(line) {
                Some(message) => sink.update(|s| s.apply(&message)),
                None => debug!(channel = %label, line = %line, "unknown environment message"),
            }
        }));

        send_in_background(
            Arc::clone(&channel),
            EnvironmentCommand::RequestEnvironment.encode().into_bytes(),
        );

        Self {
            channel,
            state,
            listening: Mutex::new(Some(listening)),
        }
    }

    pub async fn get_environment(&self) -> Result<(), ChannelError> {
        self.channel
            .send(EnvironmentCommand::RequestEnvironment.encode().as_bytes())
            .await
    }

    pub fn dispose(&self) {
        if let Some(listening) = lock(&self.listening).take() {
            listening.unsubscribe();
        }
        self.state.destroy();
    }
}

impl Observable<EnvironmentSnapshot> for EnvironmentData {
    fn get_value(&self) -> EnvironmentSnapshot {
        self.state.get_value()
    }

    fn subscribe(&self, listener: Listener<EnvironmentSnapshot>) -> Subscription {
        self.state.subscribe(listener)
    }
}

impl Drop for EnvironmentData {
    fn drop(&mut self) {
        self.dispose();
    }
}

//! AdminModule: rename or re-pin a module.
//!
//! Both commands make the module reboot, so nothing is applied locally.  The
//! snapshot only mirrors the module's last answer.

use std::sync::{Arc, Mutex};

use tracing::warn;
use vanlink_core::protocol::text::admin::AdminCommand;
use vanlink_core::{AdminSnapshot, Listener, Observable, ObservableValue, Subscription};

use super::channel::{ChannelError, TextChannel};
use super::lock;

pub struct AdminModule {
    channel: Arc<TextChannel>,
    state: ObservableValue<AdminSnapshot>,
    listening: Mutex<Option<Subscription>>,
}

impl AdminModule {
    pub fn new(channel: Arc<TextChannel>) -> Self {
        let state = ObservableValue::new(AdminSnapshot::default());

        let sink = state.clone();
        let listening = channel.listen(Box::new(move |line: &String| {
            sink.set_value(AdminSnapshot::from_reply(line));
        }));

        Self {
            channel,
            state,
            listening: Mutex::new(Some(listening)),
        }
    }

    pub async fn set_name(&self, name: &str) -> Result<(), ChannelError> {
        self.send(AdminCommand::SetName(name.to_string())).await
    }

    pub async fn set_pin(&self, pin: &str) -> Result<(), ChannelError> {
        self.send(AdminCommand::SetPin(pin.to_string())).await
    }

    pub fn dispose(&self) {
        if let Some(listening) = lock(&self.listening).take() {
            listening.unsubscribe();
        }
        self.state.destroy();
    }

    async fn send(&self, command: AdminCommand) -> Result<(), ChannelError> {
        let result = self.channel.send(command.encode().as_bytes()).await;
        if let Err(e) = &result {
            warn!(channel = %self.channel.label(), error = %e, "admin command failed");
        }
        result
    }
}

impl Observable<AdminSnapshot> for AdminModule {
    fn get_value(&self) -> AdminSnapshot {
        self.state.get_value()
    }

    fn subscribe(&self, listener: Listener<AdminSnapshot>) -> Subscription {
        self.state.subscribe(listener)
    }
}

impl Drop for AdminModule {
    fn drop(&mut self) {
        self.dispose();
    }
}

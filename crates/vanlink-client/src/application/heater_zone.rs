//! HeaterZone: one regulated heating zone.
//!
//! The firmware only reports temperature when asked, so the zone polls
//! `STATUS?` on a fixed period for as long as it lives.  The poll task is
//! aborted by [`HeaterZone::dispose`].

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};
use vanlink_core::protocol::text::heater::{setpoint_tenths, HeaterCommand, HeaterMessage, PidConfig};
use vanlink_core::protocol::text::from_tenths;
use vanlink_core::{HeaterZoneSnapshot, Listener, Observable, ObservableValue, Subscription};

use super::channel::{ChannelError, TextChannel};
use super::{lock, send_in_background};

/// Default `STATUS?` poll period.
pub const DEFAULT_STATUS_POLL: Duration = Duration::from_secs(2);

/// Construction options for [`HeaterZone`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaterZoneOptions {
    /// Period of the `STATUS?` poll; zero disables polling.
    pub status_poll: Duration,
}

impl Default for HeaterZoneOptions {
    fn default() -> Self {
        Self {
            status_poll: DEFAULT_STATUS_POLL,
        }
    }
}

pub struct HeaterZone {
    zone_index: usize,
    channel: Arc<TextChannel>,
    state: ObservableValue<HeaterZoneSnapshot>,
    listening: Mutex<Option<Subscription>>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl HeaterZone {
    pub fn new(channel: Arc<TextChannel>, zone_index: usize) -> Self {
        Self::with_options(channel, zone_index, HeaterZoneOptions::default())
    }

    pub fn with_options(channel: Arc<TextChannel>, zone_index: usize, options: HeaterZoneOptions) -> Self {
        let state = ObservableValue::new(HeaterZoneSnapshot::default());

        let sink = state.clone();
        let listening = channel.listen(Box::new(move |line: &String| {
            match HeaterMessage::parse(line) {
                Some(message) => sink.update(|s| s.apply(&message)),
                None => debug!(zone = zone_index, line = %line, "unknown heater message"),
            }
        }));

        send_in_background(Arc::clone(&channel), HeaterCommand::RequestStatus.encode().into_bytes());
        let poller = spawn_status_poll(Arc::clone(&channel), zone_index, options.status_poll);

        Self {
            zone_index,
            channel,
            state,
            listening: Mutex::new(Some(listening)),
            poller: Mutex::new(poller),
        }
    }

    pub fn zone_index(&self) -> usize {
        self.zone_index
    }

    pub async fn get_status(&self) -> Result<(), ChannelError> {
        self.send(HeaterCommand::RequestStatus).await
    }

    pub async fn get_pid_config(&self) -> Result<(), ChannelError> {
        self.send(HeaterCommand::RequestPidConfig).await
    }

    pub async fn get_setpoint(&self) -> Result<(), ChannelError> {
        self.send(HeaterCommand::RequestSetpoint).await
    }

    /// Sets the target temperature, clamped to 0–50 °C and rounded to 0.1 °C.
    pub async fn set_setpoint(&self, celsius: f64) -> Result<(), ChannelError> {
        let tenths = setpoint_tenths(celsius);
        self.state.update(|s| HeaterZoneSnapshot {
            // tenths <= 500, exact in i32
            setpoint_celsius: from_tenths(tenths as i32),
            ..s.clone()
        });

        let result = self.send(HeaterCommand::SetSetpoint { tenths }).await;
        self.on_failure(&result, "Error: failed to update setpoint");
        result
    }

    pub async fn start(&self) -> Result<(), ChannelError> {
        self.switch(true, HeaterCommand::Start, "Error: failed to start heater").await
    }

    pub async fn stop(&self) -> Result<(), ChannelError> {
        self.switch(false, HeaterCommand::Stop, "Error: failed to stop heater").await
    }

    pub async fn set_pid_config(&self, pid: PidConfig) -> Result<(), ChannelError> {
        self.state.update(|s| HeaterZoneSnapshot {
            pid_config: Some(pid),
            ..s.clone()
        });

        let result = self.send(HeaterCommand::SetPidConfig(pid)).await;
        self.on_failure(&result, "Error: failed to update PID configuration");
        result
    }

    /// Stops polling and listening, then clears every subscriber.  Idempotent.
    pub fn dispose(&self) {
        if let Some(poller) = lock(&self.poller).take() {
            poller.abort();
        }
        if let Some(listening) = lock(&self.listening).take() {
            listening.unsubscribe();
        }
        self.state.destroy();
    }

    /// Flips the running flag, sends `command`, and puts the previous flag
    /// back if the write fails.
    async fn switch(&self, running: bool, command: HeaterCommand, failure: &str) -> Result<(), ChannelError> {
        let previous = self.state.get_value().running;
        self.state.update(|s| HeaterZoneSnapshot {
            running,
            ..s.clone()
        });

        let result = self.send(command).await;
        if let Err(e) = &result {
            warn!(zone = self.zone_index, error = %e, "heater {} failed", command.encode());
            self.state.update(|s| HeaterZoneSnapshot {
                running: previous,
                ..s.with_message(failure)
            });
        }
        result
    }

    fn on_failure(&self, result: &Result<(), ChannelError>, message: &str) {
        if let Err(e) = result {
            warn!(zone = self.zone_index, error = %e, "heater write failed");
            self.state.update(|s| s.with_message(message));
        }
    }

    async fn send(&self, command: HeaterCommand) -> Result<(), ChannelError> {
        self.channel.send(command.encode().as_bytes()).await
    }
}

/// Spawns the `STATUS?` poll.  Nothing is spawned for a zero period or
/// outside a tokio runtime.
fn spawn_status_poll(channel: Arc<TextChannel>, zone_index: usize, period: Duration) -> Option<JoinHandle<()>> {
    if period.is_zero() {
        return None;
    }
    let runtime = tokio::runtime::Handle::try_current().ok()?;

    Some(runtime.spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let request = HeaterCommand::RequestStatus.encode();
        loop {
            ticker.tick().await;
            match channel.send(request.as_bytes()).await {
                Ok(()) => {}
                Err(ChannelError::Closed) => {
                    debug!(zone = zone_index, "channel closed; status poll stopped");
                    break;
                }
                Err(e) => debug!(zone = zone_index, error = %e, "status poll failed"),
            }
        }
    }))
}

impl Observable<HeaterZoneSnapshot> for HeaterZone {
    fn get_value(&self) -> HeaterZoneSnapshot {
        self.state.get_value()
    }

    fn subscribe(&self, listener: Listener<HeaterZoneSnapshot>) -> Subscription {
        self.state.subscribe(listener)
    }
}

impl Drop for HeaterZone {
    fn drop(&mut self) {
        self.dispose();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{settle, FakeChannel};

    fn count(lines: &[String], wanted: &str) -> usize {
        lines.iter().filter(|l| l.as_str() == wanted).count()
    }

    #[tokio::test]
    async fn test_status_push_updates_snapshot() {
        // Arrange
        let channel = FakeChannel::<String>::new();
        let zone = HeaterZone::new(channel.clone(), 2);

        // Act
        channel.emit_line("STATUS:T=-15;SP=205;RUN=1");

        // Assert
        let s = zone.get_value();
        assert_eq!(s.temperature_celsius, -1.5);
        assert_eq!(s.setpoint_celsius, 20.5);
        assert!(s.running);
        assert_eq!(zone.zone_index(), 2);
    }

    #[tokio::test]
    async fn test_set_setpoint_clamps_and_rounds() {
        let channel = FakeChannel::<String>::new();
        let zone = HeaterZone::new(channel.clone(), 0);

        zone.set_setpoint(21.26).await.unwrap();
        assert_eq!(zone.get_value().setpoint_celsius, 21.3);

        zone.set_setpoint(80.0).await.unwrap();
        assert_eq!(zone.get_value().setpoint_celsius, 50.0);

        zone.set_setpoint(-3.0).await.unwrap();
        let lines = channel.sent_lines();
        assert!(lines.contains(&"SP:213".to_string()));
        assert!(lines.contains(&"SP:500".to_string()));
        assert!(lines.contains(&"SP:0".to_string()));
    }

    #[tokio::test]
    async fn test_start_failure_reverts_flag() {
        // Arrange
        let channel = FakeChannel::<String>::failing();
        let zone = HeaterZone::new(channel.clone(), 1);

        // Act
        let result = zone.start().await;

        // Assert
        assert!(result.is_err());
        let s = zone.get_value();
        assert!(!s.running);
        assert_eq!(s.last_message.as_deref(), Some("Error: failed to start heater"));
    }

    #[tokio::test]
    async fn test_stop_failure_restores_running() {
        let channel = FakeChannel::<String>::new();
        let zone = HeaterZone::new(channel.clone(), 1);
        zone.start().await.unwrap();
        channel.set_failing(true);

        assert!(zone.stop().await.is_err());

        assert!(zone.get_value().running);
        assert_eq!(zone.get_value().last_message.as_deref(), Some("Error: failed to stop heater"));
    }

    #[tokio::test]
    async fn test_set_pid_config_encodes_hundredths() {
        let channel = FakeChannel::<String>::new();
        let zone = HeaterZone::new(channel.clone(), 0);
        let pid = PidConfig { kp: 10.0, ki: 0.1, kd: 0.55 };

        zone.set_pid_config(pid).await.unwrap();

        assert_eq!(zone.get_value().pid_config, Some(pid));
        assert!(channel.sent_lines().contains(&"CFG:KP=1000;KI=10;KD=55".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_status_until_disposed() {
        // Arrange
        let channel = FakeChannel::<String>::new();
        let zone = HeaterZone::with_options(
            channel.clone(),
            0,
            HeaterZoneOptions { status_poll: Duration::from_secs(2) },
        );
        settle().await;
        assert_eq!(count(&channel.sent_lines(), "STATUS?"), 1);

        // Act
        tokio::time::sleep(Duration::from_millis(4_100)).await;
        settle().await;
        let while_alive = count(&channel.sent_lines(), "STATUS?");
        zone.dispose();
        tokio::time::sleep(Duration::from_secs(10)).await;
        settle().await;

        // Assert
        assert_eq!(while_alive, 3);
        assert_eq!(count(&channel.sent_lines(), "STATUS?"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_disables_polling() {
        let channel = FakeChannel::<String>::new();
        let _zone = HeaterZone::with_options(
            channel.clone(),
            0,
            HeaterZoneOptions { status_poll: Duration::ZERO },
        );

        tokio::time::sleep(Duration::from_secs(10)).await;
        settle().await;

        assert_eq!(count(&channel.sent_lines(), "STATUS?"), 1);
    }
}

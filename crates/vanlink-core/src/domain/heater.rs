//! Heater zone state.

use serde::Serialize;

use crate::protocol::text::heater::{HeaterMessage, PidConfig};

/// Setpoint shown before the zone reports its own.
pub const DEFAULT_SETPOINT_CELSIUS: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaterZoneSnapshot {
    pub temperature_celsius: f64,
    pub setpoint_celsius: f64,
    pub running: bool,
    pub pid_config: Option<PidConfig>,
    pub last_message: Option<String>,
}

impl Default for HeaterZoneSnapshot {
    fn default() -> Self {
        Self {
            temperature_celsius: 0.0,
            setpoint_celsius: DEFAULT_SETPOINT_CELSIUS,
            running: false,
            pid_config: None,
            last_message: None,
        }
    }
}

impl HeaterZoneSnapshot {
    pub fn apply(&self, message: &HeaterMessage) -> Self {
        let mut next = self.clone();
        match message {
            HeaterMessage::Status(status) => {
                next.temperature_celsius = status.temperature_celsius;
                next.setpoint_celsius = status.setpoint_celsius;
                next.running = status.running;
            }
            HeaterMessage::Setpoint(celsius) => next.setpoint_celsius = *celsius,
            HeaterMessage::PidConfig(pid) => next.pid_config = Some(*pid),
            HeaterMessage::Ok => next.last_message = Some("OK".to_string()),
            HeaterMessage::Error(code) => next.last_message = Some(format!("Error: {code}")),
        }
        next
    }

    pub fn with_message(&self, message: &str) -> Self {
        Self {
            last_message: Some(message.to_string()),
            ..self.clone()
        }
    }
}

//! Cabin and exterior environment readings.

use serde::Serialize;

use crate::protocol::text::environment::EnvironmentMessage;

/// Standard sea-level pressure shown before the first reading.
pub const DEFAULT_PRESSURE_HPA: f64 = 1013.25;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentSnapshot {
    pub temperature_celsius: f64,
    pub exterior_temperature_celsius: f64,
    pub humidity: f64,
    pub pressure_hpa: f64,
    pub last_message: Option<String>,
}

impl Default for EnvironmentSnapshot {
    fn default() -> Self {
        Self {
            temperature_celsius: 0.0,
            exterior_temperature_celsius: 0.0,
            humidity: 0.0,
            pressure_hpa: DEFAULT_PRESSURE_HPA,
            last_message: None,
        }
    }
}

impl EnvironmentSnapshot {
    pub fn apply(&self, message: &EnvironmentMessage) -> Self {
        match message {
            EnvironmentMessage::Reading(r) => Self {
                temperature_celsius: r.temperature_celsius,
                exterior_temperature_celsius: r.exterior_temperature_celsius,
                humidity: r.humidity,
                pressure_hpa: r.pressure_hpa,
                ..self.clone()
            },
            EnvironmentMessage::Error(code) => Self {
                last_message: Some(format!("Error: {code}")),
                ..self.clone()
            },
        }
    }
}

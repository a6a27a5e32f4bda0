//! Environment sensor lines (heater module).
//!
//! `ENV:T=<signed>;H=<unsigned>;P=<unsigned>;EXT=<signed>`, every value in
//! tenths.  `ENV?` requests a reading.

use super::{field, from_tenths, parse_ack, parse_signed, parse_unsigned, strip_tag, Ack};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentReading {
    pub temperature_celsius: f64,
    pub exterior_temperature_celsius: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
    pub pressure_hpa: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnvironmentMessage {
    Reading(EnvironmentReading),
    Error(String),
}

impl EnvironmentMessage {
    pub fn parse(line: &str) -> Option<Self> {
        if let Some(reading) = parse_environment(line) {
            return Some(Self::Reading(reading));
        }
        match parse_ack(line)? {
            Ack::Error(code) => Some(Self::Error(code)),
            Ack::Ok => None,
        }
    }
}

pub fn parse_environment(line: &str) -> Option<EnvironmentReading> {
    let body = strip_tag(line, "ENV:")?;
    let unsigned_tenths = |key: &str| -> Option<f64> {
        let raw = parse_unsigned(field(body, key)?)?;
        Some(f64::from(raw) / 10.0)
    };
    Some(EnvironmentReading {
        temperature_celsius: from_tenths(parse_signed(field(body, "T")?)?),
        humidity: unsigned_tenths("H")?,
        pressure_hpa: unsigned_tenths("P")?,
        exterior_temperature_celsius: from_tenths(parse_signed(field(body, "EXT")?)?),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentCommand {
    RequestEnvironment,
}

impl EnvironmentCommand {
    pub fn encode(&self) -> String {
        match self {
            Self::RequestEnvironment => "ENV?".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_environment_reading() {
        // Act
        let r = parse_environment("ENV:T=215;H=455;P=10132;EXT=-35").unwrap();

        // Assert
        assert_eq!(r.temperature_celsius, 21.5);
        assert_eq!(r.humidity, 45.5);
        assert_eq!(r.pressure_hpa, 1013.2);
        assert_eq!(r.exterior_temperature_celsius, -3.5);
    }

    #[test]
    fn test_parse_environment_requires_every_field() {
        assert!(parse_environment("ENV:T=215;H=455;P=10132").is_none());
        assert!(parse_environment("ENV:T=215;H=-1;P=10132;EXT=0").is_none());
    }

    #[test]
    fn test_error_token_is_a_message() {
        assert_eq!(
            EnvironmentMessage::parse("ERR_I2C"),
            Some(EnvironmentMessage::Error("ERR_I2C".into()))
        );
        assert_eq!(EnvironmentMessage::parse("OK"), None);
    }
}

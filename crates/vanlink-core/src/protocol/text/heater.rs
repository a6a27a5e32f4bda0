//! Heater zone lines.
//!
//! Temperatures and setpoints travel in tenths of a degree, PID gains in
//! hundredths.
//!
//! | Direction | Line |
//! |---|---|
//! | in  | `STATUS:T=<signed tenths>;SP=<tenths>;RUN=<0\|1>` |
//! | in  | `SP:<tenths>` |
//! | in  | `CFG:KP=<x100>;KI=<x100>;KD=<x100>` |
//! | in  | `OK`, `ERR_*` |
//! | out | `STATUS?`, `SP?`, `CFG?`, `SP:<tenths>`, `START`, `STOP`, `CFG:KP=..;KI=..;KD=..` |

use serde::{Deserialize, Serialize};

use super::{
    field, from_hundredths, from_tenths, parse_ack, parse_signed, parse_unsigned, strip_tag,
    to_hundredths, to_tenths, Ack,
};

/// Highest setpoint the regulator accepts, in tenths of a degree (50 °C).
pub const MAX_SETPOINT_TENTHS: u32 = 500;

/// PID regulator gains in real units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaterStatus {
    pub temperature_celsius: f64,
    pub setpoint_celsius: f64,
    pub running: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HeaterMessage {
    Status(HeaterStatus),
    Setpoint(f64),
    PidConfig(PidConfig),
    Ok,
    Error(String),
}

impl HeaterMessage {
    /// Tries status, then setpoint, then PID gains, then `OK`/`ERR_*`.
    pub fn parse(line: &str) -> Option<Self> {
        if let Some(status) = parse_status(line) {
            return Some(Self::Status(status));
        }
        if let Some(setpoint) = parse_setpoint(line) {
            return Some(Self::Setpoint(setpoint));
        }
        if let Some(pid) = parse_pid_config(line) {
            return Some(Self::PidConfig(pid));
        }
        parse_ack(line).map(|ack| match ack {
            Ack::Ok => Self::Ok,
            Ack::Error(code) => Self::Error(code),
        })
    }
}

pub fn parse_status(line: &str) -> Option<HeaterStatus> {
    let body = strip_tag(line, "STATUS:")?;
    let running = match field(body, "RUN")? {
        "0" => false,
        "1" => true,
        _ => return None,
    };
    Some(HeaterStatus {
        temperature_celsius: from_tenths(parse_signed(field(body, "T")?)?),
        setpoint_celsius: from_tenths(i32::try_from(parse_unsigned(field(body, "SP")?)?).ok()?),
        running,
    })
}

pub fn parse_setpoint(line: &str) -> Option<f64> {
    let tenths = parse_unsigned(strip_tag(line, "SP:")?)?;
    Some(f64::from(tenths) / 10.0)
}

pub fn parse_pid_config(line: &str) -> Option<PidConfig> {
    let body = strip_tag(line, "CFG:")?;
    Some(PidConfig {
        kp: from_hundredths(parse_unsigned(field(body, "KP")?)?),
        ki: from_hundredths(parse_unsigned(field(body, "KI")?)?),
        kd: from_hundredths(parse_unsigned(field(body, "KD")?)?),
    })
}

/// Rounds `celsius` to the nearest tenth and clamps it to `0..=50 °C`.
pub fn setpoint_tenths(celsius: f64) -> u32 {
    to_tenths(celsius).clamp(0, i64::from(MAX_SETPOINT_TENTHS)) as u32
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeaterCommand {
    RequestStatus,
    RequestSetpoint,
    RequestPidConfig,
    /// Setpoint already converted with [`setpoint_tenths`].
    SetSetpoint { tenths: u32 },
    Start,
    Stop,
    SetPidConfig(PidConfig),
}

impl HeaterCommand {
    pub fn encode(&self) -> String {
        match self {
            Self::RequestStatus => "STATUS?".to_string(),
            Self::RequestSetpoint => "SP?".to_string(),
            Self::RequestPidConfig => "CFG?".to_string(),
            Self::SetSetpoint { tenths } => format!("SP:{tenths}"),
            Self::Start => "START".to_string(),
            Self::Stop => "STOP".to_string(),
            Self::SetPidConfig(pid) => format!(
                "CFG:KP={};KI={};KD={}",
                to_hundredths(pid.kp),
                to_hundredths(pid.ki),
                to_hundredths(pid.kd)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_with_negative_temperature() {
        // Act
        let status = parse_status("STATUS:T=-45;SP=200;RUN=1").unwrap();

        // Assert
        assert_eq!(status.temperature_celsius, -4.5);
        assert_eq!(status.setpoint_celsius, 20.0);
        assert!(status.running);
    }

    #[test]
    fn test_parse_status_rejects_bad_run_flag() {
        assert!(parse_status("STATUS:T=10;SP=200;RUN=2").is_none());
        assert!(parse_status("STATUS:T=10;SP=200").is_none());
    }

    #[test]
    fn test_message_priority_order() {
        assert!(matches!(
            HeaterMessage::parse("STATUS:T=225;SP=200;RUN=0"),
            Some(HeaterMessage::Status(_))
        ));
        assert_eq!(HeaterMessage::parse("SP:205"), Some(HeaterMessage::Setpoint(20.5)));
        assert_eq!(
            HeaterMessage::parse("CFG:KP=1000;KI=10;KD=50"),
            Some(HeaterMessage::PidConfig(PidConfig { kp: 10.0, ki: 0.1, kd: 0.5 }))
        );
        assert_eq!(HeaterMessage::parse("OK"), Some(HeaterMessage::Ok));
        assert_eq!(
            HeaterMessage::parse("ERR_SENSOR"),
            Some(HeaterMessage::Error("ERR_SENSOR".into()))
        );
        assert_eq!(HeaterMessage::parse("SP:-5"), None);
        assert_eq!(HeaterMessage::parse("CFG:KP=1;KI=2"), None);
    }

    #[test]
    fn test_setpoint_tenths_rounds_and_clamps() {
        assert_eq!(setpoint_tenths(22.46), 225);
        assert_eq!(setpoint_tenths(-3.0), 0);
        assert_eq!(setpoint_tenths(80.0), 500);
        assert_eq!(setpoint_tenths(f64::NAN), 0);
    }

    #[test]
    fn test_encode_pid_config_rounds_gains() {
        // Arrange
        let cmd = HeaterCommand::SetPidConfig(PidConfig { kp: 12.5, ki: 0.256, kd: 0.0 });

        // Act / Assert
        assert_eq!(cmd.encode(), "CFG:KP=1250;KI=26;KD=0");
    }

    #[test]
    fn test_encode_simple_commands() {
        assert_eq!(HeaterCommand::RequestStatus.encode(), "STATUS?");
        assert_eq!(HeaterCommand::SetSetpoint { tenths: 215 }.encode(), "SP:215");
        assert_eq!(HeaterCommand::Start.encode(), "START");
        assert_eq!(HeaterCommand::Stop.encode(), "STOP");
    }
}

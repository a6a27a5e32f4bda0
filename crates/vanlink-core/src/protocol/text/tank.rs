//! Tank level sensor lines.
//!
//! | Direction | Line | Meaning |
//! |---|---|---|
//! | in  | `CFG:V=<litres>;H=<mm>` | stored tank geometry (`;` or space separated) |
//! | in  | `<mm>` | distance from sensor to water surface |
//! | in  | `OK` | configuration stored |
//! | out | `CFG?` | request geometry |
//! | out | `CFG:V=<litres>;H=<mm>` | store geometry |

use serde::{Deserialize, Serialize};

use super::{field, parse_ack, parse_unsigned, strip_tag, Ack};

/// Tank geometry as stored by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TankConfig {
    pub volume_liters: u32,
    pub height_mm: u32,
}

/// Every line a tank sensor sends, in parse priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TankMessage {
    Config(TankConfig),
    Distance(u32),
    Ok,
}

impl TankMessage {
    pub fn parse(line: &str) -> Option<Self> {
        if let Some(config) = parse_tank_config(line) {
            return Some(Self::Config(config));
        }
        if let Some(distance) = parse_distance(line) {
            return Some(Self::Distance(distance));
        }
        match parse_ack(line) {
            Some(Ack::Ok) => Some(Self::Ok),
            _ => None,
        }
    }
}

/// `CFG:V=<int>;H=<int>` → geometry.  Both keys are required.
pub fn parse_tank_config(line: &str) -> Option<TankConfig> {
    let body = strip_tag(line, "CFG:")?;
    Some(TankConfig {
        volume_liters: parse_unsigned(field(body, "V")?)?,
        height_mm: parse_unsigned(field(body, "H")?)?,
    })
}

/// A line made only of digits → distance in millimetres.
pub fn parse_distance(line: &str) -> Option<u32> {
    parse_unsigned(line.trim())
}

/// Commands accepted by a tank sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TankCommand {
    RequestConfig,
    SetConfig(TankConfig),
}

impl TankCommand {
    pub fn encode(&self) -> String {
        match self {
            Self::RequestConfig => "CFG?".to_string(),
            Self::SetConfig(c) => format!("CFG:V={};H={}", c.volume_liters, c.height_mm),
        }
    }
}

//! Grey-water drain valve lines.
//!
//! Inbound: `CFG:T=<secs>`, `COUNTDOWN:<secs>`, `CLOSED`, `AUTO_CLOSED`, `OK`,
//! `ERR_*`.  Outbound: `CFG?`, `CFG:T=<secs>`, `OPEN`, `CLOSE`.

use super::{field, parse_ack, parse_unsigned, strip_tag, Ack};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValveMessage {
    /// Auto-close delay in seconds.
    Config { auto_close_secs: u32 },
    /// Seconds left before the open valve closes itself.
    Countdown(u32),
    Closed,
    AutoClosed,
    Ok,
    Error(String),
}

impl ValveMessage {
    pub fn parse(line: &str) -> Option<Self> {
        if let Some(body) = strip_tag(line, "CFG:") {
            return parse_unsigned(field(body, "T")?)
                .map(|auto_close_secs| Self::Config { auto_close_secs });
        }
        if let Some(body) = strip_tag(line, "COUNTDOWN:") {
            return parse_unsigned(body).map(Self::Countdown);
        }
        match line.trim() {
            "CLOSED" => return Some(Self::Closed),
            "AUTO_CLOSED" => return Some(Self::AutoClosed),
            _ => {}
        }
        parse_ack(line).map(|ack| match ack {
            Ack::Ok => Self::Ok,
            Ack::Error(code) => Self::Error(code),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveCommand {
    RequestConfig,
    SetAutoClose(u32),
    Open,
    Close,
}

impl ValveCommand {
    pub fn encode(&self) -> String {
        match self {
            Self::RequestConfig => "CFG?".to_string(),
            Self::SetAutoClose(secs) => format!("CFG:T={secs}"),
            Self::Open => "OPEN".to_string(),
            Self::Close => "CLOSE".to_string(),
        }
    }
}

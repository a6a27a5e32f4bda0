//! Admin channel lines shared by every module: rename and re-pin.
//!
//! The module answers `OK` (and then reboots) or an `ERR_*` token.

use super::{parse_ack, Ack};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    SetName(String),
    SetPin(String),
}

impl AdminCommand {
    pub fn encode(&self) -> String {
        match self {
            Self::SetName(name) => format!("NAME:{name}"),
            Self::SetPin(pin) => format!("PIN:{pin}"),
        }
    }
}

/// Admin replies are plain acknowledgements.
pub fn parse_admin_reply(line: &str) -> Option<Ack> {
    parse_ack(line)
}

//! Outcome of the last admin command.

use serde::Serialize;

use crate::protocol::text::admin::parse_admin_reply;
use crate::protocol::text::Ack;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdminSnapshot {
    /// The module accepted the last rename/re-pin and is rebooting.
    pub success: bool,
    /// Verbatim `ERR_*` token of the last rejected command.
    pub error: Option<String>,
}

impl AdminSnapshot {
    /// Every admin reply replaces both fields.
    pub fn from_reply(line: &str) -> Self {
        match parse_admin_reply(line) {
            Some(Ack::Ok) => Self { success: true, error: None },
            Some(Ack::Error(code)) => Self { success: false, error: Some(code) },
            None => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_reply() {
        assert_eq!(
            AdminSnapshot::from_reply("OK\r"),
            AdminSnapshot { success: true, error: None }
        );
        assert_eq!(
            AdminSnapshot::from_reply("ERR_PIN_FORMAT"),
            AdminSnapshot { success: false, error: Some("ERR_PIN_FORMAT".into()) }
        );
        assert_eq!(AdminSnapshot::from_reply("noise"), AdminSnapshot::default());
    }
}

//! Drain valve state.

use serde::Serialize;

use crate::protocol::text::valve::ValveMessage;

/// Auto-close delay assumed until the valve reports its own.
pub const DEFAULT_AUTO_CLOSE_SECS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValvePosition {
    Open,
    Closed,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValveState {
    pub position: ValvePosition,
    pub auto_close_secs: u32,
    /// Countdown pushed by the valve while it is open.
    pub remaining_secs: u32,
    pub last_message: Option<String>,
}

impl Default for ValveState {
    fn default() -> Self {
        Self::with_auto_close(DEFAULT_AUTO_CLOSE_SECS)
    }
}

impl ValveState {
    pub fn with_auto_close(auto_close_secs: u32) -> Self {
        Self {
            position: ValvePosition::Unknown,
            auto_close_secs,
            remaining_secs: 0,
            last_message: None,
        }
    }

    /// Optimistic state for an `OPEN` command: the countdown starts at the
    /// configured auto-close delay.
    pub fn opening(&self) -> Self {
        Self {
            position: ValvePosition::Open,
            remaining_secs: self.auto_close_secs,
            ..self.clone()
        }
    }

    /// Optimistic state for a `CLOSE` command.
    pub fn closing(&self) -> Self {
        Self {
            position: ValvePosition::Closed,
            remaining_secs: 0,
            ..self.clone()
        }
    }

    pub fn apply(&self, message: &ValveMessage) -> Self {
        let mut next = self.clone();
        match message {
            ValveMessage::Config { auto_close_secs } => next.auto_close_secs = *auto_close_secs,
            ValveMessage::Countdown(secs) => {
                next.position = ValvePosition::Open;
                next.remaining_secs = *secs;
            }
            // The valve's own report wins over any optimistic position.
            ValveMessage::Closed | ValveMessage::AutoClosed => return self.closing(),
            ValveMessage::Ok => next.last_message = Some("Configuration saved".to_string()),
            ValveMessage::Error(code) => next.last_message = Some(format!("Error: {code}")),
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let s = ValveState::default();
        assert_eq!(s.position, ValvePosition::Unknown);
        assert_eq!(s.auto_close_secs, 30);
        assert_eq!(s.remaining_secs, 0);
    }

    #[test]
    fn test_opening_seeds_countdown_from_auto_close() {
        let s = ValveState::default()
            .apply(&ValveMessage::Config { auto_close_secs: 90 })
            .opening();
        assert_eq!(s.position, ValvePosition::Open);
        assert_eq!(s.remaining_secs, 90);
    }

    #[test]
    fn test_countdown_forces_open() {
        let s = ValveState::default().closing().apply(&ValveMessage::Countdown(7));
        assert_eq!(s.position, ValvePosition::Open);
        assert_eq!(s.remaining_secs, 7);
    }

    #[test]
    fn test_auto_closed_overrides_optimistic_open() {
        let s = ValveState::default().opening().apply(&ValveMessage::AutoClosed);
        assert_eq!(s.position, ValvePosition::Closed);
        assert_eq!(s.remaining_secs, 0);
    }

    #[test]
    fn test_acknowledgements_become_messages() {
        let ok = ValveState::default().apply(&ValveMessage::Ok);
        let err = ValveState::default().apply(&ValveMessage::Error("ERR_JAM".into()));
        assert_eq!(ok.last_message.as_deref(), Some("Configuration saved"));
        assert_eq!(err.last_message.as_deref(), Some("Error: ERR_JAM"));
    }
}

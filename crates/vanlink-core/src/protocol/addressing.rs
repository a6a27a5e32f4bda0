//! Logical addressing of peripheral endpoints.
//!
//! Every Vanlink module exposes one service; each function inside it (admin,
//! a tank, a heater zone, ...) is a *channel* made of two characteristics: one
//! the module notifies on and one the phone writes to.  Both are derived from
//! a 16-bit service id and a 16-bit channel id under a common root:
//!
//! ```text
//! service  b1f8707e-<svc>-0000-0000-000000000000
//! notify   b1f8707e-<svc>-<ch>-0000-000000000000
//! write    b1f8707e-<svc>-<ch>-0000-000000000001
//! ```
//!
//! The battery BMS is third-party hardware and uses a fixed serial-style
//! service with a single characteristic for both directions.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// First 32 bits shared by every Vanlink endpoint.
pub const UUID_ROOT: u32 = 0xb1f8_707e;

/// Errors produced when parsing textual ids.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// The id is not exactly four hexadecimal digits.
    #[error("invalid endpoint id {0:?}: expected 4 hex digits")]
    InvalidId(String),
}

/// How writes to a channel must be issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WriteMode {
    /// The link waits for the peripheral to acknowledge the write.
    WithResponse,
    /// Fire-and-forget write.
    WithoutResponse,
}

/// The three endpoints of one logical channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelAddress {
    pub service: Uuid,
    /// Characteristic the peripheral notifies on.
    pub notify: Uuid,
    /// Characteristic the phone writes to.
    pub write: Uuid,
    pub write_mode: WriteMode,
}

impl ChannelAddress {
    /// Derives the endpoints of `channel_id` within `service_id`.
    pub fn new(service_id: u16, channel_id: u16) -> Self {
        Self {
            service: service_uuid(service_id),
            notify: endpoint_uuid(service_id, channel_id, 0),
            write: endpoint_uuid(service_id, channel_id, 1),
            write_mode: WriteMode::WithResponse,
        }
    }

    /// Same as [`ChannelAddress::new`] but from hex strings such as `"0002"`.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::InvalidId`] unless both ids are four hex digits.
    pub fn parse(service_id: &str, channel_id: &str) -> Result<Self, AddressError> {
        Ok(Self::new(parse_id(service_id)?, parse_id(channel_id)?))
    }

    /// The battery BMS serial service: one characteristic, unacknowledged writes.
    pub fn battery() -> Self {
        let characteristic = Uuid::from_u128(BATTERY_CHARACTERISTIC);
        Self {
            service: Uuid::from_u128(BATTERY_SERVICE),
            notify: characteristic,
            write: characteristic,
            write_mode: WriteMode::WithoutResponse,
        }
    }
}

/// Service UUID advertised by a module, used when scanning.
pub fn service_uuid(service_id: u16) -> Uuid {
    Uuid::from_u128((u128::from(UUID_ROOT) << 96) | (u128::from(service_id) << 80))
}

fn endpoint_uuid(service_id: u16, channel_id: u16, suffix: u64) -> Uuid {
    Uuid::from_u128(
        (u128::from(UUID_ROOT) << 96)
            | (u128::from(service_id) << 80)
            | (u128::from(channel_id) << 64)
            | u128::from(suffix),
    )
}

fn parse_id(id: &str) -> Result<u16, AddressError> {
    if id.len() != 4 || !id.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AddressError::InvalidId(id.to_string()));
    }
    u16::from_str_radix(id, 16).map_err(|_| AddressError::InvalidId(id.to_string()))
}

// ── Well-known ids ────────────────────────────────────────────────────────────

const BATTERY_SERVICE: u128 = 0x0000ffe0_0000_1000_8000_00805f9b34fb;
const BATTERY_CHARACTERISTIC: u128 = 0x0000ffe1_0000_1000_8000_00805f9b34fb;

/// Channel ids of the water module.
pub mod water {
    pub const SERVICE: u16 = 0x0001;
    pub const ADMIN: u16 = 0x0001;
    pub const CLEAN_TANK: u16 = 0x0002;
    pub const GREY_TANK: u16 = 0x0003;
    pub const GREY_VALVE: u16 = 0x0004;
}

/// Channel ids of the heater module.
pub mod heater {
    pub const SERVICE: u16 = 0x0002;
    pub const ADMIN: u16 = 0x0001;
    /// Zone `n` (0-based) lives on channel `ZONE_BASE + n`.
    pub const ZONE_BASE: u16 = 0x0002;
    pub const ZONE_COUNT: usize = 4;
    pub const ENVIRONMENT: u16 = 0x0006;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_address_layout() {
        // Act
        let addr = ChannelAddress::new(heater::SERVICE, heater::ZONE_BASE + 1);

        // Assert
        assert_eq!(addr.service.to_string(), "b1f8707e-0002-0000-0000-000000000000");
        assert_eq!(addr.notify.to_string(), "b1f8707e-0002-0003-0000-000000000000");
        assert_eq!(addr.write.to_string(), "b1f8707e-0002-0003-0000-000000000001");
        assert_eq!(addr.write_mode, WriteMode::WithResponse);
    }

    #[test]
    fn test_parse_matches_numeric_ids() {
        assert_eq!(
            ChannelAddress::parse("0001", "00a4"),
            Ok(ChannelAddress::new(0x0001, 0x00a4))
        );
    }

    #[test]
    fn test_parse_rejects_bad_ids() {
        assert_eq!(
            ChannelAddress::parse("1", "0001"),
            Err(AddressError::InvalidId("1".into()))
        );
        assert!(ChannelAddress::parse("0001", "00g1").is_err());
        assert!(ChannelAddress::parse("+001", "0001").is_err());
    }

    #[test]
    fn test_battery_uses_one_characteristic() {
        let addr = ChannelAddress::battery();
        assert_eq!(addr.notify, addr.write);
        assert_eq!(addr.notify.to_string(), "0000ffe1-0000-1000-8000-00805f9b34fb");
        assert_eq!(addr.write_mode, WriteMode::WithoutResponse);
    }
}

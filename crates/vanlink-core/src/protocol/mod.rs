//! Wire formats spoken by the van peripherals.
//!
//! - [`bms`] – binary frames exchanged with the battery-management system.
//! - [`text`] – newline-terminated ASCII lines used by the water and heater modules.
//! - [`addressing`] – how a logical (service, channel) pair maps onto the
//!   notify/write endpoints of the radio link.

pub mod addressing;
pub mod bms;
pub mod text;

pub use addressing::{AddressError, ChannelAddress, WriteMode};
pub use bms::{
    build_read_all_command, checksum_matches, find_frame_start, has_complete_frame,
    parse_response, BmsTelemetry,
};

//! Binary frame codec for the battery-management system (BMS).
//!
//! Wire format:
//! ```text
//! [magic:2 = 4E 57][length:2][terminal:4][cmd:1][source:1][type:1][payload:N][record:4][end:1 = 68][checksum:4]
//! ```
//! `length` counts every byte after the magic, so a complete frame is
//! `length + 2` bytes long.  The checksum is the 32-bit wrapping sum of every
//! byte before it.  All multi-byte integers are big-endian.
//!
//! The payload is a flat sequence of tag-prefixed fields whose widths are
//! implied by the tag.  Parsing never fails on a malformed payload: unknown
//! tags advance the cursor by a single byte and a truncated field ends the walk
//! with whatever was decoded so far.

use serde::Serialize;

// ── Frame layout constants ────────────────────────────────────────────────────

/// Two-byte magic ("NW") at the start of every frame.
pub const FRAME_MAGIC: [u8; 2] = [0x4E, 0x57];

/// Terminator byte placed between the record number and the checksum.
pub const FRAME_END: u8 = 0x68;

/// Smallest buffer that can hold a complete frame.
pub const MIN_FRAME_LEN: usize = 20;

/// Magic + length + terminal id + command + source + type.
pub const HEADER_LEN: usize = 11;

/// Record number + terminator + checksum.
pub const TRAILER_LEN: usize = 9;

/// Command code: read every data field.
pub const CMD_READ_ALL: u8 = 0x06;

/// Frame source: a bluetooth transmitter (the phone).
pub const SOURCE_BLUETOOTH: u8 = 0x01;

/// Transport type: request.
pub const TYPE_REQUEST: u8 = 0x00;

/// Payload tag bytes.
pub mod tag {
    pub const CELL_VOLTAGES: u8 = 0x79;
    pub const MOS_TEMP: u8 = 0x80;
    pub const TEMP_SENSOR_1: u8 = 0x81;
    pub const TEMP_SENSOR_2: u8 = 0x82;
    pub const TOTAL_VOLTAGE: u8 = 0x83;
    pub const CURRENT: u8 = 0x84;
    pub const SOC: u8 = 0x85;
    pub const TEMP_SENSOR_COUNT: u8 = 0x86;
    pub const CYCLE_COUNT: u8 = 0x87;
    pub const TOTAL_CYCLE_CAPACITY: u8 = 0x89;
    pub const CELL_COUNT: u8 = 0x8A;
    pub const BALANCE_CURRENT: u8 = 0x8B;
    pub const BALANCE_STATE: u8 = 0x8C;
    pub const BATTERY_ERRORS: u8 = 0x8E;
    pub const CHARGE_MOSFET: u8 = 0x8F;
    pub const DISCHARGE_MOSFET: u8 = 0x90;
    pub const CAPACITY_AH: u8 = 0x91;
}

/// Raw values decoded from one BMS response frame.
///
/// Units are already converted: volts, amps, degrees Celsius, amp-hours.
/// Fields absent from the frame keep their zero value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BmsTelemetry {
    /// Per-cell voltage in volts; index `n` holds cell number `n + 1`.
    /// Cells the frame did not report read as `0.0`.
    pub cell_voltages: Vec<f64>,
    pub cell_count: u16,
    pub total_voltage: f64,
    /// Positive while charging, negative while discharging.
    pub current: f64,
    pub soc: u8,
    pub temp_mos: i32,
    pub temp_sensor_1: i32,
    pub temp_sensor_2: i32,
    pub cycle_count: u16,
    pub capacity_ah: f64,
    pub balance_current: f64,
    /// Bitmask of cells currently being balanced.
    pub balance_state: u64,
    pub charge_mosfet: bool,
    pub discharge_mosfet: bool,
    /// Alarm bitmask, see [`crate::domain::battery::BatteryAlarm`].
    pub errors: u16,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Builds a complete frame around `payload`, filling in the length field and
/// appending the record number, terminator and checksum.
///
/// The terminal id and record number are always zero.
pub fn encode_frame(command: u8, source: u8, frame_type: u8, payload: &[u8]) -> Vec<u8> {
    let total = HEADER_LEN + payload.len() + TRAILER_LEN;
    let declared = (total - FRAME_MAGIC.len()) as u16;

    let mut frame = Vec::with_capacity(total);
    frame.extend_from_slice(&FRAME_MAGIC);
    frame.extend_from_slice(&declared.to_be_bytes());
    frame.extend_from_slice(&[0u8; 4]);
    frame.extend_from_slice(&[command, source, frame_type]);
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&[0u8; 4]);
    frame.push(FRAME_END);

    let sum = checksum(&frame);
    frame.extend_from_slice(&sum.to_be_bytes());
    frame
}

/// Builds the fixed 20-byte "read all data" request.
///
/// # Examples
///
/// ```rust
/// use vanlink_core::protocol::bms::{build_read_all_command, has_complete_frame};
///
/// let frame = build_read_all_command();
/// assert_eq!(frame.len(), 20);
/// assert!(has_complete_frame(&frame));
/// ```
pub fn build_read_all_command() -> Vec<u8> {
    encode_frame(CMD_READ_ALL, SOURCE_BLUETOOTH, TYPE_REQUEST, &[])
}

/// 32-bit wrapping sum of `bytes`.
pub fn checksum(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |acc, &b| acc.wrapping_add(u32::from(b)))
}

/// Returns `true` when the trailing four bytes of `frame` equal the sum of
/// everything before them.
pub fn checksum_matches(frame: &[u8]) -> bool {
    if frame.len() < 4 {
        return false;
    }
    let (body, tail) = frame.split_at(frame.len() - 4);
    let stored = u32::from_be_bytes([tail[0], tail[1], tail[2], tail[3]]);
    checksum(body) == stored
}

/// Offset of the first magic sequence in `buffer`, if any.
pub fn find_frame_start(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == FRAME_MAGIC)
}

/// Total size in bytes (`declared length + 2`) of the frame starting at
/// offset 0, or `None` when the header has not arrived or the magic is wrong.
pub fn frame_len(buffer: &[u8]) -> Option<usize> {
    if buffer.len() < 4 || buffer[..2] != FRAME_MAGIC {
        return None;
    }
    let declared = u16::from_be_bytes([buffer[2], buffer[3]]) as usize;
    Some(declared + FRAME_MAGIC.len())
}

/// Returns `true` only when `buffer` starts with a frame whose every declared
/// byte has arrived.
pub fn has_complete_frame(buffer: &[u8]) -> bool {
    if buffer.len() < MIN_FRAME_LEN {
        return false;
    }
    matches!(frame_len(buffer), Some(len) if buffer.len() >= len)
}

/// Decodes the response frame at the start of `buffer`.
///
/// Returns `None` when the buffer is shorter than [`MIN_FRAME_LEN`], the magic
/// does not match, the declared length has not fully arrived, or no terminator
/// follows the header.  The checksum is **not** verified here; use
/// [`checksum_matches`] for that.
pub fn parse_response(buffer: &[u8]) -> Option<BmsTelemetry> {
    if !has_complete_frame(buffer) {
        return None;
    }
    let frame = &buffer[..frame_len(buffer)?];
    let end = terminator_index(frame)?;

    // The payload stops where the 4-byte record number begins.
    let payload = if end >= HEADER_LEN + 4 {
        &frame[HEADER_LEN..end - 4]
    } else {
        &[]
    };
    Some(parse_payload(payload))
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Locates the terminator.  A well-formed frame carries it exactly five bytes
/// from the end; otherwise fall back to the first `0x68` after the header.
fn terminator_index(frame: &[u8]) -> Option<usize> {
    let expected = frame.len().checked_sub(5)?;
    if expected >= HEADER_LEN && frame[expected] == FRAME_END {
        return Some(expected);
    }
    frame[HEADER_LEN.min(frame.len())..]
        .iter()
        .position(|&b| b == FRAME_END)
        .map(|pos| pos + HEADER_LEN)
}

/// Cursor over the tag-encoded payload.  Every read is bounds-checked.
struct PayloadReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn u8(&mut self) -> Option<u8> {
        let b = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    fn u16(&mut self) -> Option<u16> {
        let bytes = self.data.get(self.pos..self.pos + 2)?;
        self.pos += 2;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Option<u32> {
        let bytes = self.data.get(self.pos..self.pos + 4)?;
        self.pos += 4;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn skip(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n);
    }
}

fn parse_payload(payload: &[u8]) -> BmsTelemetry {
    let mut telemetry = BmsTelemetry::default();
    let mut reader = PayloadReader::new(payload);

    while !reader.is_empty() {
        // A truncated field simply ends the walk.
        if read_field(&mut reader, &mut telemetry).is_none() {
            break;
        }
    }
    telemetry
}

fn read_field(reader: &mut PayloadReader<'_>, t: &mut BmsTelemetry) -> Option<()> {
    match reader.u8()? {
        tag::CELL_VOLTAGES => {
            let cells = reader.u8()? / 3;
            t.cell_voltages.clear();
            for _ in 0..cells {
                let index = reader.u8()? as usize;
                let millivolts = reader.u16()?;
                // Cell numbers are 1-based; cell 0 has no slot.
                if index == 0 {
                    continue;
                }
                if t.cell_voltages.len() < index {
                    t.cell_voltages.resize(index, 0.0);
                }
                t.cell_voltages[index - 1] = f64::from(millivolts) / 1000.0;
            }
            t.cell_count = u16::from(cells);
        }
        tag::MOS_TEMP => t.temp_mos = i32::from(reader.u16()?) - 100,
        tag::TEMP_SENSOR_1 => t.temp_sensor_1 = i32::from(reader.u16()?) - 100,
        tag::TEMP_SENSOR_2 => t.temp_sensor_2 = i32::from(reader.u16()?) - 100,
        tag::TOTAL_VOLTAGE => t.total_voltage = f64::from(reader.u16()?) / 100.0,
        tag::CURRENT => {
            let raw = reader.u16()?;
            let magnitude = f64::from(raw & 0x7FFF) / 100.0;
            t.current = if raw & 0x8000 != 0 { -magnitude } else { magnitude };
        }
        tag::SOC => t.soc = reader.u8()?,
        tag::TEMP_SENSOR_COUNT => reader.skip(1),
        tag::CYCLE_COUNT => t.cycle_count = reader.u16()?,
        tag::TOTAL_CYCLE_CAPACITY => reader.skip(4),
        tag::CELL_COUNT => t.cell_count = reader.u16()?,
        tag::BALANCE_CURRENT => t.balance_current = f64::from(reader.u16()?) / 1000.0,
        tag::BALANCE_STATE => {
            let width = match (t.cell_count as usize).div_ceil(8) {
                0 => 2,
                n => n,
            };
            t.balance_state = 0;
            for i in 0..width {
                let Some(b) = reader.u8() else { break };
                if i < 8 {
                    t.balance_state |= u64::from(b) << (i * 8);
                }
            }
        }
        tag::BATTERY_ERRORS => t.errors = reader.u16()?,
        tag::CHARGE_MOSFET => t.charge_mosfet = reader.u8()? == 1,
        tag::DISCHARGE_MOSFET => t.discharge_mosfet = reader.u8()? == 1,
        tag::CAPACITY_AH => t.capacity_ah = f64::from(reader.u32()?) / 1000.0,
        // Unknown tag: width is not known, move on by one byte.
        _ => {}
    }
    Some(())
}

// ── Unit tests ────────────────────────────────────────────────────────────────

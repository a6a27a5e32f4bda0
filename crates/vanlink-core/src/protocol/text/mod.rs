//! Line-oriented ASCII protocols spoken by the water and heater modules.
//!
//! Every message is one line such as `STATUS:T=215;SP=200;RUN=1`: an optional
//! `TAG:` prefix followed by `KEY=value` pairs separated by `;` (spaces are
//! accepted too), a bare number, or a bare status token (`OK`, `ERR_*`).
//! Numbers travel as fixed-point integers (tenths or hundredths) so that no
//! floating point ever crosses the wire.
//!
//! Parsers take one line without its `\n`, tolerate surrounding whitespace,
//! and return `None` for anything they do not recognise.  Command encoders
//! produce the bare line; the transport adds no terminator on the way out.

pub mod admin;
pub mod environment;
pub mod heater;
pub mod tank;
pub mod valve;

use serde::Serialize;

/// A bare acknowledgement (`OK`) or error token (`ERR_*`) sent by a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Ack {
    Ok,
    /// The whole error token, e.g. `ERR_RANGE`.
    Error(String),
}

/// Parses `OK` or any `ERR_*` token.
pub fn parse_ack(line: &str) -> Option<Ack> {
    let line = line.trim();
    if line == "OK" {
        Some(Ack::Ok)
    } else if line.starts_with("ERR_") {
        Some(Ack::Error(line.to_string()))
    } else {
        None
    }
}

// ── Fixed-point helpers ───────────────────────────────────────────────────────

pub fn from_tenths(raw: i32) -> f64 {
    f64::from(raw) / 10.0
}

pub fn from_hundredths(raw: u32) -> f64 {
    f64::from(raw) / 100.0
}

/// Multiplies by 10 and rounds to the nearest integer.
pub fn to_tenths(value: f64) -> i64 {
    (value * 10.0).round() as i64
}

/// Multiplies by 100 and rounds to the nearest integer.
pub fn to_hundredths(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

// ── Shared field scanning ─────────────────────────────────────────────────────

/// Returns the body after `tag` (e.g. `"CFG:"`) on a trimmed line.
pub(crate) fn strip_tag<'a>(line: &'a str, tag: &str) -> Option<&'a str> {
    line.trim().strip_prefix(tag)
}

/// Value of `key` in a `K=v;K=v` (or space separated) body.  Keys match
/// exactly, so `T` never matches inside `EXT`.
pub(crate) fn field<'a>(body: &'a str, key: &str) -> Option<&'a str> {
    body.split(|c: char| c == ';' || c.is_whitespace())
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

/// Non-empty run of ASCII digits.
pub(crate) fn parse_unsigned(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Optional leading `-` followed by ASCII digits.
pub(crate) fn parse_signed(s: &str) -> Option<i32> {
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let magnitude = i32::try_from(parse_unsigned(digits)?).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

//! Capture files replayed into a [`MemoryLink`].
//!
//! A capture records what a peripheral sent, chunk by chunk, exactly as the
//! radio delivered it.  Text chunks are written verbatim (escape the
//! newlines); binary chunks as hex:
//!
//! ```toml
//! device_id = "C4:DE:E2:19:0A:41"
//! device_name = "Vanlink Heater"
//!
//! [[chunk]]
//! channel = "zone0"
//! text = "STATUS:T=215;SP=200;RUN=1\n"
//!
//! [[chunk]]
//! channel = "environment"
//! text = "ENV:T=215;H=450;P=10130;EXT=-20\n"
//! ```
//!
//! Channel names per family:
//! - water: `admin`, `clean_tank`, `grey_tank`, `grey_valve`
//! - heater: `admin`, `zone0` to `zone3`, `environment`
//! - battery: `bms`

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use vanlink_core::protocol::addressing::{heater, water};
use vanlink_core::ChannelAddress;

use super::link::memory::MemoryLink;
use super::storage::ModuleKey;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("I/O error reading capture {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse capture TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("chunk {index}: no channel {channel:?} on the {family:?} module")]
    UnknownChannel {
        index: usize,
        family: Family,
        channel: String,
    },

    #[error("chunk {index}: invalid hex payload: {source}")]
    Hex {
        index: usize,
        #[source]
        source: hex::FromHexError,
    },

    #[error("chunk {index}: exactly one of `text` or `hex` is required")]
    Payload { index: usize },
}

/// Peripheral family a capture was recorded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Family {
    Water,
    Heater,
    Battery,
}

impl From<Family> for ModuleKey {
    fn from(family: Family) -> Self {
        match family {
            Family::Water => ModuleKey::Water,
            Family::Heater => ModuleKey::Heater,
            Family::Battery => ModuleKey::Battery,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Capture {
    pub device_id: String,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default, rename = "chunk")]
    pub chunks: Vec<CaptureChunk>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CaptureChunk {
    pub channel: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub hex: Option<String>,
}

impl CaptureChunk {
    fn payload(&self, index: usize) -> Result<Vec<u8>, ReplayError> {
        match (&self.text, &self.hex) {
            (Some(text), None) => Ok(text.as_bytes().to_vec()),
            (None, Some(encoded)) => {
                let compact: String = encoded.split_whitespace().collect();
                hex::decode(compact).map_err(|source| ReplayError::Hex { index, source })
            }
            _ => Err(ReplayError::Payload { index }),
        }
    }
}

/// Counts from one replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub chunks: usize,
    pub bytes: usize,
    /// Chunks that reached at least one monitor.
    pub delivered: usize,
}

pub fn parse_capture(content: &str) -> Result<Capture, ReplayError> {
    Ok(toml::from_str(content)?)
}

pub fn load_capture(path: &Path) -> Result<Capture, ReplayError> {
    let content = std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_capture(&content)
}

/// Endpoints of the channel named `name` on a `family` module.
pub fn channel_address(family: Family, name: &str) -> Option<ChannelAddress> {
    match family {
        Family::Water => {
            let channel = match name {
                "admin" => water::ADMIN,
                "clean_tank" => water::CLEAN_TANK,
                "grey_tank" => water::GREY_TANK,
                "grey_valve" => water::GREY_VALVE,
                _ => return None,
            };
            Some(ChannelAddress::new(water::SERVICE, channel))
        }
        Family::Heater => {
            let channel = match name {
                "admin" => heater::ADMIN,
                "environment" => heater::ENVIRONMENT,
                zone => {
                    let index: u16 = zone.strip_prefix("zone")?.parse().ok()?;
                    if usize::from(index) >= heater::ZONE_COUNT {
                        return None;
                    }
                    heater::ZONE_BASE + index
                }
            };
            Some(ChannelAddress::new(heater::SERVICE, channel))
        }
        Family::Battery => (name == "bms").then(ChannelAddress::battery),
    }
}

/// Resolves and decodes every chunk, then pushes them into `link` in order.
/// Nothing is delivered when any chunk is invalid.
pub fn replay(link: &MemoryLink, family: Family, capture: &Capture) -> Result<ReplayStats, ReplayError> {
    let mut resolved = Vec::with_capacity(capture.chunks.len());
    for (index, chunk) in capture.chunks.iter().enumerate() {
        let address = channel_address(family, &chunk.channel).ok_or_else(|| ReplayError::UnknownChannel {
            index,
            family,
            channel: chunk.channel.clone(),
        })?;
        resolved.push((address, chunk.payload(index)?));
    }

    let mut stats = ReplayStats::default();
    for (address, payload) in resolved {
        let receivers = link.notify(address.service, address.notify, &payload);
        if receivers == 0 {
            debug!(bytes = payload.len(), "chunk had no monitor");
        }
        stats.chunks += 1;
        stats.bytes += payload.len();
        stats.delivered += usize::from(receivers > 0);
    }
    Ok(stats)
}

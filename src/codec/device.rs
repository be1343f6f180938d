//! Device hints and hardware capability flags.
//!
//! Neither value is stored in the token stream. They only steer encoder
//! heuristics and the literal copy path, so decode never needs them.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Gradient verification depth for seek-bound media.
pub const DEEP_SCAN: usize = 32;

/// Gradient verification depth for everything else.
pub const SHALLOW_SCAN: usize = 8;

/// Classification of the target medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceHint {
    /// Flash / NVMe, random access is cheap
    #[default]
    SolidState,
    /// Spinning disk, seek bound
    Rotational,
    /// Zoned namespace devices (sequential write, random read)
    Zoned,
    /// Tape
    Tape,
}

impl DeviceHint {
    /// Bytes the gradient detector must verify before accepting a run.
    pub fn gradient_scan_depth(&self) -> usize {
        match self {
            DeviceHint::Rotational => DEEP_SCAN,
            _ => SHALLOW_SCAN,
        }
    }

    /// Whether the 2D delta detector runs on this medium.
    pub fn allows_manifold(&self) -> bool {
        matches!(self, DeviceHint::SolidState | DeviceHint::Zoned)
    }

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            DeviceHint::SolidState => "solid-state",
            DeviceHint::Rotational => "rotational",
            DeviceHint::Zoned => "zoned",
            DeviceHint::Tape => "tape",
        }
    }
}

impl std::fmt::Display for DeviceHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DeviceHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "solid-state" | "ssd" | "nvme" => Ok(DeviceHint::SolidState),
            "rotational" | "hdd" => Ok(DeviceHint::Rotational),
            "zoned" | "zns" | "smr" => Ok(DeviceHint::Zoned),
            "tape" => Ok(DeviceHint::Tape),
            other => Err(format!("unknown device type: {other}")),
        }
    }
}

/// Hardware capability bitset reported by the device layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HwFlags(u32);

impl HwFlags {
    /// Byte-addressable persistent memory (literal copies use streaming stores)
    pub const PERSISTENT_MEMORY: u32 = 1 << 0;

    /// Create new empty flags
    pub fn new() -> Self {
        Self(0)
    }

    /// Create from raw bits
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Get raw bits
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Set a flag
    pub fn set(&mut self, flag: u32) {
        self.0 |= flag;
    }

    /// Clear a flag
    pub fn clear(&mut self, flag: u32) {
        self.0 &= !flag;
    }

    /// Check if flag is set
    pub fn has(&self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    /// Builder form of [`HwFlags::set`].
    pub fn with(mut self, flag: u32) -> Self {
        self.set(flag);
        self
    }
}

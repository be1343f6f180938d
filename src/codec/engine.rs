//! Per-device codec facade.
//!
//! A volume layer configures one [`BlockCodec`] per physical device (device
//! hint plus capability flags) and reuses it for every block written there.
//! The facade adds allocating convenience calls and stream inspection on top
//! of the buffer-oriented free functions.

use serde::{Deserialize, Serialize};

use super::device::{DeviceHint, HwFlags};
use super::token::TokenStats;
use super::{bound, compress_with_stats, decompress_with_stats, MAX_BLOCK_SIZE};
use crate::error::{OreError, Result};

/// Result of compressing one block into an owned buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionResult {
    /// Encoded token stream
    pub data: Vec<u8>,
    /// Original size in bytes
    pub original_bytes: usize,
    /// Compressed size in bytes
    pub compressed_bytes: usize,
    /// Per-kind token statistics
    pub stats: TokenStats,
}

impl CompressionResult {
    /// Calculate byte compression ratio
    pub fn byte_ratio(&self) -> f64 {
        if self.compressed_bytes == 0 {
            0.0
        } else {
            self.original_bytes as f64 / self.compressed_bytes as f64
        }
    }

    /// Check if compression was beneficial
    pub fn is_beneficial(&self) -> bool {
        self.compressed_bytes < self.original_bytes
    }
}

/// Block codec bound to one device's hint and capability flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockCodec {
    device: DeviceHint,
    hw: HwFlags,
}

impl BlockCodec {
    /// Create codec for a device class with no capability flags
    pub fn new(device: DeviceHint) -> Self {
        Self {
            device,
            hw: HwFlags::new(),
        }
    }

    /// Set hardware capability flags
    pub fn with_hw_flags(mut self, hw: HwFlags) -> Self {
        self.hw = hw;
        self
    }

    /// Device hint in use
    pub fn device(&self) -> DeviceHint {
        self.device
    }

    /// Capability flags in use
    pub fn hw_flags(&self) -> HwFlags {
        self.hw
    }

    /// Compress into a caller-owned buffer.
    pub fn compress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        compress_with_stats(src, dst, self.device, self.hw).map(|(n, _)| n)
    }

    /// Decompress into a caller-owned buffer.
    pub fn decompress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        decompress_with_stats(src, dst).map(|(n, _)| n)
    }

    /// Compress into a freshly allocated buffer sized by [`bound`].
    pub fn compress_to_vec(&self, src: &[u8]) -> Result<CompressionResult> {
        let len = block_len(src.len())?;
        let mut data = vec![0u8; bound(len) as usize];
        let (written, stats) = compress_with_stats(src, &mut data, self.device, self.hw)?;
        data.truncate(written);
        Ok(CompressionResult {
            data,
            original_bytes: src.len(),
            compressed_bytes: written,
            stats,
        })
    }

    /// Decompress a block whose original length was stored alongside it.
    ///
    /// The stream must reproduce exactly `original_len` bytes.
    pub fn decompress_to_vec(&self, src: &[u8], original_len: usize) -> Result<Vec<u8>> {
        block_len(original_len)?;
        let mut out = vec![0u8; original_len];
        let written = self.decompress(src, &mut out)?;
        if written != original_len {
            return Err(OreError::InvalidArgument(format!(
                "stream decoded to {written} bytes, expected {original_len}"
            )));
        }
        Ok(out)
    }

    /// Fully validate a stream and report what it is made of.
    ///
    /// `capacity` is the largest output the stream may expand to.
    pub fn inspect(&self, src: &[u8], capacity: usize) -> Result<TokenStats> {
        block_len(capacity)?;
        let mut scratch = vec![0u8; capacity];
        decompress_with_stats(src, &mut scratch).map(|(_, stats)| stats)
    }
}

fn block_len(len: usize) -> Result<u32> {
    if len > MAX_BLOCK_SIZE {
        return Err(OreError::InvalidArgument(format!(
            "block of {len} bytes exceeds ceiling of {MAX_BLOCK_SIZE}"
        )));
    }
    Ok(len as u32)
}

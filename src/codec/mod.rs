//! ORE block codec.
//!
//! Compresses one storage block at a time into a self-describing token
//! stream and restores it bit for bit. Both directions work over
//! caller-owned buffers and never allocate.
//!
//! # Tokens
//!
//! | Token    | Wire form                                   | Best For                     |
//! |----------|---------------------------------------------|------------------------------|
//! | Literal  | header, raw bytes                           | Anything nothing else claims |
//! | Isotope  | header, value                               | Zero fill, padding           |
//! | Gradient | header, start, slope                        | Counters, ramps, indices     |
//! | Bitmask  | header, presence mask, non-zero words       | Sparse tables                |
//! | Lexicon  | `0x00 0x01`, index                          | Common protocol strings      |
//! | Manifold | `0x00 0x02`, stride, length, row 0, deltas  | Smooth 2D data (images)      |
//!
//! See [`token`] for the header layout and length limits.
//!
//! # Usage
//!
//! ```rust
//! use ore::codec::{bound, compress, decompress, DeviceHint, HwFlags};
//!
//! let block: Vec<u8> = (0..4096u32).map(|i| (i % 256) as u8).collect();
//! let mut packed = vec![0u8; bound(block.len() as u32) as usize];
//! let n = compress(&block, &mut packed, DeviceHint::Rotational, HwFlags::new())?;
//!
//! let mut restored = vec![0u8; block.len()];
//! let m = decompress(&packed[..n], &mut restored)?;
//! assert_eq!(&restored[..m], &block[..]);
//! # Ok::<(), ore::OreError>(())
//! ```
//!
//! On any error the destination contents are undefined and must be
//! discarded. The caller decides whether to store the block raw instead.

mod copy;
mod decoder;
pub mod detect;
mod device;
mod encoder;
mod engine;
pub mod lexicon;
mod sink;
pub mod token;
pub mod varint;

pub use copy::LiteralCopy;
pub use decoder::Token;
pub use device::{DeviceHint, HwFlags};
pub use engine::{BlockCodec, CompressionResult};
pub use token::{Opcode, TokenKind, TokenStats, MAX_RUN_LEN, MAX_TOKEN_LEN};

use crate::error::Result;
use decoder::Decoder;
use encoder::Encoder;

/// Largest block a single `compress` call accepts (16 MiB).
pub const MAX_BLOCK_SIZE: usize = 1 << 24;

/// Worst-case compressed size for `input_size` bytes.
///
/// Saturates at `u32::MAX`. Any destination at least this large is enough
/// for [`compress`] to succeed.
pub fn bound(input_size: u32) -> u32 {
    input_size
        .saturating_add(input_size >> 6)
        .saturating_add(384)
}

/// Compress `src` into `dst`, returning the number of bytes written.
///
/// `device` only tunes encoder heuristics and `hw` only selects the literal
/// copy path. Neither is recorded in the output.
pub fn compress(src: &[u8], dst: &mut [u8], device: DeviceHint, hw: HwFlags) -> Result<usize> {
    compress_with_stats(src, dst, device, hw).map(|(written, _)| written)
}

/// Like [`compress`], also returning per-kind token statistics.
pub fn compress_with_stats(
    src: &[u8],
    dst: &mut [u8],
    device: DeviceHint,
    hw: HwFlags,
) -> Result<(usize, TokenStats)> {
    let (written, stats) = Encoder::new(src, dst, device, hw)?.run()?;
    tracing::debug!(
        input = src.len(),
        output = written,
        tokens = stats.total_tokens(),
        device = %device,
        "block compressed"
    );
    Ok((written, stats))
}

/// Decompress the token stream `src` into `dst`, returning bytes written.
///
/// `src` must be exactly the stream produced by [`compress`]; there is no
/// end marker.
pub fn decompress(src: &[u8], dst: &mut [u8]) -> Result<usize> {
    decompress_with_stats(src, dst).map(|(written, _)| written)
}

/// Like [`decompress`], also returning per-kind token statistics.
pub fn decompress_with_stats(src: &[u8], dst: &mut [u8]) -> Result<(usize, TokenStats)> {
    let (written, stats) = Decoder::new(src, dst)?.run()?;
    tracing::debug!(
        input = src.len(),
        output = written,
        tokens = stats.total_tokens(),
        "block decompressed"
    );
    Ok((written, stats))
}

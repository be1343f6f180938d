//! # ORE - Orbital Redundancy Encoding
//!
//! Lossless block codec for structured storage payloads. A volume layer hands
//! it one block at a time and gets back a compact, self-describing token
//! stream, or an error telling it to store the block raw.
//!
//! ## Features
//!
//! - **Pattern tokens**: constant runs, linear ramps, sparse word tables,
//!   dictionary strings and smooth 2D data each get a dedicated token
//! - **Device aware**: encoder heuristics follow the target medium
//!   (solid-state, rotational, zoned, tape)
//! - **Hostile-input safe**: single validating decode pass with a linear cost
//!   bound, never writes past the last good token
//! - **Zero allocation**: both directions work over caller-owned buffers
//!
//! ## Pipeline
//!
//! ```text
//!   block ──> detectors ──> encoder ──> token stream ──> decoder ──> block
//!               │  isotope                  (stored with      │
//!               │  gradient                  raw length +     │ validate
//!               │  bitmask                   algorithm tag)   │ then write
//!               │  lexicon                                    │
//!               └─ manifold                                   v
//!                                                      OreError::DataRot
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use ore::{BlockCodec, DeviceHint};
//!
//! let codec = BlockCodec::new(DeviceHint::SolidState);
//! let block = vec![0u8; 4096];
//!
//! let result = codec.compress_to_vec(&block)?;
//! assert!(result.is_beneficial());
//!
//! let restored = codec.decompress_to_vec(&result.data, block.len())?;
//! assert_eq!(restored, block);
//! # Ok::<(), ore::OreError>(())
//! ```
//!
//! ## Modules
//!
//! - [`codec`]: Token grammar, detectors, encoder and decoder
//! - [`config`]: Configuration management
//! - [`error`]: Error types and result aliases

pub mod codec;
pub mod config;
pub mod error;

// Re-exports for convenience
pub use codec::{
    bound, compress, compress_with_stats, decompress, decompress_with_stats, BlockCodec,
    CompressionResult, DeviceHint, HwFlags, TokenKind, TokenStats, MAX_BLOCK_SIZE,
};
pub use config::Config;
pub use error::{OreError, Result, RotCause, Status};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

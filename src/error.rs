//! ORE codec error types.
//!
//! # Error Classification
//!
//! The codec reports exactly three kinds of failure to its caller:
//!
//! - **Invalid argument**: the call itself is malformed (block too large,
//!   oversized compressed input).
//! - **Out of space**: the destination is too small, either while encoding or
//!   because a decoded token declares more bytes than the destination can hold.
//! - **Data rot**: any decode-time validation failure. Corruption and hostile
//!   input are indistinguishable to the decoder and are handled identically.
//!
//! The `DataRot` variant preserves the precise cause via `#[source]`, so tools
//! like `anyhow` can print the full chain while callers still match a single
//! variant.

use thiserror::Error;

/// Precise reason a token stream was rejected.
///
/// All of these surface as [`OreError::DataRot`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotCause {
    /// Stream ended in the middle of a header, escape or payload.
    #[error("truncated token")]
    Truncated,

    /// Length extension chain exceeded the 32-byte cap.
    #[error("length extension chain too long")]
    ChainOverflow,

    /// Declared length exceeds the per-token maximum.
    #[error("token length {0} exceeds maximum")]
    LengthOverflow(usize),

    /// Declared length is zero or not valid for the opcode.
    #[error("invalid token length {0}")]
    BadLength(usize),

    /// Escape selector is not a known extension opcode.
    #[error("unknown escape selector {0:#04x}")]
    UnknownEscape(u8),

    /// Gradient slope of 0 or -128.
    #[error("illegal gradient slope {0}")]
    BadSlope(i8),

    /// Gradient run would leave the 0..=255 range.
    #[error("gradient run leaves byte range")]
    GradientOverflow,

    /// Unused high bits of the final bitmask byte are set.
    #[error("bitmask padding bits set")]
    MaskPadding,

    /// Lexicon index past the end of the table.
    #[error("lexicon index {0} out of range")]
    LexiconIndex(u8),

    /// Manifold stride is zero or reaches before the start of the output.
    #[error("invalid manifold stride {0}")]
    BadStride(u8),

    /// Decode work exceeded the linear cost budget.
    #[error("decode cost budget exhausted")]
    CostExhausted,
}

/// Result code reported across the codec boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Call succeeded.
    Ok,
    /// Malformed call.
    InvalidArgument,
    /// Destination capacity insufficient.
    OutOfSpace,
    /// Stream failed validation.
    DataRot,
    /// Encoder invariant violated (a bug, never caused by input).
    Internal,
}

/// ORE codec errors.
#[derive(Error, Debug)]
pub enum OreError {
    /// Call arguments rejected before any work was done.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Destination buffer exhausted.
    #[error("Out of space: needed {needed} bytes, {available} available")]
    OutOfSpace {
        /// Bytes the failing write required.
        needed: usize,
        /// Bytes left in the destination at that point.
        available: usize,
    },

    /// Token stream failed validation.
    #[error("Data rot at offset {offset}: {cause}")]
    DataRot {
        /// Source offset of the token that failed.
        offset: usize,
        /// What was wrong with it.
        #[source]
        cause: RotCause,
    },

    /// Encoder invariant violation. Aborts the block.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ORE operations
pub type Result<T> = std::result::Result<T, OreError>;

impl OreError {
    /// Map onto the codec's result code.
    pub fn status(&self) -> Status {
        match self {
            OreError::InvalidArgument(_) | OreError::Config(_) | OreError::Io(_) => {
                Status::InvalidArgument
            },
            OreError::OutOfSpace { .. } => Status::OutOfSpace,
            OreError::DataRot { .. } => Status::DataRot,
            OreError::Internal(_) => Status::Internal,
        }
    }

    /// Rot cause, if this is a data rot error.
    pub fn rot_cause(&self) -> Option<RotCause> {
        match self {
            OreError::DataRot { cause, .. } => Some(*cause),
            _ => None,
        }
    }

    pub(crate) fn rot(offset: usize, cause: RotCause) -> Self {
        OreError::DataRot { offset, cause }
    }
}

impl From<toml::de::Error> for OreError {
    fn from(err: toml::de::Error) -> Self {
        OreError::Config(err.to_string())
    }
}

//! Token grammar shared by the encoder and decoder.
//!
//! Every token starts with one header byte:
//!
//! ```text
//!   7   6   5   4   3   2   1   0
//! +-------+-----------------------+
//! |opcode |     short length      |
//! +-------+-----------------------+
//! ```
//!
//! | Opcode | Name     | Payload                                  |
//! |--------|----------|------------------------------------------|
//! | 0      | Literal  | `len` raw bytes                          |
//! | 1      | Isotope  | one repeated byte (`len` biased by 4)    |
//! | 2      | Gradient | start byte, slope byte (biased by 4)     |
//! | 3      | Bitmask  | presence mask, then the non-zero words   |
//!
//! A Literal header with short length 0 is the escape marker. It is followed
//! by a selector byte naming an extension token (Lexicon or Manifold).

use serde::{Deserialize, Serialize};

/// Bit position of the opcode within the header byte.
pub const OPCODE_SHIFT: u32 = 6;

/// Mask of the short length field.
pub const SHORT_LEN_MASK: u8 = 0x3F;

/// Short length value meaning "an extension chain follows".
pub const VARINT_TRIGGER: u8 = 63;

/// Literal short length reserved as the escape marker.
pub const ESCAPE_SENTINEL: u8 = 0;

/// Extension byte meaning "add 255 and keep reading".
pub const EXT_CONTINUE: u8 = 0xFF;

/// Maximum number of `EXT_CONTINUE` bytes in one chain.
pub const MAX_EXT_BYTES: usize = 32;

/// Largest length a token length field can carry (63 + 32 * 255).
pub const MAX_TOKEN_LEN: usize = VARINT_TRIGGER as usize + MAX_EXT_BYTES * 255;

/// Length bias applied to Isotope and Gradient tokens.
pub const RUN_BIAS: usize = 4;

/// Shortest span worth a run token.
pub const MIN_RUN: usize = RUN_BIAS;

/// Largest span a single Isotope or Gradient token covers.
pub const MAX_RUN_LEN: usize = MAX_TOKEN_LEN + RUN_BIAS;

/// Width of a bitmask word in bytes.
pub const WORD_BYTES: usize = 4;

/// Largest span of a single Bitmask token (a whole number of words).
pub const MAX_BITMASK_LEN: usize = MAX_TOKEN_LEN / WORD_BYTES * WORD_BYTES;

/// Wire size of a Lexicon token: escape header, selector, index.
pub const LEXICON_TOKEN_LEN: usize = 3;

/// Row width used by the Manifold encoder.
pub const MANIFOLD_STRIDE: usize = 64;

/// Primary opcodes carried in the top two header bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Raw bytes.
    Literal = 0,
    /// Run of one repeated byte.
    Isotope = 1,
    /// Arithmetic progression without wraparound.
    Gradient = 2,
    /// Sparse 4-byte words with a presence mask.
    Bitmask = 3,
}

impl Opcode {
    /// Split a header byte into opcode and short length.
    pub fn split_header(header: u8) -> (Self, u8) {
        let opcode = match header >> OPCODE_SHIFT {
            0 => Opcode::Literal,
            1 => Opcode::Isotope,
            2 => Opcode::Gradient,
            _ => Opcode::Bitmask,
        };
        (opcode, header & SHORT_LEN_MASK)
    }

    /// Header byte with the given short length.
    pub fn header(self, short: u8) -> u8 {
        ((self as u8) << OPCODE_SHIFT) | (short & SHORT_LEN_MASK)
    }

    /// Whether the length field stores `actual - RUN_BIAS`.
    pub fn is_biased(self) -> bool {
        matches!(self, Opcode::Isotope | Opcode::Gradient)
    }

    /// Largest actual span one token of this opcode may cover.
    pub fn max_span(self) -> usize {
        if self.is_biased() {
            MAX_RUN_LEN
        } else {
            MAX_TOKEN_LEN
        }
    }

    /// Convert an actual span into the value stored in the length field.
    ///
    /// Returns `None` when the span cannot be represented by this opcode.
    pub fn stored_len(self, actual: usize) -> Option<usize> {
        if self.is_biased() {
            actual.checked_sub(RUN_BIAS)
        } else {
            Some(actual)
        }
        .filter(|&stored| stored <= MAX_TOKEN_LEN)
    }

    /// Convert a decoded length field back into the actual span.
    pub fn actual_len(self, stored: usize) -> usize {
        if self.is_biased() {
            stored + RUN_BIAS
        } else {
            stored
        }
    }
}

/// Extension opcodes introduced by the escape marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Escape {
    /// Static dictionary substitution.
    Lexicon = 0x01,
    /// Row-predicted 2D delta run.
    Manifold = 0x02,
}

impl Escape {
    /// Parse a selector byte. Any other value is invalid on the wire.
    pub fn from_selector(selector: u8) -> Option<Self> {
        match selector {
            0x01 => Some(Escape::Lexicon),
            0x02 => Some(Escape::Manifold),
            _ => None,
        }
    }

    /// Selector byte value.
    pub fn selector(self) -> u8 {
        self as u8
    }
}

/// Logical token kinds, for statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Raw bytes
    Literal,
    /// Constant run
    Isotope,
    /// Linear run
    Gradient,
    /// Sparse words
    Bitmask,
    /// Dictionary entry
    Lexicon,
    /// 2D delta run
    Manifold,
}

impl TokenKind {
    /// All kinds in wire order.
    pub fn all() -> &'static [TokenKind] {
        &[
            TokenKind::Literal,
            TokenKind::Isotope,
            TokenKind::Gradient,
            TokenKind::Bitmask,
            TokenKind::Lexicon,
            TokenKind::Manifold,
        ]
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Literal => "LITERAL",
            TokenKind::Isotope => "ISOTOPE",
            TokenKind::Gradient => "GRADIENT",
            TokenKind::Bitmask => "BITMASK",
            TokenKind::Lexicon => "LEXICON",
            TokenKind::Manifold => "MANIFOLD",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Per-kind token and byte counts for one encoded stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStats {
    /// Token counts, indexed in [`TokenKind::all`] order.
    pub tokens: [usize; 6],
    /// Decoded bytes covered by each kind, same order.
    pub bytes: [usize; 6],
}

impl TokenStats {
    /// Record one token covering `span` output bytes.
    pub fn record(&mut self, kind: TokenKind, span: usize) {
        let idx = kind as usize;
        self.tokens[idx] += 1;
        self.bytes[idx] += span;
    }

    /// Tokens of one kind.
    pub fn count(&self, kind: TokenKind) -> usize {
        self.tokens[kind as usize]
    }

    /// Output bytes covered by one kind.
    pub fn covered(&self, kind: TokenKind) -> usize {
        self.bytes[kind as usize]
    }

    /// Total number of tokens.
    pub fn total_tokens(&self) -> usize {
        self.tokens.iter().sum()
    }

    /// Total output bytes.
    pub fn total_bytes(&self) -> usize {
        self.bytes.iter().sum()
    }

    /// Accumulate another stream's counts into this one.
    pub fn merge(&mut self, other: &TokenStats) {
        for (a, b) in self.tokens.iter_mut().zip(other.tokens) {
            *a += b;
        }
        for (a, b) in self.bytes.iter_mut().zip(other.bytes) {
            *a += b;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_split_roundtrip() {
        for op in [
            Opcode::Literal,
            Opcode::Isotope,
            Opcode::Gradient,
            Opcode::Bitmask,
        ] {
            for short in [0u8, 1, 31, 62, 63] {
                assert_eq!(Opcode::split_header(op.header(short)), (op, short));
            }
        }
        assert_eq!(Opcode::split_header(0x00), (Opcode::Literal, ESCAPE_SENTINEL));
    }

    #[test]
    fn test_limits() {
        assert_eq!(MAX_TOKEN_LEN, 8223);
        assert_eq!(MAX_RUN_LEN, 8227);
        assert_eq!(MAX_BITMASK_LEN, 8220);
    }

    #[test]
    fn test_bias_conversion() {
        assert_eq!(Opcode::Isotope.stored_len(4), Some(0));
        assert_eq!(Opcode::Isotope.stored_len(3), None);
        assert_eq!(Opcode::Gradient.stored_len(MAX_RUN_LEN), Some(MAX_TOKEN_LEN));
        assert_eq!(Opcode::Gradient.stored_len(MAX_RUN_LEN + 1), None);
        assert_eq!(Opcode::Literal.stored_len(MAX_TOKEN_LEN + 1), None);
        assert_eq!(Opcode::Isotope.actual_len(0), 4);
        assert_eq!(Opcode::Bitmask.actual_len(8), 8);
    }

    #[test]
    fn test_escape_selectors() {
        assert_eq!(Escape::from_selector(0x01), Some(Escape::Lexicon));
        assert_eq!(Escape::from_selector(0x02), Some(Escape::Manifold));
        assert_eq!(Escape::from_selector(0x00), None);
        assert_eq!(Escape::from_selector(0x03), None);
        assert_eq!(Escape::from_selector(0xFF), None);
    }

    #[test]
    fn test_stats_record() {
        let mut stats = TokenStats::default();
        stats.record(TokenKind::Isotope, 100);
        stats.record(TokenKind::Isotope, 8);
        stats.record(TokenKind::Literal, 3);
        assert_eq!(stats.count(TokenKind::Isotope), 2);
        assert_eq!(stats.covered(TokenKind::Isotope), 108);
        assert_eq!(stats.total_tokens(), 3);
        assert_eq!(stats.total_bytes(), 111);

        let mut total = TokenStats::default();
        total.merge(&stats);
        total.merge(&stats);
        assert_eq!(total.count(TokenKind::Isotope), 4);
        assert_eq!(total.total_bytes(), 222);
    }
}

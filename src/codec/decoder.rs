//! Single-pass validating decoder.
//!
//! # State Machine
//!
//! ```text
//!              header byte
//!   [Awaiting] ───────────> [Token] ── validated ──> write span ──┐
//!       ^                      │                                  │
//!       │                      │ any check fails                  │
//!       │                      v                                  │
//!       │                  [Aborted]  (DataRot / OutOfSpace)      │
//!       └─────────────────────────────────────────────────────────┘
//!   cursor == end of input ──> [Done]
//! ```
//!
//! A token is parsed into a [`Token`] and every length, range and source
//! availability check runs before the first byte of its span is written.
//! A failing token therefore never leaves partial output behind; bytes from
//! earlier, fully validated tokens stay in place.

use super::detect::predict;
use super::lexicon;
use super::token::{
    Escape, Opcode, TokenKind, TokenStats, ESCAPE_SENTINEL, MAX_TOKEN_LEN, VARINT_TRIGGER,
    WORD_BYTES,
};
use super::varint::read_chain;
use super::{bound, MAX_BLOCK_SIZE};
use crate::error::{OreError, Result, RotCause};

/// Fixed part of the decode cost budget.
const COST_BASE: usize = 64;

/// Budgeted cost units per source byte.
const COST_PER_BYTE: usize = 2;

/// One validated token. Payload slices borrow the encoded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Raw bytes
    Literal(&'a [u8]),
    /// Constant run
    Isotope {
        /// Repeated byte
        value: u8,
        /// Run length
        len: usize,
    },
    /// Linear run, already range-checked
    Gradient {
        /// First byte
        start: u8,
        /// Per-byte step
        slope: i8,
        /// Run length
        len: usize,
    },
    /// Sparse words
    Bitmask {
        /// Span in bytes (whole words)
        len: usize,
        /// Presence bits, LSB first
        mask: &'a [u8],
        /// Words for the set bits, in order
        words: &'a [u8],
    },
    /// Lexicon entry bytes
    Lexicon(&'static [u8]),
    /// Row-predicted run
    Manifold {
        /// Row width
        stride: usize,
        /// First row, stored verbatim
        row0: &'a [u8],
        /// One delta per remaining byte
        deltas: &'a [u8],
    },
}

impl Token<'_> {
    /// Output bytes this token produces.
    pub fn span(&self) -> usize {
        match *self {
            Token::Literal(bytes) | Token::Lexicon(bytes) => bytes.len(),
            Token::Isotope { len, .. } | Token::Gradient { len, .. } | Token::Bitmask { len, .. } => {
                len
            },
            Token::Manifold { row0, deltas, .. } => row0.len() + deltas.len(),
        }
    }

    /// Statistics bucket.
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Literal(_) => TokenKind::Literal,
            Token::Isotope { .. } => TokenKind::Isotope,
            Token::Gradient { .. } => TokenKind::Gradient,
            Token::Bitmask { .. } => TokenKind::Bitmask,
            Token::Lexicon(_) => TokenKind::Lexicon,
            Token::Manifold { .. } => TokenKind::Manifold,
        }
    }

    /// Reconstruct the span into `out`, which must be exactly `span()` long.
    fn write(&self, out: &mut [u8]) {
        match *self {
            Token::Literal(bytes) | Token::Lexicon(bytes) => out.copy_from_slice(bytes),
            Token::Isotope { value, .. } => out.fill(value),
            Token::Gradient { start, slope, .. } => {
                let mut value = i32::from(start);
                for b in out.iter_mut() {
                    *b = value as u8;
                    value += i32::from(slope);
                }
            },
            Token::Bitmask { mask, words, .. } => {
                let mut set_words = words.chunks_exact(WORD_BYTES);
                for (i, slot) in out.chunks_exact_mut(WORD_BYTES).enumerate() {
                    if mask[i / 8] & (1 << (i % 8)) != 0 {
                        if let Some(word) = set_words.next() {
                            slot.copy_from_slice(word);
                            continue;
                        }
                    }
                    slot.fill(0);
                }
            },
            Token::Manifold {
                stride,
                row0,
                deltas,
            } => {
                out[..stride].copy_from_slice(row0);
                for (i, &delta) in (stride..out.len()).zip(deltas) {
                    out[i] = predict(out[i - 1], out[i - stride]).wrapping_add(delta);
                }
            },
        }
    }
}

pub(crate) struct Decoder<'s, 'd> {
    src: &'s [u8],
    pos: usize,
    token_start: usize,
    out: &'d mut [u8],
    written: usize,
    cost: usize,
    budget: usize,
    stats: TokenStats,
}

impl<'s, 'd> Decoder<'s, 'd> {
    pub fn new(src: &'s [u8], dst: &'d mut [u8]) -> Result<Self> {
        let limit = bound(MAX_BLOCK_SIZE as u32) as usize;
        if src.len() > limit {
            return Err(OreError::InvalidArgument(format!(
                "compressed input of {} bytes exceeds {limit}",
                src.len()
            )));
        }
        Ok(Self {
            src,
            pos: 0,
            token_start: 0,
            out: dst,
            written: 0,
            cost: 0,
            budget: COST_BASE + src.len() * COST_PER_BYTE,
            stats: TokenStats::default(),
        })
    }

    #[cfg(test)]
    fn with_budget(mut self, budget: usize) -> Self {
        self.budget = budget;
        self
    }

    /// Decode the whole stream, returning bytes written and token statistics.
    pub fn run(mut self) -> Result<(usize, TokenStats)> {
        while self.pos < self.src.len() {
            self.token_start = self.pos;
            if let Err(e) = self.step() {
                tracing::debug!(
                    offset = self.token_start,
                    written = self.written,
                    error = %e,
                    "decode aborted"
                );
                return Err(e);
            }
        }
        debug_assert_eq!(self.pos, self.src.len());
        Ok((self.written, self.stats))
    }

    /// Parse, validate and apply one token.
    fn step(&mut self) -> Result<()> {
        self.charge(1)?;
        let token = self.next_token()?;
        let span = token.span();
        token.write(&mut self.out[self.written..self.written + span]);
        self.written += span;
        self.stats.record(token.kind(), span);
        Ok(())
    }

    fn next_token(&mut self) -> Result<Token<'s>> {
        let (opcode, short) = Opcode::split_header(self.byte()?);
        if opcode == Opcode::Literal && short == ESCAPE_SENTINEL {
            return self.escape();
        }

        let stored = if short == VARINT_TRIGGER {
            VARINT_TRIGGER as usize + self.chain()?
        } else {
            short as usize
        };
        let len = opcode.actual_len(stored);
        if len > opcode.max_span() {
            return Err(self.rot(RotCause::LengthOverflow(len)));
        }
        if len == 0 {
            return Err(self.rot(RotCause::BadLength(0)));
        }
        self.ensure_room(len)?;

        match opcode {
            Opcode::Literal => Ok(Token::Literal(self.take(len)?)),
            Opcode::Isotope => Ok(Token::Isotope {
                value: self.byte()?,
                len,
            }),
            Opcode::Gradient => self.gradient(len),
            Opcode::Bitmask => self.bitmask(len),
        }
    }

    fn escape(&mut self) -> Result<Token<'s>> {
        let selector = self.byte()?;
        match Escape::from_selector(selector) {
            Some(Escape::Lexicon) => {
                let index = self.byte()?;
                let entry =
                    lexicon::entry(index).ok_or_else(|| self.rot(RotCause::LexiconIndex(index)))?;
                self.ensure_room(entry.len())?;
                Ok(Token::Lexicon(entry))
            },
            Some(Escape::Manifold) => self.manifold(),
            None => Err(self.rot(RotCause::UnknownEscape(selector))),
        }
    }

    fn gradient(&mut self, len: usize) -> Result<Token<'s>> {
        let start = self.byte()?;
        let slope = self.byte()? as i8;
        if slope == 0 || slope == i8::MIN {
            return Err(self.rot(RotCause::BadSlope(slope)));
        }
        // Monotonic, so checking the final value covers the whole run.
        let last = i32::from(start) + i32::from(slope) * (len as i32 - 1);
        if !(0..=255).contains(&last) {
            return Err(self.rot(RotCause::GradientOverflow));
        }
        Ok(Token::Gradient { start, slope, len })
    }

    fn bitmask(&mut self, len: usize) -> Result<Token<'s>> {
        if len % WORD_BYTES != 0 {
            return Err(self.rot(RotCause::BadLength(len)));
        }
        let word_count = len / WORD_BYTES;
        let mask = self.take(word_count.div_ceil(8))?;
        let used_bits = word_count % 8;
        if used_bits != 0 && mask[mask.len() - 1] >> used_bits != 0 {
            return Err(self.rot(RotCause::MaskPadding));
        }
        let present: usize = mask.iter().map(|b| b.count_ones() as usize).sum();
        let words = self.take(present * WORD_BYTES)?;
        Ok(Token::Bitmask { len, mask, words })
    }

    fn manifold(&mut self) -> Result<Token<'s>> {
        let stride = self.byte()?;
        if stride == 0 || stride as usize > self.written {
            return Err(self.rot(RotCause::BadStride(stride)));
        }
        let stride = stride as usize;
        let len = self.chain()?;
        if len > MAX_TOKEN_LEN {
            return Err(self.rot(RotCause::LengthOverflow(len)));
        }
        if len < stride {
            return Err(self.rot(RotCause::BadLength(len)));
        }
        self.ensure_room(len)?;
        let row0 = self.take(stride)?;
        let deltas = self.take(len - stride)?;
        Ok(Token::Manifold {
            stride,
            row0,
            deltas,
        })
    }

    fn rot(&self, cause: RotCause) -> OreError {
        OreError::rot(self.token_start, cause)
    }

    fn charge(&mut self, units: usize) -> Result<()> {
        self.cost += units;
        if self.cost > self.budget {
            return Err(self.rot(RotCause::CostExhausted));
        }
        Ok(())
    }

    fn ensure_room(&self, len: usize) -> Result<()> {
        let available = self.out.len() - self.written;
        if len > available {
            return Err(OreError::OutOfSpace {
                needed: len,
                available,
            });
        }
        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<&'s [u8]> {
        let src = self.src;
        let bytes = src
            .get(self.pos..self.pos + n)
            .ok_or_else(|| self.rot(RotCause::Truncated))?;
        self.pos += n;
        self.charge(n)?;
        Ok(bytes)
    }

    fn byte(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn chain(&mut self) -> Result<usize> {
        let src = self.src;
        let (value, used) = read_chain(&src[self.pos..]).map_err(|cause| self.rot(cause))?;
        self.pos += used;
        self.charge(used)?;
        Ok(value)
    }
}

//! Block encoder.
//!
//! Walks the input once. At every cursor position the detectors run in fixed
//! priority order:
//!
//! 1. Isotope
//! 2. Gradient (scan depth from the device hint)
//! 3. Bitmask (word-aligned cursor and a sparse two-word hint)
//! 4. Lexicon
//! 5. Manifold (device hint permitting, at least one row already produced)
//!
//! Bytes no detector claims accumulate into a pending literal run, which is
//! flushed before every matched token and whenever it reaches the maximum
//! token length.

use super::copy::LiteralCopy;
use super::detect::{self, predict, Match};
use super::device::{DeviceHint, HwFlags};
use super::sink::Sink;
use super::token::{
    Escape, Opcode, TokenKind, TokenStats, ESCAPE_SENTINEL, MANIFOLD_STRIDE, MAX_TOKEN_LEN,
    MIN_RUN, WORD_BYTES,
};
use super::varint::{write_chain, write_header};
use super::MAX_BLOCK_SIZE;
use crate::error::{OreError, Result};

pub(crate) struct Encoder<'s, 'd> {
    src: &'s [u8],
    sink: Sink<'d>,
    device: DeviceHint,
    copy: LiteralCopy,
    stats: TokenStats,
}

impl<'s, 'd> Encoder<'s, 'd> {
    pub fn new(src: &'s [u8], dst: &'d mut [u8], device: DeviceHint, hw: HwFlags) -> Result<Self> {
        if src.len() > MAX_BLOCK_SIZE {
            return Err(OreError::InvalidArgument(format!(
                "block of {} bytes exceeds ceiling of {MAX_BLOCK_SIZE}",
                src.len()
            )));
        }
        Ok(Self {
            src,
            sink: Sink::new(dst),
            device,
            copy: LiteralCopy::for_flags(hw),
            stats: TokenStats::default(),
        })
    }

    /// Encode the whole block, returning bytes written and token statistics.
    pub fn run(mut self) -> Result<(usize, TokenStats)> {
        let mut pos = 0;
        let mut literal_start = 0;

        while pos < self.src.len() {
            if pos - literal_start >= MAX_TOKEN_LEN {
                self.flush_literals(literal_start, pos)?;
                literal_start = pos;
            }

            match self.detect(pos) {
                Some(m) => {
                    self.flush_literals(literal_start, pos)?;
                    pos += self.emit(m, pos)?;
                    literal_start = pos;
                },
                None => pos += 1,
            }
        }
        self.flush_literals(literal_start, pos)?;

        Ok((self.sink.position(), self.stats))
    }

    fn detect(&self, pos: usize) -> Option<Match> {
        let input = &self.src[pos..];
        detect::isotope(input)
            .or_else(|| detect::gradient(input, self.device.gradient_scan_depth()))
            .or_else(|| {
                (pos % WORD_BYTES == 0 && detect::sparse_hint(input))
                    .then(|| detect::bitmask(input))
                    .flatten()
            })
            .or_else(|| detect::lexicon(input))
            .or_else(|| {
                (self.device.allows_manifold() && pos >= MANIFOLD_STRIDE)
                    .then(|| detect::manifold(input))
                    .flatten()
            })
    }

    /// Write literal bytes `src[start..end]` in chunks of at most
    /// [`MAX_TOKEN_LEN`].
    fn flush_literals(&mut self, start: usize, end: usize) -> Result<()> {
        for chunk in self.src[start..end].chunks(MAX_TOKEN_LEN) {
            write_header(&mut self.sink, Opcode::Literal, chunk.len())?;
            let out = self.sink.reserve(chunk.len())?;
            self.copy.copy(out, chunk);
            self.stats.record(TokenKind::Literal, chunk.len());
        }
        Ok(())
    }

    /// Emit tokens for a match at `pos`, returning the input bytes consumed.
    ///
    /// Runs longer than one token can carry are split into maximum-length
    /// tokens. A remainder shorter than [`MIN_RUN`] is left for the caller.
    fn emit(&mut self, m: Match, pos: usize) -> Result<usize> {
        let src = self.src;
        match m {
            Match::Isotope { value, len } => self.emit_run(Opcode::Isotope, len, |sink, _| {
                sink.put(value)
            }),
            Match::Gradient { start, slope, len } => {
                self.emit_run(Opcode::Gradient, len, |sink, offset| {
                    // Every byte of the run is in range, so the split point is too.
                    let first = i32::from(start) + i32::from(slope) * offset as i32;
                    sink.put_slice(&[first as u8, slope as u8])
                })
            },
            Match::Bitmask { len, nonzero } => {
                self.emit_bitmask(&src[pos..pos + len], nonzero)?;
                self.stats.record(TokenKind::Bitmask, len);
                Ok(len)
            },
            Match::Lexicon { index, len } => {
                self.sink.put_slice(&[
                    Opcode::Literal.header(ESCAPE_SENTINEL),
                    Escape::Lexicon.selector(),
                    index,
                ])?;
                self.stats.record(TokenKind::Lexicon, len);
                Ok(len)
            },
            Match::Manifold { len } => {
                self.emit_manifold(&src[pos..pos + len])?;
                self.stats.record(TokenKind::Manifold, len);
                Ok(len)
            },
        }
    }

    fn emit_run<F>(&mut self, opcode: Opcode, len: usize, mut payload: F) -> Result<usize>
    where
        F: FnMut(&mut Sink<'d>, usize) -> Result<()>,
    {
        let kind = if opcode == Opcode::Isotope {
            TokenKind::Isotope
        } else {
            TokenKind::Gradient
        };
        let mut done = 0;
        while len - done >= MIN_RUN {
            let span = (len - done).min(opcode.max_span());
            let stored = opcode.stored_len(span).ok_or_else(|| {
                OreError::Internal(format!("{opcode:?} span {span} not encodable"))
            })?;
            write_header(&mut self.sink, opcode, stored)?;
            payload(&mut self.sink, done)?;
            self.stats.record(kind, span);
            done += span;
        }
        Ok(done)
    }

    fn emit_bitmask(&mut self, span: &[u8], nonzero: usize) -> Result<()> {
        write_header(&mut self.sink, Opcode::Bitmask, span.len())?;

        let words = span.len() / WORD_BYTES;
        let mask = self.sink.reserve(words.div_ceil(8))?;
        mask.fill(0);
        for (i, word) in span.chunks_exact(WORD_BYTES).enumerate() {
            if word.iter().any(|&b| b != 0) {
                mask[i / 8] |= 1 << (i % 8);
            }
        }

        let out = self.sink.reserve(nonzero * WORD_BYTES)?;
        let set_words = span
            .chunks_exact(WORD_BYTES)
            .filter(|w| w.iter().any(|&b| b != 0));
        for (slot, word) in out.chunks_exact_mut(WORD_BYTES).zip(set_words) {
            slot.copy_from_slice(word);
        }
        Ok(())
    }

    fn emit_manifold(&mut self, span: &[u8]) -> Result<()> {
        let stride = MANIFOLD_STRIDE;
        self.sink.put_slice(&[
            Opcode::Literal.header(ESCAPE_SENTINEL),
            Escape::Manifold.selector(),
            stride as u8,
        ])?;
        write_chain(&mut self.sink, span.len())?;
        self.sink.put_slice(&span[..stride])?;

        let deltas = self.sink.reserve(span.len() - stride)?;
        for (i, delta) in (stride..span.len()).zip(deltas.iter_mut()) {
            *delta = span[i].wrapping_sub(predict(span[i - 1], span[i - stride]));
        }
        Ok(())
    }
}

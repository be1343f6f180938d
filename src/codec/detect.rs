//! Pattern detectors.
//!
//! Each detector is a stateless probe over the input starting at the encoder
//! cursor. It either declines or returns a [`Match`] describing the span it
//! would consume and the parameters of the token that reproduces it.

use super::device::DEEP_SCAN;
use super::lexicon::{self, LEXICON};
use super::token::{LEXICON_TOKEN_LEN, MANIFOLD_STRIDE, MAX_BITMASK_LEN, MIN_RUN, WORD_BYTES};
use super::varint::header_size;

/// A byte repeated across all eight lanes of a `u64`.
const BROADCAST: u64 = 0x0101_0101_0101_0101;

/// Bytes compared by the isotope fast check.
const ISOTOPE_PROBE: usize = 8;

/// Minimum saving (bytes) a bitmask token must achieve over the raw span.
pub const BITMASK_MIN_SAVING: usize = 4;

/// Non-zero words allowed per `BITMASK_DENSITY_DEN` words.
const BITMASK_DENSITY_NUM: usize = 1;
const BITMASK_DENSITY_DEN: usize = 8;

/// Largest `|actual - predicted|` counted as a manifold hit.
pub const MANIFOLD_TOLERANCE: u8 = 4;

/// Shortest manifold span worth emitting (eight rows).
pub const MANIFOLD_MIN_SPAN: usize = 8 * MANIFOLD_STRIDE;

/// Furthest a single manifold token looks ahead.
pub const MANIFOLD_LOOKAHEAD: usize = 64 * MANIFOLD_STRIDE;

/// A detector hit: the span to consume and how to encode it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    /// `len` copies of `value`
    #[allow(missing_docs)]
    Isotope { value: u8, len: usize },
    /// `start, start + slope, ...` for `len` bytes
    #[allow(missing_docs)]
    Gradient { start: u8, slope: i8, len: usize },
    /// `len` bytes of 4-byte words, `nonzero` of them non-zero
    #[allow(missing_docs)]
    Bitmask { len: usize, nonzero: usize },
    /// Lexicon entry `index`, `len` bytes long
    #[allow(missing_docs)]
    Lexicon { index: u8, len: usize },
    /// Row-predicted run of `len` bytes
    #[allow(missing_docs)]
    Manifold { len: usize },
}

impl Match {
    /// Input bytes covered by this match.
    pub fn span(&self) -> usize {
        match *self {
            Match::Isotope { len, .. }
            | Match::Gradient { len, .. }
            | Match::Bitmask { len, .. }
            | Match::Lexicon { len, .. }
            | Match::Manifold { len } => len,
        }
    }
}

/// Constant run of at least [`MIN_RUN`] bytes.
pub fn isotope(input: &[u8]) -> Option<Match> {
    let value = *input.first()?;
    let probe = match input.first_chunk::<ISOTOPE_PROBE>() {
        Some(head) => {
            if u64::from_ne_bytes(*head) != u64::from(value) * BROADCAST {
                return None;
            }
            ISOTOPE_PROBE
        },
        None => {
            // Short tail: the whole remainder must repeat.
            if input.len() < MIN_RUN || input.iter().any(|&b| b != value) {
                return None;
            }
            input.len()
        },
    };
    let len = probe + input[probe..].iter().take_while(|&&b| b == value).count();
    Some(Match::Isotope { value, len })
}

/// Arithmetic progression with a non-zero slope in `-127..=127` that never
/// leaves `0..=255`.
///
/// `depth` is the number of bytes verified before the run is accepted. The
/// deep scan probes offsets 0, 16 and 31 before walking the window so that
/// non-linear data is rejected after three loads.
pub fn gradient(input: &[u8], depth: usize) -> Option<Match> {
    let start = *input.first()?;
    let second = *input.get(1)?;
    let slope = i32::from(second) - i32::from(start);
    if slope == 0 || !(-127..=127).contains(&slope) {
        return None;
    }

    let window = input.len().min(depth);
    if window < MIN_RUN {
        return None;
    }
    let expected = |i: usize| i32::from(start) + slope * i as i32;
    let holds = |i: usize| i32::from(input[i]) == expected(i);

    if window == DEEP_SCAN && ![0, 16, DEEP_SCAN - 1].into_iter().all(holds) {
        return None;
    }
    if !(2..window).all(holds) {
        return None;
    }

    // Any byte equal to the expected value is in range, so matching is
    // enough to rule out wraparound.
    let len = window + (window..input.len()).take_while(|&i| holds(i)).count();
    Some(Match::Gradient {
        start,
        slope: slope as i8,
        len,
    })
}

/// Cheap two-word check run before the full bitmask scan.
pub fn sparse_hint(input: &[u8]) -> bool {
    match input.first_chunk::<8>() {
        Some(words) => words[..4] == [0; 4] || words[4..] == [0; 4],
        None => false,
    }
}

/// Encoded size of a bitmask token covering `len` bytes.
pub fn bitmask_size(len: usize, nonzero: usize) -> usize {
    let words = len / WORD_BYTES;
    header_size(len) + words.div_ceil(8) + nonzero * WORD_BYTES
}

/// Sparse run of 4-byte words. The caller guarantees the cursor is
/// word-aligned.
pub fn bitmask(input: &[u8]) -> Option<Match> {
    let len = input.len().min(MAX_BITMASK_LEN) / WORD_BYTES * WORD_BYTES;
    if len == 0 {
        return None;
    }
    let words = len / WORD_BYTES;
    let nonzero = input[..len]
        .chunks_exact(WORD_BYTES)
        .filter(|w| w.iter().any(|&b| b != 0))
        .count();

    if nonzero * BITMASK_DENSITY_DEN > words * BITMASK_DENSITY_NUM {
        tracing::trace!(words, nonzero, "bitmask declined: too dense");
        return None;
    }
    let encoded = bitmask_size(len, nonzero);
    if encoded + BITMASK_MIN_SAVING > len {
        tracing::trace!(len, encoded, "bitmask declined: saving too small");
        return None;
    }
    Some(Match::Bitmask { len, nonzero })
}

/// Longest profitable lexicon entry that prefixes the input.
pub fn lexicon(input: &[u8]) -> Option<Match> {
    if !lexicon::is_plausible_lead(*input.first()?) {
        return None;
    }
    let mut best: Option<Match> = None;
    for (index, entry) in LEXICON.iter().enumerate() {
        let Ok(index) = u8::try_from(index) else {
            break;
        };
        if entry.len() <= LEXICON_TOKEN_LEN || !input.starts_with(entry) {
            continue;
        }
        if best.map_or(true, |m| entry.len() > m.span()) {
            best = Some(Match::Lexicon {
                index,
                len: entry.len(),
            });
        }
    }
    best
}

/// Predicted value from the left neighbour and the byte one row up.
pub fn predict(left: u8, top: u8) -> u8 {
    ((u16::from(left) + u16::from(top)) >> 1) as u8
}

/// 2D delta run with a fixed stride of [`MANIFOLD_STRIDE`].
///
/// Predictions only reference bytes inside the candidate span, so the token
/// decodes without looking at earlier output.
pub fn manifold(input: &[u8]) -> Option<Match> {
    let stride = MANIFOLD_STRIDE;
    if input.len() < MANIFOLD_MIN_SPAN || input[0] == 0 || input[1] == 0 {
        return None;
    }

    let hits = (stride..2 * stride)
        .filter(|&i| input[i].abs_diff(predict(input[i - 1], input[i - stride])) <= MANIFOLD_TOLERANCE)
        .count();
    if hits * 4 < stride * 3 {
        tracing::trace!(hits, "manifold declined: row score");
        return None;
    }

    let limit = input.len().min(MANIFOLD_LOOKAHEAD);
    let mut len = stride;
    while len < limit {
        if input.get(len..len + WORD_BYTES) == Some(&[0u8; WORD_BYTES][..]) {
            break;
        }
        len += 1;
    }
    if len < MANIFOLD_MIN_SPAN {
        return None;
    }
    Some(Match::Manifold { len })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::device::SHALLOW_SCAN;

    #[test]
    fn test_isotope_fast_path() {
        let data = [7u8; 20];
        assert_eq!(isotope(&data), Some(Match::Isotope { value: 7, len: 20 }));

        let mut data = [7u8; 20];
        data[12] = 8;
        assert_eq!(isotope(&data), Some(Match::Isotope { value: 7, len: 12 }));
    }

    #[test]
    fn test_isotope_rejects_short_or_broken_probe() {
        assert_eq!(isotope(&[1, 1, 1]), None);
        assert_eq!(isotope(&[1, 1, 1, 1]), Some(Match::Isotope { value: 1, len: 4 }));
        // Mismatch inside the first eight bytes
        assert_eq!(isotope(&[1, 1, 1, 1, 1, 2, 1, 1, 1, 1]), None);
        assert_eq!(isotope(&[]), None);
    }

    #[test]
    fn test_gradient_basic() {
        let data: Vec<u8> = (10..40).collect();
        assert_eq!(
            gradient(&data, SHALLOW_SCAN),
            Some(Match::Gradient {
                start: 10,
                slope: 1,
                len: 30
            })
        );
    }

    #[test]
    fn test_gradient_negative_slope_stops_at_zero() {
        let mut data: Vec<u8> = (0..=20).rev().map(|v| v * 3).collect();
        data.push(253); // would be -3 with wraparound
        let m = gradient(&data, SHALLOW_SCAN).unwrap();
        assert_eq!(
            m,
            Match::Gradient {
                start: 60,
                slope: -3,
                len: 21
            }
        );
    }

    #[test]
    fn test_gradient_rejects_bad_slopes() {
        assert_eq!(gradient(&[5, 5, 5, 5, 5], SHALLOW_SCAN), None);
        assert_eq!(gradient(&[0, 128, 0, 0], SHALLOW_SCAN), None);
        assert_eq!(gradient(&[200, 72, 0, 0], SHALLOW_SCAN), None);
        assert!(gradient(&[0, 127, 254], SHALLOW_SCAN).is_none());
        assert!(gradient(&[254, 127, 0, 0], SHALLOW_SCAN).is_none());
    }

    #[test]
    fn test_gradient_deep_needs_full_window() {
        let mut data: Vec<u8> = (0..64).collect();
        data[20] = 0;
        assert!(gradient(&data, SHALLOW_SCAN).is_some());
        assert_eq!(gradient(&data, DEEP_SCAN), None);

        // Fail-fast probe at offset 31
        let mut data: Vec<u8> = (0..64).collect();
        data[31] = 0;
        assert_eq!(gradient(&data, DEEP_SCAN), None);

        let data: Vec<u8> = (0..64).collect();
        assert_eq!(gradient(&data, DEEP_SCAN).map(|m| m.span()), Some(64));
    }

    #[test]
    fn test_gradient_short_tail_uses_remainder() {
        let data = [1u8, 3, 5, 7];
        assert_eq!(gradient(&data, DEEP_SCAN).map(|m| m.span()), Some(4));
        assert_eq!(gradient(&[1, 3, 5], DEEP_SCAN), None);
    }

    #[test]
    fn test_sparse_hint() {
        assert!(sparse_hint(&[0, 0, 0, 0, 1, 2, 3, 4]));
        assert!(sparse_hint(&[1, 0, 0, 0, 0, 0, 0, 0]));
        assert!(!sparse_hint(&[1, 0, 0, 0, 0, 0, 1, 0]));
        assert!(!sparse_hint(&[0, 0, 0, 0]));
    }

    #[test]
    fn test_bitmask_density_and_saving() {
        // 16 words, one non-zero
        let mut data = vec![0u8; 64];
        data[0..4].copy_from_slice(&[1, 2, 3, 4]);
        let m = bitmask(&data).unwrap();
        assert_eq!(m, Match::Bitmask { len: 64, nonzero: 1 });
        assert_eq!(bitmask_size(64, 1), 2 + 2 + 4);

        // 8 words, two non-zero: 25% density
        let mut data = vec![0u8; 32];
        data[0] = 1;
        data[8] = 1;
        assert_eq!(bitmask(&data), None);

        // 8 words, one non-zero: header 1 + mask 1 + 4 = 6, saves 26
        let mut data = vec![0u8; 32];
        data[0] = 1;
        assert!(bitmask(&data).is_some());

        // 1 word: too small to save anything
        assert_eq!(bitmask(&[0, 0, 0, 0]), None);
    }

    #[test]
    fn test_bitmask_rounds_down_to_words() {
        let mut data = vec![0u8; 66];
        data[0] = 9;
        assert_eq!(bitmask(&data).map(|m| m.span()), Some(64));
    }

    #[test]
    fn test_lexicon_longest_match() {
        let m = lexicon(b"application/json; charset").unwrap();
        let Match::Lexicon { index, len } = m else {
            panic!("expected lexicon match");
        };
        assert_eq!(len, 16);
        assert_eq!(LEXICON[index as usize], b"application/json");

        // "[ERROR]" beats nothing shorter; "ERROR" inside is not a prefix
        assert_eq!(lexicon(b"[ERROR] x").map(|m| m.span()), Some(7));
    }

    #[test]
    fn test_lexicon_skips_unprofitable() {
        // Exact three-byte entries are never emitted
        assert_eq!(lexicon(b"{\"x"), None);
        assert_eq!(lexicon(b"\x00\x01\x02\x03"), None);
        assert_eq!(lexicon(b"nul"), None);
    }

    fn smooth_field(rows: usize) -> Vec<u8> {
        (0..rows * MANIFOLD_STRIDE)
            .map(|i| {
                let (r, c) = (i / MANIFOLD_STRIDE, i % MANIFOLD_STRIDE);
                (40 + r + c) as u8
            })
            .collect()
    }

    #[test]
    fn test_manifold_accepts_smooth_field() {
        let data = smooth_field(16);
        assert_eq!(manifold(&data), Some(Match::Manifold { len: 16 * 64 }));
    }

    #[test]
    fn test_manifold_stops_at_zero_word() {
        let mut data = smooth_field(16);
        data[700..704].fill(0);
        assert_eq!(manifold(&data), Some(Match::Manifold { len: 700 }));

        let mut data = smooth_field(16);
        data[300..304].fill(0);
        assert_eq!(manifold(&data), None);
    }

    #[test]
    fn test_manifold_prefilters() {
        let mut data = smooth_field(16);
        data[0] = 0;
        assert_eq!(manifold(&data), None);
        assert_eq!(manifold(&smooth_field(4)), None);

        let noisy: Vec<u8> = (0..1024u32).map(|i| (i.wrapping_mul(2654435761) >> 13) as u8 | 1).collect();
        assert_eq!(manifold(&noisy), None);
    }

    #[test]
    fn test_predict_average() {
        assert_eq!(predict(10, 20), 15);
        assert_eq!(predict(255, 255), 255);
        assert_eq!(predict(0, 1), 0);
    }
}

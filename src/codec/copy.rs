//! Literal payload copy strategies.
//!
//! Ordinary copies go through the cache. When the destination lives on
//! byte-addressable persistent memory the encoder switches to a streaming
//! copy: unaligned head and tail bytes are copied normally, the aligned bulk
//! is written in 16-byte lines, and a store fence follows so the bytes are
//! ordered ahead of whatever the caller persists next.
//!
//! With the `nt-store` feature on x86_64 the bulk lines use non-temporal
//! stores (`movntdq`) and the fence is `sfence`. Elsewhere the same shape runs
//! with plain stores and an atomic fence, so output is identical either way.

use super::device::HwFlags;

/// Alignment of one streaming store.
pub const STREAM_LINE: usize = 16;

/// How literal bytes are moved into the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralCopy {
    /// `copy_from_slice`
    Plain,
    /// Cache-bypassing line copy plus store fence
    Streaming,
}

impl LiteralCopy {
    /// Pick the strategy for a device's capability flags.
    pub fn for_flags(flags: HwFlags) -> Self {
        if flags.has(HwFlags::PERSISTENT_MEMORY) {
            LiteralCopy::Streaming
        } else {
            LiteralCopy::Plain
        }
    }

    /// Copy `src` into `dst`. Both slices must have the same length.
    pub fn copy(self, dst: &mut [u8], src: &[u8]) {
        debug_assert_eq!(dst.len(), src.len());
        match self {
            LiteralCopy::Plain => dst.copy_from_slice(src),
            LiteralCopy::Streaming => stream_copy(dst, src),
        }
    }
}

fn stream_copy(dst: &mut [u8], src: &[u8]) {
    let head = dst.as_ptr().align_offset(STREAM_LINE).min(dst.len());
    let (dst_head, dst_rest) = dst.split_at_mut(head);
    let (src_head, src_rest) = src.split_at(head);
    dst_head.copy_from_slice(src_head);

    let bulk = dst_rest.len() / STREAM_LINE * STREAM_LINE;
    let (dst_bulk, dst_tail) = dst_rest.split_at_mut(bulk);
    let (src_bulk, src_tail) = src_rest.split_at(bulk);
    for (d, s) in dst_bulk
        .chunks_exact_mut(STREAM_LINE)
        .zip(src_bulk.chunks_exact(STREAM_LINE))
    {
        store_line(d, s);
    }

    dst_tail.copy_from_slice(src_tail);
    persist_barrier();
}

#[cfg(all(feature = "nt-store", target_arch = "x86_64"))]
#[allow(unsafe_code)]
fn store_line(dst: &mut [u8], src: &[u8]) {
    use std::arch::x86_64::{__m128i, _mm_loadu_si128, _mm_stream_si128};

    assert!(dst.len() == STREAM_LINE && src.len() == STREAM_LINE);
    debug_assert_eq!(dst.as_ptr().align_offset(STREAM_LINE), 0);
    // SAFETY: both slices are exactly 16 bytes; `dst` starts on a 16-byte
    // boundary (head peeled in `stream_copy`), as `_mm_stream_si128`
    // requires. SSE2 is part of the x86_64 baseline.
    unsafe {
        let line = _mm_loadu_si128(src.as_ptr().cast::<__m128i>());
        _mm_stream_si128(dst.as_mut_ptr().cast::<__m128i>(), line);
    }
}

#[cfg(not(all(feature = "nt-store", target_arch = "x86_64")))]
fn store_line(dst: &mut [u8], src: &[u8]) {
    dst.copy_from_slice(src);
}

#[cfg(all(feature = "nt-store", target_arch = "x86_64"))]
#[allow(unsafe_code)]
fn persist_barrier() {
    // SAFETY: `sfence` has no memory operands; SSE is baseline on x86_64.
    unsafe { std::arch::x86_64::_mm_sfence() }
}

#[cfg(not(all(feature = "nt-store", target_arch = "x86_64")))]
fn persist_barrier() {
    std::sync::atomic::fence(std::sync::atomic::Ordering::SeqCst);
}

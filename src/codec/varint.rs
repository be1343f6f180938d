//! Length encoding for token headers.
//!
//! Short lengths live in the header's 6-bit field. Longer lengths store the
//! trigger value 63 in the header and stream the remainder as a chain:
//!
//! - zero or more `0xFF` bytes, each adding 255 (at most 32 of them)
//! - one terminator byte `0..=254`, added as-is
//!
//! | Length      | Encoding                        |
//! |-------------|---------------------------------|
//! | 0-62        | header only                     |
//! | 63-317      | header + 1 byte                 |
//! | 318-572     | header + 2 bytes                |
//! | 8223        | header + 32 x `0xFF` + `0x00`   |
//!
//! Manifold tokens carry their total length as a bare chain with no header.

use super::sink::Sink;
use super::token::{Opcode, EXT_CONTINUE, MAX_EXT_BYTES, MAX_TOKEN_LEN, VARINT_TRIGGER};
use crate::error::{OreError, Result, RotCause};

/// Largest value a bare chain can carry.
pub const MAX_CHAIN_VALUE: usize = MAX_EXT_BYTES * 255 + 254;

/// Bytes needed to encode `value` as a bare chain.
pub fn chain_size(value: usize) -> usize {
    value / 255 + 1
}

/// Bytes needed for a header carrying `stored_len`.
pub fn header_size(stored_len: usize) -> usize {
    if stored_len < VARINT_TRIGGER as usize {
        1
    } else {
        1 + chain_size(stored_len - VARINT_TRIGGER as usize)
    }
}

/// Write a bare extension chain.
pub(crate) fn write_chain(sink: &mut Sink<'_>, value: usize) -> Result<()> {
    if value > MAX_CHAIN_VALUE {
        return Err(OreError::Internal(format!(
            "chain value {value} exceeds {MAX_CHAIN_VALUE}"
        )));
    }
    let out = sink.reserve(chain_size(value))?;
    let (continues, last) = out.split_at_mut(value / 255);
    continues.fill(EXT_CONTINUE);
    last[0] = (value % 255) as u8;
    Ok(())
}

/// Write a token header whose length field holds `stored_len`.
pub(crate) fn write_header(sink: &mut Sink<'_>, opcode: Opcode, stored_len: usize) -> Result<()> {
    if stored_len > MAX_TOKEN_LEN {
        return Err(OreError::Internal(format!(
            "{opcode:?} length {stored_len} exceeds {MAX_TOKEN_LEN}"
        )));
    }
    if stored_len < VARINT_TRIGGER as usize {
        return sink.put(opcode.header(stored_len as u8));
    }
    sink.put(opcode.header(VARINT_TRIGGER))?;
    write_chain(sink, stored_len - VARINT_TRIGGER as usize)
}

/// Read a bare chain, returning `(value, bytes_consumed)`.
pub fn read_chain(data: &[u8]) -> std::result::Result<(usize, usize), RotCause> {
    let mut value = 0usize;
    for (pos, &byte) in data.iter().enumerate() {
        if byte != EXT_CONTINUE {
            return Ok((value + byte as usize, pos + 1));
        }
        if pos + 1 > MAX_EXT_BYTES {
            return Err(RotCause::ChainOverflow);
        }
        value += 255;
    }
    Err(RotCause::Truncated)
}

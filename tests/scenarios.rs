//! End-to-end codec scenarios.
//!
//! These tests pin down token classification, length boundaries and the
//! decoder's failure behaviour through the public API only.

use ore::codec::{Opcode, TokenKind};
use ore::{
    bound, compress, compress_with_stats, decompress, decompress_with_stats, BlockCodec,
    DeviceHint, HwFlags, OreError, RotCause, Status, TokenStats,
};

fn encode(block: &[u8], device: DeviceHint) -> (Vec<u8>, TokenStats) {
    let mut dst = vec![0u8; bound(block.len() as u32) as usize];
    let (n, stats) = compress_with_stats(block, &mut dst, device, HwFlags::new()).unwrap();
    dst.truncate(n);
    (dst, stats)
}

fn roundtrip(block: &[u8], device: DeviceHint) -> TokenStats {
    let (packed, stats) = encode(block, device);
    let mut out = vec![0u8; block.len()];
    let (n, decoded) = decompress_with_stats(&packed, &mut out).unwrap();
    assert_eq!(n, block.len());
    assert_eq!(out, block);
    assert_eq!(decoded, stats);
    stats
}

/// Bytes no detector claims: no repeats, no constant slopes, no zero words,
/// and no lexicon lead bytes.
fn literal_only(len: usize) -> Vec<u8> {
    (0..len).map(|i| 0x80 | ((i * i) % 127) as u8).collect()
}

/// Test all-zero blocks become exactly one Isotope token
#[test]
fn test_zero_block_is_single_isotope() {
    for len in [4usize, 5, 63, 100, 4096, 8227] {
        let (packed, stats) = encode(&vec![0u8; len], DeviceHint::SolidState);
        assert_eq!(stats.total_tokens(), 1, "len {len}");
        assert_eq!(stats.count(TokenKind::Isotope), 1);
        assert_eq!(packed.last(), Some(&0));
        assert_eq!(Opcode::split_header(packed[0]).0, Opcode::Isotope);
    }
    let (packed, _) = encode(&[0u8; 4], DeviceHint::SolidState);
    assert_eq!(packed, vec![0x40, 0x00]);
}

/// Test strictly arithmetic sequences become Gradient tokens
#[test]
fn test_arithmetic_sequence_is_gradient() {
    let rising: Vec<u8> = (0..100u32).map(|i| (5 + 2 * i) as u8).collect();
    let falling: Vec<u8> = (0..20u32).map(|i| (250 - 12 * i) as u8).collect();
    let steep = [0u8, 127, 254];

    for data in [&rising, &falling] {
        for device in [DeviceHint::SolidState, DeviceHint::Rotational] {
            let stats = roundtrip(data, device);
            assert_eq!(stats.total_tokens(), 1);
            assert_eq!(stats.count(TokenKind::Gradient), 1);
        }
    }

    // Too short for a run token
    let stats = roundtrip(&steep, DeviceHint::SolidState);
    assert_eq!(stats.count(TokenKind::Gradient), 0);
}

/// Test sparse word tables become a Bitmask token
#[test]
fn test_sparse_words_are_bitmask() {
    let mut block = vec![0u8; 256];
    block[0..4].copy_from_slice(&[1, 5, 2, 7]);
    block[160..164].copy_from_slice(&[9, 9, 9, 9]);

    let (packed, stats) = encode(&block, DeviceHint::SolidState);
    assert_eq!(stats.total_tokens(), 1);
    assert_eq!(stats.count(TokenKind::Bitmask), 1);
    // header + chain, 8 mask bytes, 2 words
    assert_eq!(packed.len(), 2 + 8 + 8);
    roundtrip(&block, DeviceHint::SolidState);
}

/// Test a sparse span too small to save four bytes falls through
#[test]
fn test_unprofitable_bitmask_falls_through() {
    let block = [1u8, 0, 0, 0, 0, 0, 0, 0];
    let stats = roundtrip(&block, DeviceHint::SolidState);
    assert_eq!(stats.count(TokenKind::Bitmask), 0);
    assert_eq!(stats.covered(TokenKind::Literal), 1);
    assert_eq!(stats.covered(TokenKind::Isotope), 7);
}

/// Test Isotope run boundary at the maximum token span
#[test]
fn test_isotope_boundary_exactness() {
    let stats = roundtrip(&vec![0xA5u8; 8227], DeviceHint::SolidState);
    assert_eq!(stats.total_tokens(), 1);

    let stats = roundtrip(&vec![0xA5u8; 8228], DeviceHint::SolidState);
    assert_eq!(stats.total_tokens(), 2);
    assert_eq!(stats.covered(TokenKind::Isotope), 8227);
    assert_eq!(stats.total_bytes(), 8228);

    let stats = roundtrip(&vec![0xA5u8; 8227 + 4], DeviceHint::SolidState);
    assert_eq!(stats.count(TokenKind::Isotope), 2);
    assert_eq!(stats.covered(TokenKind::Isotope), 8231);
}

/// Test Literal run boundary at the maximum token length
#[test]
fn test_literal_boundary_exactness() {
    let (packed, stats) = encode(&literal_only(8223), DeviceHint::Tape);
    assert_eq!(stats.count(TokenKind::Literal), 1);
    assert_eq!(packed.len(), 1 + 32 + 1 + 8223);
    assert_eq!(packed[0], 0x3F);
    assert!(packed[1..33].iter().all(|&b| b == 0xFF));
    assert_eq!(packed[33], 0x00);

    let stats = roundtrip(&literal_only(8224), DeviceHint::Tape);
    assert_eq!(stats.count(TokenKind::Literal), 2);
    assert_eq!(stats.covered(TokenKind::Literal), 8224);
}

/// Test 64 KiB counter ramp on rotational media
#[test]
fn test_counter_ramp_rotational_ratio() {
    let block: Vec<u8> = (0..65536u32).map(|i| (i % 256) as u8).collect();
    let (packed, stats) = encode(&block, DeviceHint::Rotational);

    assert!(packed.len() * 20 < block.len(), "got {} bytes", packed.len());
    assert_eq!(stats.count(TokenKind::Gradient), 256);
    assert_eq!(stats.covered(TokenKind::Gradient), block.len());
    roundtrip(&block, DeviceHint::Rotational);
}

/// Test lexicon substitution on protocol text
#[test]
fn test_protocol_text_uses_lexicon() {
    let text = b"GET /index HTTP/1.1\r\nHost: localhost\r\nConnection: keep-alive\r\n\r\n";
    let stats = roundtrip(text, DeviceHint::Rotational);
    assert!(stats.count(TokenKind::Lexicon) >= 4);

    let json = br#"{"id":7,"name":"probe","value":null,"status":true}"#;
    let stats = roundtrip(json, DeviceHint::SolidState);
    assert!(stats.count(TokenKind::Lexicon) >= 3);
}

/// Smooth 2D field whose rows are not linear.
fn image_field(rows: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(rows * 64);
    for r in 0..rows {
        for c in 0..64 {
            data.push((100 + (c * 5) % 7 + r) as u8);
        }
    }
    data
}

/// Test Manifold encoding on solid-state and its absence on rotational media
#[test]
fn test_manifold_roundtrip() {
    let block = image_field(64);

    let stats = roundtrip(&block, DeviceHint::SolidState);
    assert!(stats.count(TokenKind::Manifold) >= 1);
    assert_eq!(stats.covered(TokenKind::Literal), 64);

    let stats = roundtrip(&block, DeviceHint::Zoned);
    assert!(stats.count(TokenKind::Manifold) >= 1);

    let stats = roundtrip(&block, DeviceHint::Rotational);
    assert_eq!(stats.count(TokenKind::Manifold), 0);
}

/// Test a Manifold token placed after other tokens decodes from its own span
#[test]
fn test_manifold_after_prior_tokens() {
    let mut block = vec![0u8; 100];
    block.extend_from_slice(&image_field(20));
    block.extend_from_slice(&[0u8; 40]);

    let stats = roundtrip(&block, DeviceHint::SolidState);
    assert!(stats.count(TokenKind::Manifold) >= 1);
    assert_eq!(stats.covered(TokenKind::Isotope), 140);
}

/// Test no bytes are written past the last valid token on Data Rot
#[test]
fn test_no_phantom_writes() {
    let mut block = vec![0u8; 100];
    block.extend((10..60u8).collect::<Vec<_>>());
    block.extend_from_slice(&[7u8; 50]);
    let (mut packed, _) = encode(&block, DeviceHint::Tape);

    // Gradient of 6 bytes from 250 with slope 2 overflows
    packed.extend_from_slice(&[0x80 | 2, 250, 2]);

    let mut dst = vec![0xEEu8; 400];
    let err = decompress(&packed, &mut dst).unwrap_err();
    assert_eq!(err.rot_cause(), Some(RotCause::GradientOverflow));
    assert_eq!(&dst[..block.len()], &block[..]);
    assert!(dst[block.len()..].iter().all(|&b| b == 0xEE));
}

/// Test escape selectors other than Lexicon and Manifold are rejected
#[test]
fn test_reserved_escape_is_rot() {
    let mut dst = [0u8; 64];
    for selector in [0x00u8, 0x03, 0x10, 0xFF] {
        let err = decompress(&[0x00, selector], &mut dst).unwrap_err();
        assert!(matches!(
            err,
            OreError::DataRot {
                offset: 0,
                cause: RotCause::UnknownEscape(s)
            } if s == selector
        ));
    }
}

/// Test declared length larger than the destination
#[test]
fn test_decoder_out_of_space() {
    let (packed, _) = encode(&[9u8; 1000], DeviceHint::SolidState);
    let mut dst = vec![0u8; 999];
    let err = decompress(&packed, &mut dst).unwrap_err();
    assert_eq!(err.status(), Status::OutOfSpace);
}

/// Test encoder out of space and the bound
#[test]
fn test_encoder_capacity() {
    let block = literal_only(1000);
    let mut dst = vec![0u8; 500];
    let err = compress(&block, &mut dst, DeviceHint::Tape, HwFlags::new()).unwrap_err();
    assert_eq!(err.status(), Status::OutOfSpace);

    let mut dst = vec![0u8; bound(1000) as usize];
    assert!(compress(&block, &mut dst, DeviceHint::Tape, HwFlags::new()).is_ok());
}

/// Test block ceiling
#[test]
fn test_block_ceiling_is_invalid_argument() {
    let block = vec![0u8; ore::MAX_BLOCK_SIZE + 1];
    let mut dst = vec![0u8; 1024];
    let err = compress(&block, &mut dst, DeviceHint::SolidState, HwFlags::new()).unwrap_err();
    assert_eq!(err.status(), Status::InvalidArgument);
}

/// Test concurrent encoders produce identical output
#[test]
fn test_parallel_determinism() {
    let mut block = image_field(32);
    block.extend_from_slice(b"Content-Type: application/json\r\n");
    block.extend_from_slice(&[0u8; 500]);
    let (expected, _) = encode(&block, DeviceHint::SolidState);

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| encode(&block, DeviceHint::SolidState).0))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}

/// Test facade and free functions agree
#[test]
fn test_block_codec_matches_free_functions() {
    let block = image_field(16);
    let codec = BlockCodec::new(DeviceHint::Zoned)
        .with_hw_flags(HwFlags::new().with(HwFlags::PERSISTENT_MEMORY));
    let result = codec.compress_to_vec(&block).unwrap();
    let (packed, stats) = encode(&block, DeviceHint::Zoned);
    assert_eq!(result.data, packed);
    assert_eq!(result.stats, stats);
}

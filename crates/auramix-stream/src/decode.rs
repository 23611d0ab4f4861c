//! Sample format decoding: every input format is converted to PCM16
//! (the wire's default and the mixer's working format) at push time.

use byteorder::{ByteOrder, LittleEndian};

use auramix_proto::StreamFlags;

use crate::error::{Error, Result};

/// Decodes one ITU-T G.711 µ-law byte to a linear PCM16 sample.
pub fn ulaw_decode(byte: u8) -> i16 {
    let u = !byte;
    let sign = u & 0x80;
    let exponent = (u >> 4) & 0x07;
    let mantissa = u & 0x0f;
    let magnitude = ((i32::from(mantissa) << 3) + 0x84) << exponent;
    let sample = magnitude - 0x84;
    if sign != 0 {
        -sample as i16
    } else {
        sample as i16
    }
}

/// Decodes one ITU-T G.711 A-law byte to a linear PCM16 sample.
pub fn alaw_decode(byte: u8) -> i16 {
    let a = byte ^ 0x55;
    let sign = a & 0x80;
    let exponent = (a >> 4) & 0x07;
    let mantissa = a & 0x0f;
    let mut magnitude = i32::from(mantissa) << 4;
    if exponent == 0 {
        magnitude |= 0x08;
    } else {
        magnitude = (magnitude | 0x108) << (exponent - 1);
    }
    if sign != 0 {
        magnitude as i16
    } else {
        (-magnitude) as i16
    }
}

/// Decodes a signed 24-bit little-endian sample (3 bytes) to PCM16 by
/// keeping the top 16 bits.
fn pcm24_decode_one(bytes: &[u8]) -> i16 {
    let raw = i32::from(bytes[0]) | (i32::from(bytes[1]) << 8) | (i32::from(bytes[2]) << 16);
    let signed = (raw << 8) >> 8; // sign-extend from 24 to 32 bits
    (signed >> 8) as i16
}

/// Decodes a signed 32-bit little-endian sample to PCM16 by keeping the
/// top 16 bits.
fn pcm32_decode_one(bytes: &[u8]) -> i16 {
    let raw = LittleEndian::read_i32(bytes);
    (raw >> 16) as i16
}

/// Decodes a 32-bit little-endian float sample in `[-1.0, 1.0]` to PCM16.
fn f32_decode_one(bytes: &[u8]) -> i16 {
    let raw = LittleEndian::read_f32(bytes);
    (raw.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}

fn decode_fixed_width(
    raw: &[u8],
    frame_bytes: usize,
    format: &'static str,
    one: impl Fn(&[u8]) -> i16,
) -> Result<Vec<i16>> {
    if raw.len() % frame_bytes != 0 {
        return Err(Error::TruncatedFrame {
            format,
            frame_bytes,
            got: raw.len(),
        });
    }
    Ok(raw.chunks_exact(frame_bytes).map(one).collect())
}

/// Decodes a `DATA` payload's raw bytes into PCM16 samples according to
/// the stream's negotiated decode format (spec.md §6.1). An empty
/// `flags` means the bytes are already little-endian PCM16.
pub fn decode(flags: StreamFlags, raw: &[u8]) -> Result<Vec<i16>> {
    if flags.contains(StreamFlags::ULAW_DECODE) {
        Ok(raw.iter().copied().map(ulaw_decode).collect())
    } else if flags.contains(StreamFlags::ALAW_DECODE) {
        Ok(raw.iter().copied().map(alaw_decode).collect())
    } else if flags.contains(StreamFlags::PCM24_DECODE) {
        decode_fixed_width(raw, 3, "pcm24", pcm24_decode_one)
    } else if flags.contains(StreamFlags::PCM32_DECODE) {
        decode_fixed_width(raw, 4, "pcm32", pcm32_decode_one)
    } else if flags.contains(StreamFlags::F32_DECODE) {
        decode_fixed_width(raw, 4, "f32", f32_decode_one)
    } else {
        decode_fixed_width(raw, 2, "pcm16", |b| LittleEndian::read_i16(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ulaw_silence_decodes_near_zero() {
        // 0xff is the µ-law encoding of (positive) silence.
        assert!(ulaw_decode(0xff).abs() < 10);
    }

    #[test]
    fn alaw_silence_decodes_near_zero() {
        assert!(alaw_decode(0xd5).abs() < 10);
    }

    #[test]
    fn pcm16_passthrough_roundtrips() {
        let raw = 1234i16.to_le_bytes();
        let decoded = decode(StreamFlags::empty(), &raw).unwrap();
        assert_eq!(decoded, vec![1234]);
    }

    #[test]
    fn f32_unity_maps_to_i16_max() {
        let raw = 1.0f32.to_le_bytes();
        let decoded = decode(StreamFlags::F32_DECODE, &raw).unwrap();
        assert_eq!(decoded, vec![i16::MAX]);
    }

    #[test]
    fn truncated_pcm16_is_rejected() {
        assert!(decode(StreamFlags::empty(), &[0u8]).is_err());
    }

    #[test]
    fn pcm32_keeps_top_bits() {
        let raw = (i32::MAX).to_le_bytes();
        let decoded = decode(StreamFlags::PCM32_DECODE, &raw).unwrap();
        assert_eq!(decoded, vec![i16::MAX]);
    }
}

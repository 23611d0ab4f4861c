//! Stream decode flag bits (spec.md §6.1).
//!
//! Bit 0 is mutually exclusive with bits 1-4: a stream decodes at most one
//! of µ-law / A-law / PCM24 / PCM32 / float32. The absence of any bit means
//! raw PCM16, the wire's default sample format.

use bitflags::bitflags;

bitflags! {
    /// Raw wire representation of `STREAM_SET_FLAGS`/`STREAM_GET_FLAGS` payloads.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StreamFlags: u32 {
        const ULAW_DECODE = 1 << 0;
        const PCM32_DECODE = 1 << 1;
        const PCM24_DECODE = 1 << 2;
        const ALAW_DECODE = 1 << 3;
        const F32_DECODE = 1 << 4;
    }
}

/// All bits the server understands. Anything outside this mask is rejected
/// with `STATUS_REPLY_INVAL`.
pub const VALID_STREAM_FLAG_MASK: u32 = StreamFlags::all().bits();

/// The mutually-exclusive decode-format bits (everything but bit 0, which
/// historically stood alone but is still exclusive with the others).
const FORMAT_BITS: u32 = StreamFlags::ULAW_DECODE.bits()
    | StreamFlags::PCM32_DECODE.bits()
    | StreamFlags::ALAW_DECODE.bits()
    | StreamFlags::PCM24_DECODE.bits()
    | StreamFlags::F32_DECODE.bits();

impl StreamFlags {
    /// Parses raw wire flags, rejecting unknown bits or more than one
    /// decode format bit set at once.
    pub fn parse(raw: u32) -> Option<StreamFlags> {
        if raw & !VALID_STREAM_FLAG_MASK != 0 {
            return None;
        }
        let flags = StreamFlags::from_bits_truncate(raw);
        if (flags.bits() & FORMAT_BITS).count_ones() > 1 {
            return None;
        }
        Some(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_bits() {
        assert!(StreamFlags::parse(1 << 31).is_none());
    }

    #[test]
    fn rejects_conflicting_format_bits() {
        let raw = StreamFlags::ULAW_DECODE.bits() | StreamFlags::F32_DECODE.bits();
        assert!(StreamFlags::parse(raw).is_none());
    }

    #[test]
    fn accepts_single_format_bit() {
        assert_eq!(
            StreamFlags::parse(StreamFlags::F32_DECODE.bits()),
            Some(StreamFlags::F32_DECODE)
        );
    }

    #[test]
    fn empty_flags_mean_pcm16() {
        assert_eq!(StreamFlags::parse(0), Some(StreamFlags::empty()));
    }
}

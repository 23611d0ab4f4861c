//! Decode -> resample -> ring, exercised end to end as a stream would
//! drive it. Channel count is never touched by this pipeline; the ring
//! holds samples in the stream's own channel layout.

use auramix_proto::StreamFlags;
use auramix_stream::{convert_rate, decode, StreamRing};

#[test]
fn ulaw_mono_8khz_into_48khz_ring() {
    let silence_byte = 0xffu8; // positive-silence µ-law code
    let raw = vec![silence_byte; 80]; // 10ms at 8kHz mono
    let decoded = decode(StreamFlags::ULAW_DECODE, &raw).unwrap();
    assert_eq!(decoded.len(), 80);

    let converted = convert_rate(&decoded, 1, 8000, 48000);
    // 10ms @ 48kHz mono = 480 frames * 1 channel.
    assert_eq!(converted.len(), 480);

    let ring = StreamRing::new(converted.len() * 2);
    ring.push(&converted);
    let mut out = vec![0i16; converted.len()];
    let filled = ring.pop_into(&mut out);
    assert_eq!(filled, converted.len());
    assert_eq!(out, converted);
}

#[test]
fn pcm16_passthrough_keeps_exact_samples() {
    let samples: Vec<i16> = vec![100, -100, 200, -200];
    let raw: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    let decoded = decode(StreamFlags::empty(), &raw).unwrap();
    assert_eq!(decoded, samples);
}

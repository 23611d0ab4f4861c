//! Frame layout, transmission, and reception (spec.md §4.1).
//!
//! ```text
//! magic(4) data_offset(4) total_size(4) opcode(4) transmission_id(4) client_id(4)
//! [padding to data_offset] payload[total_size - data_offset]
//! ```
//!
//! `magic`, `data_offset`, `total_size`, and `opcode` are network
//! (big-endian) order; `transmission_id` and `client_id` are little-endian.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicU32, Ordering};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};
use crate::opcode::Opcode;

/// Fixed 32-bit frame magic, `0x0B05A7D1` in network byte order.
pub const MAGIC: u32 = 0x0b05a7d1;

/// Size in bytes of the base header fields (`magic` through `client_id`).
/// `data_offset` must never be smaller than this.
pub const BASE_HEADER_SIZE: u32 = 24;

/// A decoded wire frame, reassembled into library-friendly fields. This
/// type never appears on the wire verbatim — it is the in-memory
/// representation [`transmit`] serializes from and [`receive`] parses
/// into.
#[derive(Debug, Clone)]
pub struct Packet {
    pub opcode: Opcode,
    /// Set by [`transmit`] to either the caller-supplied reply-to id or a
    /// freshly minted one; read from the wire by [`receive`].
    pub transmission_id: u32,
    /// Whether `transmission_id` should be sent as-is (a reply correlated
    /// to a specific request) rather than freshly assigned.
    pub transmission_id_valid: bool,
    pub client_id: u32,
    pub payload: Vec<u8>,
}

impl Packet {
    /// Build a fresh request/notification with no pre-assigned
    /// transmission id; [`transmit`] will mint one.
    pub fn new(opcode: Opcode, client_id: u32, payload: Vec<u8>) -> Self {
        Self {
            opcode,
            transmission_id: 0,
            transmission_id_valid: false,
            client_id,
            payload,
        }
    }

    /// Build a reply correlated to `request`'s transmission id.
    pub fn reply_to(request: &Packet, opcode: Opcode, payload: Vec<u8>) -> Self {
        Self {
            opcode,
            transmission_id: request.transmission_id,
            transmission_id_valid: true,
            client_id: request.client_id,
            payload,
        }
    }
}

/// Per-instance monotonic transmission id counter (spec.md §3: "a single
/// monotonic counter per client library instance"). Exposed as an
/// explicit value rather than an ambient static so callers (the server,
/// a test client, a real client binary) each own their instance.
#[derive(Debug, Default)]
pub struct TransmissionIds(AtomicU32);

impl TransmissionIds {
    pub fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    /// Returns the next id, starting at 1.
    pub fn next(&self) -> u32 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Serializes and sends `pkt`, retrying on `ErrorKind::Interrupted`
/// (handled for us by [`Write::write_all`]'s documented retry behavior).
/// If `pkt` was not already marked as a reply (`transmission_id_valid`),
/// a fresh id is drawn from `ids` and written back into `pkt`. Returns the
/// transmission id that was actually sent, so callers can correlate a
/// later reply.
pub fn transmit<W: Write>(writer: &mut W, pkt: &mut Packet, ids: &TransmissionIds) -> Result<u32> {
    if !pkt.transmission_id_valid {
        pkt.transmission_id = ids.next();
        pkt.transmission_id_valid = true;
    }

    let total_size = BASE_HEADER_SIZE + pkt.payload.len() as u32;
    let mut header = Vec::with_capacity(BASE_HEADER_SIZE as usize);
    header.write_u32::<BigEndian>(MAGIC)?;
    header.write_u32::<BigEndian>(BASE_HEADER_SIZE)?;
    header.write_u32::<BigEndian>(total_size)?;
    header.write_u32::<BigEndian>(pkt.opcode.0)?;
    header.write_u32::<LittleEndian>(pkt.transmission_id)?;
    header.write_u32::<LittleEndian>(pkt.client_id)?;

    writer.write_all(&header)?;
    if !pkt.payload.is_empty() {
        writer.write_all(&pkt.payload)?;
    }
    writer.flush()?;

    Ok(pkt.transmission_id)
}

/// Reads and decodes one frame. Reads happen in phases so that a future
/// larger base header (`data_offset` grown beyond 24) stays
/// forward-compatible: unknown extra header bytes between the base
/// header and the payload are read and discarded.
pub fn receive<R: Read>(reader: &mut R) -> Result<Packet> {
    let mut prefix = [0u8; 8];
    read_exact_or_closed(reader, &mut prefix)?;
    let magic = (&prefix[0..4]).read_u32::<BigEndian>()?;
    if magic != MAGIC {
        return Err(Error::BadMagic(magic));
    }
    let data_offset = (&prefix[4..8]).read_u32::<BigEndian>()?;
    if data_offset < BASE_HEADER_SIZE {
        return Err(Error::HeaderTooShort(data_offset));
    }

    let mut rest = [0u8; 16];
    read_exact_or_closed(reader, &mut rest)?;
    let total_size = (&rest[0..4]).read_u32::<BigEndian>()?;
    let opcode = (&rest[4..8]).read_u32::<BigEndian>()?;
    let transmission_id = (&rest[8..12]).read_u32::<LittleEndian>()?;
    let client_id = (&rest[12..16]).read_u32::<LittleEndian>()?;

    let extra = data_offset - BASE_HEADER_SIZE;
    if extra > 0 {
        let mut sink = vec![0u8; extra as usize];
        read_exact_or_closed(reader, &mut sink)?;
    }

    if total_size < data_offset {
        return Err(Error::SizeUnderflow {
            total_size,
            data_offset,
        });
    }
    let payload_len = (total_size - data_offset) as usize;
    let mut payload = vec![0u8; payload_len];
    if payload_len > 0 {
        read_exact_or_closed(reader, &mut payload)?;
    }

    Ok(Packet {
        opcode: Opcode(opcode),
        transmission_id,
        transmission_id_valid: true,
        client_id,
        payload,
    })
}

/// Like `Read::read_exact`, but a zero-byte read (the peer closing the
/// socket) is reported as [`Error::PeerClosed`] instead of
/// `UnexpectedEof`, and `ErrorKind::Interrupted` is retried.
fn read_exact_or_closed<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Err(Error::PeerClosed),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn rejects_bad_magic() {
        let mut buf = Vec::new();
        buf.write_u32::<BigEndian>(0xdead_beef).unwrap();
        buf.write_u32::<BigEndian>(BASE_HEADER_SIZE).unwrap();
        buf.extend_from_slice(&[0u8; 16]);
        let mut cursor = Cursor::new(buf);
        let err = receive(&mut cursor).unwrap_err();
        assert!(matches!(err, Error::BadMagic(0xdead_beef)));
    }

    #[test]
    fn rejects_short_data_offset() {
        let mut buf = Vec::new();
        buf.write_u32::<BigEndian>(MAGIC).unwrap();
        buf.write_u32::<BigEndian>(10).unwrap();
        let mut cursor = Cursor::new(buf);
        let err = receive(&mut cursor).unwrap_err();
        assert!(matches!(err, Error::HeaderTooShort(10)));
    }

    #[test]
    fn roundtrip_preserves_fields() {
        let ids = TransmissionIds::new();
        let mut pkt = Packet::new(Opcode::NOP, 7, vec![1, 2, 3, 4]);
        let mut wire = Vec::new();
        let sent_id = transmit(&mut wire, &mut pkt, &ids).unwrap();

        let mut cursor = Cursor::new(wire);
        let decoded = receive(&mut cursor).unwrap();
        assert_eq!(decoded.opcode, Opcode::NOP);
        assert_eq!(decoded.client_id, 7);
        assert_eq!(decoded.transmission_id, sent_id);
        assert_eq!(decoded.payload, vec![1, 2, 3, 4]);
    }

    #[test]
    fn empty_read_is_peer_closed() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        let err = receive(&mut cursor).unwrap_err();
        assert!(matches!(err, Error::PeerClosed));
    }

    #[test]
    fn forward_compatible_header_padding_is_discarded() {
        let ids = TransmissionIds::new();
        let mut pkt = Packet::new(Opcode::NOP, 1, vec![9, 9]);
        pkt.transmission_id = 42;
        pkt.transmission_id_valid = true;

        // Hand-encode with a larger data_offset carrying two extra bytes
        // a future protocol revision might add.
        let mut wire = Vec::new();
        wire.write_u32::<BigEndian>(MAGIC).unwrap();
        wire.write_u32::<BigEndian>(BASE_HEADER_SIZE + 2).unwrap();
        wire.write_u32::<BigEndian>(BASE_HEADER_SIZE + 2 + 2)
            .unwrap();
        wire.write_u32::<BigEndian>(pkt.opcode.0).unwrap();
        wire.write_u32::<LittleEndian>(pkt.transmission_id)
            .unwrap();
        wire.write_u32::<LittleEndian>(pkt.client_id).unwrap();
        wire.extend_from_slice(&[0xff, 0xff]); // unknown extra header bytes
        wire.extend_from_slice(&pkt.payload);

        let mut cursor = Cursor::new(wire);
        let decoded = receive(&mut cursor).unwrap();
        assert_eq!(decoded.payload, vec![9, 9]);
        assert_eq!(decoded.transmission_id, 42);
        let _ = ids; // unused in this hand-encoded test
    }
}

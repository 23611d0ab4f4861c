//! Typed payload encodings carried inside frame bodies (spec.md §6.1).
//!
//! All payload fields are little-endian, unlike the frame header's mixed
//! byte order. Variable-length payloads (names, connection listings) put
//! their fixed fields first and the variable tail last.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};

fn require_len(buf: &[u8], expected: usize) -> Result<()> {
    if buf.len() < expected {
        return Err(Error::PayloadTooShort {
            expected,
            got: buf.len(),
        });
    }
    Ok(())
}

fn read_str(buf: &[u8]) -> Result<String> {
    String::from_utf8(buf.to_vec()).map_err(|_| Error::BadString)
}

/// `id` a stream/connection/output volume target is addressed by.
pub type TargetId = u32;

/// Kind discriminant for an enumerated output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum OutputKind {
    Speaker = 0,
    LineOut = 1,
    Headphone = 2,
    Other = 0xffff,
}

impl OutputKind {
    pub fn from_wire(v: u16) -> Self {
        match v {
            0 => Self::Speaker,
            1 => Self::LineOut,
            2 => Self::Headphone,
            _ => Self::Other,
        }
    }
}

/// `OPEN_STREAM` request payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenStreamPayload {
    pub output_id: u16,
    pub sample_rate: u32,
    pub channels: u8,
    pub volume: f32,
}

impl OpenStreamPayload {
    /// `output_id(2) + pad(1) + channels(1) + sample_rate(4) + volume(4)`.
    const WIRE_SIZE: usize = 12;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::WIRE_SIZE);
        buf.write_u16::<LittleEndian>(self.output_id).unwrap();
        buf.write_u8(0).unwrap(); // pad
        buf.write_u8(self.channels).unwrap();
        buf.write_u32::<LittleEndian>(self.sample_rate).unwrap();
        buf.write_f32::<LittleEndian>(self.volume).unwrap();
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        require_len(buf, Self::WIRE_SIZE)?;
        let output_id = (&buf[0..2]).read_u16::<LittleEndian>()?;
        let channels = buf[3];
        let sample_rate = (&buf[4..8]).read_u32::<LittleEndian>()?;
        let volume = (&buf[8..12]).read_f32::<LittleEndian>()?;
        Ok(Self {
            output_id,
            sample_rate,
            channels,
            volume,
        })
    }
}

/// `OPEN_STREAM_REPLY` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenStreamReply {
    pub stream_id: u16,
}

impl OpenStreamReply {
    pub fn encode(&self) -> Vec<u8> {
        self.stream_id.to_le_bytes().to_vec()
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        require_len(buf, 2)?;
        Ok(Self {
            stream_id: (&buf[0..2]).read_u16::<LittleEndian>()?,
        })
    }
}

/// `CLOSE_STREAM` request payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseStreamPayload {
    pub stream_id: u16,
}

impl CloseStreamPayload {
    pub fn encode(&self) -> Vec<u8> {
        self.stream_id.to_le_bytes().to_vec()
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        require_len(buf, 2)?;
        Ok(Self {
            stream_id: (&buf[0..2]).read_u16::<LittleEndian>()?,
        })
    }
}

/// `DATA` request payload: target stream plus raw encoded audio bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPayload {
    pub stream_id: u16,
    pub samples: Vec<u8>,
}

impl DataPayload {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(2 + self.samples.len());
        buf.write_u16::<LittleEndian>(self.stream_id).unwrap();
        buf.extend_from_slice(&self.samples);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        require_len(buf, 2)?;
        Ok(Self {
            stream_id: (&buf[0..2]).read_u16::<LittleEndian>()?,
            samples: buf[2..].to_vec(),
        })
    }
}

/// `QUERY_OUTPUT_DEVICE` request payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOutputDevicePayload {
    /// `Opcode::DEFAULT_OUTPUT_ID` means "the configured default output".
    pub output_id: u16,
}

impl QueryOutputDevicePayload {
    pub fn encode(&self) -> Vec<u8> {
        self.output_id.to_le_bytes().to_vec()
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        require_len(buf, 2)?;
        Ok(Self {
            output_id: (&buf[0..2]).read_u16::<LittleEndian>()?,
        })
    }
}

/// `QUERY_OUTPUT_DEVICE_REPLY` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOutputDeviceReply {
    pub output_id: u16,
    pub kind: u16,
    pub sample_rate: u32,
    pub channels: u16,
}

impl QueryOutputDeviceReply {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(10);
        buf.write_u16::<LittleEndian>(self.output_id).unwrap();
        buf.write_u16::<LittleEndian>(self.kind).unwrap();
        buf.write_u32::<LittleEndian>(self.sample_rate).unwrap();
        buf.write_u16::<LittleEndian>(self.channels).unwrap();
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        require_len(buf, 10)?;
        Ok(Self {
            output_id: (&buf[0..2]).read_u16::<LittleEndian>()?,
            kind: (&buf[2..4]).read_u16::<LittleEndian>()?,
            sample_rate: (&buf[4..8]).read_u32::<LittleEndian>()?,
            channels: (&buf[8..10]).read_u16::<LittleEndian>()?,
        })
    }
}

/// A single entry in an output-enumeration listing. Packed to 8 bytes so a
/// listing is just a flat array of these, no per-entry stepping needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputDeviceDesc {
    pub id: u16,
    pub kind: u16,
    pub channels: u16,
    pub reserved: u16,
}

impl OutputDeviceDesc {
    pub const WIRE_SIZE: usize = 8;

    pub fn encode(&self) -> [u8; 8] {
        let mut buf = [0u8; 8];
        (&mut buf[0..2])
            .write_u16::<LittleEndian>(self.id)
            .unwrap();
        (&mut buf[2..4])
            .write_u16::<LittleEndian>(self.kind)
            .unwrap();
        (&mut buf[4..6])
            .write_u16::<LittleEndian>(self.channels)
            .unwrap();
        (&mut buf[6..8])
            .write_u16::<LittleEndian>(self.reserved)
            .unwrap();
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        require_len(buf, Self::WIRE_SIZE)?;
        Ok(Self {
            id: (&buf[0..2]).read_u16::<LittleEndian>()?,
            kind: (&buf[2..4]).read_u16::<LittleEndian>()?,
            channels: (&buf[4..6]).read_u16::<LittleEndian>()?,
            reserved: (&buf[6..8]).read_u16::<LittleEndian>()?,
        })
    }
}

/// `*_SET_VOLUME` request payload (stream / output / connection volume,
/// distinguished only by which opcode carries it). `volume` is a wire
/// percentage in `[0, 100+]`, not yet normalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetVolumePayload {
    pub target_id: TargetId,
    pub volume: f32,
}

impl SetVolumePayload {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8);
        buf.write_u32::<LittleEndian>(self.target_id).unwrap();
        buf.write_f32::<LittleEndian>(self.volume).unwrap();
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        require_len(buf, 8)?;
        Ok(Self {
            target_id: (&buf[0..4]).read_u32::<LittleEndian>()?,
            volume: (&buf[4..8]).read_f32::<LittleEndian>()?,
        })
    }
}

/// `*_GET_VOLUME` request payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetVolumePayload {
    pub target_id: TargetId,
}

impl GetVolumePayload {
    pub fn encode(&self) -> Vec<u8> {
        self.target_id.to_le_bytes().to_vec()
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        require_len(buf, 4)?;
        Ok(Self {
            target_id: (&buf[0..4]).read_u32::<LittleEndian>()?,
        })
    }
}

/// `GET_VOLUME_REPLY` payload, shared by all three volume-target kinds.
/// `volume` is a wire percentage in `[0, 100+]`, denormalized from the
/// server's internal `[0,1]` representation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GetVolumeReply {
    pub volume: f32,
}

impl GetVolumeReply {
    pub fn encode(&self) -> Vec<u8> {
        self.volume.to_le_bytes().to_vec()
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        require_len(buf, 4)?;
        Ok(Self {
            volume: (&buf[0..4]).read_f32::<LittleEndian>()?,
        })
    }
}

/// `STREAM_SET_FLAGS` request payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSetFlagsPayload {
    pub stream_id: u16,
    pub flags: u32,
}

impl StreamSetFlagsPayload {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(6);
        buf.write_u16::<LittleEndian>(self.stream_id).unwrap();
        buf.write_u32::<LittleEndian>(self.flags).unwrap();
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        require_len(buf, 6)?;
        Ok(Self {
            stream_id: (&buf[0..2]).read_u16::<LittleEndian>()?,
            flags: (&buf[2..6]).read_u32::<LittleEndian>()?,
        })
    }
}

/// `STREAM_GET_FLAGS` request payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamGetFlagsPayload {
    pub stream_id: u16,
}

impl StreamGetFlagsPayload {
    pub fn encode(&self) -> Vec<u8> {
        self.stream_id.to_le_bytes().to_vec()
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        require_len(buf, 2)?;
        Ok(Self {
            stream_id: (&buf[0..2]).read_u16::<LittleEndian>()?,
        })
    }
}

/// `STREAM_GET_FLAGS_REPLY` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamGetFlagsReply {
    pub flags: u32,
}

impl StreamGetFlagsReply {
    pub fn encode(&self) -> Vec<u8> {
        self.flags.to_le_bytes().to_vec()
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        require_len(buf, 4)?;
        Ok(Self {
            flags: (&buf[0..4]).read_u32::<LittleEndian>()?,
        })
    }
}

/// `SET_NAME` request payload: the caller's new UTF-8 name, filling the
/// whole payload. The connection renamed is always the caller
/// (`client_id` from the frame header), never an explicit target field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetNamePayload {
    pub name: String,
}

impl SetNamePayload {
    pub fn encode(&self) -> Vec<u8> {
        self.name.as_bytes().to_vec()
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        Ok(Self { name: read_str(buf)? })
    }
}

/// `INITIAL_CONNECTION_REQUEST` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialConnectionRequest {
    pub protocol_version: u32,
}

impl InitialConnectionRequest {
    pub fn encode(&self) -> Vec<u8> {
        self.protocol_version.to_le_bytes().to_vec()
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        require_len(buf, 4)?;
        Ok(Self {
            protocol_version: (&buf[0..4]).read_u32::<LittleEndian>()?,
        })
    }
}

/// `INITIAL_CONNECTION_REPLY` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialConnectionReply {
    pub client_id: u32,
    pub protocol_version: u32,
    pub default_output_id: u16,
}

impl InitialConnectionReply {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(10);
        buf.write_u32::<LittleEndian>(self.client_id).unwrap();
        buf.write_u32::<LittleEndian>(self.protocol_version)
            .unwrap();
        buf.write_u16::<LittleEndian>(self.default_output_id)
            .unwrap();
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        require_len(buf, 10)?;
        Ok(Self {
            client_id: (&buf[0..4]).read_u32::<LittleEndian>()?,
            protocol_version: (&buf[4..8]).read_u32::<LittleEndian>()?,
            default_output_id: (&buf[8..10]).read_u16::<LittleEndian>()?,
        })
    }
}

/// One entry in a `QUERY_CONNECTIONS_REPLY` listing. Variable length (the
/// name tail), so each entry is prefixed with its own total byte size —
/// readers step through the listing `entry_size` bytes at a time rather
/// than assuming a fixed stride.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDesc {
    pub connection_id: u32,
    pub name: String,
}

impl ConnectionDesc {
    /// Bytes before the variable-length name: `entry_size(2) + id(4)`.
    const FIXED_PREFIX: usize = 6;

    fn encode_into(&self, out: &mut Vec<u8>) {
        let entry_size = Self::FIXED_PREFIX + self.name.len();
        out.write_u16::<LittleEndian>(entry_size as u16).unwrap();
        out.write_u32::<LittleEndian>(self.connection_id).unwrap();
        out.extend_from_slice(self.name.as_bytes());
    }

    /// Decodes one entry from the front of `buf`, returning it along with
    /// the remaining, not-yet-consumed bytes.
    fn decode_one(buf: &[u8]) -> Result<(Self, &[u8])> {
        require_len(buf, 2)?;
        let entry_size = (&buf[0..2]).read_u16::<LittleEndian>()? as usize;
        require_len(buf, entry_size)?;
        if entry_size < Self::FIXED_PREFIX {
            return Err(Error::PayloadTooShort {
                expected: Self::FIXED_PREFIX,
                got: entry_size,
            });
        }
        let connection_id = (&buf[2..6]).read_u32::<LittleEndian>()?;
        let name = read_str(&buf[6..entry_size])?;
        Ok((
            Self {
                connection_id,
                name,
            },
            &buf[entry_size..],
        ))
    }
}

/// `QUERY_CONNECTIONS_REPLY` payload: a flat, `sizeof_desc`-stepped
/// listing of every currently connected client.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryConnectionsReply {
    pub connections: Vec<ConnectionDesc>,
}

impl QueryConnectionsReply {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for entry in &self.connections {
            entry.encode_into(&mut buf);
        }
        buf
    }

    pub fn decode(mut buf: &[u8]) -> Result<Self> {
        let mut connections = Vec::new();
        while !buf.is_empty() {
            let (entry, rest) = ConnectionDesc::decode_one(buf)?;
            connections.push(entry);
            buf = rest;
        }
        Ok(Self { connections })
    }
}

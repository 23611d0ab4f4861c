//! Wire protocol framing for the auramix audio server: frame headers,
//! the opcode space, stream decode flags, typed payload encodings, and
//! endpoint URI parsing.

mod error;
mod flags;
mod header;
mod opcode;
mod payload;
mod uri;

pub use error::{Error, Result};
pub use flags::{StreamFlags, VALID_STREAM_FLAG_MASK};
pub use header::{receive, transmit, Packet, TransmissionIds, BASE_HEADER_SIZE, MAGIC};
pub use opcode::{Opcode, DEFAULT_OUTPUT_ID};
pub use payload::{
    CloseStreamPayload, ConnectionDesc, DataPayload, GetVolumePayload, GetVolumeReply,
    InitialConnectionReply, InitialConnectionRequest, OpenStreamPayload, OpenStreamReply,
    OutputDeviceDesc, OutputKind, QueryConnectionsReply, QueryOutputDevicePayload,
    QueryOutputDeviceReply, SetNamePayload, SetVolumePayload, StreamGetFlagsPayload,
    StreamGetFlagsReply, StreamSetFlagsPayload, TargetId,
};
pub use uri::{Endpoint, DEFAULT_ENDPOINT, DISPLAY_ENV_VAR};

//! The request / reply / status opcode space (spec.md §6.1).
//!
//! `0x0000-0x0FFF` are requests, `0x1000-0x1FFF` are typed replies,
//! `0x2000-0x2FFF` are status replies whose payload (if any) is a
//! human-readable ASCII detail string.

/// A single opcode value. Kept as a thin newtype over `u32` rather than a
/// closed enum so that unknown opcodes (future protocol revisions, or a
/// misbehaving client) can still be represented and rejected with
/// `STATUS_REPLY_UNSUPPORTED` instead of failing to parse at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Opcode(pub u32);

macro_rules! opcodes {
    ($($(#[$meta:meta])* $name:ident = $val:expr;)*) => {
        impl Opcode {
            $($(#[$meta])* pub const $name: Opcode = Opcode($val);)*
        }
    };
}

opcodes! {
    // Requests (0x0000..0x0FFF)
    INITIAL_CONNECTION_REQUEST = 0x0001;
    NOP = 0x0002;
    DISCONNECT_REQUEST = 0x0003;
    OPEN_STREAM = 0x0004;
    CLOSE_STREAM = 0x0005;
    DATA = 0x0006;
    QUERY_OUTPUT_DEVICE = 0x0007;
    STREAM_SET_VOLUME = 0x0008;
    STREAM_GET_VOLUME = 0x0009;
    OUTPUT_SET_VOLUME = 0x000a;
    OUTPUT_GET_VOLUME = 0x000b;
    CONNECTION_SET_VOLUME = 0x000c;
    CONNECTION_GET_VOLUME = 0x000d;
    STREAM_SET_FLAGS = 0x000e;
    STREAM_GET_FLAGS = 0x000f;
    SET_NAME = 0x0010;
    QUERY_CONNECTIONS = 0x0011;

    // Typed replies (0x1000..0x1FFF)
    INITIAL_CONNECTION_REPLY = 0x1001;
    OPEN_STREAM_REPLY = 0x1002;
    QUERY_OUTPUT_DEVICE_REPLY = 0x1003;
    GET_VOLUME_REPLY = 0x1004;
    STREAM_GET_FLAGS_REPLY = 0x1005;
    QUERY_CONNECTIONS_REPLY = 0x1006;

    // Status replies (0x2000..0x2FFF)
    STATUS_REPLY_OK = 0x2000;
    STATUS_REPLY_UNSUPPORTED = 0x2001;
    STATUS_REPLY_INVAL = 0x2002;
    STATUS_REPLY_DISCONNECTED = 0x2003;
}

impl Opcode {
    /// Whether this opcode falls in the request range.
    pub fn is_request(self) -> bool {
        (0x0000..=0x0fff).contains(&self.0)
    }

    /// Whether this opcode falls in the typed-reply range.
    pub fn is_typed_reply(self) -> bool {
        (0x1000..=0x1fff).contains(&self.0)
    }

    /// Whether this opcode falls in the status-reply range.
    pub fn is_status_reply(self) -> bool {
        (0x2000..=0x2fff).contains(&self.0)
    }

    /// A human-readable name, for logging. Unknown opcodes print their
    /// numeric value.
    pub fn name(self) -> String {
        match self {
            Opcode::INITIAL_CONNECTION_REQUEST => "INITIAL_CONNECTION_REQUEST".into(),
            Opcode::NOP => "NOP".into(),
            Opcode::DISCONNECT_REQUEST => "DISCONNECT_REQUEST".into(),
            Opcode::OPEN_STREAM => "OPEN_STREAM".into(),
            Opcode::CLOSE_STREAM => "CLOSE_STREAM".into(),
            Opcode::DATA => "DATA".into(),
            Opcode::QUERY_OUTPUT_DEVICE => "QUERY_OUTPUT_DEVICE".into(),
            Opcode::STREAM_SET_VOLUME => "STREAM_SET_VOLUME".into(),
            Opcode::STREAM_GET_VOLUME => "STREAM_GET_VOLUME".into(),
            Opcode::OUTPUT_SET_VOLUME => "OUTPUT_SET_VOLUME".into(),
            Opcode::OUTPUT_GET_VOLUME => "OUTPUT_GET_VOLUME".into(),
            Opcode::CONNECTION_SET_VOLUME => "CONNECTION_SET_VOLUME".into(),
            Opcode::CONNECTION_GET_VOLUME => "CONNECTION_GET_VOLUME".into(),
            Opcode::STREAM_SET_FLAGS => "STREAM_SET_FLAGS".into(),
            Opcode::STREAM_GET_FLAGS => "STREAM_GET_FLAGS".into(),
            Opcode::SET_NAME => "SET_NAME".into(),
            Opcode::QUERY_CONNECTIONS => "QUERY_CONNECTIONS".into(),
            Opcode::INITIAL_CONNECTION_REPLY => "INITIAL_CONNECTION_REPLY".into(),
            Opcode::OPEN_STREAM_REPLY => "OPEN_STREAM_REPLY".into(),
            Opcode::QUERY_OUTPUT_DEVICE_REPLY => "QUERY_OUTPUT_DEVICE_REPLY".into(),
            Opcode::GET_VOLUME_REPLY => "GET_VOLUME_REPLY".into(),
            Opcode::STREAM_GET_FLAGS_REPLY => "STREAM_GET_FLAGS_REPLY".into(),
            Opcode::QUERY_CONNECTIONS_REPLY => "QUERY_CONNECTIONS_REPLY".into(),
            Opcode::STATUS_REPLY_OK => "STATUS_REPLY_OK".into(),
            Opcode::STATUS_REPLY_UNSUPPORTED => "STATUS_REPLY_UNSUPPORTED".into(),
            Opcode::STATUS_REPLY_INVAL => "STATUS_REPLY_INVAL".into(),
            Opcode::STATUS_REPLY_DISCONNECTED => "STATUS_REPLY_DISCONNECTED".into(),
            other => format!("UNKNOWN({:#06x})", other.0),
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

impl From<u32> for Opcode {
    fn from(v: u32) -> Self {
        Opcode(v)
    }
}

impl From<Opcode> for u32 {
    fn from(op: Opcode) -> Self {
        op.0
    }
}

/// Output-id wire sentinel meaning "the server's configured default
/// output" (spec.md §6.1).
pub const DEFAULT_OUTPUT_ID: u16 = 0xffff;

//! Per-opcode request handling. Each handler decodes its payload, does
//! the work, and returns the reply packet; the dispatcher is responsible
//! for transmitting it and for tearing down the connection when a
//! handler signals disconnection.

use std::sync::Arc;

use tracing::{trace, warn};

use auramix_proto::{
    CloseStreamPayload, ConnectionDesc, DataPayload, GetVolumePayload, GetVolumeReply,
    InitialConnectionReply, InitialConnectionRequest, OpenStreamPayload, OpenStreamReply, Opcode,
    Packet, QueryConnectionsReply, QueryOutputDevicePayload, QueryOutputDeviceReply,
    SetNamePayload, SetVolumePayload, StreamFlags, StreamGetFlagsPayload, StreamGetFlagsReply,
    StreamSetFlagsPayload,
};

use crate::error::{Error, Result};
use crate::state::{ConnState, ServerState, StreamEntry};

/// Protocol version this server implements and echoes back.
pub const PROTOCOL_VERSION: u32 = 1;

/// Outcome of handling one request: the reply to send, and whether the
/// connection should be torn down after it is sent.
pub struct Handled {
    pub reply: Packet,
    pub disconnect: bool,
}

fn ok(request: &Packet) -> Handled {
    Handled {
        reply: Packet::reply_to(request, Opcode::STATUS_REPLY_OK, Vec::new()),
        disconnect: false,
    }
}

fn invalid(request: &Packet) -> Handled {
    Handled {
        reply: Packet::reply_to(request, Opcode::STATUS_REPLY_INVAL, Vec::new()),
        disconnect: false,
    }
}

fn unsupported(request: &Packet) -> Handled {
    Handled {
        reply: Packet::reply_to(request, Opcode::STATUS_REPLY_UNSUPPORTED, Vec::new()),
        disconnect: false,
    }
}

/// Handles the very first frame on a new connection, which must be
/// `INITIAL_CONNECTION_REQUEST`. Returns the reply and, on success, the
/// newly assigned `client_id`.
pub fn handle_initial(state: &ServerState, request: &Packet) -> (Handled, Option<u32>) {
    if request.opcode != Opcode::INITIAL_CONNECTION_REQUEST {
        return (
            Handled {
                reply: Packet::reply_to(request, Opcode::STATUS_REPLY_DISCONNECTED, Vec::new()),
                disconnect: true,
            },
            None,
        );
    }
    let _req = match InitialConnectionRequest::decode(&request.payload) {
        Ok(r) => r,
        Err(_) => {
            return (
                Handled {
                    reply: Packet::reply_to(request, Opcode::STATUS_REPLY_INVAL, Vec::new()),
                    disconnect: true,
                },
                None,
            )
        }
    };

    let client_id = state.connections.insert();
    let reply_payload = InitialConnectionReply {
        client_id,
        protocol_version: PROTOCOL_VERSION,
        default_output_id: state.outputs.default_output(),
    };
    trace!(client_id, "connection handshake complete");
    (
        Handled {
            reply: Packet::reply_to(
                request,
                Opcode::INITIAL_CONNECTION_REPLY,
                reply_payload.encode(),
            ),
            disconnect: false,
        },
        Some(client_id),
    )
}

/// Dispatches a request from an already-handshaken connection.
pub fn dispatch(state: &ServerState, client_id: u32, request: &Packet) -> Handled {
    let result = match request.opcode {
        Opcode::NOP => Ok(ok(request)),
        Opcode::DISCONNECT_REQUEST => Ok(Handled {
            reply: Packet::reply_to(request, Opcode::STATUS_REPLY_OK, Vec::new()),
            disconnect: true,
        }),
        Opcode::OPEN_STREAM => open_stream(state, client_id, request),
        Opcode::CLOSE_STREAM => close_stream(state, client_id, request),
        Opcode::DATA => data(state, request),
        Opcode::QUERY_OUTPUT_DEVICE => query_output_device(state, request),
        Opcode::STREAM_SET_VOLUME => stream_set_volume(state, request),
        Opcode::STREAM_GET_VOLUME => stream_get_volume(state, request),
        Opcode::OUTPUT_SET_VOLUME => output_set_volume(state, request),
        Opcode::OUTPUT_GET_VOLUME => output_get_volume(state, request),
        Opcode::CONNECTION_SET_VOLUME => connection_set_volume(state, request),
        Opcode::CONNECTION_GET_VOLUME => connection_get_volume(state, request),
        Opcode::STREAM_SET_FLAGS => stream_set_flags(state, request),
        Opcode::STREAM_GET_FLAGS => stream_get_flags(state, request),
        Opcode::SET_NAME => set_name(state, client_id, request),
        Opcode::QUERY_CONNECTIONS => query_connections(state, request),
        other => {
            warn!(?other, "unrecognized opcode");
            return unsupported(request);
        }
    };

    result.unwrap_or_else(|err| {
        warn!(client_id, %err, opcode = %request.opcode, "request failed");
        invalid(request)
    })
}

fn open_stream(state: &ServerState, client_id: u32, request: &Packet) -> Result<Handled> {
    let payload = OpenStreamPayload::decode(&request.payload)?;
    let output_id = state.outputs.resolve(payload.output_id);
    let device = state.outputs.device(output_id)?;

    let capacity = device.params.sample_rate as usize
        * payload.channels as usize
        * state.buffer_seconds as usize;
    let ring = Arc::new(auramix_stream::StreamRing::new(capacity.max(1)));
    let mixer_key = device.add_stream(client_id, ring, payload.channels as u16);
    if let Some(stream) = device.stream(mixer_key) {
        stream.set_volume(payload.volume / 100.0);
    }

    let stream_id = state.streams.insert(StreamEntry {
        connection_id: client_id,
        output_id,
        mixer_key,
        source_rate: payload.sample_rate,
        source_channels: payload.channels,
        flags: StreamFlags::empty(),
    });
    state.connections.add_owned_stream(client_id, stream_id)?;

    Ok(Handled {
        reply: Packet::reply_to(
            request,
            Opcode::OPEN_STREAM_REPLY,
            OpenStreamReply { stream_id }.encode(),
        ),
        disconnect: false,
    })
}

fn close_stream(state: &ServerState, client_id: u32, request: &Packet) -> Result<Handled> {
    let payload = CloseStreamPayload::decode(&request.payload)?;
    teardown_stream(state, payload.stream_id)?;
    state
        .connections
        .remove_owned_stream(client_id, payload.stream_id)
        .ok();
    Ok(ok(request))
}

/// Removes a stream from its output's mixer arena and the registry. Used
/// both by `CLOSE_STREAM` and by connection teardown.
pub fn teardown_stream(state: &ServerState, stream_id: u16) -> Result<()> {
    let entry = state.streams.remove(stream_id).ok_or(Error::UnknownStream(stream_id))?;
    if let Ok(device) = state.outputs.device(entry.output_id) {
        device.remove_stream(entry.mixer_key);
    }
    Ok(())
}

fn data(state: &ServerState, request: &Packet) -> Result<Handled> {
    let payload = DataPayload::decode(&request.payload)?;
    let (output_id, mixer_key, source_rate, source_channels, flags) =
        state.streams.get(payload.stream_id, |e| {
            (e.output_id, e.mixer_key, e.source_rate, e.source_channels, e.flags)
        })?;

    let decoded = auramix_stream::decode(flags, &payload.samples)?;
    let device = state.outputs.device(output_id)?;
    let converted = auramix_stream::convert_rate(
        &decoded,
        source_channels as u16,
        source_rate,
        device.params.sample_rate,
    );
    if let Some(stream) = device.stream(mixer_key) {
        stream.ring.push(&converted);
    }

    Ok(ok(request))
}

fn query_output_device(state: &ServerState, request: &Packet) -> Result<Handled> {
    let payload = QueryOutputDevicePayload::decode(&request.payload)?;
    let output_id = state.outputs.resolve(payload.output_id);
    let params = state.outputs.params(output_id)?;
    let descriptor = state.outputs.descriptor(output_id)?;
    let reply = QueryOutputDeviceReply {
        output_id,
        kind: descriptor.kind as u16,
        sample_rate: params.sample_rate,
        channels: params.channels,
    };
    Ok(Handled {
        reply: Packet::reply_to(request, Opcode::QUERY_OUTPUT_DEVICE_REPLY, reply.encode()),
        disconnect: false,
    })
}

fn stream_set_volume(state: &ServerState, request: &Packet) -> Result<Handled> {
    let payload = SetVolumePayload::decode(&request.payload)?;
    let stream_id = payload.target_id as u16;
    let (output_id, mixer_key) = state
        .streams
        .get(stream_id, |e| (e.output_id, e.mixer_key))?;
    let device = state.outputs.device(output_id)?;
    if let Some(stream) = device.stream(mixer_key) {
        stream.set_volume(payload.volume / 100.0);
    }
    Ok(ok(request))
}

fn stream_get_volume(state: &ServerState, request: &Packet) -> Result<Handled> {
    let payload = GetVolumePayload::decode(&request.payload)?;
    let stream_id = payload.target_id as u16;
    let (output_id, mixer_key) = state
        .streams
        .get(stream_id, |e| (e.output_id, e.mixer_key))?;
    let device = state.outputs.device(output_id)?;
    let volume = device
        .stream(mixer_key)
        .map(|s| s.volume())
        .unwrap_or(auramix_mixer::UNITY);
    Ok(volume_reply(request, volume))
}

fn output_set_volume(state: &ServerState, request: &Packet) -> Result<Handled> {
    let payload = SetVolumePayload::decode(&request.payload)?;
    let output_id = state.outputs.resolve(payload.target_id as u16);
    let device = state.outputs.device(output_id)?;
    device.set_volume(payload.volume / 100.0);
    Ok(ok(request))
}

fn output_get_volume(state: &ServerState, request: &Packet) -> Result<Handled> {
    let payload = GetVolumePayload::decode(&request.payload)?;
    let output_id = state.outputs.resolve(payload.target_id as u16);
    let device = state.outputs.device(output_id)?;
    Ok(volume_reply(request, device.volume()))
}

fn connection_set_volume(state: &ServerState, request: &Packet) -> Result<Handled> {
    let payload = SetVolumePayload::decode(&request.payload)?;
    state
        .connections
        .set_volume(payload.target_id, payload.volume / 100.0)?;
    Ok(ok(request))
}

fn connection_get_volume(state: &ServerState, request: &Packet) -> Result<Handled> {
    let payload = GetVolumePayload::decode(&request.payload)?;
    let volume = state.connections.volume(payload.target_id)?;
    Ok(volume_reply(request, volume))
}

fn volume_reply(request: &Packet, volume: f32) -> Handled {
    Handled {
        reply: Packet::reply_to(
            request,
            Opcode::GET_VOLUME_REPLY,
            GetVolumeReply { volume: volume * 100.0 }.encode(),
        ),
        disconnect: false,
    }
}

fn stream_set_flags(state: &ServerState, request: &Packet) -> Result<Handled> {
    let payload = StreamSetFlagsPayload::decode(&request.payload)?;
    let Some(flags) = StreamFlags::parse(payload.flags) else {
        return Ok(invalid(request));
    };
    state.streams.set_flags(payload.stream_id, flags)?;
    Ok(ok(request))
}

fn stream_get_flags(state: &ServerState, request: &Packet) -> Result<Handled> {
    let payload = StreamGetFlagsPayload::decode(&request.payload)?;
    let flags = state.streams.get(payload.stream_id, |e| e.flags)?;
    Ok(Handled {
        reply: Packet::reply_to(
            request,
            Opcode::STREAM_GET_FLAGS_REPLY,
            StreamGetFlagsReply { flags: flags.bits() }.encode(),
        ),
        disconnect: false,
    })
}

fn set_name(state: &ServerState, client_id: u32, request: &Packet) -> Result<Handled> {
    let payload = SetNamePayload::decode(&request.payload)?;
    state.connections.set_name(client_id, payload.name)?;
    Ok(ok(request))
}

fn query_connections(state: &ServerState, request: &Packet) -> Result<Handled> {
    let reply = QueryConnectionsReply {
        connections: state
            .connections
            .snapshot()
            .into_iter()
            .map(|(connection_id, name)| ConnectionDesc { connection_id, name })
            .collect(),
    };
    Ok(Handled {
        reply: Packet::reply_to(request, Opcode::QUERY_CONNECTIONS_REPLY, reply.encode()),
        disconnect: false,
    })
}

/// Tears down everything a disconnecting connection owned: its streams
/// and its table entry.
pub fn teardown_connection(state: &ServerState, client_id: u32) {
    state.connections.set_state(client_id, ConnState::Disconnecting).ok();
    if let Some(conn) = state.connections.remove(client_id) {
        for stream_id in conn.streams {
            teardown_stream(state, stream_id).ok();
        }
    }
}

//! End-to-end scenarios against a real, running server instance:
//! handshake, stream open/data/close, volume get/set, and device query.

use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use auramix_backend::mock::MockBackend;
use auramix_backend::AudioBackend;
use auramix_mixer::ConnectionVolumes;
use auramix_proto::{
    receive, transmit, CloseStreamPayload, DataPayload, GetVolumePayload, InitialConnectionReply,
    InitialConnectionRequest, OpenStreamPayload, OpenStreamReply, Opcode, Packet,
    QueryOutputDevicePayload, QueryOutputDeviceReply, SetVolumePayload, TransmissionIds,
};
use auramix_server::state::{ConnectionTable, ServerState};
use auramix_server::{handlers, server};

fn start_test_server() -> std::net::SocketAddr {
    let backend: Arc<dyn AudioBackend> = Arc::new(MockBackend::with_default_devices());
    let connections = Arc::new(ConnectionTable::new());
    let connection_volumes: Arc<dyn ConnectionVolumes> = connections.clone();

    let (outputs, workers) =
        server::bring_up_outputs(backend, connection_volumes, None).unwrap();
    std::mem::forget(workers); // keep mixer threads alive for the test process

    let state = Arc::new(ServerState::with_connections(connections, outputs, 2));

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for conn in listener.incoming() {
            let Ok(stream) = conn else { continue };
            let state = state.clone();
            thread::spawn(move || auramix_server::dispatcher::run_connection(state, stream));
        }
    });
    // Give the accept thread a moment to start listening (the bind
    // above already reserved the port, so this is just scheduling slack).
    thread::sleep(Duration::from_millis(10));
    addr
}

fn handshake(stream: &mut TcpStream, ids: &TransmissionIds) -> u32 {
    let mut req = Packet::new(
        Opcode::INITIAL_CONNECTION_REQUEST,
        0,
        InitialConnectionRequest {
            protocol_version: handlers::PROTOCOL_VERSION,
        }
        .encode(),
    );
    transmit(stream, &mut req, ids).unwrap();
    let reply = receive(stream).unwrap();
    assert_eq!(reply.opcode, Opcode::INITIAL_CONNECTION_REPLY);
    InitialConnectionReply::decode(&reply.payload).unwrap().client_id
}

#[test]
fn handshake_then_query_output_device() {
    let addr = start_test_server();
    let mut stream = TcpStream::connect(addr).unwrap();
    let ids = TransmissionIds::new();
    let client_id = handshake(&mut stream, &ids);
    assert!(client_id > 0);

    let mut req = Packet::new(
        Opcode::QUERY_OUTPUT_DEVICE,
        client_id,
        QueryOutputDevicePayload {
            output_id: auramix_proto::DEFAULT_OUTPUT_ID,
        }
        .encode(),
    );
    transmit(&mut stream, &mut req, &ids).unwrap();
    let reply = receive(&mut stream).unwrap();
    assert_eq!(reply.opcode, Opcode::QUERY_OUTPUT_DEVICE_REPLY);
    let desc = QueryOutputDeviceReply::decode(&reply.payload).unwrap();
    assert_eq!(desc.sample_rate, 48000);
    assert_eq!(desc.channels, 2);
}

#[test]
fn open_stream_send_data_then_close() {
    let addr = start_test_server();
    let mut stream = TcpStream::connect(addr).unwrap();
    let ids = TransmissionIds::new();
    let client_id = handshake(&mut stream, &ids);

    let mut open = Packet::new(
        Opcode::OPEN_STREAM,
        client_id,
        OpenStreamPayload {
            output_id: auramix_proto::DEFAULT_OUTPUT_ID,
            sample_rate: 48000,
            channels: 2,
            volume: 100.0,
        }
        .encode(),
    );
    transmit(&mut stream, &mut open, &ids).unwrap();
    let reply = receive(&mut stream).unwrap();
    assert_eq!(reply.opcode, Opcode::OPEN_STREAM_REPLY);
    let stream_id = OpenStreamReply::decode(&reply.payload).unwrap().stream_id;

    let samples = vec![1000i16; 960]; // 10ms @ 48kHz stereo
    let raw: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    let mut data = Packet::new(
        Opcode::DATA,
        client_id,
        DataPayload {
            stream_id,
            samples: raw,
        }
        .encode(),
    );
    transmit(&mut stream, &mut data, &ids).unwrap();
    let reply = receive(&mut stream).unwrap();
    assert_eq!(reply.opcode, Opcode::STATUS_REPLY_OK);

    let mut close = Packet::new(
        Opcode::CLOSE_STREAM,
        client_id,
        CloseStreamPayload { stream_id }.encode(),
    );
    transmit(&mut stream, &mut close, &ids).unwrap();
    let reply = receive(&mut stream).unwrap();
    assert_eq!(reply.opcode, Opcode::STATUS_REPLY_OK);

    // The stream is gone now; closing it again should fail cleanly.
    let mut close_again = Packet::new(
        Opcode::CLOSE_STREAM,
        client_id,
        CloseStreamPayload { stream_id }.encode(),
    );
    transmit(&mut stream, &mut close_again, &ids).unwrap();
    let reply = receive(&mut stream).unwrap();
    assert_eq!(reply.opcode, Opcode::STATUS_REPLY_INVAL);
}

#[test]
fn connection_volume_get_set_roundtrips() {
    let addr = start_test_server();
    let mut stream = TcpStream::connect(addr).unwrap();
    let ids = TransmissionIds::new();
    let client_id = handshake(&mut stream, &ids);

    let mut set = Packet::new(
        Opcode::CONNECTION_SET_VOLUME,
        client_id,
        SetVolumePayload {
            target_id: client_id,
            volume: 25.0,
        }
        .encode(),
    );
    transmit(&mut stream, &mut set, &ids).unwrap();
    let reply = receive(&mut stream).unwrap();
    assert_eq!(reply.opcode, Opcode::STATUS_REPLY_OK);

    let mut get = Packet::new(
        Opcode::CONNECTION_GET_VOLUME,
        client_id,
        GetVolumePayload {
            target_id: client_id,
        }
        .encode(),
    );
    transmit(&mut stream, &mut get, &ids).unwrap();
    let reply = receive(&mut stream).unwrap();
    assert_eq!(reply.opcode, Opcode::GET_VOLUME_REPLY);
    let volume = auramix_proto::GetVolumeReply::decode(&reply.payload).unwrap().volume;
    assert_eq!(volume, 25.0);
}

#[test]
fn disconnect_request_closes_the_socket() {
    let addr = start_test_server();
    let mut stream = TcpStream::connect(addr).unwrap();
    let ids = TransmissionIds::new();
    let _client_id = handshake(&mut stream, &ids);

    let mut req = Packet::new(Opcode::DISCONNECT_REQUEST, 0, Vec::new());
    transmit(&mut stream, &mut req, &ids).unwrap();
    let reply = receive(&mut stream).unwrap();
    assert_eq!(reply.opcode, Opcode::STATUS_REPLY_OK);

    // The server closes its end after replying; a further read should
    // observe a clean peer close.
    let err = receive(&mut stream).unwrap_err();
    assert!(matches!(
        err,
        auramix_proto::Error::PeerClosed | auramix_proto::Error::Io(_)
    ));
}

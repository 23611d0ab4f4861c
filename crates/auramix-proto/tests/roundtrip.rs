//! End-to-end frame round-trip over a loopback TCP socket.

use std::net::{TcpListener, TcpStream};
use std::thread;

use auramix_proto::{receive, transmit, DataPayload, Opcode, Packet, TransmissionIds};

#[test]
fn frame_roundtrips_over_tcp_loopback() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let pkt = receive(&mut stream).unwrap();
        assert_eq!(pkt.opcode, Opcode::DATA);
        let payload = DataPayload::decode(&pkt.payload).unwrap();
        assert_eq!(payload.stream_id, 42);
        assert_eq!(payload.samples, vec![10, 20, 30]);

        let ids = TransmissionIds::new();
        let mut reply = Packet::reply_to(&pkt, Opcode::STATUS_REPLY_OK, Vec::new());
        transmit(&mut stream, &mut reply, &ids).unwrap();
    });

    let mut client = TcpStream::connect(addr).unwrap();
    let ids = TransmissionIds::new();
    let data = DataPayload {
        stream_id: 42,
        samples: vec![10, 20, 30],
    };
    let mut request = Packet::new(Opcode::DATA, 1, data.encode());
    let sent_id = transmit(&mut client, &mut request, &ids).unwrap();

    let reply = receive(&mut client).unwrap();
    assert_eq!(reply.opcode, Opcode::STATUS_REPLY_OK);
    assert_eq!(reply.transmission_id, sent_id);

    server.join().unwrap();
}

#[test]
fn peer_close_is_reported_cleanly() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        drop(stream);
    });

    let mut client = TcpStream::connect(addr).unwrap();
    server.join().unwrap();

    // Give the server's close a moment to propagate, then expect a clean
    // PeerClosed rather than a panic or a truncated-frame error.
    let err = receive(&mut client).unwrap_err();
    assert!(matches!(err, auramix_proto::Error::PeerClosed | auramix_proto::Error::Io(_)));
}

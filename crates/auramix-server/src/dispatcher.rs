//! Per-connection request/reply loop.
//!
//! Each accepted connection gets its own OS thread running a blocking
//! receive/dispatch/transmit loop — simple and correct, and since every
//! handler does its own locking, the threads need no coordination beyond
//! the shared [`ServerState`] and [`auramix_mixer`] tables. A connection's
//! FIFO ordering falls out for free: one thread means one in-flight
//! request at a time per connection, processed in the order frames
//! arrive on the socket.

use std::io::{Read, Write};
use std::sync::Arc;

use tracing::{debug, info, warn};

use auramix_proto::{receive, transmit, Opcode, TransmissionIds};

use crate::handlers::{self, Handled};
use crate::state::ServerState;

/// Drives one connection until it disconnects or its socket errors out.
pub fn run_connection<S: Read + Write>(state: Arc<ServerState>, mut stream: S) {
    let ids = TransmissionIds::new();

    let first = match receive(&mut stream) {
        Ok(pkt) => pkt,
        Err(err) => {
            debug!(%err, "connection closed before handshake");
            return;
        }
    };

    let (handled, client_id) = handlers::handle_initial(&state, &first);
    if let Err(err) = send(&mut stream, handled.reply, &ids) {
        debug!(%err, "failed to send handshake reply");
        return;
    }
    let Some(client_id) = client_id else {
        return;
    };
    info!(client_id, "connection established");

    loop {
        let request = match receive(&mut stream) {
            Ok(pkt) => pkt,
            Err(auramix_proto::Error::PeerClosed) => {
                debug!(client_id, "peer closed connection");
                break;
            }
            Err(err) => {
                warn!(client_id, %err, "read error, closing connection");
                break;
            }
        };

        let Handled { reply, disconnect } = handlers::dispatch(&state, client_id, &request);
        let send_failed = send(&mut stream, reply, &ids).is_err();
        if disconnect || send_failed {
            break;
        }
    }

    handlers::teardown_connection(&state, client_id);
    info!(client_id, "connection closed");
}

fn send<S: Write>(
    stream: &mut S,
    mut reply: auramix_proto::Packet,
    ids: &TransmissionIds,
) -> auramix_proto::Result<()> {
    if reply.opcode == Opcode::STATUS_REPLY_DISCONNECTED {
        // Best-effort notice to a client that never completed the
        // handshake; a write failure here is not worth logging loudly.
        let _ = transmit(stream, &mut reply, ids);
        return Ok(());
    }
    transmit(stream, &mut reply, ids).map(|_| ())
}

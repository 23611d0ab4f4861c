//! Shared server state: the connection table, the output device table, and
//! the stream registry that ties a wire-visible stream id to the mixer's
//! internal slotmap handle.
//!
//! Lock ordering, outermost first, to avoid deadlock between the
//! dispatcher threads and the mixer worker threads: connection table ->
//! stream registry -> output table -> a specific output's stream arena ->
//! a stream's ring buffer. Code in this crate never acquires an outer
//! lock while already holding an inner one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use slotmap::{new_key_type, SlotMap};

use auramix_backend::{OutputId, OutputParams};
use auramix_mixer::{ConnectionVolumes, OutputDevice, StreamKey, UNITY};
use auramix_proto::StreamFlags;

use crate::error::{Error, Result};

new_key_type! {
    pub struct ConnectionKey;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    AwaitingInitial,
    Active,
    Disconnecting,
    Closed,
}

pub struct Connection {
    pub client_id: u32,
    pub state: ConnState,
    pub name: String,
    pub volume: f32,
    /// Streams this connection owns, so they can be torn down together
    /// when it disconnects.
    pub streams: Vec<u16>,
}

/// Connections indexed by slotmap key, with a `client_id -> key` index for
/// O(1) lookup from wire requests (which only ever carry `client_id`).
pub struct ConnectionTable {
    connections: RwLock<SlotMap<ConnectionKey, Connection>>,
    by_client_id: RwLock<HashMap<u32, ConnectionKey>>,
    next_client_id: AtomicU32,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(SlotMap::with_key()),
            by_client_id: RwLock::new(HashMap::new()),
            next_client_id: AtomicU32::new(1),
        }
    }

    /// Registers a newly handshaken connection and returns its wire id.
    pub fn insert(&self) -> u32 {
        let client_id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        let conn = Connection {
            client_id,
            state: ConnState::Active,
            name: String::new(),
            volume: UNITY,
            streams: Vec::new(),
        };
        let key = self.connections.write().insert(conn);
        self.by_client_id.write().insert(client_id, key);
        client_id
    }

    pub fn remove(&self, client_id: u32) -> Option<Connection> {
        let key = self.by_client_id.write().remove(&client_id)?;
        self.connections.write().remove(key)
    }

    pub fn set_state(&self, client_id: u32, state: ConnState) -> Result<()> {
        self.with_mut(client_id, |c| c.state = state)
    }

    pub fn set_volume(&self, client_id: u32, volume: f32) -> Result<()> {
        self.with_mut(client_id, |c| c.volume = volume)
    }

    pub fn volume(&self, client_id: u32) -> Result<f32> {
        self.with(client_id, |c| c.volume)
    }

    pub fn set_name(&self, client_id: u32, name: String) -> Result<()> {
        self.with_mut(client_id, |c| c.name = name)
    }

    pub fn add_owned_stream(&self, client_id: u32, wire_stream_id: u16) -> Result<()> {
        self.with_mut(client_id, |c| c.streams.push(wire_stream_id))
    }

    pub fn remove_owned_stream(&self, client_id: u32, wire_stream_id: u16) -> Result<()> {
        self.with_mut(client_id, |c| c.streams.retain(|&id| id != wire_stream_id))
    }

    /// Snapshots every connection's id and display name, for
    /// `QUERY_CONNECTIONS`.
    pub fn snapshot(&self) -> Vec<(u32, String)> {
        self.connections
            .read()
            .values()
            .map(|c| (c.client_id, c.name.clone()))
            .collect()
    }

    fn with<T>(&self, client_id: u32, f: impl FnOnce(&Connection) -> T) -> Result<T> {
        let by_id = self.by_client_id.read();
        let key = *by_id.get(&client_id).ok_or(Error::UnknownConnection(client_id))?;
        let connections = self.connections.read();
        let conn = connections
            .get(key)
            .ok_or(Error::UnknownConnection(client_id))?;
        Ok(f(conn))
    }

    fn with_mut<T>(&self, client_id: u32, f: impl FnOnce(&mut Connection) -> T) -> Result<T> {
        let by_id = self.by_client_id.read();
        let key = *by_id.get(&client_id).ok_or(Error::UnknownConnection(client_id))?;
        let mut connections = self.connections.write();
        let conn = connections
            .get_mut(key)
            .ok_or(Error::UnknownConnection(client_id))?;
        Ok(f(conn))
    }
}

impl Default for ConnectionTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapts the connection table to the mixer's read-only volume lookup.
impl ConnectionVolumes for ConnectionTable {
    fn volume_for(&self, connection_id: u32) -> f32 {
        self.volume(connection_id).unwrap_or(UNITY)
    }
}

/// A stream's server-side bookkeeping: which output it feeds, the
/// mixer's handle for it, and the source format needed to decode and
/// convert each `DATA` frame before it reaches the mixer.
pub struct StreamEntry {
    pub connection_id: u32,
    pub output_id: OutputId,
    pub mixer_key: StreamKey,
    pub source_rate: u32,
    pub source_channels: u8,
    pub flags: StreamFlags,
}

/// Wire-visible stream ids, independent of the mixer's internal slotmap
/// keys (which are not stable to encode as a bare `u16`).
pub struct StreamRegistry {
    entries: RwLock<HashMap<u16, StreamEntry>>,
    next_id: AtomicU32,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_id: AtomicU32::new(1),
        }
    }

    pub fn insert(&self, entry: StreamEntry) -> u16 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) as u16;
        self.entries.write().insert(id, entry);
        id
    }

    pub fn remove(&self, stream_id: u16) -> Option<StreamEntry> {
        self.entries.write().remove(&stream_id)
    }

    pub fn get<T>(&self, stream_id: u16, f: impl FnOnce(&StreamEntry) -> T) -> Result<T> {
        let entries = self.entries.read();
        let entry = entries
            .get(&stream_id)
            .ok_or(Error::UnknownStream(stream_id))?;
        Ok(f(entry))
    }

    pub fn set_flags(&self, stream_id: u16, flags: StreamFlags) -> Result<()> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(&stream_id)
            .ok_or(Error::UnknownStream(stream_id))?;
        entry.flags = flags;
        Ok(())
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Output devices indexed by their backend-assigned id, alongside the
/// descriptor metadata (kind, name) the backend reported at startup.
pub struct OutputTable {
    devices: HashMap<OutputId, Arc<OutputDevice>>,
    descriptors: HashMap<OutputId, auramix_backend::OutputDescriptor>,
    default_output: OutputId,
}

impl OutputTable {
    pub fn new(
        devices: HashMap<OutputId, Arc<OutputDevice>>,
        descriptors: HashMap<OutputId, auramix_backend::OutputDescriptor>,
        default_output: OutputId,
    ) -> Self {
        Self {
            devices,
            descriptors,
            default_output,
        }
    }

    pub fn default_output(&self) -> OutputId {
        self.default_output
    }

    /// Resolves `auramix_proto::DEFAULT_OUTPUT_ID` to the real default.
    pub fn resolve(&self, output_id: u16) -> OutputId {
        if output_id == auramix_proto::DEFAULT_OUTPUT_ID {
            self.default_output
        } else {
            output_id
        }
    }

    pub fn device(&self, output_id: OutputId) -> Result<&Arc<OutputDevice>> {
        self.devices
            .get(&output_id)
            .ok_or(Error::UnknownOutput(output_id))
    }

    pub fn params(&self, output_id: OutputId) -> Result<OutputParams> {
        Ok(self.device(output_id)?.params)
    }

    pub fn descriptor(&self, output_id: OutputId) -> Result<&auramix_backend::OutputDescriptor> {
        self.descriptors
            .get(&output_id)
            .ok_or(Error::UnknownOutput(output_id))
    }

    pub fn devices(&self) -> impl Iterator<Item = &Arc<OutputDevice>> {
        self.devices.values()
    }
}

/// Everything a request handler needs: the three tables plus the
/// per-stream ring buffer capacity (in seconds) new streams are sized
/// with.
pub struct ServerState {
    pub connections: Arc<ConnectionTable>,
    pub outputs: OutputTable,
    pub streams: StreamRegistry,
    pub buffer_seconds: u32,
}

impl ServerState {
    pub fn new(outputs: OutputTable, buffer_seconds: u32) -> Self {
        Self::with_connections(Arc::new(ConnectionTable::new()), outputs, buffer_seconds)
    }

    /// Builds state sharing an already-constructed connection table, so
    /// the same `Arc` can be handed to the mixer as its
    /// [`auramix_mixer::ConnectionVolumes`] source before the rest of the
    /// server state exists.
    pub fn with_connections(
        connections: Arc<ConnectionTable>,
        outputs: OutputTable,
        buffer_seconds: u32,
    ) -> Self {
        Self {
            connections,
            outputs,
            streams: StreamRegistry::new(),
            buffer_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_lifecycle() {
        let table = ConnectionTable::new();
        let id = table.insert();
        table.set_name(id, "alice".into()).unwrap();
        assert_eq!(table.snapshot(), vec![(id, "alice".into())]);
        table.set_volume(id, UNITY / 2.0).unwrap();
        assert_eq!(table.volume(id).unwrap(), UNITY / 2.0);
        assert!(table.remove(id).is_some());
        assert!(table.volume(id).is_err());
    }

    #[test]
    fn stream_registry_roundtrips() {
        let registry = StreamRegistry::new();
        let id = registry.insert(StreamEntry {
            connection_id: 1,
            output_id: 0,
            mixer_key: StreamKey::default(),
            source_rate: 44100,
            source_channels: 2,
            flags: StreamFlags::empty(),
        });
        assert_eq!(registry.get(id, |e| e.source_rate).unwrap(), 44100);
        assert!(registry.remove(id).is_some());
        assert!(registry.get(id, |_| ()).is_err());
    }
}

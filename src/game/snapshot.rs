//! Snapshot cadence and serialization

use serde::Serialize;
use std::sync::Arc;

use crate::ws::protocol::ServerMsg;

use super::PlayerId;

/// Decides which ticks are broadcast and encodes the frames
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
    /// Size of the most recent encoded snapshot
    last_bytes: usize,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
            last_bytes: 0,
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Encode a per-tick `gameState` frame once for every recipient
    pub fn build<S: Serialize>(&mut self, state: &S) -> serde_json::Result<Arc<str>> {
        let payload = encode(&ServerMsg::GameState { state })?;
        self.last_bytes = payload.len();
        Ok(payload)
    }

    pub fn last_bytes(&self) -> usize {
        self.last_bytes
    }
}

/// Encode the one-off `init` frame for a joining session
pub fn build_init<S: Serialize>(id: PlayerId, room: &str, state: &S) -> serde_json::Result<Arc<str>> {
    encode(&ServerMsg::Init { id, room, state })
}

fn encode<S: Serialize>(msg: &ServerMsg<'_, S>) -> serde_json::Result<Arc<str>> {
    serde_json::to_string(msg).map(Arc::from)
}

//! Per-connection session state shared between the socket tasks and the room

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use uuid::Uuid;

use super::{InputKeys, PlayerId};

/// Frames queued for a connection's writer task
#[derive(Debug, Clone)]
pub enum Outbound {
    /// Serialized server message, shared across every recipient
    Frame(Arc<str>),
    /// Liveness probe
    Ping,
}

/// What happened when a snapshot was offered to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// Consumer is behind; this frame is dropped for it
    Skipped,
    /// Writer has gone away
    Closed,
}

/// Binding between one live connection and one player entity
pub struct Session {
    id: PlayerId,
    conn_id: Uuid,
    /// Single-slot input buffer; the newest message wins
    input: Mutex<InputKeys>,
    outbound: mpsc::Sender<Outbound>,
    /// Bytes queued but not yet written to the socket
    pending_bytes: AtomicUsize,
    alive: AtomicBool,
    /// A probe was postponed because the queue was full
    probe_deferred: AtomicBool,
    evicted: AtomicBool,
    evict_notify: Notify,
}

impl Session {
    pub fn new(
        id: PlayerId,
        conn_id: Uuid,
        queue_frames: usize,
    ) -> (Arc<Self>, mpsc::Receiver<Outbound>) {
        let (outbound, outbound_rx) = mpsc::channel(queue_frames.max(1));
        let session = Arc::new(Self {
            id,
            conn_id,
            input: Mutex::new(InputKeys::default()),
            outbound,
            pending_bytes: AtomicUsize::new(0),
            alive: AtomicBool::new(true),
            probe_deferred: AtomicBool::new(false),
            evicted: AtomicBool::new(false),
            evict_notify: Notify::new(),
        });
        (session, outbound_rx)
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn conn_id(&self) -> Uuid {
        self.conn_id
    }

    /// Overwrite the buffered input
    pub fn set_input(&self, keys: InputKeys) {
        *self.input.lock() = keys;
    }

    /// Most recent input, sampled once per tick
    pub fn input(&self) -> InputKeys {
        *self.input.lock()
    }

    /// Queue a frame regardless of backlog. Used for `init`, which must not be dropped.
    pub fn send_frame(&self, payload: Arc<str>) -> Delivery {
        let len = payload.len();
        // Counted before the send so the writer can never subtract first
        self.pending_bytes.fetch_add(len, Ordering::AcqRel);
        match self.outbound.try_send(Outbound::Frame(payload)) {
            Ok(()) => Delivery::Queued,
            Err(err) => {
                self.frame_written(len);
                match err {
                    mpsc::error::TrySendError::Full(_) => Delivery::Skipped,
                    mpsc::error::TrySendError::Closed(_) => Delivery::Closed,
                }
            }
        }
    }

    /// Queue a snapshot unless the connection already has more than
    /// `max_pending_bytes` waiting to be written
    pub fn offer_frame(&self, payload: &Arc<str>, max_pending_bytes: usize) -> Delivery {
        if self.pending_bytes() > max_pending_bytes {
            return Delivery::Skipped;
        }
        self.send_frame(Arc::clone(payload))
    }

    /// Called by the writer once a frame has been flushed to the socket
    pub fn frame_written(&self, len: usize) {
        let _ = self
            .pending_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |pending| {
                Some(pending.saturating_sub(len))
            });
    }

    pub fn pending_bytes(&self) -> usize {
        self.pending_bytes.load(Ordering::Acquire)
    }

    pub fn send_ping(&self) -> bool {
        let queued = self.outbound.try_send(Outbound::Ping).is_ok();
        if queued {
            self.probe_deferred.store(false, Ordering::Release);
        }
        queued
    }

    /// Postpone a probe that could not be queued. Returns `false` if the
    /// previous probe was already postponed.
    pub fn defer_probe(&self) -> bool {
        !self.probe_deferred.swap(true, Ordering::AcqRel)
    }

    /// A pong arrived
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::Release);
    }

    /// Clear the alive flag ahead of a new probe, returning its previous value
    pub fn begin_probe(&self) -> bool {
        self.alive.swap(false, Ordering::AcqRel)
    }

    /// Ask the connection task to drop the socket
    pub fn evict(&self) {
        if !self.evicted.swap(true, Ordering::AcqRel) {
            self.evict_notify.notify_one();
        }
    }

    pub fn is_evicted(&self) -> bool {
        self.evicted.load(Ordering::Acquire)
    }

    /// Resolves once `evict` has been called
    pub async fn evicted(&self) {
        if self.is_evicted() {
            return;
        }
        self.evict_notify.notified().await;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("conn_id", &self.conn_id)
            .field("pending_bytes", &self.pending_bytes())
            .field("evicted", &self.is_evicted())
            .finish()
    }
}

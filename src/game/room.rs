//! Room lifecycle: session registry, authoritative tick loop, broadcast

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::util::time::Timer;

use super::heartbeat;
use super::session::{Delivery, Outbound, Session};
use super::snapshot::{build_init, SnapshotBuilder};
use super::{PlayerId, Simulation};

/// Knobs shared by every room
#[derive(Debug, Clone)]
pub struct RoomSettings {
    pub tick_period: Duration,
    pub snapshot_every_ticks: u32,
    pub heartbeat_interval: Duration,
    pub max_buffered_bytes: usize,
    pub outbound_queue_frames: usize,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_micros(1_000_000 / 60),
            snapshot_every_ticks: 1,
            heartbeat_interval: Duration::from_secs(30),
            max_buffered_bytes: 256 * 1024,
            outbound_queue_frames: 64,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room {0} is not running")]
    Stopped(String),
}

/// Work handed to the tick loop; applied at the start of the next tick
#[derive(Debug)]
pub enum RoomCommand {
    Join(Arc<Session>),
    Leave(PlayerId),
}

/// Per-tick delivery counts
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastStats {
    pub delivered: usize,
    pub skipped: usize,
    pub closed: usize,
}

/// Shared, thread-safe face of a room
pub struct RoomHandle {
    name: String,
    path: String,
    settings: RoomSettings,
    next_session_id: AtomicU64,
    /// Sessions currently receiving broadcasts
    sessions: DashMap<PlayerId, Arc<Session>>,
    commands: mpsc::Sender<RoomCommand>,
    /// Flipped to `true` once the tick loop has ended, for any reason
    stopped: watch::Sender<bool>,
    tick: AtomicU64,
}

impl RoomHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn settings(&self) -> &RoomSettings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        !*self.stopped.borrow()
    }

    /// Resolves once the room has stopped; immediately if it already has
    pub async fn stopped(&self) {
        let mut rx = self.stopped.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    pub fn tick_count(&self) -> u64 {
        self.tick.load(Ordering::Relaxed)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Snapshot of the attached sessions
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.sessions.iter().map(|s| s.value().clone()).collect()
    }

    /// Allocate an identity and queue the player's creation.
    ///
    /// Identities come from a counter that is never rewound, so they are
    /// unique for the lifetime of the process.
    pub async fn join(
        &self,
        conn_id: Uuid,
    ) -> Result<(Arc<Session>, mpsc::Receiver<Outbound>), RoomError> {
        if !self.is_running() {
            return Err(RoomError::Stopped(self.name.clone()));
        }

        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let (session, outbound_rx) = Session::new(id, conn_id, self.settings.outbound_queue_frames);

        self.commands
            .send(RoomCommand::Join(session.clone()))
            .await
            .map_err(|_| RoomError::Stopped(self.name.clone()))?;

        Ok((session, outbound_rx))
    }

    /// Detach a session and queue removal of its player.
    ///
    /// Safe to call any number of times; returns whether this call detached it.
    pub async fn leave(&self, id: PlayerId) -> bool {
        let detached = self.sessions.remove(&id).is_some();
        // Always queued: the join may still be waiting in the channel
        if self.commands.send(RoomCommand::Leave(id)).await.is_err() {
            debug!(room = %self.name, session_id = id, "Room gone, nothing to remove");
        }
        detached
    }

    /// Offer one encoded frame to every attached session
    pub fn broadcast(&self, payload: &Arc<str>) -> BroadcastStats {
        let mut stats = BroadcastStats::default();
        for entry in self.sessions.iter() {
            match entry
                .value()
                .offer_frame(payload, self.settings.max_buffered_bytes)
            {
                Delivery::Queued => stats.delivered += 1,
                Delivery::Skipped => stats.skipped += 1,
                Delivery::Closed => stats.closed += 1,
            }
        }
        stats
    }

    /// Drop every connection, used once the tick loop has stopped
    pub fn evict_all(&self) {
        for entry in self.sessions.iter() {
            entry.value().evict();
        }
    }

    fn mark_stopped(&self) {
        self.stopped.send_replace(true);
    }
}

/// The authoritative room, owned by its tick loop
pub struct Room<S: Simulation> {
    handle: Arc<RoomHandle>,
    engine: S,
    commands: mpsc::Receiver<RoomCommand>,
    snapshot_builder: SnapshotBuilder,
}

impl<S: Simulation> Room<S> {
    /// Create a room and the handle used to reach it
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        engine: S,
        settings: RoomSettings,
    ) -> (Self, Arc<RoomHandle>) {
        let (command_tx, command_rx) = mpsc::channel(256);

        let handle = Arc::new(RoomHandle {
            name: name.into(),
            path: path.into(),
            settings,
            next_session_id: AtomicU64::new(1),
            sessions: DashMap::new(),
            commands: command_tx,
            stopped: watch::channel(false).0,
            tick: AtomicU64::new(0),
        });

        let room = Self {
            snapshot_builder: SnapshotBuilder::new(handle.settings.snapshot_every_ticks),
            handle: handle.clone(),
            engine,
            commands: command_rx,
        };

        (room, handle)
    }

    #[cfg(test)]
    pub fn engine(&self) -> &S {
        &self.engine
    }

    /// Run one full tick: apply joins/leaves, sample input, advance, broadcast
    pub fn tick(&mut self) {
        self.process_commands();
        self.sample_inputs();

        self.engine.advance();
        self.handle.tick.fetch_add(1, Ordering::Relaxed);

        if !self.snapshot_builder.should_send() {
            return;
        }

        let payload = match self.snapshot_builder.build(&self.engine.state()) {
            Ok(payload) => payload,
            Err(e) => {
                error!(room = %self.handle.name, error = %e, "Failed to serialize snapshot");
                return;
            }
        };

        let stats = self.handle.broadcast(&payload);
        if stats.skipped > 0 || stats.closed > 0 {
            debug!(
                room = %self.handle.name,
                delivered = stats.delivered,
                skipped = stats.skipped,
                closed = stats.closed,
                bytes = self.snapshot_builder.last_bytes(),
                "Snapshot not delivered to every session"
            );
        }
    }

    /// Drive the room at its fixed rate until shutdown
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let period = self.handle.settings.tick_period;
        info!(room = %self.handle.name, path = %self.handle.path, ?period, "Room started");

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let timer = Timer::new();
                    self.tick();
                    if timer.elapsed() > period {
                        warn!(
                            room = %self.handle.name,
                            tick_micros = timer.elapsed_micros(),
                            "Tick overran its period"
                        );
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        self.handle.mark_stopped();
        self.handle.evict_all();
        info!(room = %self.handle.name, "Room stopped");
    }

    fn process_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                RoomCommand::Join(session) => self.handle_join(session),
                RoomCommand::Leave(id) => self.handle_leave(id),
            }
        }
    }

    fn handle_join(&mut self, session: Arc<Session>) {
        let id = session.id();
        self.engine.add_player(id);

        // init goes out before the session can see any broadcast
        match build_init(id, &self.handle.name, &self.engine.state()) {
            Ok(payload) => {
                session.send_frame(payload);
            }
            Err(e) => error!(room = %self.handle.name, error = %e, "Failed to serialize init"),
        }
        self.handle.sessions.insert(id, session.clone());

        info!(
            room = %self.handle.name,
            session_id = id,
            conn_id = %session.conn_id(),
            player_count = self.engine.player_count(),
            "Player joined room"
        );
    }

    fn handle_leave(&mut self, id: PlayerId) {
        self.handle.sessions.remove(&id);
        if self.engine.remove_player(id) {
            info!(
                room = %self.handle.name,
                session_id = id,
                player_count = self.engine.player_count(),
                "Player left room"
            );
        }
    }

    fn sample_inputs(&mut self) {
        for entry in self.handle.sessions.iter() {
            self.engine.set_input(*entry.key(), entry.value().input());
        }
    }
}

/// Start a room's tick loop, its liveness monitor, and a supervisor that
/// contains a panicking loop to this room
pub fn spawn_room<S: Simulation>(
    name: &str,
    path: &str,
    engine: S,
    settings: RoomSettings,
    shutdown: watch::Receiver<bool>,
) -> Arc<RoomHandle> {
    let (room, handle) = Room::new(name, path, engine, settings);

    let tick_task = tokio::spawn(room.run(shutdown.clone()));
    tokio::spawn(heartbeat::run(handle.clone(), shutdown));

    let supervised = handle.clone();
    tokio::spawn(async move {
        match tick_task.await {
            Ok(()) => {}
            Err(e) if e.is_panic() => {
                error!(room = %supervised.name, "Room tick loop panicked; closing its sessions");
                supervised.mark_stopped();
                supervised.evict_all();
            }
            Err(e) => {
                warn!(room = %supervised.name, error = %e, "Room tick loop cancelled");
                supervised.mark_stopped();
            }
        }
    });

    handle
}

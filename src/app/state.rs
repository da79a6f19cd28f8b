//! Application state shared across routes

use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use crate::config::Config;
use crate::game::room::spawn_room;
use crate::game::{
    ArcadeEngine, ArcadeTuning, AsteroidsEngine, AsteroidsTuning, RoomHandle, RoomSettings,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Every running room, in endpoint order
    pub rooms: Arc<Vec<Arc<RoomHandle>>>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl AppState {
    /// Start every room. Must be called inside a tokio runtime.
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let settings = RoomSettings {
            tick_period: config.tick_period(),
            snapshot_every_ticks: config.snapshot_every_ticks,
            heartbeat_interval: config.heartbeat_interval,
            max_buffered_bytes: config.max_buffered_bytes,
            outbound_queue_frames: config.outbound_queue_frames,
        };

        let seed = config.world_seed.unwrap_or_else(rand::random);
        info!(seed, "Seeding asteroid field");

        let rooms = vec![
            spawn_room(
                "asteroids",
                "/ws",
                AsteroidsEngine::new(AsteroidsTuning::default(), seed),
                settings.clone(),
                shutdown_rx.clone(),
            ),
            spawn_room(
                "galaga",
                "/galaga",
                ArcadeEngine::new(ArcadeTuning::default()),
                settings.clone(),
                shutdown_rx.clone(),
            ),
            spawn_room(
                "berzerk",
                "/berzerk",
                ArcadeEngine::new(ArcadeTuning::default()),
                settings,
                shutdown_rx,
            ),
        ];

        Self {
            config,
            rooms: Arc::new(rooms),
            shutdown: Arc::new(shutdown_tx),
        }
    }

    /// Stop every room's tick loop and liveness monitor
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

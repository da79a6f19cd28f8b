//! Game simulation modules

pub mod arcade;
pub mod asteroids;
pub mod combat;
pub mod entity;
pub mod heartbeat;
pub mod physics;
pub mod room;
pub mod session;
pub mod snapshot;

pub use arcade::{ArcadeEngine, ArcadeTuning};
pub use asteroids::{AsteroidsEngine, AsteroidsTuning};
pub use room::{RoomHandle, RoomSettings};
pub use session::{Outbound, Session};

use serde::{Deserialize, Serialize};

/// Identity of a player entity, equal to the session id that owns it.
pub type PlayerId = u64;

/// Directional and fire flags as last reported by a client.
///
/// Absent flags decode as `false`, so a partial or empty `keys` object means
/// "no input".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputKeys {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub space: bool,
}

/// One room's authoritative world.
///
/// Implementations are owned by a single tick loop and are never shared
/// between threads, so every method takes plain `&self`/`&mut self`.
pub trait Simulation: Send + 'static {
    /// Value view handed to the broadcaster after every tick.
    type Snapshot: Serialize + Send;

    /// Spawn a player at the variant's spawn point. Re-adding an existing id is a no-op.
    fn add_player(&mut self, id: PlayerId);

    /// Remove a player; returns whether it existed.
    fn remove_player(&mut self, id: PlayerId) -> bool;

    /// Replace a player's buffered input.
    fn set_input(&mut self, id: PlayerId, keys: InputKeys);

    /// Advance the world by exactly one fixed step.
    fn advance(&mut self);

    /// Copy of every entity collection.
    fn state(&self) -> Self::Snapshot;

    fn player_count(&self) -> usize;
}

//! Entity records. Plain state; the engines own all behavior.

use serde::Serialize;

use super::{InputKeys, PlayerId};

/// Player in the asteroids room: rotates and thrusts with inertia.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ship {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    /// Heading in radians
    pub angle: f32,
    pub vx: f32,
    pub vy: f32,
    pub score: u32,
    pub input: InputKeys,
    /// Ticks until the next shot is allowed
    pub fire_timer: u32,
}

/// Player in the strafing arcade rooms: moves directly, no inertia.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fighter {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    /// Current direction on each axis, one of -1, 0, 1
    pub vx: f32,
    pub vy: f32,
    pub speed: f32,
    pub score: u32,
    pub input: InputKeys,
    pub fire_timer: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bullet {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Remaining lifetime in ticks
    pub ttl: u32,
    pub owner: PlayerId,
}

/// Destructible hazard. `size` doubles as the collision radius.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Asteroid {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub size: f32,
    pub rotation: f32,
}

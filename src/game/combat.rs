//! Combat system - firing, projectile lifetime, hazard hits

use rand::Rng;
use std::f32::consts::TAU;

use super::entity::{Asteroid, Bullet};
use super::physics::{Bounds, PhysicsSystem};
use super::PlayerId;

/// Outcome of a projectile striking a hazard
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub shooter_id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

/// Combat system for managing weapons and projectiles
pub struct CombatSystem;

impl CombatSystem {
    /// Check if a player can fire (cooldown check)
    pub fn can_fire(fire_timer: u32) -> bool {
        fire_timer == 0
    }

    /// Count a cooldown down by one tick, never below zero
    pub fn tick_cooldown(fire_timer: u32) -> u32 {
        fire_timer.saturating_sub(1)
    }

    /// Move a projectile one tick and burn one tick of lifetime.
    /// Returns false once it has expired or left the room.
    pub fn advance_bullet(bullet: &mut Bullet, bounds: &Bounds) -> bool {
        bullet.x += bullet.vx;
        bullet.y += bullet.vy;
        bullet.ttl = bullet.ttl.saturating_sub(1);
        bullet.ttl > 0 && bounds.contains(bullet.x, bullet.y)
    }

    /// Pair projectiles with the hazards they hit this tick.
    ///
    /// Each projectile hits at most one hazard and each hazard is claimed by
    /// at most one projectile. Returns `(bullet_index, asteroid_index)` pairs.
    pub fn find_hits(bullets: &[Bullet], asteroids: &[Asteroid]) -> Vec<(usize, usize)> {
        let mut claimed = vec![false; asteroids.len()];
        let mut hits = Vec::new();

        for (bi, bullet) in bullets.iter().enumerate() {
            let target = asteroids.iter().enumerate().find(|(ai, a)| {
                !claimed[*ai] && PhysicsSystem::circles_overlap(bullet.x, bullet.y, 0.0, a.x, a.y, a.size)
            });
            if let Some((ai, _)) = target {
                claimed[ai] = true;
                hits.push((bi, ai));
            }
        }

        hits
    }

    /// Break a hazard into two halves, or nothing once it is at or below `min_split_size`
    pub fn split_asteroid<R: Rng>(
        asteroid: &Asteroid,
        min_split_size: f32,
        drift: f32,
        rng: &mut R,
    ) -> Vec<Asteroid> {
        if asteroid.size <= min_split_size {
            return Vec::new();
        }

        (0..2)
            .map(|_| Asteroid {
                x: asteroid.x,
                y: asteroid.y,
                vx: rng.gen_range(-drift..drift),
                vy: rng.gen_range(-drift..drift),
                size: asteroid.size / 2.0,
                rotation: rng.gen_range(0.0..TAU),
            })
            .collect()
    }
}

//! Strafing arcade rooms (galaga, berzerk): direct movement, forward shots

use serde::Serialize;
use std::collections::BTreeMap;

use super::combat::CombatSystem;
use super::entity::{Bullet, Fighter};
use super::physics::{axis, Bounds, PhysicsSystem};
use super::{InputKeys, PlayerId, Simulation};

#[derive(Debug, Clone)]
pub struct ArcadeTuning {
    pub bounds: Bounds,
    pub move_speed: f32,
    /// Horizontal distance from the fighter at which shots appear
    pub muzzle_offset: f32,
    pub bullet_speed: f32,
    pub bullet_ttl: u32,
    pub fire_cooldown: u32,
}

impl Default for ArcadeTuning {
    fn default() -> Self {
        Self {
            bounds: Bounds::new(960.0, 540.0),
            move_speed: 3.2,
            muzzle_offset: 12.0,
            bullet_speed: 8.0,
            bullet_ttl: 90,
            fire_cooldown: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArcadeState {
    pub players: BTreeMap<PlayerId, Fighter>,
    pub bullets: Vec<Bullet>,
}

pub struct ArcadeEngine {
    tuning: ArcadeTuning,
    players: BTreeMap<PlayerId, Fighter>,
    bullets: Vec<Bullet>,
}

impl ArcadeEngine {
    pub fn new(tuning: ArcadeTuning) -> Self {
        Self {
            tuning,
            players: BTreeMap::new(),
            bullets: Vec::new(),
        }
    }

    pub fn create_player(&self, id: PlayerId) -> Fighter {
        let (x, y) = self.tuning.bounds.center();
        Fighter {
            id,
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            speed: self.tuning.move_speed,
            score: 0,
            input: InputKeys::default(),
            fire_timer: 0,
        }
    }
}

impl Simulation for ArcadeEngine {
    type Snapshot = ArcadeState;

    fn add_player(&mut self, id: PlayerId) {
        if !self.players.contains_key(&id) {
            let fighter = self.create_player(id);
            self.players.insert(id, fighter);
        }
    }

    fn remove_player(&mut self, id: PlayerId) -> bool {
        self.players.remove(&id).is_some()
    }

    fn set_input(&mut self, id: PlayerId, keys: InputKeys) {
        if let Some(fighter) = self.players.get_mut(&id) {
            fighter.input = keys;
        }
    }

    fn advance(&mut self) {
        let t = &self.tuning;

        for fighter in self.players.values_mut() {
            let keys = fighter.input;
            fighter.vx = axis(keys.left, keys.right);
            fighter.vy = axis(keys.up, keys.down);
            (fighter.x, fighter.y) = PhysicsSystem::strafe(
                fighter.x,
                fighter.y,
                fighter.vx,
                fighter.vy,
                fighter.speed,
                &t.bounds,
            );

            fighter.fire_timer = CombatSystem::tick_cooldown(fighter.fire_timer);
            if keys.space && CombatSystem::can_fire(fighter.fire_timer) {
                self.bullets.push(Bullet {
                    x: fighter.x + t.muzzle_offset,
                    y: fighter.y,
                    vx: t.bullet_speed,
                    vy: 0.0,
                    ttl: t.bullet_ttl,
                    owner: fighter.id,
                });
                fighter.fire_timer = t.fire_cooldown;
            }
        }

        self.bullets
            .retain_mut(|b| CombatSystem::advance_bullet(b, &t.bounds));
    }

    fn state(&self) -> ArcadeState {
        ArcadeState {
            players: self.players.clone(),
            bullets: self.bullets.clone(),
        }
    }

    fn player_count(&self) -> usize {
        self.players.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(f: impl FnOnce(&mut InputKeys)) -> InputKeys {
        let mut k = InputKeys::default();
        f(&mut k);
        k
    }

    #[test]
    fn spawns_at_room_center() {
        let engine = ArcadeEngine::new(ArcadeTuning::default());
        let fighter = engine.create_player(1);
        assert_eq!((fighter.x, fighter.y), (480.0, 270.0));
        assert_eq!(fighter.speed, 3.2);
    }

    #[test]
    fn diagonal_input_moves_both_axes() {
        let mut engine = ArcadeEngine::new(ArcadeTuning::default());
        engine.add_player(1);
        engine.set_input(1, keys(|k| {
            k.right = true;
            k.up = true;
        }));
        engine.advance();

        let f = &engine.state().players[&1];
        assert_eq!((f.vx, f.vy), (1.0, -1.0));
        assert!((f.x - 483.2).abs() < 1e-3);
        assert!((f.y - 266.8).abs() < 1e-3);
    }

    #[test]
    fn wraps_past_left_edge() {
        let mut engine = ArcadeEngine::new(ArcadeTuning::default());
        engine.add_player(1);
        engine.set_input(1, keys(|k| k.left = true));
        for _ in 0..200 {
            engine.advance();
            let f = &engine.state().players[&1];
            assert!((0.0..960.0).contains(&f.x));
        }
        // 200 * 3.2 = 640 travelled from 480, wrapping once
        let f = &engine.state().players[&1];
        assert!((f.x - 800.0).abs() < 0.1, "x = {}", f.x);
    }

    #[test]
    fn shots_spawn_at_muzzle_and_respect_cooldown() {
        let mut engine = ArcadeEngine::new(ArcadeTuning::default());
        engine.add_player(1);
        engine.set_input(1, keys(|k| k.space = true));

        engine.advance();
        let state = engine.state();
        assert_eq!(state.bullets.len(), 1);
        // spawned at 480 + 12, then moved once
        assert_eq!((state.bullets[0].x, state.bullets[0].ttl), (500.0, 89));

        for _ in 0..7 {
            engine.advance();
        }
        assert_eq!(engine.state().bullets.len(), 1);
        engine.advance();
        assert_eq!(engine.state().bullets.len(), 2);
    }

    #[test]
    fn bullet_gone_after_lifetime() {
        let tuning = ArcadeTuning {
            bullet_ttl: 4,
            fire_cooldown: 1_000,
            ..Default::default()
        };
        let mut engine = ArcadeEngine::new(tuning);
        engine.add_player(1);
        engine.set_input(1, keys(|k| k.space = true));

        for _ in 0..3 {
            engine.advance();
            assert_eq!(engine.state().bullets.len(), 1);
        }
        engine.advance();
        assert!(engine.state().bullets.is_empty());
    }

    #[test]
    fn missing_player_input_is_ignored() {
        let mut engine = ArcadeEngine::new(ArcadeTuning::default());
        engine.set_input(42, keys(|k| k.space = true));
        engine.advance();
        assert!(engine.state().bullets.is_empty());
        assert_eq!(engine.player_count(), 0);
    }
}

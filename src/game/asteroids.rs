//! Asteroids room: inertial ships, wrapping hazards that split when shot

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::f32::consts::TAU;
use tracing::debug;

use super::combat::{CombatSystem, HitResult};
use super::entity::{Asteroid, Bullet, Ship};
use super::physics::{axis, Bounds, PhysicsSystem, ShipHandling, ShipMotion};
use super::{InputKeys, PlayerId, Simulation};

/// Per-tick constants for the asteroids room
#[derive(Debug, Clone)]
pub struct AsteroidsTuning {
    pub bounds: Bounds,
    pub handling: ShipHandling,
    pub bullet_speed: f32,
    pub bullet_ttl: u32,
    pub fire_cooldown: u32,
    /// Hazards spawned at start and whenever the field is cleared
    pub field_size: usize,
    pub asteroid_size: f32,
    /// Hazards at or below this size vanish instead of splitting
    pub min_split_size: f32,
    /// Velocity components of fresh hazards are drawn from `(-drift, drift)`
    pub spawn_drift: f32,
    pub fragment_drift: f32,
    pub spin: f32,
    pub hit_reward: u32,
}

impl Default for AsteroidsTuning {
    fn default() -> Self {
        Self {
            bounds: Bounds::new(800.0, 600.0),
            handling: ShipHandling {
                turn_rate: 0.06,
                thrust: 0.15,
                damping: 0.98,
            },
            bullet_speed: 7.0,
            bullet_ttl: 60,
            fire_cooldown: 15,
            field_size: 5,
            asteroid_size: 30.0,
            min_split_size: 15.0,
            spawn_drift: 1.0,
            fragment_drift: 1.5,
            spin: 0.01,
            hit_reward: 100,
        }
    }
}

/// Snapshot of the asteroids room
#[derive(Debug, Clone, Serialize)]
pub struct AsteroidsState {
    pub players: BTreeMap<PlayerId, Ship>,
    pub bullets: Vec<Bullet>,
    pub asteroids: Vec<Asteroid>,
}

pub struct AsteroidsEngine {
    tuning: AsteroidsTuning,
    players: BTreeMap<PlayerId, Ship>,
    bullets: Vec<Bullet>,
    asteroids: Vec<Asteroid>,
    rng: ChaCha8Rng,
}

impl AsteroidsEngine {
    pub fn new(tuning: AsteroidsTuning, seed: u64) -> Self {
        let mut engine = Self {
            tuning,
            players: BTreeMap::new(),
            bullets: Vec::new(),
            asteroids: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        };
        engine.spawn_field();
        engine
    }

    /// A fresh ship at the room's spawn point
    pub fn create_player(&self, id: PlayerId) -> Ship {
        let (x, y) = self.tuning.bounds.center();
        Ship {
            id,
            x,
            y,
            angle: 0.0,
            vx: 0.0,
            vy: 0.0,
            score: 0,
            input: InputKeys::default(),
            fire_timer: 0,
        }
    }

    fn spawn_field(&mut self) {
        let t = &self.tuning;
        let rng = &mut self.rng;
        self.asteroids = (0..t.field_size)
            .map(|_| Asteroid {
                x: rng.gen_range(0.0..t.bounds.width),
                y: rng.gen_range(0.0..t.bounds.height),
                vx: rng.gen_range(-t.spawn_drift..t.spawn_drift),
                vy: rng.gen_range(-t.spawn_drift..t.spawn_drift),
                size: t.asteroid_size,
                rotation: rng.gen_range(0.0..TAU),
            })
            .collect();
    }

    fn update_ships(&mut self) {
        let t = &self.tuning;
        for ship in self.players.values_mut() {
            let keys = ship.input;
            let motion = PhysicsSystem::steer_ship(
                ShipMotion {
                    x: ship.x,
                    y: ship.y,
                    angle: ship.angle,
                    vx: ship.vx,
                    vy: ship.vy,
                },
                axis(keys.left, keys.right),
                keys.up,
                &t.handling,
                &t.bounds,
            );
            ship.x = motion.x;
            ship.y = motion.y;
            ship.angle = motion.angle;
            ship.vx = motion.vx;
            ship.vy = motion.vy;

            if keys.space && CombatSystem::can_fire(ship.fire_timer) {
                self.bullets.push(Bullet {
                    x: ship.x,
                    y: ship.y,
                    vx: ship.angle.cos() * t.bullet_speed + ship.vx,
                    vy: ship.angle.sin() * t.bullet_speed + ship.vy,
                    ttl: t.bullet_ttl,
                    owner: ship.id,
                });
                ship.fire_timer = t.fire_cooldown;
            }
            ship.fire_timer = CombatSystem::tick_cooldown(ship.fire_timer);
        }
    }

    fn update_asteroids(&mut self) {
        let bounds = self.tuning.bounds;
        for rock in &mut self.asteroids {
            (rock.x, rock.y) = bounds.wrap(rock.x + rock.vx, rock.y + rock.vy);
            rock.rotation += self.tuning.spin;
        }
    }

    fn resolve_collisions(&mut self) -> Vec<HitResult> {
        let hits = CombatSystem::find_hits(&self.bullets, &self.asteroids);
        if hits.is_empty() {
            return Vec::new();
        }

        let mut spent = vec![false; self.bullets.len()];
        let mut destroyed = vec![false; self.asteroids.len()];
        let mut fragments = Vec::new();
        let mut results = Vec::with_capacity(hits.len());

        for (bi, ai) in hits {
            spent[bi] = true;
            destroyed[ai] = true;
            let rock = &self.asteroids[ai];
            fragments.extend(CombatSystem::split_asteroid(
                rock,
                self.tuning.min_split_size,
                self.tuning.fragment_drift,
                &mut self.rng,
            ));
            results.push(HitResult {
                shooter_id: self.bullets[bi].owner,
                x: rock.x,
                y: rock.y,
                size: rock.size,
            });
        }

        let mut spent = spent.into_iter();
        self.bullets.retain(|_| !spent.next().unwrap_or(false));
        let mut destroyed = destroyed.into_iter();
        self.asteroids.retain(|_| !destroyed.next().unwrap_or(false));
        self.asteroids.extend(fragments);

        for hit in &results {
            // The shooter may have left while the bullet was in flight
            if let Some(ship) = self.players.get_mut(&hit.shooter_id) {
                ship.score += self.tuning.hit_reward;
            }
        }

        results
    }
}

impl Simulation for AsteroidsEngine {
    type Snapshot = AsteroidsState;

    fn add_player(&mut self, id: PlayerId) {
        if !self.players.contains_key(&id) {
            let ship = self.create_player(id);
            self.players.insert(id, ship);
        }
    }

    fn remove_player(&mut self, id: PlayerId) -> bool {
        self.players.remove(&id).is_some()
    }

    fn set_input(&mut self, id: PlayerId, keys: InputKeys) {
        if let Some(ship) = self.players.get_mut(&id) {
            ship.input = keys;
        }
    }

    fn advance(&mut self) {
        self.update_ships();
        self.update_asteroids();

        let bounds = self.tuning.bounds;
        self.bullets
            .retain_mut(|b| CombatSystem::advance_bullet(b, &bounds));

        for hit in self.resolve_collisions() {
            debug!(shooter = hit.shooter_id, size = hit.size, x = hit.x, y = hit.y, "Asteroid destroyed");
        }

        if self.asteroids.is_empty() {
            self.spawn_field();
        }
    }

    fn state(&self) -> AsteroidsState {
        AsteroidsState {
            players: self.players.clone(),
            bullets: self.bullets.clone(),
            asteroids: self.asteroids.clone(),
        }
    }

    fn player_count(&self) -> usize {
        self.players.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> AsteroidsEngine {
        let mut engine = AsteroidsEngine::new(AsteroidsTuning::default(), 7);
        // Park a single still hazard in a corner so it never interferes
        engine.asteroids = vec![still_rock(20.0, 20.0, 30.0)];
        engine
    }

    fn still_rock(x: f32, y: f32, size: f32) -> Asteroid {
        Asteroid {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            size,
            rotation: 0.0,
        }
    }

    fn press(engine: &mut AsteroidsEngine, id: PlayerId, keys: InputKeys) {
        engine.set_input(id, keys);
    }

    #[test]
    fn new_player_spawns_at_center_at_rest() {
        let engine = engine();
        let ship = engine.create_player(3);
        assert_eq!((ship.x, ship.y, ship.angle), (400.0, 300.0, 0.0));
        assert_eq!((ship.vx, ship.vy, ship.score, ship.fire_timer), (0.0, 0.0, 0, 0));
    }

    #[test]
    fn initial_field_is_populated() {
        let engine = AsteroidsEngine::new(AsteroidsTuning::default(), 1);
        let state = engine.state();
        assert_eq!(state.asteroids.len(), 5);
        assert!(state.asteroids.iter().all(|a| a.size == 30.0));
    }

    #[test]
    fn thrust_moves_along_heading_up_to_terminal_speed() {
        let mut engine = engine();
        engine.add_player(1);
        press(
            &mut engine,
            1,
            InputKeys {
                up: true,
                ..Default::default()
            },
        );

        let terminal = 0.15 * 0.98 / (1.0 - 0.98);
        let mut last_x = 400.0;
        let mut last_vx = 0.0;
        for _ in 0..40 {
            engine.advance();
            let ship = &engine.state().players[&1];
            assert!(ship.x > last_x, "ship should keep moving forward");
            assert!(ship.vx > last_vx && ship.vx < terminal);
            assert_eq!(ship.y, 300.0);
            last_x = ship.x;
            last_vx = ship.vx;
        }
    }

    #[test]
    fn positions_always_wrap_into_room() {
        let mut engine = AsteroidsEngine::new(AsteroidsTuning::default(), 99);
        for id in 1..=4 {
            engine.add_player(id);
        }
        press(&mut engine, 1, InputKeys { up: true, left: true, ..Default::default() });
        press(&mut engine, 2, InputKeys { up: true, ..Default::default() });
        press(&mut engine, 3, InputKeys { up: true, right: true, space: true, ..Default::default() });

        for _ in 0..2_000 {
            engine.advance();
            let state = engine.state();
            for ship in state.players.values() {
                assert!((0.0..800.0).contains(&ship.x), "x out of range: {}", ship.x);
                assert!((0.0..600.0).contains(&ship.y), "y out of range: {}", ship.y);
            }
            for rock in &state.asteroids {
                assert!((0.0..800.0).contains(&rock.x) && (0.0..600.0).contains(&rock.y));
            }
        }
    }

    #[test]
    fn fire_respects_cooldown() {
        let mut engine = engine();
        engine.add_player(1);
        press(&mut engine, 1, InputKeys { space: true, ..Default::default() });

        engine.advance();
        assert_eq!(engine.state().bullets.len(), 1);
        assert_eq!(engine.state().players[&1].fire_timer, 14);

        for _ in 0..14 {
            engine.advance();
        }
        assert_eq!(engine.state().bullets.len(), 1);

        engine.advance();
        assert_eq!(engine.state().bullets.len(), 2);
    }

    #[test]
    fn bullet_expires_after_its_lifetime() {
        let tuning = AsteroidsTuning {
            bullet_ttl: 10,
            ..Default::default()
        };
        let mut engine = AsteroidsEngine::new(tuning, 3);
        engine.asteroids = vec![still_rock(20.0, 580.0, 30.0)];
        engine.add_player(1);
        press(&mut engine, 1, InputKeys { space: true, ..Default::default() });
        engine.advance();
        press(&mut engine, 1, InputKeys::default());

        let bullet = &engine.state().bullets[0];
        assert_eq!((bullet.ttl, bullet.owner), (9, 1));

        for _ in 0..8 {
            engine.advance();
            assert_eq!(engine.state().bullets.len(), 1);
        }
        engine.advance();
        assert!(engine.state().bullets.is_empty());
    }

    #[test]
    fn hit_splits_rock_and_rewards_shooter() {
        let mut engine = engine();
        engine.asteroids = vec![still_rock(440.0, 300.0, 30.0)];
        engine.add_player(1);
        press(&mut engine, 1, InputKeys { space: true, ..Default::default() });
        engine.advance();
        press(&mut engine, 1, InputKeys::default());

        // bullet at x=407 after the first tick, inside the rock after the second
        assert_eq!(engine.state().asteroids.len(), 1);
        engine.advance();

        let state = engine.state();
        assert!(state.bullets.is_empty());
        assert!(state.asteroids.iter().all(|a| a.size != 30.0));
        assert_eq!(state.asteroids.len(), 2);
        for half in &state.asteroids {
            assert_eq!(half.size, 15.0);
            assert!((half.x - 440.0).abs() < 0.01 && (half.y - 300.0).abs() < 0.01);
        }
        assert_eq!(state.players[&1].score, 100);
    }

    #[test]
    fn smallest_rock_vanishes_and_field_respawns() {
        let mut engine = engine();
        engine.asteroids = vec![still_rock(420.0, 300.0, 15.0)];
        engine.add_player(1);
        press(&mut engine, 1, InputKeys { space: true, ..Default::default() });
        engine.advance();
        engine.advance();

        let state = engine.state();
        assert_eq!(state.players[&1].score, 100);
        assert_eq!(state.asteroids.len(), 5);
        assert!(state.asteroids.iter().all(|a| a.size == 30.0));
    }

    #[test]
    fn empty_field_is_repopulated_next_tick() {
        let mut engine = engine();
        engine.asteroids.clear();
        engine.advance();
        assert_eq!(engine.state().asteroids.len(), 5);
    }

    #[test]
    fn score_for_departed_shooter_is_dropped() {
        let mut engine = engine();
        engine.asteroids = vec![still_rock(440.0, 300.0, 30.0)];
        engine.add_player(1);
        press(&mut engine, 1, InputKeys { space: true, ..Default::default() });
        engine.advance();
        assert!(engine.remove_player(1));
        engine.advance();
        assert_eq!(engine.state().asteroids.len(), 2);
        assert!(!engine.remove_player(1));
    }

    #[test]
    fn snapshot_is_a_detached_copy() {
        let mut engine = engine();
        engine.add_player(1);
        let mut snapshot = engine.state();
        snapshot.players.get_mut(&1).unwrap().x = -5.0;
        snapshot.asteroids.clear();
        assert_eq!(engine.state().players[&1].x, 400.0);
        assert_eq!(engine.state().asteroids.len(), 1);
    }

    #[test]
    fn snapshot_serializes_in_wire_shape() {
        let mut engine = engine();
        engine.add_player(12);
        let json = serde_json::to_value(engine.state()).unwrap();
        let ship = &json["players"]["12"];
        assert_eq!(ship["id"], 12);
        assert_eq!(ship["fireTimer"], 0);
        assert_eq!(ship["input"]["space"], false);
        assert!(json["bullets"].as_array().unwrap().is_empty());
        assert_eq!(json["asteroids"][0]["size"], 30.0);
    }
}

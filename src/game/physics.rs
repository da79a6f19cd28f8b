//! Movement integration and room-space geometry
//!
//! Every step is one tick of simple Euler integration: velocities are
//! expressed per tick, so there is no explicit delta time.

/// Rectangular room extent. Positions live in `[0, width) x [0, height)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.width / 2.0, self.height / 2.0)
    }

    /// Wrap a point back into the room
    pub fn wrap(&self, x: f32, y: f32) -> (f32, f32) {
        (wrap_axis(x, self.width), wrap_axis(y, self.height))
    }

    /// Inclusive containment check used to cull projectiles
    pub fn contains(&self, x: f32, y: f32) -> bool {
        (0.0..=self.width).contains(&x) && (0.0..=self.height).contains(&y)
    }
}

/// Euclidean wrap into `[0, extent)`.
pub fn wrap_axis(value: f32, extent: f32) -> f32 {
    let wrapped = value.rem_euclid(extent);
    // rem_euclid can round a tiny negative input up to exactly `extent`
    if wrapped >= extent {
        0.0
    } else {
        wrapped
    }
}

/// Rotation and thrust parameters for inertial ships
#[derive(Debug, Clone, Copy)]
pub struct ShipHandling {
    /// Radians per tick while turning
    pub turn_rate: f32,
    /// Velocity added per tick along the heading while thrusting
    pub thrust: f32,
    /// Velocity multiplier applied every tick
    pub damping: f32,
}

/// Result of one inertial ship step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShipMotion {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub vx: f32,
    pub vy: f32,
}

/// Physics system for updating player positions and velocities
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Turn, thrust, damp, move and wrap an inertial ship
    pub fn steer_ship(
        current: ShipMotion,
        turn: f32,
        thrusting: bool,
        handling: &ShipHandling,
        bounds: &Bounds,
    ) -> ShipMotion {
        let angle = current.angle + turn.clamp(-1.0, 1.0) * handling.turn_rate;

        let (mut vx, mut vy) = (current.vx, current.vy);
        if thrusting {
            vx += angle.cos() * handling.thrust;
            vy += angle.sin() * handling.thrust;
        }
        vx *= handling.damping;
        vy *= handling.damping;

        let (x, y) = bounds.wrap(current.x + vx, current.y + vy);
        ShipMotion { x, y, angle, vx, vy }
    }

    /// Move a point directly along a unit direction and wrap it
    pub fn strafe(
        x: f32,
        y: f32,
        dir_x: f32,
        dir_y: f32,
        speed: f32,
        bounds: &Bounds,
    ) -> (f32, f32) {
        bounds.wrap(x + dir_x * speed, y + dir_y * speed)
    }

    /// Strict circle-circle overlap test
    pub fn circles_overlap(x1: f32, y1: f32, r1: f32, x2: f32, y2: f32, r2: f32) -> bool {
        let dx = x2 - x1;
        let dy = y2 - y1;
        let combined = r1 + r2;
        dx * dx + dy * dy < combined * combined
    }
}

/// Map a pair of opposing flags to -1, 0 or 1
pub fn axis(negative: bool, positive: bool) -> f32 {
    (positive as i8 - negative as i8) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_stays_half_open() {
        assert_eq!(wrap_axis(800.0, 800.0), 0.0);
        assert_eq!(wrap_axis(-1.0, 800.0), 799.0);
        assert_eq!(wrap_axis(801.5, 800.0), 1.5);
        let tiny = wrap_axis(-1e-9, 800.0);
        assert!((0.0..800.0).contains(&tiny));
    }

    #[test]
    fn overlap_is_strict() {
        assert!(PhysicsSystem::circles_overlap(0.0, 0.0, 0.0, 29.9, 0.0, 30.0));
        assert!(!PhysicsSystem::circles_overlap(0.0, 0.0, 0.0, 30.0, 0.0, 30.0));
    }

    #[test]
    fn axis_cancels_opposing_flags() {
        assert_eq!(axis(true, true), 0.0);
        assert_eq!(axis(true, false), -1.0);
        assert_eq!(axis(false, true), 1.0);
    }

    #[test]
    fn damping_applies_without_thrust() {
        let handling = ShipHandling {
            turn_rate: 0.06,
            thrust: 0.15,
            damping: 0.5,
        };
        let bounds = Bounds::new(800.0, 600.0);
        let start = ShipMotion {
            x: 10.0,
            y: 10.0,
            angle: 0.0,
            vx: 4.0,
            vy: -4.0,
        };
        let next = PhysicsSystem::steer_ship(start, 0.0, false, &handling, &bounds);
        assert_eq!((next.vx, next.vy), (2.0, -2.0));
        assert_eq!((next.x, next.y), (12.0, 8.0));
    }
}

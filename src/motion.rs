//! Bounded random walk backing the coordinates baked into disguise packets.
//!
//! A probe that inspects consecutive Player Position / chunk packets should see a
//! plausible, slowly wandering player rather than a fixed point or an unbounded walk.

use rand::Rng;
use rand::rand_core::UnwrapErr;
use rand::rngs::OsRng;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

const MIN_XZ: f64 = 0.0;
const MAX_XZ: f64 = 2000.0;
const MIN_Y: f64 = 85.0;
const MAX_Y: f64 = 110.0;
const SPAWN_Y: f64 = 95.0;

const MIN_SPEED: f64 = 2.0;
const MAX_SPEED: f64 = 5.0;

const SHARP_TURN_PROBABILITY: f64 = 0.05;
const SPEED_RESAMPLE_PROBABILITY: f64 = 0.10;

/// Position and heading of the disguise "player", updated once per tick.
#[derive(Debug, Clone, Copy)]
pub struct MotionState {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// heading in radians
    pub angle: f64,
    /// blocks moved per tick
    pub speed: f64,
}

impl MotionState {
    /// Spawns at a uniformly random (x, z) with a fixed starting height, random heading
    /// and random speed, per §4.2's constructor.
    pub fn new() -> Self {
        let mut rng = UnwrapErr(OsRng);
        Self {
            x: rng.random_range(MIN_XZ..MAX_XZ),
            y: SPAWN_Y,
            z: rng.random_range(MIN_XZ..MAX_XZ),
            angle: rng.random_range(0.0..TAU),
            speed: rng.random_range(MIN_SPEED..MAX_SPEED),
        }
    }

    /// Advances the walk by one tick, following §4.2's update steps verbatim:
    /// small turn, occasional sharp turn, occasional speed resample, move, reflect off
    /// the X/Z walls, and blend Y toward a sinusoidal target height.
    pub fn update(&mut self) {
        let mut rng = UnwrapErr(OsRng);

        self.angle += rng.random_range(-0.15..=0.15);

        if rng.random_bool(SHARP_TURN_PROBABILITY) {
            self.angle += rng.random_range(-FRAC_PI_2..=FRAC_PI_2);
        }

        if rng.random_bool(SPEED_RESAMPLE_PROBABILITY) {
            self.speed = rng.random_range(MIN_SPEED..MAX_SPEED);
        }

        self.x += self.angle.cos() * self.speed;
        self.z += self.angle.sin() * self.speed;

        if self.x < MIN_XZ || self.x > MAX_XZ {
            self.x = self.x.clamp(MIN_XZ, MAX_XZ);
            self.angle = PI - self.angle;
        }
        if self.z < MIN_XZ || self.z > MAX_XZ {
            self.z = self.z.clamp(MIN_XZ, MAX_XZ);
            self.angle = -self.angle;
        }

        let target_y = 97.5
            + 5.0 * ((self.x / 100.0).sin() + (self.z / 100.0).cos())
            + 3.0 * ((self.x / 200.0).sin() + (self.z / 200.0).cos())
            + 2.0 * ((self.x + self.z) / 50.0).sin();
        self.y += 0.2 * (target_y - self.y);
        self.y = self.y.clamp(MIN_Y, MAX_Y);
    }
}

impl Default for MotionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawns_within_bounds() {
        for _ in 0..100 {
            let state = MotionState::new();
            assert!((MIN_XZ..MAX_XZ).contains(&state.x));
            assert!((MIN_XZ..MAX_XZ).contains(&state.z));
            assert_eq!(state.y, SPAWN_Y);
            assert!((MIN_SPEED..MAX_SPEED).contains(&state.speed));
        }
    }

    #[test]
    fn stays_within_bounds_over_many_ticks() {
        let mut state = MotionState::new();
        for _ in 0..10_000 {
            state.update();
            assert!((MIN_XZ..=MAX_XZ).contains(&state.x), "x={}", state.x);
            assert!((MIN_XZ..=MAX_XZ).contains(&state.z), "z={}", state.z);
            assert!((MIN_Y..=MAX_Y).contains(&state.y), "y={}", state.y);
        }
    }
}

//! Tank Arena - combat simulation core for a top-down survival shooter
//!
//! Core modules:
//! - `sim`: Frame-driven simulation (actors, collisions, combat, waves, boss)
//! - `tuning`: Data-driven game balance and run configuration
//! - `weapons`: Weapon definition table, looked up by identifier

pub mod sim;
pub mod tuning;
pub mod weapons;

pub use tuning::{MetaMultipliers, Tuning, TuningError};
pub use weapons::{FirePattern, WeaponDef, WeaponTable};

use glam::Vec2;
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;

/// Game configuration constants
pub mod consts {
    /// Longest frame the simulation will integrate in one step
    pub const MAX_FRAME_DT: f32 = 1.0 / 30.0;

    /// Arena dimensions
    pub const ARENA_W: f32 = 3000.0;
    pub const ARENA_H: f32 = 3000.0;

    /// Visible window around the player (used for on-screen checks)
    pub const VIEW_W: f32 = 1100.0;
    pub const VIEW_H: f32 = 650.0;

    /// Player defaults
    pub const PLAYER_RADIUS: f32 = 16.0;
    pub const PLAYER_MAX_HP: i32 = 7;
    pub const PLAYER_ACCEL: f32 = 2100.0;
    pub const PLAYER_FRICTION: f32 = 10.5;
    pub const PLAYER_MAX_SPEED: f32 = 360.0;
    /// Post-hit grace window
    pub const PLAYER_IFRAMES: f32 = 0.70;

    /// Dash defaults
    pub const DASH_SPEED: f32 = 1000.0;
    pub const DASH_TIME: f32 = 0.16;
    pub const DASH_COOLDOWN: f32 = 1.15;
    pub const DASH_COOLDOWN_MIN: f32 = 0.35;

    /// Crit defaults
    pub const CRIT_CHANCE: f32 = 0.05;
    pub const CRIT_MULT: f32 = 1.75;

    /// Knockback impulses (divided by target radius)
    pub const BASE_KNOCKBACK: f32 = 95.0;
    pub const SPLASH_KNOCKBACK: f32 = 110.0;
    pub const CHAIN_KNOCKBACK: f32 = 70.0;
    /// Impulse applied to the player on enemy contact
    pub const CONTACT_KNOCKBACK: f32 = 220.0;

    /// Hit flash duration on damaged actors
    pub const HIT_FLASH: f32 = 0.12;

    /// Pickups
    pub const XP_ORB_VALUE: u32 = 12;
    pub const XP_ORB_RADIUS: f32 = 8.0;
    pub const HEALTH_PACK_AMOUNT: i32 = 1;
    pub const HEALTH_PACK_RADIUS: f32 = 10.0;
    pub const POWERUP_RADIUS: f32 = 12.0;
    pub const PICKUP_ATTRACT_FORCE: f32 = 900.0;
    pub const PICKUP_ATTRACT_DIST: f32 = 190.0;

    /// Power-up spawner
    pub const POWERUP_SPAWN_MIN: f32 = 20.0;
    pub const POWERUP_SPAWN_MAX: f32 = 34.0;
    pub const POWERUP_MAX_ON_MAP: usize = 2;
}

/// Linear interpolation
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Smoothstep easing of a [0, 1] fraction (3t² - 2t³)
#[inline]
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Rotate a vector counter-clockwise by degrees
#[inline]
pub fn rotate_deg(v: Vec2, degrees: f32) -> Vec2 {
    Vec2::from_angle(degrees.to_radians()).rotate(v)
}

/// Normalized direction, or `fallback` when `v` is too short to normalize
#[inline]
pub fn direction_or(v: Vec2, fallback: Vec2) -> Vec2 {
    if v.length_squared() > 1e-6 {
        v.normalize()
    } else {
        fallback
    }
}

/// Blend factor for exponential smoothing at `rate` per second
#[inline]
pub fn exp_smoothing(rate: f32, dt: f32) -> f32 {
    1.0 - (-dt * rate).exp()
}

/// Weighted random pick. Falls back to a uniform pick when no weight is positive.
pub fn weighted_pick<T: Copy, R: Rng + ?Sized>(items: &[(T, f32)], rng: &mut R) -> Option<T> {
    if items.is_empty() {
        return None;
    }
    match WeightedIndex::new(items.iter().map(|(_, w)| w.max(0.0))) {
        Ok(dist) => Some(items[dist.sample(rng)].0),
        Err(_) => Some(items[rng.random_range(0..items.len())].0),
    }
}

/// Normal sample via Box-Muller
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f32, std_dev: f32) -> f32 {
    let u1: f32 = rng.random::<f32>().max(f32::MIN_POSITIVE);
    let u2: f32 = rng.random();
    let z = (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos();
    mean + z * std_dev
}

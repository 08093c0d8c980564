//! Data-driven game balance
//!
//! Every knob the simulation reads at run start lives here. Values load from
//! JSON with serde; anything missing takes the shipped default, and anything
//! out of range is clamped by [`Tuning::sanitized`] rather than rejected.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Errors raised while loading configuration
///
/// Shared by [`Tuning::load`] and the weapon table loader.
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed tuning json: {0}")]
    Parse(#[from] serde_json::Error),
    /// Structurally valid json that cannot be used, such as an empty weapon table
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Wave director curve
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveTuning {
    /// Seconds of survival until difficulty saturates
    pub ramp_time: f32,
    /// Spawn interval at zero difficulty
    pub spawn_rate_base: f32,
    /// Spawn interval at full difficulty
    pub spawn_rate_hard: f32,
    /// Interval reduction per wave past the first
    pub spawn_rate_wave_bonus: f32,
    pub min_spawn_interval: f32,
    pub enemy_cap_base: f32,
    pub enemy_cap_hard: f32,
    pub hp_mult_base: f32,
    pub hp_mult_hard: f32,
    /// Seconds per wave
    pub wave_time: f32,
    /// Boss arrives on multiples of this wave number
    pub boss_every: u32,
    /// Spawn suspension after a boss dies
    pub boss_grace: f32,
}

impl Default for WaveTuning {
    fn default() -> Self {
        Self {
            ramp_time: 400.0,
            spawn_rate_base: 1.35,
            spawn_rate_hard: 0.9,
            spawn_rate_wave_bonus: 0.008,
            min_spawn_interval: 0.42,
            enemy_cap_base: 7.0,
            enemy_cap_hard: 20.0,
            hp_mult_base: 1.0,
            hp_mult_hard: 1.3,
            wave_time: 15.0,
            boss_every: 10,
            boss_grace: 3.0,
        }
    }
}

/// Local separation between enemies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeparationTuning {
    /// Spatial grid cell size
    pub cell_size: f32,
    /// Neighbors closer than `(r1 + r2) * softness` push apart
    pub softness: f32,
    pub force: f32,
}

impl Default for SeparationTuning {
    fn default() -> Self {
        Self {
            cell_size: 120.0,
            softness: 1.15,
            force: 2.2,
        }
    }
}

/// Boss encounter switches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BossTuning {
    /// Dash and rocket-strike specials
    pub attacks: bool,
    /// Enrage-gated sky-slam (special encounters only)
    pub sky_slam: bool,
    /// Boss ignores damage while airborne
    pub slam_damage_immune: bool,
    /// Health fraction below which the boss enrages
    pub enrage_fraction: f32,
}

impl Default for BossTuning {
    fn default() -> Self {
        Self {
            attacks: true,
            sky_slam: false,
            slam_damage_immune: true,
            enrage_fraction: 0.35,
        }
    }
}

/// Meta-progression scalars applied once at run start
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaMultipliers {
    pub damage: f32,
    pub move_speed: f32,
    pub xp: f32,
    /// Dash cooldown scale (lower is faster)
    pub dash: f32,
    /// Incoming damage scale (lower is tougher)
    pub armor: f32,
    pub bullet_speed: f32,
}

impl Default for MetaMultipliers {
    fn default() -> Self {
        Self {
            damage: 1.0,
            move_speed: 1.0,
            xp: 1.0,
            dash: 1.0,
            armor: 1.0,
            bullet_speed: 1.0,
        }
    }
}

/// Defend-the-beacon encounter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveConfig {
    pub pos: Vec2,
    pub radius: f32,
    pub hp: i32,
}

impl Default for ObjectiveConfig {
    fn default() -> Self {
        Self {
            pos: Vec2::new(ARENA_W * 0.5, ARENA_H * 0.5),
            radius: 18.0,
            hp: 25,
        }
    }
}

/// Full run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub max_frame_dt: f32,
    /// Visible window size centered on the player
    pub view_size: Vec2,
    pub wave: WaveTuning,
    pub separation: SeparationTuning,
    pub boss: BossTuning,
    /// Late-game modifier rotation
    pub modifiers_enabled: bool,
    pub meta: MetaMultipliers,
    pub objective: Option<ObjectiveConfig>,
    pub starting_weapon: String,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            max_frame_dt: MAX_FRAME_DT,
            view_size: Vec2::new(VIEW_W, VIEW_H),
            wave: WaveTuning::default(),
            separation: SeparationTuning::default(),
            boss: BossTuning::default(),
            modifiers_enabled: true,
            meta: MetaMultipliers::default(),
            objective: None,
            starting_weapon: crate::weapons::DEFAULT_WEAPON_ID.to_string(),
        }
    }
}

fn clamp_field(name: &str, value: &mut f32, min: f32, max: f32) {
    let clamped = if value.is_finite() {
        value.clamp(min, max)
    } else {
        min
    };
    if clamped != *value {
        log::warn!("tuning: {name}={value} out of range, clamped to {clamped}");
        *value = clamped;
    }
}

impl Tuning {
    /// Parse from a JSON string and clamp into safe ranges
    pub fn from_json_str(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        Ok(tuning.sanitized())
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let tuning = Self::from_json_str(&json)?;
        log::info!("Loaded tuning from {}", path.as_ref().display());
        Ok(tuning)
    }

    /// Clamp every field into a range the simulation can run with
    pub fn sanitized(mut self) -> Self {
        clamp_field("max_frame_dt", &mut self.max_frame_dt, 0.001, 0.25);
        clamp_field("view_size.x", &mut self.view_size.x, 64.0, 8192.0);
        clamp_field("view_size.y", &mut self.view_size.y, 64.0, 8192.0);

        let w = &mut self.wave;
        clamp_field("wave.ramp_time", &mut w.ramp_time, 1.0, f32::MAX);
        clamp_field("wave.spawn_rate_base", &mut w.spawn_rate_base, 0.05, 60.0);
        clamp_field("wave.spawn_rate_hard", &mut w.spawn_rate_hard, 0.05, 60.0);
        clamp_field("wave.spawn_rate_wave_bonus", &mut w.spawn_rate_wave_bonus, 0.0, 1.0);
        clamp_field("wave.min_spawn_interval", &mut w.min_spawn_interval, 0.05, 60.0);
        clamp_field("wave.enemy_cap_base", &mut w.enemy_cap_base, 1.0, 500.0);
        clamp_field("wave.enemy_cap_hard", &mut w.enemy_cap_hard, 1.0, 500.0);
        clamp_field("wave.hp_mult_base", &mut w.hp_mult_base, 0.05, 100.0);
        clamp_field("wave.hp_mult_hard", &mut w.hp_mult_hard, 0.05, 100.0);
        clamp_field("wave.wave_time", &mut w.wave_time, 1.0, 3600.0);
        clamp_field("wave.boss_grace", &mut w.boss_grace, 0.0, 60.0);
        if w.boss_every == 0 {
            log::warn!("tuning: wave.boss_every=0 out of range, clamped to 1");
            w.boss_every = 1;
        }

        let s = &mut self.separation;
        clamp_field("separation.cell_size", &mut s.cell_size, 8.0, 2048.0);
        clamp_field("separation.softness", &mut s.softness, 0.0, 4.0);
        clamp_field("separation.force", &mut s.force, 0.0, 50.0);

        clamp_field("boss.enrage_fraction", &mut self.boss.enrage_fraction, 0.0, 1.0);

        let m = &mut self.meta;
        clamp_field("meta.damage", &mut m.damage, 0.05, 20.0);
        clamp_field("meta.move_speed", &mut m.move_speed, 0.05, 20.0);
        clamp_field("meta.xp", &mut m.xp, 0.0, 20.0);
        clamp_field("meta.dash", &mut m.dash, 0.05, 20.0);
        clamp_field("meta.armor", &mut m.armor, 0.0, 20.0);
        clamp_field("meta.bullet_speed", &mut m.bullet_speed, 0.05, 20.0);

        if let Some(obj) = self.objective.as_mut() {
            clamp_field("objective.radius", &mut obj.radius, 1.0, 1000.0);
            if obj.hp < 1 {
                log::warn!("tuning: objective.hp={} out of range, clamped to 1", obj.hp);
                obj.hp = 1;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_roundtrip_through_partial_json() {
        let tuning = Tuning::from_json_str(r#"{ "wave": { "ramp_time": 200.0 } }"#).unwrap();
        assert_eq!(tuning.wave.ramp_time, 200.0);
        // Unspecified fields keep their defaults
        assert_eq!(tuning.wave.boss_every, 10);
        assert_eq!(tuning.separation.cell_size, 120.0);
        assert!(tuning.objective.is_none());
    }

    #[test]
    fn test_negative_values_are_clamped() {
        let json = r#"{
            "max_frame_dt": -1.0,
            "wave": { "min_spawn_interval": -3.0, "boss_every": 0 },
            "separation": { "cell_size": 0.0 },
            "objective": { "radius": 0.0, "hp": -5 }
        }"#;
        let tuning = Tuning::from_json_str(json).unwrap();
        assert_eq!(tuning.max_frame_dt, 0.001);
        assert_eq!(tuning.wave.min_spawn_interval, 0.05);
        assert_eq!(tuning.wave.boss_every, 1);
        assert_eq!(tuning.separation.cell_size, 8.0);
        let obj = tuning.objective.unwrap();
        assert_eq!(obj.radius, 1.0);
        assert_eq!(obj.hp, 1);
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = Tuning::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, TuningError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Tuning::load("/definitely/not/here/tuning.json").unwrap_err();
        assert!(matches!(err, TuningError::Io(_)));
    }
}

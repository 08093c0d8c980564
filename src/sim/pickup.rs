//! Pickups: XP orbs, health packs and timed power-ups

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Timed player buffs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUp {
    DamageBoost,
    RapidFire,
    SpeedBoost,
    Shield,
}

impl PowerUp {
    pub const ALL: [PowerUp; 4] = [
        PowerUp::DamageBoost,
        PowerUp::RapidFire,
        PowerUp::SpeedBoost,
        PowerUp::Shield,
    ];

    /// Seconds the effect lasts
    pub fn duration(self) -> f32 {
        match self {
            PowerUp::DamageBoost => 10.0,
            PowerUp::RapidFire => 8.0,
            PowerUp::SpeedBoost => 10.0,
            PowerUp::Shield => 6.0,
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

/// What a pickup grants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PickupKind {
    Xp { value: u32 },
    Health { amount: i32 },
    Power { power: PowerUp },
}

/// A pickup lying in the arena
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pickup {
    pub pos: Vec2,
    pub vel: Vec2,
    pub kind: PickupKind,
}

impl Pickup {
    pub fn new(pos: Vec2, kind: PickupKind) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            kind,
        }
    }

    pub fn radius(&self) -> f32 {
        match self.kind {
            PickupKind::Xp { .. } => XP_ORB_RADIUS,
            PickupKind::Health { .. } => HEALTH_PACK_RADIUS,
            PickupKind::Power { .. } => POWERUP_RADIUS,
        }
    }

    pub fn is_power(&self) -> bool {
        matches!(self.kind, PickupKind::Power { .. })
    }

    /// Drift toward the player when within `reach`, with damping
    pub fn attract(&mut self, player_pos: Vec2, reach: f32, dt: f32) {
        let d = player_pos - self.pos;
        let dist = d.length();
        if dist < reach && dist > 1e-6 {
            self.vel += d / dist * PICKUP_ATTRACT_FORCE * dt;
        }
        self.vel *= 1.0 - (dt * 6.0).min(0.5);
        self.pos += self.vel * dt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attraction_only_within_reach() {
        let mut near = Pickup::new(Vec2::new(100.0, 0.0), PickupKind::Xp { value: 12 });
        let mut far = Pickup::new(Vec2::new(1000.0, 0.0), PickupKind::Xp { value: 12 });
        near.attract(Vec2::ZERO, 190.0, 1.0 / 60.0);
        far.attract(Vec2::ZERO, 190.0, 1.0 / 60.0);
        assert!(near.pos.x < 100.0);
        assert_eq!(far.pos, Vec2::new(1000.0, 0.0));
    }

    #[test]
    fn test_pickup_kind_serializes_tagged() {
        let json = serde_json::to_string(&PickupKind::Power {
            power: PowerUp::Shield,
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"power","power":"shield"}"#);
    }
}

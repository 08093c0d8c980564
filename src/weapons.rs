//! Weapon definitions
//!
//! Inbound configuration: the simulation looks weapons up by identifier and
//! never owns the table. Unknown identifiers resolve to the pistol.

use serde::{Deserialize, Serialize};

use crate::TuningError;

pub const DEFAULT_WEAPON_ID: &str = "pistol";

/// How a trigger pull fans out into projectiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirePattern {
    /// `bullets_per_shot` spread evenly over `spread_deg`
    #[default]
    Spread,
    /// Sixteen directions relative to aim
    Omni,
}

/// A single weapon's stats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponDef {
    pub id: String,
    pub name: String,
    pub base_damage: i32,
    /// Seconds between trigger pulls
    pub fire_cd: f32,
    pub bullet_speed: f32,
    pub bullet_life: f32,
    pub bullets_per_shot: u32,
    pub spread_deg: f32,
    pub bullet_radius: f32,
    /// Backward impulse on the shooter
    pub recoil: f32,
    pub pattern: FirePattern,
    /// Shots per trigger pull for burst weapons (0 = single fire)
    pub burst_count: u32,
    pub burst_gap: f32,
    pub splash_radius: f32,
    pub chain: u32,
    pub chain_range: f32,
    pub chain_damage_mult: f32,
    pub base_pierce: u32,
    pub knockback_mult: f32,
}

impl Default for WeaponDef {
    fn default() -> Self {
        Self {
            id: DEFAULT_WEAPON_ID.to_string(),
            name: "Pistol".to_string(),
            base_damage: 14,
            fire_cd: 0.16,
            bullet_speed: 880.0,
            bullet_life: 1.0,
            bullets_per_shot: 1,
            spread_deg: 0.0,
            bullet_radius: 4.0,
            recoil: 21.0,
            pattern: FirePattern::Spread,
            burst_count: 0,
            burst_gap: 0.0,
            splash_radius: 0.0,
            chain: 0,
            chain_range: 0.0,
            chain_damage_mult: 0.65,
            base_pierce: 0,
            knockback_mult: 1.0,
        }
    }
}

impl WeaponDef {
    fn named(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Clamp stats the fire loop divides by or counts with
    fn sanitized(mut self) -> Self {
        self.base_damage = self.base_damage.max(1);
        self.fire_cd = self.fire_cd.max(0.01);
        self.bullet_speed = self.bullet_speed.max(1.0);
        self.bullet_life = self.bullet_life.max(0.01);
        self.bullets_per_shot = self.bullets_per_shot.max(1);
        self.spread_deg = self.spread_deg.max(0.0);
        self.bullet_radius = self.bullet_radius.max(1.0);
        self.burst_gap = self.burst_gap.max(0.0);
        self.splash_radius = self.splash_radius.max(0.0);
        self.chain_range = self.chain_range.max(0.0);
        self.chain_damage_mult = self.chain_damage_mult.max(0.0);
        self.knockback_mult = self.knockback_mult.max(0.0);
        self
    }
}

/// Lookup table of weapon definitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponTable {
    pub weapons: Vec<WeaponDef>,
}

impl Default for WeaponTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl WeaponTable {
    /// The shipped arsenal
    pub fn builtin() -> Self {
        let weapons = vec![
            WeaponDef::default(),
            WeaponDef {
                base_damage: 22,
                fire_cd: 0.44,
                bullet_speed: 780.0,
                bullet_life: 1.15,
                bullet_radius: 5.0,
                recoil: 52.0,
                knockback_mult: 1.55,
                ..WeaponDef::named("cannon", "Cannon")
            },
            WeaponDef {
                base_damage: 7,
                fire_cd: 0.07,
                bullet_speed: 920.0,
                bullet_life: 0.95,
                spread_deg: 6.0,
                bullet_radius: 3.0,
                recoil: 18.0,
                knockback_mult: 0.75,
                ..WeaponDef::named("minigun", "Minigun")
            },
            WeaponDef {
                base_damage: 12,
                fire_cd: 0.26,
                bullet_speed: 930.0,
                bullet_life: 1.05,
                spread_deg: 2.5,
                burst_count: 3,
                burst_gap: 0.06,
                ..WeaponDef::named("burst", "Burst Rifle")
            },
            WeaponDef {
                base_damage: 9,
                fire_cd: 0.55,
                bullet_speed: 760.0,
                bullet_life: 0.70,
                bullets_per_shot: 5,
                spread_deg: 20.0,
                bullet_radius: 3.0,
                recoil: 60.0,
                knockback_mult: 1.30,
                ..WeaponDef::named("shotgun", "Shotgun")
            },
            WeaponDef {
                base_damage: 30,
                fire_cd: 0.85,
                bullet_speed: 680.0,
                bullet_life: 1.25,
                bullet_radius: 5.0,
                recoil: 80.0,
                splash_radius: 95.0,
                knockback_mult: 1.60,
                ..WeaponDef::named("rocket", "Rocket")
            },
            WeaponDef {
                base_damage: 9,
                fire_cd: 0.21,
                bullet_speed: 920.0,
                bullet_life: 0.85,
                chain: 2,
                chain_range: 150.0,
                ..WeaponDef::named("tesla", "Tesla")
            },
            WeaponDef {
                base_damage: 50,
                fire_cd: 0.78,
                bullet_speed: 1500.0,
                bullet_life: 1.55,
                bullet_radius: 3.0,
                recoil: 10.0,
                base_pierce: 1,
                knockback_mult: 1.15,
                ..WeaponDef::named("sniper", "Sniper")
            },
            WeaponDef {
                base_damage: 1,
                fire_cd: 0.05,
                bullet_speed: 520.0,
                bullet_life: 0.45,
                bullets_per_shot: 6,
                spread_deg: 18.0,
                bullet_radius: 1.0,
                recoil: 10.0,
                ..WeaponDef::named("flamethrower", "Flamethrower")
            },
            WeaponDef {
                base_damage: 9,
                fire_cd: 0.14,
                bullet_speed: 860.0,
                bullet_life: 1.05,
                recoil: 18.0,
                pattern: FirePattern::Omni,
                ..WeaponDef::named("omni_pistol", "Omni Pistol")
            },
            WeaponDef {
                base_damage: 1,
                fire_cd: 0.05,
                bullet_speed: 600.0,
                bullet_life: 2.0,
                bullets_per_shot: 50,
                spread_deg: 80.0,
                bullet_radius: 1.0,
                recoil: 10.0,
                ..WeaponDef::named("windscreen_wiper", "Windscreen Wiper")
            },
            WeaponDef {
                base_damage: 7,
                fire_cd: 0.27,
                bullet_speed: 920.0,
                bullet_life: 0.85,
                recoil: 23.0,
                chain: 6,
                chain_range: 200.0,
                chain_damage_mult: 0.85,
                ..WeaponDef::named("electricity", "Electricity")
            },
            WeaponDef {
                base_damage: 56,
                fire_cd: 1.5,
                bullet_speed: 350.0,
                bullet_life: 1.0,
                bullet_radius: 7.0,
                recoil: 150.0,
                splash_radius: 150.0,
                ..WeaponDef::named("tank", "Tank")
            },
        ];
        Self { weapons }
    }

    /// Parse a table from JSON. An empty table is rejected.
    pub fn from_json_str(json: &str) -> Result<Self, TuningError> {
        let table: WeaponTable = serde_json::from_str(json)?;
        if table.weapons.is_empty() {
            return Err(TuningError::InvalidConfig("weapon table is empty"));
        }
        Ok(Self {
            weapons: table.weapons.into_iter().map(WeaponDef::sanitized).collect(),
        })
    }

    pub fn get(&self, id: &str) -> Option<&WeaponDef> {
        self.weapons.iter().find(|w| w.id == id)
    }

    /// Look up by identifier, falling back to the pistol
    pub fn resolve(&self, id: &str) -> WeaponDef {
        match self.get(id) {
            Some(def) => def.clone(),
            None => {
                log::warn!("Unknown weapon '{id}', falling back to {DEFAULT_WEAPON_ID}");
                self.get(DEFAULT_WEAPON_ID).cloned().unwrap_or_default()
            }
        }
    }
}

//! Enemy actors and archetype data
//!
//! Actors live in a generational [`SlotMap`]; projectiles and chain lookups
//! refer to them by [`ActorId`] so a reaped actor's slot can be reused safely.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};

use super::boss::BossBrain;
use crate::consts::HIT_FLASH;
use crate::lerp;

new_key_type! {
    /// Generation-checked handle to a live actor
    pub struct ActorId;
}

pub type ActorStore = SlotMap<ActorId, Actor>;

/// Archetype tag, cheap to copy into events and snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchetypeTag {
    Chaser,
    Ranged,
    Tank,
    Sprinter,
    Dasher,
    Knight,
    Boss,
}

/// Static per-archetype numbers
#[derive(Debug, Clone, Copy)]
pub struct ArchetypeStats {
    pub base_hp: f32,
    pub radius: f32,
    pub contact_damage: i32,
    pub score: u32,
    /// Speed at zero and full difficulty
    pub speed_base: f32,
    pub speed_hard: f32,
    /// Exponential steering rate
    pub turn_rate: f32,
    pub wall_damping: f32,
}

impl ArchetypeTag {
    pub const fn stats(self) -> ArchetypeStats {
        match self {
            ArchetypeTag::Chaser => ArchetypeStats {
                base_hp: 42.0,
                radius: 14.0,
                contact_damage: 1,
                score: 12,
                speed_base: 140.0,
                speed_hard: 300.0,
                turn_rate: 6.5,
                wall_damping: 0.2,
            },
            ArchetypeTag::Ranged => ArchetypeStats {
                base_hp: 58.0,
                radius: 15.0,
                contact_damage: 1,
                score: 16,
                speed_base: 110.0,
                speed_hard: 240.0,
                turn_rate: 5.0,
                wall_damping: 0.2,
            },
            ArchetypeTag::Tank => ArchetypeStats {
                base_hp: 125.0,
                radius: 20.0,
                contact_damage: 2,
                score: 24,
                speed_base: 75.0,
                speed_hard: 160.0,
                turn_rate: 4.0,
                wall_damping: 0.15,
            },
            ArchetypeTag::Sprinter => ArchetypeStats {
                base_hp: 28.0,
                radius: 11.0,
                contact_damage: 1,
                score: 10,
                speed_base: 175.0,
                speed_hard: 360.0,
                turn_rate: 9.0,
                wall_damping: 0.25,
            },
            ArchetypeTag::Dasher => ArchetypeStats {
                base_hp: 72.0,
                radius: 16.0,
                contact_damage: 2,
                score: 20,
                speed_base: 115.0,
                speed_hard: 255.0,
                turn_rate: 6.0,
                wall_damping: 0.18,
            },
            ArchetypeTag::Knight => ArchetypeStats {
                base_hp: 375.0,
                radius: 24.0,
                contact_damage: 3,
                score: 38,
                speed_base: 45.0,
                speed_hard: 90.0,
                turn_rate: 3.2,
                wall_damping: 0.12,
            },
            ArchetypeTag::Boss => ArchetypeStats {
                base_hp: 1200.0,
                radius: 36.0,
                contact_damage: 1,
                score: 300,
                speed_base: 72.0,
                speed_hard: 94.0,
                turn_rate: 3.2,
                wall_damping: 0.12,
            },
        }
    }

    /// Speed for the current eased difficulty
    pub fn speed_at(self, eased: f32) -> f32 {
        let s = self.stats();
        lerp(s.speed_base, s.speed_hard, eased)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArchetypeTag::Chaser => "chaser",
            ArchetypeTag::Ranged => "ranged",
            ArchetypeTag::Tank => "tank",
            ArchetypeTag::Sprinter => "sprinter",
            ArchetypeTag::Dasher => "dasher",
            ArchetypeTag::Knight => "knight",
            ArchetypeTag::Boss => "boss",
        }
    }
}

/// Per-instance archetype state
#[derive(Debug, Clone)]
pub enum Archetype {
    Chaser,
    Ranged {
        shoot_cd: f32,
    },
    Tank,
    Sprinter,
    Dasher {
        dash_cd: f32,
        /// Remaining lunge time (0 = not lunging)
        lunge: f32,
    },
    Knight,
    Boss(Box<BossBrain>),
}

impl Archetype {
    /// Fresh state for a normal enemy. Bosses are built with [`BossBrain::new`].
    pub fn spawn<R: Rng + ?Sized>(tag: ArchetypeTag, rng: &mut R) -> Self {
        match tag {
            ArchetypeTag::Chaser => Archetype::Chaser,
            ArchetypeTag::Ranged => Archetype::Ranged {
                shoot_cd: rng.random_range(0.9..1.3),
            },
            ArchetypeTag::Tank => Archetype::Tank,
            ArchetypeTag::Sprinter => Archetype::Sprinter,
            ArchetypeTag::Dasher => Archetype::Dasher {
                dash_cd: rng.random_range(2.2..3.0),
                lunge: 0.0,
            },
            ArchetypeTag::Knight => Archetype::Knight,
            ArchetypeTag::Boss => {
                log::warn!("Archetype::spawn called for a boss; using chaser state");
                Archetype::Chaser
            }
        }
    }

    pub fn tag(&self) -> ArchetypeTag {
        match self {
            Archetype::Chaser => ArchetypeTag::Chaser,
            Archetype::Ranged { .. } => ArchetypeTag::Ranged,
            Archetype::Tank => ArchetypeTag::Tank,
            Archetype::Sprinter => ArchetypeTag::Sprinter,
            Archetype::Dasher { .. } => ArchetypeTag::Dasher,
            Archetype::Knight => ArchetypeTag::Knight,
            Archetype::Boss(_) => ArchetypeTag::Boss,
        }
    }

    pub fn boss(&self) -> Option<&BossBrain> {
        match self {
            Archetype::Boss(brain) => Some(brain),
            _ => None,
        }
    }

    pub fn boss_mut(&mut self) -> Option<&mut BossBrain> {
        match self {
            Archetype::Boss(brain) => Some(brain),
            _ => None,
        }
    }
}

/// Short burst dash granted by the `enemy_dashes` modifier
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtraDash {
    pub enabled: bool,
    pub cooldown: f32,
    pub timer: f32,
    pub dir: Vec2,
}

/// A live enemy or boss
#[derive(Debug, Clone)]
pub struct Actor {
    pub archetype: Archetype,
    pub pos: Vec2,
    pub vel: Vec2,
    pub hp: f32,
    pub hp_max: f32,
    /// Spawn speed before modifiers
    pub base_speed: f32,
    /// Current speed after modifiers
    pub speed: f32,
    pub radius: f32,
    pub contact_damage: i32,
    pub score_value: u32,
    /// Seconds alive
    pub age: f32,
    pub hit_flash: f32,
    /// Weapon that last damaged this actor, for attribution
    pub last_weapon: Option<String>,
    pub elite: bool,
    pub revives_remaining: u32,
    pub extra_dash: ExtraDash,
}

impl Actor {
    pub fn new(archetype: Archetype, pos: Vec2, hp: f32, speed: f32) -> Self {
        let stats = archetype.tag().stats();
        let hp = hp.max(1.0);
        Self {
            archetype,
            pos,
            vel: Vec2::ZERO,
            hp,
            hp_max: hp,
            base_speed: speed,
            speed,
            radius: stats.radius,
            contact_damage: stats.contact_damage,
            score_value: stats.score,
            age: 0.0,
            hit_flash: 0.0,
            last_weapon: None,
            elite: false,
            revives_remaining: 0,
            extra_dash: ExtraDash::default(),
        }
    }

    pub fn tag(&self) -> ArchetypeTag {
        self.archetype.tag()
    }

    pub fn is_boss(&self) -> bool {
        matches!(self.archetype, Archetype::Boss(_))
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    /// Elite buff: tougher, slightly faster, worth more
    pub fn make_elite(&mut self) {
        self.elite = true;
        self.hp_max = (self.hp_max * 1.25).round();
        self.hp = self.hp_max;
        self.base_speed *= 1.08;
        self.speed = self.base_speed;
        self.score_value = (self.score_value as f32 * 1.45).round() as u32;
    }

    /// True while knockback cannot move this actor
    pub fn knockback_immune(&self) -> bool {
        self.archetype.boss().is_some_and(BossBrain::airborne)
    }

    /// True while damage is ignored entirely
    pub fn damage_immune(&self) -> bool {
        self.archetype
            .boss()
            .is_some_and(|b| b.airborne() && b.slam_damage_immune)
    }

    /// Apply damage and knockback. Health is clamped at 0.
    /// Returns false if the actor ignored the hit.
    pub fn take_damage(&mut self, amount: i32, knock_dir: Vec2, knockback: f32, weapon: Option<&str>) -> bool {
        if self.damage_immune() {
            return false;
        }
        if !self.knockback_immune() {
            let scale = if self.is_boss() { 0.35 } else { 1.0 };
            self.vel += knock_dir * (knockback * scale / self.radius.max(1.0));
        }
        self.hp = (self.hp - amount.max(0) as f32).clamp(0.0, self.hp_max);
        self.hit_flash = HIT_FLASH;
        if let Some(id) = weapon {
            self.last_weapon = Some(id.to_string());
        }
        true
    }

    /// Heal, never past the cap
    pub fn heal(&mut self, amount: f32) {
        self.hp = (self.hp + amount.max(0.0)).min(self.hp_max);
    }
}

//! The player tank: movement, dash, firing, power-ups, XP and upgrades

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::arena::Arena;
use super::collision::resolve_circle_walls;
use super::combat::{ChainParams, Projectile, Side};
use super::pickup::PowerUp;
use super::tick::InputFrame;
use crate::consts::*;
use crate::weapons::{FirePattern, WeaponDef};
use crate::{MetaMultipliers, direction_or, exp_smoothing, lerp, rotate_deg};

/// Distance from the player's center at which shots appear
const MUZZLE_OFFSET: f32 = PLAYER_RADIUS + 7.0;
const MIN_FIRE_COOLDOWN: f32 = 0.045;
/// Most level-ups processed in a single frame
const MAX_LEVELS_PER_FRAME: u32 = 16;
const XP_FIRST_LEVEL: u32 = 60;

/// Level-up choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Upgrade {
    Damage,
    FireRate,
    BulletSpeed,
    MaxHp,
    MoveSpeed,
    DashCooldown,
    Piercing,
    Crit,
    DashLength,
    Heal,
    XpGain,
    XpPush,
    Knockback,
    Magnet,
}

impl Upgrade {
    pub const ALL: [Upgrade; 14] = [
        Upgrade::Damage,
        Upgrade::FireRate,
        Upgrade::BulletSpeed,
        Upgrade::MaxHp,
        Upgrade::MoveSpeed,
        Upgrade::DashCooldown,
        Upgrade::Piercing,
        Upgrade::Crit,
        Upgrade::DashLength,
        Upgrade::Heal,
        Upgrade::XpGain,
        Upgrade::XpPush,
        Upgrade::Knockback,
        Upgrade::Magnet,
    ];

    /// `count` distinct upgrades
    pub fn roll_choices<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<Upgrade> {
        let count = count.min(Self::ALL.len());
        rand::seq::index::sample(rng, Self::ALL.len(), count)
            .into_iter()
            .map(|i| Self::ALL[i])
            .collect()
    }
}

/// Remaining seconds on each timed power-up
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Effects {
    pub damage_boost: f32,
    pub rapid_fire: f32,
    pub speed_boost: f32,
    pub shield: f32,
}

impl Effects {
    fn tick(&mut self, dt: f32) {
        for t in [
            &mut self.damage_boost,
            &mut self.rapid_fire,
            &mut self.speed_boost,
            &mut self.shield,
        ] {
            *t = (*t - dt).max(0.0);
        }
    }

    fn slot(&mut self, power: PowerUp) -> &mut f32 {
        match power {
            PowerUp::DamageBoost => &mut self.damage_boost,
            PowerUp::RapidFire => &mut self.rapid_fire,
            PowerUp::SpeedBoost => &mut self.speed_boost,
            PowerUp::Shield => &mut self.shield,
        }
    }
}

/// The player
#[derive(Debug, Clone)]
pub struct Player {
    pub pos: Vec2,
    pub vel: Vec2,
    pub aim_dir: Vec2,
    pub radius: f32,
    pub hp: i32,
    pub max_hp: i32,
    /// Post-hit grace remaining
    pub iframes: f32,
    pub weapon: WeaponDef,
    pub meta: MetaMultipliers,

    // Upgradable stats
    pub damage_mult: f32,
    pub fire_rate_mult: f32,
    pub bullet_speed_mult: f32,
    pub bullet_life_add: f32,
    pub move_speed_add: f32,
    pub piercing: u32,
    pub crit_chance: f32,
    pub crit_mult: f32,
    pub dash_time_bonus: f32,
    /// Dash cooldown scale, seeded from meta
    pub dash_mult: f32,
    pub knockback_mult: f32,
    pub magnet_bonus: f32,
    /// XP gain scale, seeded from meta
    pub xp_mult: f32,

    pub level: u32,
    pub xp: u32,
    pub xp_to_next: u32,
    pub score: u64,
    pub effects: Effects,

    shoot_timer: f32,
    burst_remaining: u32,
    burst_gap_timer: f32,
    dash_timer: f32,
    dash_cd_timer: f32,
    dash_dir: Vec2,
}

impl Player {
    pub fn new(pos: Vec2, weapon: WeaponDef, meta: MetaMultipliers) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            aim_dir: Vec2::X,
            radius: PLAYER_RADIUS,
            hp: PLAYER_MAX_HP,
            max_hp: PLAYER_MAX_HP,
            iframes: 0.0,
            weapon,
            meta,
            damage_mult: 1.0,
            fire_rate_mult: 1.0,
            bullet_speed_mult: 1.0,
            bullet_life_add: 0.0,
            move_speed_add: 0.0,
            piercing: 0,
            crit_chance: CRIT_CHANCE,
            crit_mult: CRIT_MULT,
            dash_time_bonus: 0.0,
            dash_mult: meta.dash,
            knockback_mult: 1.0,
            magnet_bonus: 0.0,
            xp_mult: meta.xp,
            level: 1,
            xp: 0,
            xp_to_next: XP_FIRST_LEVEL,
            score: 0,
            effects: Effects::default(),
            shoot_timer: 0.0,
            burst_remaining: 0,
            burst_gap_timer: 0.0,
            dash_timer: 0.0,
            dash_cd_timer: 0.0,
            dash_dir: Vec2::X,
        }
    }

    pub fn is_dashing(&self) -> bool {
        self.dash_timer > 0.0
    }

    /// Grace window, dash, or shield
    pub fn invulnerable(&self) -> bool {
        self.iframes > 0.0 || self.is_dashing() || self.effects.shield > 0.0
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn damage(&self) -> i32 {
        let mut dmg =
            (self.weapon.base_damage as f32 * self.damage_mult * self.meta.damage).round() as i32;
        if self.effects.damage_boost > 0.0 {
            dmg = (dmg as f32 * 1.5) as i32;
        }
        dmg.max(1)
    }

    pub fn fire_cooldown(&self) -> f32 {
        let mut cd = self.weapon.fire_cd / self.fire_rate_mult.max(0.1);
        if self.effects.rapid_fire > 0.0 {
            cd *= 0.58;
        }
        cd.max(MIN_FIRE_COOLDOWN)
    }

    pub fn bullet_speed(&self) -> f32 {
        self.weapon.bullet_speed * self.bullet_speed_mult * self.meta.bullet_speed
    }

    pub fn bullet_lifetime(&self) -> f32 {
        (self.weapon.bullet_life + self.bullet_life_add).max(0.25)
    }

    pub fn move_speed(&self) -> f32 {
        let mut speed = (PLAYER_MAX_SPEED + self.move_speed_add) * self.meta.move_speed;
        if self.effects.speed_boost > 0.0 {
            speed *= 1.25;
        }
        speed
    }

    pub fn dash_time(&self) -> f32 {
        DASH_TIME + self.dash_time_bonus
    }

    pub fn dash_cooldown(&self) -> f32 {
        (DASH_COOLDOWN * self.dash_mult).max(DASH_COOLDOWN_MIN)
    }

    /// Pickup attraction reach
    pub fn magnet_reach(&self) -> f32 {
        PICKUP_ATTRACT_DIST + self.magnet_bonus
    }

    /// Timers, dash, steering and wall resolution
    pub fn update(&mut self, input: &InputFrame, dt: f32, arena: &Arena) {
        if input.aim_dir.length_squared() > 1e-6 {
            self.aim_dir = input.aim_dir.normalize();
        }

        self.shoot_timer = (self.shoot_timer - dt).max(0.0);
        self.iframes = (self.iframes - dt).max(0.0);
        self.dash_cd_timer = (self.dash_cd_timer - dt).max(0.0);
        self.dash_timer = (self.dash_timer - dt).max(0.0);
        self.burst_gap_timer = (self.burst_gap_timer - dt).max(0.0);
        self.effects.tick(dt);

        if input.dash && self.dash_cd_timer <= 0.0 && !self.is_dashing() {
            let wish = if input.move_dir.length_squared() > 0.01 {
                input.move_dir
            } else {
                self.aim_dir
            };
            self.dash_dir = direction_or(wish, Vec2::X);
            self.dash_timer = self.dash_time();
            self.dash_cd_timer = self.dash_cooldown();
        }

        if self.is_dashing() {
            self.vel = self.dash_dir * DASH_SPEED;
        } else {
            let max_speed = self.move_speed();
            if input.move_dir.length_squared() > 0.001 {
                let wish = input.move_dir.normalize() * max_speed;
                self.vel += (wish - self.vel) * exp_smoothing(PLAYER_ACCEL / 500.0, dt);
            }
            self.vel *= 1.0 - (dt * PLAYER_FRICTION).min(0.65);
            self.vel = self.vel.clamp_length_max(max_speed);
        }

        self.pos += self.vel * dt;
        resolve_circle_walls(&mut self.pos, &mut self.vel, self.radius, arena, 0.0);
    }

    /// Trigger handling, including burst follow-ups. Returns new projectiles.
    pub fn fire(&mut self, trigger: bool) -> Vec<Projectile> {
        if self.burst_remaining > 0 {
            if self.burst_gap_timer <= 0.0 {
                self.burst_remaining -= 1;
                self.burst_gap_timer = self.weapon.burst_gap;
                return self.volley();
            }
            return Vec::new();
        }
        if !trigger || self.shoot_timer > 0.0 {
            return Vec::new();
        }
        self.shoot_timer = self.fire_cooldown();
        if self.weapon.burst_count > 0 {
            self.burst_remaining = self.weapon.burst_count - 1;
            self.burst_gap_timer = self.weapon.burst_gap;
        }
        self.volley()
    }

    fn volley(&mut self) -> Vec<Projectile> {
        let damage = self.damage();
        let speed = self.bullet_speed();
        let life = self.bullet_lifetime();
        let base_dir = direction_or(self.aim_dir, Vec2::X);
        let w = &self.weapon;

        let angles: Vec<f32> = match w.pattern {
            FirePattern::Omni => (0..16).map(|i| i as f32 * 22.5).collect(),
            FirePattern::Spread if w.bullets_per_shot <= 1 || w.spread_deg <= 0.0 => vec![0.0],
            FirePattern::Spread => {
                let n = w.bullets_per_shot;
                (0..n)
                    .map(|i| {
                        let t = i as f32 / (n - 1) as f32;
                        lerp(-w.spread_deg * 0.5, w.spread_deg * 0.5, t)
                    })
                    .collect()
            }
        };

        let chain = ChainParams {
            count: w.chain,
            range: w.chain_range,
            falloff: w.chain_damage_mult,
        };
        let shots = angles
            .into_iter()
            .map(|angle| {
                let dir = rotate_deg(base_dir, angle);
                let mut p = Projectile::new(
                    self.pos + dir * MUZZLE_OFFSET,
                    dir * speed,
                    damage,
                    Side::Player,
                    w.bullet_radius,
                    life,
                );
                p.pierce = self.piercing + w.base_pierce;
                p.splash_radius = w.splash_radius;
                p.chain = chain;
                p.knockback_mult = w.knockback_mult;
                p.weapon = Some(w.id.clone());
                p
            })
            .collect();

        self.vel -= base_dir * self.weapon.recoil;
        shots
    }

    /// Apply incoming damage through armor. Returns the amount dealt, or
    /// `None` while invulnerable.
    pub fn take_hit(&mut self, amount: i32) -> Option<i32> {
        if self.invulnerable() || !self.is_alive() {
            return None;
        }
        let dealt = ((amount.max(0) as f32 * self.meta.armor).ceil() as i32).max(1);
        self.hp = (self.hp - dealt).max(0);
        self.iframes = PLAYER_IFRAMES;
        Some(dealt)
    }

    pub fn heal(&mut self, amount: i32) {
        self.hp = (self.hp + amount.max(0)).min(self.max_hp);
    }

    pub fn apply_powerup(&mut self, power: PowerUp) {
        let slot = self.effects.slot(power);
        *slot = slot.max(power.duration());
    }

    pub fn gain_xp(&mut self, amount: u32) {
        self.xp += (amount as f32 * self.xp_mult).round() as u32;
    }

    /// Consume banked XP into levels. Returns how many were gained.
    pub fn try_level_up(&mut self) -> u32 {
        let mut gained = 0;
        while gained < MAX_LEVELS_PER_FRAME && self.xp >= self.xp_to_next {
            self.xp -= self.xp_to_next;
            self.level += 1;
            self.xp_to_next = (self.xp_to_next as f32 * 1.18 + 18.0) as u32;
            gained += 1;
        }
        gained
    }

    pub fn apply_upgrade(&mut self, upgrade: Upgrade) {
        match upgrade {
            Upgrade::Damage => self.damage_mult *= 1.12,
            Upgrade::FireRate => self.fire_rate_mult *= 1.12,
            Upgrade::BulletSpeed => self.bullet_speed_mult *= 1.10,
            Upgrade::MaxHp => {
                self.max_hp += 1;
                self.heal(1);
            }
            Upgrade::MoveSpeed => self.move_speed_add += 20.0,
            Upgrade::DashCooldown => self.dash_mult = (self.dash_mult * 0.92).max(0.55),
            Upgrade::Piercing => self.piercing += 1,
            Upgrade::Crit => self.crit_chance = (self.crit_chance + 0.04).min(0.30),
            Upgrade::DashLength => self.dash_time_bonus = (self.dash_time_bonus + 0.03).min(0.12),
            Upgrade::Heal => self.heal(3),
            Upgrade::XpGain => self.xp_mult = (self.xp_mult * 1.10).min(2.0),
            Upgrade::XpPush => {
                self.xp_mult = (self.xp_mult * 1.06).min(2.0);
                self.knockback_mult = (self.knockback_mult * 1.10).min(2.0);
            }
            Upgrade::Knockback => self.knockback_mult = (self.knockback_mult * 1.18).min(2.0),
            Upgrade::Magnet => self.magnet_bonus = (self.magnet_bonus + 35.0).min(120.0),
        }
    }
}

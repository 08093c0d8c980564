//! Combat resolution
//!
//! Projectile hits, chain propagation, splash falloff, pierce bookkeeping and
//! contact damage. Nothing here removes actors: health is clamped at zero and
//! the reap stage picks up the dead afterwards.

use std::collections::HashSet;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::actor::{Actor, ActorId, ActorStore};
use super::collision::circles_overlap;
use super::player::Player;
use super::state::{GameEvent, Objective};
use crate::consts::*;
use crate::direction_or;

/// Splash damage at the blast edge, as a fraction of full damage
pub const SPLASH_EDGE_FRACTION: f32 = 0.55;
pub const SPLASH_MIN_DAMAGE: i32 = 2;
pub const CHAIN_MIN_DAMAGE: i32 = 3;

/// Which side fired a projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Player,
    Enemy,
}

/// Chain lightning parameters (count 0 = none)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainParams {
    pub count: u32,
    pub range: f32,
    pub falloff: f32,
}

impl ChainParams {
    pub fn is_active(&self) -> bool {
        self.count > 0 && self.range > 0.0
    }
}

/// A projectile in flight
#[derive(Debug, Clone)]
pub struct Projectile {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Seconds until expiry
    pub life: f32,
    pub side: Side,
    pub damage: i32,
    pub radius: f32,
    /// Remaining actors this shot may pass through
    pub pierce: u32,
    pub splash_radius: f32,
    pub chain: ChainParams,
    /// Per-weapon knockback scale
    pub knockback_mult: f32,
    pub weapon: Option<String>,
    /// Actors already struck by this shot; only grows
    pub hit_set: HashSet<ActorId>,
}

impl Projectile {
    /// Plain single-target projectile
    pub fn new(pos: Vec2, vel: Vec2, damage: i32, side: Side, radius: f32, life: f32) -> Self {
        Self {
            pos,
            vel,
            life,
            side,
            damage,
            radius,
            pierce: 0,
            splash_radius: 0.0,
            chain: ChainParams::default(),
            knockback_mult: 1.0,
            weapon: None,
            hit_set: HashSet::new(),
        }
    }

    pub fn alive(&self) -> bool {
        self.life > 0.0
    }

    pub fn advance(&mut self, dt: f32) {
        self.pos += self.vel * dt;
        self.life -= dt;
    }

    /// Bend velocity toward `target`, keeping at least `min_speed`
    pub fn steer_toward(&mut self, target: Vec2, rate: f32, min_speed: f32, dt: f32) {
        let to = target - self.pos;
        if to.length_squared() < 1e-6 {
            return;
        }
        let speed = self.vel.length().max(min_speed);
        let desired = to.normalize() * speed;
        self.vel = self.vel.lerp(desired, (rate * dt).min(1.0));
    }
}

/// Shooter-side numbers the resolver needs
#[derive(Debug, Clone, Copy)]
pub struct HitContext {
    pub crit_chance: f32,
    pub crit_mult: f32,
    /// Player-wide knockback scale
    pub knockback_mult: f32,
    /// `resist_over_time` modifier active
    pub resist_over_time: bool,
}

impl Default for HitContext {
    fn default() -> Self {
        Self {
            crit_chance: CRIT_CHANCE,
            crit_mult: CRIT_MULT,
            knockback_mult: 1.0,
            resist_over_time: false,
        }
    }
}

/// What a single projectile hit did
#[derive(Debug, Clone)]
pub struct HitReport {
    pub actor: ActorId,
    pub damage: i32,
    pub crit: bool,
    /// Pierce budget was spent on this hit
    pub pierced: bool,
    /// Actors reached by chain propagation, in hop order
    pub chained: Vec<ActorId>,
    /// Actors damaged by splash
    pub splashed: usize,
}

/// Incoming damage scale for an actor under `resist_over_time`
pub fn resistance_multiplier(actor: &Actor, resist_over_time: bool) -> f32 {
    if resist_over_time && !actor.is_boss() {
        1.0 - (actor.age * 0.01).min(0.25)
    } else {
        1.0
    }
}

/// Apply modifier-scaled damage, floored at 1. Returns the amount applied,
/// or `None` if the actor ignored the hit.
pub fn apply_enemy_damage(
    actor: &mut Actor,
    damage: i32,
    knock_dir: Vec2,
    knockback: f32,
    weapon: Option<&str>,
    resist_over_time: bool,
) -> Option<i32> {
    let mult = resistance_multiplier(actor, resist_over_time);
    let scaled = ((damage as f32 * mult).round() as i32).max(1);
    actor.take_damage(scaled, knock_dir, knockback, weapon).then_some(scaled)
}

/// Resolve every live player projectile against living actors.
///
/// A projectile hits at most one new actor per call. On a hit: damage (with a
/// crit roll), then pierce bookkeeping, then chain, then splash if the hit was
/// terminal.
pub fn resolve_projectile_hits<R: Rng + ?Sized>(
    projectiles: &mut [Projectile],
    actors: &mut ActorStore,
    ctx: &HitContext,
    rng: &mut R,
    events: &mut Vec<GameEvent>,
) -> Vec<HitReport> {
    let mut reports = Vec::new();

    for proj in projectiles
        .iter_mut()
        .filter(|p| p.side == Side::Player && p.alive())
    {
        let target = actors
            .iter()
            .filter(|(id, a)| {
                a.is_alive()
                    && !proj.hit_set.contains(id)
                    && circles_overlap(proj.pos, proj.radius, a.pos, a.radius)
            })
            .map(|(id, _)| id)
            .next();
        let Some(id) = target else {
            continue;
        };
        proj.hit_set.insert(id);

        let crit = ctx.crit_chance > 0.0 && rng.random::<f32>() < ctx.crit_chance;
        let mut damage = proj.damage;
        if crit {
            damage = (damage as f32 * ctx.crit_mult) as i32;
        }

        let actor = &mut actors[id];
        let knock_dir = direction_or(actor.pos - proj.pos, Vec2::X);
        let knockback = BASE_KNOCKBACK * proj.knockback_mult * ctx.knockback_mult;
        let hit_pos = actor.pos;
        let applied = apply_enemy_damage(
            actor,
            damage,
            knock_dir,
            knockback,
            proj.weapon.as_deref(),
            ctx.resist_over_time,
        )
        .unwrap_or(0);
        if applied > 0 {
            events.push(GameEvent::DamageNumber {
                pos: hit_pos,
                amount: applied,
                crit,
            });
            events.push(GameEvent::HitSpark { pos: hit_pos });
        }

        // Pierce is settled before chain/splash so a pass-through never explodes
        let pierced = proj.pierce > 0;
        if pierced {
            proj.pierce -= 1;
        }

        let chained = if proj.chain.is_active() && applied > 0 {
            propagate_chain(actors, id, applied, proj.chain, ctx, proj.weapon.as_deref(), events)
        } else {
            Vec::new()
        };

        let mut splashed = 0;
        if !pierced {
            if proj.splash_radius > 0.0 {
                splashed = apply_splash(
                    actors,
                    proj.pos,
                    proj.splash_radius,
                    proj.damage,
                    ctx,
                    proj.weapon.as_deref(),
                    events,
                );
            }
            proj.life = 0.0;
        }

        reports.push(HitReport {
            actor: id,
            damage: applied,
            crit,
            pierced,
            chained,
            splashed,
        });
    }

    reports
}

/// Hop from `start` to the nearest un-chained living actor within range, up
/// to `chain.count` times. Every hop deals `max(floor, base * falloff)`.
pub fn propagate_chain(
    actors: &mut ActorStore,
    start: ActorId,
    base_damage: i32,
    chain: ChainParams,
    ctx: &HitContext,
    weapon: Option<&str>,
    events: &mut Vec<GameEvent>,
) -> Vec<ActorId> {
    let Some(mut origin) = actors.get(start).map(|a| a.pos) else {
        return Vec::new();
    };
    let mut visited: Vec<ActorId> = vec![start];
    let range_sq = chain.range * chain.range;
    let damage = ((base_damage as f32 * chain.falloff) as i32).max(CHAIN_MIN_DAMAGE);

    for _ in 0..chain.count {
        let next = actors
            .iter()
            .filter(|(id, a)| a.is_alive() && !visited.contains(id))
            .map(|(id, a)| (id, a.pos.distance_squared(origin)))
            .filter(|(_, d2)| *d2 < range_sq)
            .min_by(|a, b| a.1.total_cmp(&b.1));
        let Some((id, _)) = next else {
            break;
        };
        visited.push(id);

        let actor = &mut actors[id];
        let dir = direction_or(actor.pos - origin, Vec2::X);
        let pos = actor.pos;
        if let Some(applied) =
            apply_enemy_damage(actor, damage, dir, CHAIN_KNOCKBACK, weapon, ctx.resist_over_time)
        {
            events.push(GameEvent::DamageNumber {
                pos,
                amount: applied,
                crit: false,
            });
        }
        origin = pos;
    }

    visited.split_off(1)
}

/// Damage every living actor within `radius` of `center` with linear falloff
/// to [`SPLASH_EDGE_FRACTION`] at the edge. Returns how many were damaged.
pub fn apply_splash(
    actors: &mut ActorStore,
    center: Vec2,
    radius: f32,
    damage: i32,
    ctx: &HitContext,
    weapon: Option<&str>,
    events: &mut Vec<GameEvent>,
) -> usize {
    let radius = radius.max(1.0);
    let mut count = 0;
    for (_, actor) in actors.iter_mut() {
        if !actor.is_alive() {
            continue;
        }
        let d = actor.pos.distance(center);
        if d > radius {
            continue;
        }
        let t = 1.0 - d / radius;
        let scaled = damage as f32 * (SPLASH_EDGE_FRACTION + (1.0 - SPLASH_EDGE_FRACTION) * t);
        let dmg = (scaled as i32).max(SPLASH_MIN_DAMAGE);
        let dir = direction_or(actor.pos - center, Vec2::X);
        let pos = actor.pos;
        if let Some(applied) =
            apply_enemy_damage(actor, dmg, dir, SPLASH_KNOCKBACK, weapon, ctx.resist_over_time)
        {
            events.push(GameEvent::DamageNumber {
                pos,
                amount: applied,
                crit: false,
            });
            count += 1;
        }
    }
    events.push(GameEvent::Explosion { pos: center, radius });
    count
}

/// Damage the player, emitting an event if it lands
pub fn damage_player(player: &mut Player, amount: i32, knockback: Vec2, events: &mut Vec<GameEvent>) -> bool {
    match player.take_hit(amount) {
        Some(dealt) => {
            player.vel += knockback;
            events.push(GameEvent::PlayerDamaged {
                amount: dealt,
                hp: player.hp,
            });
            true
        }
        None => false,
    }
}

fn damage_objective(objective: &mut Objective, amount: i32, events: &mut Vec<GameEvent>) {
    if let Some(dealt) = objective.take_hit(amount) {
        events.push(GameEvent::ObjectiveDamaged {
            amount: dealt,
            hp: objective.hp,
        });
    }
}

/// Enemy projectiles against the player and the objective. Each side takes at
/// most one projectile per frame; the projectile is consumed.
pub fn resolve_enemy_projectiles(
    projectiles: &mut [Projectile],
    player: &mut Player,
    mut objective: Option<&mut Objective>,
    events: &mut Vec<GameEvent>,
) {
    if let Some(proj) = projectiles
        .iter_mut()
        .filter(|p| p.side == Side::Enemy && p.alive())
        .find(|p| circles_overlap(p.pos, p.radius, player.pos, player.radius))
    {
        proj.life = 0.0;
        damage_player(player, proj.damage, Vec2::ZERO, events);
    }

    if let Some(obj) = objective.as_deref_mut().filter(|o| o.is_standing()) {
        if let Some(proj) = projectiles
            .iter_mut()
            .filter(|p| p.side == Side::Enemy && p.alive())
            .find(|p| circles_overlap(p.pos, p.radius, obj.pos, obj.radius))
        {
            proj.life = 0.0;
            damage_objective(obj, proj.damage, events);
        }
    }
}

/// Body contact between actors and the player/objective. The first touching
/// actor deals its contact damage and shoves the player.
pub fn resolve_contact_damage(
    actors: &ActorStore,
    player: &mut Player,
    mut objective: Option<&mut Objective>,
    events: &mut Vec<GameEvent>,
) {
    let touching = |a: &Actor, pos: Vec2, radius: f32| {
        a.is_alive() && a.contact_damage > 0 && circles_overlap(a.pos, a.radius, pos, radius)
    };

    if let Some((_, actor)) = actors
        .iter()
        .find(|(_, a)| touching(a, player.pos, player.radius))
    {
        let knock = direction_or(player.pos - actor.pos, Vec2::X) * CONTACT_KNOCKBACK;
        damage_player(player, actor.contact_damage, knock, events);
    }

    if let Some(obj) = objective.as_deref_mut().filter(|o| o.is_standing()) {
        if let Some((_, actor)) = actors.iter().find(|(_, a)| touching(a, obj.pos, obj.radius)) {
            damage_objective(obj, actor.contact_damage, events);
        }
    }
}

/// Delayed blast queued by the `death_explosions` modifier
#[derive(Debug, Clone, Copy)]
pub struct PendingBlast {
    pub pos: Vec2,
    pub fuse: f32,
    pub radius: f32,
    pub damage: i32,
}

impl PendingBlast {
    pub const FUSE: f32 = 0.35;
    pub const RADIUS: f32 = 120.0;
    pub const DAMAGE: i32 = 2;

    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            fuse: Self::FUSE,
            radius: Self::RADIUS,
            damage: Self::DAMAGE,
        }
    }

    /// Count down; true on the frame it detonates
    pub fn tick(&mut self, dt: f32) -> bool {
        self.fuse -= dt;
        self.fuse <= 0.0
    }
}

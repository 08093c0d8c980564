//! Per-archetype enemy steering
//!
//! One `match` over [`Archetype`] drives every normal enemy. The boss has its
//! own state machine in [`super::boss`].

use glam::Vec2;
use rand::Rng;

use super::actor::{Actor, ActorId, ActorStore, Archetype};
use super::arena::{Arena, Rect};
use super::combat::{Projectile, Side};
use super::grid::SpatialGrid;
use crate::tuning::SeparationTuning;
use crate::{exp_smoothing, lerp, rotate_deg};

const RANGED_ADVANCE_DIST: f32 = 430.0;
const RANGED_RETREAT_DIST: f32 = 270.0;
const RANGED_SHOOT_DIST: f32 = 520.0;
const RANGED_SCREEN_MARGIN: f32 = 60.0;
const RANGED_BULLET_SPEED: f32 = 470.0;
const RANGED_BULLET_LIFE: f32 = 1.55;
const RANGED_BULLET_RADIUS: f32 = 4.0;
const RANGED_DOUBLE_SPREAD_DEG: f32 = 10.0;

const DASHER_TRIGGER_DIST: f32 = 620.0;
const DASHER_LUNGE_TIME: f32 = 0.22;
const DASHER_LUNGE_SPEED_MULT: f32 = 2.6;
const DASHER_LUNGE_RATE: f32 = 10.0;

const EXTRA_DASH_TIME: f32 = 0.12;
const EXTRA_DASH_SPEED_MULT: f32 = 2.8;

/// Velocity scale applied to the accumulated separation push
const SEPARATION_GAIN: f32 = 8.0;
const REGEN_RANGE: f32 = 170.0;
const REGEN_RATE: f32 = 0.05;

/// What a normal enemy can see this frame
pub struct AiContext<'a> {
    pub arena: &'a Arena,
    /// Player, or the objective when one is standing
    pub target: Vec2,
    pub view: Rect,
    pub eased: f32,
    /// Steering rate scale from modifiers
    pub turn_mult: f32,
    pub double_ranged: bool,
}

/// Exponentially steer toward `desired`
fn approach(vel: &mut Vec2, desired: Vec2, rate: f32, dt: f32) {
    *vel = vel.lerp(desired, exp_smoothing(rate, dt));
}

/// Update velocity (and archetype timers) for one non-boss actor
pub fn steer<R: Rng + ?Sized>(actor: &mut Actor, ctx: &AiContext, dt: f32, rng: &mut R) {
    let to_target = ctx.target - actor.pos;
    let dist_sq = to_target.length_squared();
    let dir = if dist_sq > 1.0 {
        to_target / dist_sq.sqrt()
    } else {
        Vec2::ZERO
    };
    let turn = actor.tag().stats().turn_rate * ctx.turn_mult;
    let speed = actor.speed;

    match &mut actor.archetype {
        Archetype::Chaser | Archetype::Tank | Archetype::Sprinter | Archetype::Knight => {
            if dist_sq > 1.0 {
                approach(&mut actor.vel, dir * speed, turn, dt);
            }
        }
        Archetype::Ranged { .. } => {
            let dist = dist_sq.sqrt();
            if dist > RANGED_ADVANCE_DIST {
                approach(&mut actor.vel, dir * speed, 5.0 * ctx.turn_mult, dt);
            } else if dist < RANGED_RETREAT_DIST {
                if dist > 1.0 {
                    approach(&mut actor.vel, -dir * speed * 0.95, 7.0 * ctx.turn_mult, dt);
                }
            } else {
                actor.vel *= 1.0 - (dt * 6.5 * ctx.turn_mult).min(0.25);
            }
        }
        Archetype::Dasher { dash_cd, lunge } => {
            *dash_cd -= dt;
            *lunge = (*lunge - dt).max(0.0);
            if *lunge > 0.0 {
                if dist_sq > 1.0 {
                    let desired = dir * speed * DASHER_LUNGE_SPEED_MULT;
                    approach(&mut actor.vel, desired, DASHER_LUNGE_RATE * ctx.turn_mult, dt);
                }
            } else {
                if dist_sq > 1.0 {
                    approach(&mut actor.vel, dir * speed, turn, dt);
                }
                if *dash_cd <= 0.0 && dist_sq < DASHER_TRIGGER_DIST * DASHER_TRIGGER_DIST {
                    *lunge = DASHER_LUNGE_TIME;
                    *dash_cd = lerp(3.0, 2.0, ctx.eased) + rng.random_range(-0.15..0.15);
                }
            }
        }
        Archetype::Boss(_) => {}
    }
}

/// Ranged fire. Other archetypes never shoot.
pub fn maybe_attack<R: Rng + ?Sized>(
    actor: &mut Actor,
    ctx: &AiContext,
    dt: f32,
    rng: &mut R,
) -> Vec<Projectile> {
    let Archetype::Ranged { shoot_cd } = &mut actor.archetype else {
        return Vec::new();
    };
    *shoot_cd -= dt;

    let to_target = ctx.target - actor.pos;
    let dist = to_target.length();
    if *shoot_cd > 0.0 || dist > RANGED_SHOOT_DIST || dist <= 1.0 {
        return Vec::new();
    }
    if !ctx.view.inflate(RANGED_SCREEN_MARGIN).contains(actor.pos)
        || !ctx.arena.has_line_of_sight(actor.pos, ctx.target)
    {
        return Vec::new();
    }

    let dir = to_target / dist;
    let speed = RANGED_BULLET_SPEED + 60.0 * ctx.eased;
    let damage = lerp(1.0, 2.0, ctx.eased).round() as i32;
    let angles: &[f32] = if ctx.double_ranged {
        &[-RANGED_DOUBLE_SPREAD_DEG * 0.5, RANGED_DOUBLE_SPREAD_DEG * 0.5]
    } else {
        &[0.0]
    };
    let shots = angles
        .iter()
        .map(|&angle| {
            let d = rotate_deg(dir, angle);
            Projectile::new(
                actor.pos + dir * (actor.radius + 6.0),
                d * speed,
                damage,
                Side::Enemy,
                RANGED_BULLET_RADIUS,
                RANGED_BULLET_LIFE,
            )
        })
        .collect();
    *shoot_cd = rng.random_range(1.10..1.55);
    shots
}

/// Short modifier-granted burst toward the target
pub fn update_extra_dash<R: Rng + ?Sized>(actor: &mut Actor, target: Vec2, dt: f32, rng: &mut R) {
    let dash = &mut actor.extra_dash;
    if !dash.enabled {
        return;
    }
    dash.cooldown = (dash.cooldown - dt).max(0.0);
    if dash.timer > 0.0 {
        let step = dt.min(dash.timer);
        actor.pos += dash.dir * actor.base_speed * EXTRA_DASH_SPEED_MULT * step;
        dash.timer -= step;
    } else if dash.cooldown <= 0.0 {
        let to = target - actor.pos;
        if to.length_squared() > 1.0 {
            dash.dir = to.normalize();
            dash.timer = EXTRA_DASH_TIME;
            dash.cooldown = rng.random_range(2.0..3.6);
        }
    }
}

/// Per-actor result of the neighbor pass
#[derive(Debug, Clone, Copy)]
pub struct NeighborInfo {
    pub id: ActorId,
    /// Accumulated separation push (zero for the boss)
    pub push: Vec2,
    /// Another enemy within regen range
    pub has_close_neighbor: bool,
}

/// Read-only neighbor pass over the grid. Pushes are applied afterwards so
/// every actor sees the same positions.
pub fn compute_neighbors(
    actors: &ActorStore,
    grid: &SpatialGrid,
    tuning: &SeparationTuning,
) -> Vec<NeighborInfo> {
    let mut scratch = Vec::new();
    let mut out = Vec::with_capacity(actors.len());
    for (id, actor) in actors.iter() {
        grid.neighbors_of(actor.pos, &mut scratch);
        let mut push = Vec2::ZERO;
        let mut has_close_neighbor = false;
        for &(other_id, other_pos) in &scratch {
            if other_id == id {
                continue;
            }
            let d = actor.pos - other_pos;
            let dist = d.length();
            if dist < REGEN_RANGE {
                has_close_neighbor = true;
            }
            let Some(other) = actors.get(other_id) else {
                continue;
            };
            let min_dist = actor.radius + other.radius;
            if dist > 0.001 && dist < min_dist * tuning.softness {
                push += d / dist * (min_dist - dist) * tuning.force;
            }
        }
        if actor.is_boss() {
            push = Vec2::ZERO;
        }
        out.push(NeighborInfo {
            id,
            push,
            has_close_neighbor,
        });
    }
    out
}

/// Fold a separation push into velocity
pub fn apply_separation(actor: &mut Actor, push: Vec2, dt: f32) {
    if push.length_squared() > 0.0 {
        actor.vel += push * dt * SEPARATION_GAIN;
    }
}

/// `enemy_regen`: heal a fraction of max HP per second
pub fn regen(actor: &mut Actor, dt: f32) {
    actor.heal(actor.hp_max * REGEN_RATE * dt);
}

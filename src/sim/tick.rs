//! Per-frame simulation step
//!
//! A frame runs the stages in [`PIPELINE`] order. Each stage reads and
//! writes [`SimulationState`] directly and can be driven on its own in tests.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::actor::ActorId;
use super::ai::{
    AiContext, apply_separation, compute_neighbors, maybe_attack, regen, steer, update_extra_dash,
};
use super::boss::{BossContext, BossOutput, PlayerHit, RocketStrike, SLAM_RADIUS, StrikeTick, update_boss};
use super::collision::{resolve_circle_walls, resolve_player_overlap};
use super::combat::{
    HitContext, PendingBlast, Side, damage_player, resolve_contact_damage, resolve_enemy_projectiles,
    resolve_projectile_hits,
};
use super::director::{boss_bonus_coins, pick_enemy_kind};
use super::modifiers::{EARLY_START_WAVE, ModifierId};
use super::pickup::{PickupKind, PowerUp};
use super::player::Upgrade;
use super::state::{EndReason, GameEvent, RunPhase, SimulationState};
use crate::consts::*;
use crate::direction_or;

/// Upgrade choices offered per level
const UPGRADE_CHOICES: usize = 3;
const CURVE_RATE: f32 = 1.25;
const CURVE_MIN_SPEED: f32 = 80.0;
const REVIVE_HP_FRACTION: f32 = 0.45;
const BOSS_XP_ORBS: usize = 18;
const BOSS_HEALTH_PACKS: usize = 2;

/// Player intent for one frame
#[derive(Debug, Clone, Default)]
pub struct InputFrame {
    /// Movement intent; need not be normalized
    pub move_dir: Vec2,
    pub aim_dir: Vec2,
    /// Trigger held
    pub fire: bool,
    pub dash: bool,
    /// Autopilot plays the run
    pub idle_mode: bool,
}

/// One step of the frame pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Spawn,
    Move,
    Collide,
    Combat,
    Reap,
    DirectorAdvance,
}

pub const PIPELINE: [Stage; 6] = [
    Stage::Spawn,
    Stage::Move,
    Stage::Collide,
    Stage::Combat,
    Stage::Reap,
    Stage::DirectorAdvance,
];

/// Advance the run by `dt` seconds, clamped to the configured maximum.
/// Does nothing once the run is over.
pub fn advance(state: &mut SimulationState, input: &InputFrame, dt: f32) {
    if state.is_over() {
        return;
    }
    let dt = if dt.is_finite() {
        dt.clamp(0.0, state.tuning.max_frame_dt)
    } else {
        0.0
    };
    let input = if input.idle_mode {
        autopilot(state)
    } else {
        input.clone()
    };

    state.frame += 1;
    for stage in PIPELINE {
        run_stage(state, stage, &input, dt);
        if state.is_over() {
            break;
        }
    }
}

pub fn run_stage(state: &mut SimulationState, stage: Stage, input: &InputFrame, dt: f32) {
    match stage {
        Stage::Spawn => spawn_stage(state, dt),
        Stage::Move => move_stage(state, input, dt),
        Stage::Collide => collide_stage(state),
        Stage::Combat => combat_stage(state, dt),
        Stage::Reap => reap_stage(state),
        Stage::DirectorAdvance => director_stage(state, dt),
    }
}

/// Roll a new modifier set if the current one expired, and retrofit it
fn advance_modifiers(state: &mut SimulationState) {
    let wave = state.director.wave;
    if wave < EARLY_START_WAVE {
        return;
    }
    if let Some(active) = state.modifiers.advance(wave, &mut state.rng) {
        state.modifiers.retrofit(&mut state.actors, &mut state.rng);
        let waves = state.modifiers.waves_remaining(wave);
        state.push_event(GameEvent::ModifiersChanged { active, waves });
    }
}

fn spawn_stage(state: &mut SimulationState, dt: f32) {
    advance_modifiers(state);

    if state.director.powerup_due(dt, &mut state.rng) {
        state.spawn_powerup();
    }

    let attempts = state
        .director
        .spawn_attempts(dt, &mut state.modifiers, &mut state.rng);
    for _ in 0..attempts {
        if state.enemy_count() >= state.director.population_cap() {
            break;
        }
        let kind = pick_enemy_kind(
            state.director.wave,
            state.modifiers.knight_weight(),
            &mut state.rng,
        );
        state.spawn_enemy(kind);
    }
}

fn move_stage(state: &mut SimulationState, input: &InputFrame, dt: f32) {
    state.player.update(input, dt, &state.arena);
    let shots = state.player.fire(input.fire);
    state.projectiles.extend(shots);

    if let Some(obj) = state.objective.as_mut() {
        obj.tick(dt);
    }

    let target = state.enemy_target();
    let view = state.view_rect();
    let eased = state.director.eased_difficulty();
    let wave_progress = state.director.wave_progress();
    let player_pos = state.player.pos;

    state
        .grid
        .rebuild(state.actors.iter().map(|(id, a)| (id, a.pos)));
    let neighbors = compute_neighbors(&state.actors, &state.grid, &state.tuning.separation);

    let ai_ctx = AiContext {
        arena: &state.arena,
        target,
        view,
        eased,
        turn_mult: state.modifiers.turn_mult(),
        double_ranged: state.modifiers.is_active(ModifierId::DoubleRanged),
    };
    let boss_ctx = BossContext {
        arena: &state.arena,
        player_pos,
        player_radius: state.player.radius,
        view,
        eased,
    };
    let regen_active = state.modifiers.is_active(ModifierId::EnemyRegen);
    let dashes_active = state.modifiers.is_active(ModifierId::EnemyDashes);

    let mut boss_out = BossOutput::default();
    let mut boss_id: Option<ActorId> = None;
    for info in &neighbors {
        let Some(actor) = state.actors.get_mut(info.id) else {
            continue;
        };
        actor.hit_flash = (actor.hit_flash - dt).max(0.0);
        apply_separation(actor, info.push, dt);
        actor.age += dt;

        if actor.is_boss() {
            update_boss(actor, &boss_ctx, dt, &mut state.rng, &mut boss_out);
            boss_id = Some(info.id);
            continue;
        }

        actor.speed = actor.base_speed * state.modifiers.speed_mult(actor.age, wave_progress);
        steer(actor, &ai_ctx, dt, &mut state.rng);
        actor.pos += actor.vel * dt;
        if dashes_active {
            update_extra_dash(actor, target, dt, &mut state.rng);
        }
        let shots = maybe_attack(actor, &ai_ctx, dt, &mut state.rng);
        state.projectiles.extend(shots);
        if regen_active && info.has_close_neighbor {
            regen(actor, dt);
        }
    }

    state.projectiles.extend(boss_out.projectiles);
    state.rocket_strikes.extend(boss_out.strikes);
    state.pending_player_hits.extend(boss_out.player_hits);
    if boss_out.enraged {
        if let Some(id) = boss_id {
            log::info!("Boss enraged");
            state.push_event(GameEvent::BossEnraged { id });
        }
    }
    if let Some(pos) = boss_out.slam_impact {
        state.push_event(GameEvent::Explosion {
            pos,
            radius: SLAM_RADIUS,
        });
    }

    let curving = state.modifiers.is_active(ModifierId::CurvingShots);
    for proj in &mut state.projectiles {
        if curving && proj.side == Side::Enemy {
            proj.steer_toward(target, CURVE_RATE, CURVE_MIN_SPEED, dt);
        }
        proj.advance(dt);
    }

    let reach = state.player.magnet_reach();
    for pickup in &mut state.pickups {
        pickup.attract(player_pos, reach, dt);
    }
}

fn collide_stage(state: &mut SimulationState) {
    let player_pos = state.player.pos;
    let player_radius = state.player.radius;
    for actor in state.actors.values_mut() {
        let damping = actor.tag().stats().wall_damping;
        resolve_circle_walls(&mut actor.pos, &mut actor.vel, actor.radius, &state.arena, damping);
        if !actor.knockback_immune() {
            resolve_player_overlap(
                &mut actor.pos,
                &mut actor.vel,
                actor.radius,
                player_pos,
                player_radius,
                &state.arena.bounds,
            );
        }
    }

    let arena = &state.arena;
    state
        .projectiles
        .retain(|p| p.alive() && arena.in_bounds(p.pos) && !arena.point_blocked(p.pos));
}

fn combat_stage(state: &mut SimulationState, dt: f32) {
    let ctx = HitContext {
        crit_chance: state.player.crit_chance,
        crit_mult: state.player.crit_mult,
        knockback_mult: state.player.knockback_mult,
        resist_over_time: state.modifiers.is_active(ModifierId::ResistOverTime),
    };
    resolve_projectile_hits(
        &mut state.projectiles,
        &mut state.actors,
        &ctx,
        &mut state.rng,
        &mut state.events,
    );
    resolve_enemy_projectiles(
        &mut state.projectiles,
        &mut state.player,
        state.objective.as_mut(),
        &mut state.events,
    );
    resolve_contact_damage(
        &state.actors,
        &mut state.player,
        state.objective.as_mut(),
        &mut state.events,
    );

    for hit in std::mem::take(&mut state.pending_player_hits) {
        damage_player(&mut state.player, hit.damage, hit.knockback, &mut state.events);
    }

    let mut strike_hits: Vec<PlayerHit> = Vec::new();
    let player_pos = state.player.pos;
    state.rocket_strikes.retain_mut(|strike| match strike.tick(dt) {
        StrikeTick::Pending => true,
        StrikeTick::Detonated => {
            state.events.push(GameEvent::Explosion {
                pos: strike.pos,
                radius: strike.radius,
            });
            if strike.covers(player_pos) {
                strike_hits.push(PlayerHit {
                    damage: RocketStrike::DAMAGE,
                    knockback: direction_or(player_pos - strike.pos, Vec2::X) * RocketStrike::KNOCKBACK,
                });
            }
            true
        }
        StrikeTick::Expired => false,
    });
    for hit in strike_hits {
        damage_player(&mut state.player, hit.damage, hit.knockback, &mut state.events);
    }

    let mut blasts_hit = 0;
    state.pending_blasts.retain_mut(|blast| {
        if !blast.tick(dt) {
            return true;
        }
        state.events.push(GameEvent::Explosion {
            pos: blast.pos,
            radius: blast.radius,
        });
        let reach = blast.radius + PLAYER_RADIUS;
        if blast.pos.distance_squared(player_pos) <= reach * reach {
            blasts_hit += blast.damage;
        }
        false
    });
    if blasts_hit > 0 {
        damage_player(&mut state.player, blasts_hit, Vec2::ZERO, &mut state.events);
    }

    state.projectiles.retain(|p| p.alive());
    collect_pickups(state);
}

fn collect_pickups(state: &mut SimulationState) {
    let player_pos = state.player.pos;
    let player_radius = state.player.radius;
    let mut collected = Vec::new();
    state.pickups.retain(|p| {
        let reach = player_radius + p.radius();
        if p.pos.distance_squared(player_pos) <= reach * reach {
            collected.push(p.kind);
            false
        } else {
            true
        }
    });
    for kind in collected {
        match kind {
            PickupKind::Xp { value } => state.player.gain_xp(value),
            PickupKind::Health { amount } => state.player.heal(amount),
            PickupKind::Power { power } => state.player.apply_powerup(power),
        }
        log::debug!("Collected {kind:?}");
        state.push_event(GameEvent::PickupCollected { kind });
    }
}

fn reap_stage(state: &mut SimulationState) {
    let dead: Vec<ActorId> = state
        .actors
        .iter()
        .filter(|(_, a)| !a.is_alive())
        .map(|(id, _)| id)
        .collect();

    let revive_active = state.modifiers.is_active(ModifierId::ReviveOnce);
    for id in dead {
        let revived = match state.actors.get_mut(id) {
            Some(a) if revive_active && !a.is_boss() && a.revives_remaining > 0 => {
                a.revives_remaining -= 1;
                a.hp = (a.hp_max * REVIVE_HP_FRACTION).max(1.0).min(a.hp_max);
                a.hit_flash = 0.2;
                Some(a.pos)
            }
            _ => None,
        };
        if let Some(pos) = revived {
            state.push_event(GameEvent::EnemyRevived { id, pos });
            continue;
        }

        let Some(actor) = state.actors.remove(id) else {
            continue;
        };
        state.player.score += u64::from(actor.score_value);
        state.kills += 1;
        state.push_event(GameEvent::ActorDied {
            id,
            archetype: actor.tag(),
            pos: actor.pos,
            score: actor.score_value,
            weapon: actor.last_weapon.clone(),
            elite: actor.elite,
        });

        match actor.archetype.boss() {
            Some(brain) => on_boss_killed(state, actor.pos, actor.score_value, brain.stage),
            None => {
                if state.modifiers.is_active(ModifierId::DeathExplosions) {
                    state.pending_blasts.push(PendingBlast::new(actor.pos));
                }
                drop_enemy_loot(state, actor.pos);
            }
        }
    }

    let gained = state.player.try_level_up();
    let first = state.player.level + 1 - gained;
    for level in first..=state.player.level {
        let choices = Upgrade::roll_choices(&mut state.rng, UPGRADE_CHOICES);
        state.push_event(GameEvent::LevelUpAvailable { level, choices });
    }

    let reason = if !state.player.is_alive() {
        Some(EndReason::PlayerDestroyed)
    } else if state.objective.as_ref().is_some_and(|o| !o.is_standing()) {
        Some(EndReason::ObjectiveDestroyed)
    } else {
        None
    };
    if let Some(reason) = reason {
        end_run(state, reason);
    }
}

fn drop_enemy_loot(state: &mut SimulationState, pos: Vec2) {
    let eased = state.director.eased_difficulty();
    let value = XP_ORB_VALUE + (eased * 6.0) as u32;
    state.drop_pickup(pos, PickupKind::Xp { value });

    if state.rng.random::<f32>() < 0.09 + 0.07 * eased {
        let jitter = Vec2::new(
            state.rng.random_range(-10.0..10.0),
            state.rng.random_range(-10.0..10.0),
        );
        state.drop_pickup(
            pos + jitter,
            PickupKind::Health {
                amount: HEALTH_PACK_AMOUNT,
            },
        );
    }
}

fn on_boss_killed(state: &mut SimulationState, center: Vec2, score: u32, stage: u32) {
    let bonus_coins = boss_bonus_coins(stage);
    state.run_bonus_coins += bonus_coins;

    let eased = state.director.eased_difficulty();
    let value = (XP_ORB_VALUE as f32 * (3.0 + eased)) as u32;
    for _ in 0..BOSS_XP_ORBS {
        let angle = state.rng.random_range(0.0..TAU);
        let radius = state.rng.random_range(10.0..120.0);
        let pos = state
            .arena
            .clamp_inset(center + Vec2::from_angle(angle) * radius, 40.0);
        state.drop_pickup(pos, PickupKind::Xp { value });
    }
    for _ in 0..BOSS_HEALTH_PACKS {
        let jitter = Vec2::new(
            state.rng.random_range(-60.0..60.0),
            state.rng.random_range(-60.0..60.0),
        );
        state.drop_pickup(
            center + jitter,
            PickupKind::Health {
                amount: HEALTH_PACK_AMOUNT + 1,
            },
        );
    }
    let power = PowerUp::random(&mut state.rng);
    state.drop_pickup(center + Vec2::new(0.0, -20.0), PickupKind::Power { power });

    state.director.end_boss_fight();
    state.rocket_strikes.clear();
    log::info!("Boss killed: stage={stage} bonus_coins={bonus_coins}");
    state.push_event(GameEvent::BossKilled {
        pos: center,
        score,
        bonus_coins,
    });
}

fn end_run(state: &mut SimulationState, reason: EndReason) {
    state.phase = RunPhase::GameOver;
    log::info!(
        "Run ended ({reason:?}): wave={} score={} time={:.1}s kills={}",
        state.director.wave,
        state.player.score,
        state.director.survival_time,
        state.kills
    );
    let event = GameEvent::RunEnded {
        reason,
        wave: state.director.wave,
        score: state.player.score,
        survival_time: state.director.survival_time,
        kills: state.kills,
        bonus_coins: state.run_bonus_coins,
    };
    state.push_event(event);
}

fn director_stage(state: &mut SimulationState, dt: f32) {
    let Some(wave) = state.director.advance_clock(dt) else {
        return;
    };
    state.push_event(GameEvent::WaveStarted { wave });
    advance_modifiers(state);
    let overlord = state.modifiers.is_active(ModifierId::OverlordWaves);
    if state.director.is_boss_wave(wave, overlord) {
        state.spawn_boss();
    }
}

/// Demo input: kite away from the nearest enemy, grab pickups when safe
fn autopilot(state: &SimulationState) -> InputFrame {
    let me = state.player.pos;
    let nearest = state
        .actors
        .values()
        .map(|a| (a.pos, a.pos.distance_squared(me)))
        .min_by(|a, b| a.1.total_cmp(&b.1));

    let Some((enemy_pos, dist_sq)) = nearest else {
        let pickup = state
            .pickups
            .iter()
            .min_by(|a, b| a.pos.distance_squared(me).total_cmp(&b.pos.distance_squared(me)));
        let move_dir = pickup.map_or(state.arena.center() - me, |p| p.pos - me);
        return InputFrame {
            move_dir: direction_or(move_dir, Vec2::ZERO),
            aim_dir: state.player.aim_dir,
            ..InputFrame::default()
        };
    };

    let away = direction_or(me - enemy_pos, Vec2::Y);
    // Orbit rather than back straight into a wall
    let orbit = Vec2::new(-away.y, away.x);
    let to_center = direction_or(state.arena.center() - me, Vec2::ZERO) * 0.35;
    let move_dir = if dist_sq < 260.0 * 260.0 {
        away + orbit * 0.6 + to_center
    } else {
        orbit + to_center
    };
    InputFrame {
        move_dir,
        aim_dir: direction_or(enemy_pos - me, Vec2::X),
        fire: true,
        dash: dist_sq < 70.0 * 70.0,
        idle_mode: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::actor::ArchetypeTag;
    use crate::sim::arena::Arena;
    use crate::sim::combat::Projectile;
    use crate::tuning::Tuning;
    use crate::weapons::WeaponTable;
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 60.0;

    fn quiet_state(seed: u64) -> SimulationState {
        let mut s = SimulationState::new(
            seed,
            Tuning::default(),
            Arena::open(ARENA_W, ARENA_H),
            WeaponTable::builtin(),
        );
        s.director.spawn_timer = f32::MAX;
        s.director.powerup_timer = f32::MAX;
        s.player.crit_chance = 0.0;
        s
    }

    fn shot_at(pos: Vec2, damage: i32) -> Projectile {
        Projectile::new(pos, Vec2::ZERO, damage, Side::Player, 5.0, 1.0)
    }

    fn died_score(events: &[GameEvent]) -> Option<u32> {
        events.iter().find_map(|e| match e {
            GameEvent::ActorDied { score, .. } => Some(*score),
            _ => None,
        })
    }

    #[test]
    fn test_dt_is_clamped() {
        let mut s = quiet_state(1);
        advance(&mut s, &InputFrame::default(), 5.0);
        assert!((s.director.survival_time - s.tuning.max_frame_dt).abs() < 1e-6);
        advance(&mut s, &InputFrame::default(), f32::NAN);
        assert!((s.director.survival_time - s.tuning.max_frame_dt).abs() < 1e-6);
        assert_eq!(s.frame, 2);
    }

    #[test]
    fn test_chaser_takes_two_twenty_damage_shots() {
        let mut s = quiet_state(2);
        let pos = s.player.pos + Vec2::new(300.0, 0.0);
        let id = s.spawn_enemy_at(ArchetypeTag::Chaser, pos);

        s.projectiles.push(shot_at(pos, 20));
        run_stage(&mut s, Stage::Combat, &InputFrame::default(), DT);
        assert_eq!(s.actors[id].hp, 22.0);
        assert!(s.projectiles.is_empty());

        s.projectiles.push(shot_at(s.actors[id].pos, 20));
        run_stage(&mut s, Stage::Combat, &InputFrame::default(), DT);
        run_stage(&mut s, Stage::Reap, &InputFrame::default(), DT);
        assert_eq!(s.actors[id].hp, 2.0);
        assert_eq!(died_score(s.events()), None);
    }

    fn dash_frames(s: &mut SimulationState, id: ActorId, frames: u32) -> u32 {
        let mut dashing = 0;
        for _ in 0..frames {
            run_stage(s, Stage::Move, &InputFrame::default(), DT);
            if s.actors[id].extra_dash.timer > 0.0 {
                dashing += 1;
            }
        }
        dashing
    }

    #[test]
    fn test_extra_dash_fires_while_modifier_active() {
        let mut s = quiet_state(3);
        s.modifiers.force_set(&[ModifierId::EnemyDashes], 1, 2);
        let id = s.spawn_enemy_at(ArchetypeTag::Chaser, s.player.pos + Vec2::new(1000.0, 1000.0));
        assert!(s.actors[id].extra_dash.enabled);

        assert!(dash_frames(&mut s, id, 240) > 0);
    }

    #[test]
    fn test_extra_dash_stops_when_modifier_expires() {
        let mut s = quiet_state(3);
        s.modifiers.force_set(&[ModifierId::EnemyDashes], 1, 2);
        let id = s.spawn_enemy_at(ArchetypeTag::Chaser, s.player.pos + Vec2::new(600.0, 0.0));
        assert!(s.actors[id].extra_dash.enabled);

        s.modifiers.force_set(&[], 1, 1);
        assert!(!s.modifiers.is_active(ModifierId::EnemyDashes));
        assert_eq!(dash_frames(&mut s, id, 600), 0);
    }

    #[test]
    fn test_lethal_hit_reaps_and_scores() {
        let mut s = quiet_state(3);
        let pos = s.player.pos + Vec2::new(300.0, 0.0);
        let id = s.spawn_enemy_at(ArchetypeTag::Chaser, pos);
        s.actors[id].hp = 22.0;

        let mut shot = shot_at(pos, 22);
        shot.weapon = Some("cannon".into());
        s.projectiles.push(shot);
        run_stage(&mut s, Stage::Combat, &InputFrame::default(), DT);
        // Still present until the reap stage
        assert!(s.actors.contains_key(id));
        run_stage(&mut s, Stage::Reap, &InputFrame::default(), DT);

        assert!(!s.actors.contains_key(id));
        assert_eq!(died_score(s.events()), Some(12));
        assert_eq!(s.player.score, 12);
        assert!(s.events().iter().any(|e| matches!(
            e,
            GameEvent::ActorDied { weapon: Some(w), .. } if w == "cannon"
        )));
        assert!(s.pickups.iter().any(|p| matches!(p.kind, PickupKind::Xp { value: 12 })));
    }

    #[test]
    fn test_revive_once_restores_health() {
        let mut s = quiet_state(4);
        s.modifiers.force_set(&[ModifierId::ReviveOnce], 1, 2);
        let id = s.spawn_enemy_at(ArchetypeTag::Tank, s.player.pos + Vec2::new(400.0, 0.0));
        s.actors[id].hp = 0.0;
        run_stage(&mut s, Stage::Reap, &InputFrame::default(), DT);
        let a = &s.actors[id];
        assert_eq!(a.hp, a.hp_max * 0.45);
        assert_eq!(a.revives_remaining, 0);

        s.actors[id].hp = 0.0;
        run_stage(&mut s, Stage::Reap, &InputFrame::default(), DT);
        assert!(!s.actors.contains_key(id));
    }

    #[test]
    fn test_death_explosion_hurts_nearby_player() {
        let mut s = quiet_state(5);
        s.modifiers.force_set(&[ModifierId::DeathExplosions], 1, 2);
        let id = s.spawn_enemy_at(ArchetypeTag::Chaser, s.player.pos + Vec2::new(80.0, 0.0));
        s.actors[id].hp = 0.0;
        run_stage(&mut s, Stage::Reap, &InputFrame::default(), DT);
        assert_eq!(s.pending_blasts.len(), 1);

        let hp = s.player.hp;
        run_stage(&mut s, Stage::Combat, &InputFrame::default(), 0.2);
        assert_eq!(s.player.hp, hp);
        run_stage(&mut s, Stage::Combat, &InputFrame::default(), 0.2);
        assert_eq!(s.player.hp, hp - 2);
        assert!(s.pending_blasts.is_empty());
    }

    #[test]
    fn test_boss_wave_and_kill_rewards() {
        let mut s = quiet_state(6);
        s.director.wave = 9;
        s.director.wave_timer = DT / 2.0;
        s.spawn_enemy_at(ArchetypeTag::Chaser, s.player.pos + Vec2::new(500.0, 0.0));
        run_stage(&mut s, Stage::DirectorAdvance, &InputFrame::default(), DT);

        let boss = s.boss_id().expect("boss spawned");
        assert_eq!(s.actors.len(), 1);
        assert!(s.director.in_boss_fight);
        assert!(s.events().iter().any(|e| matches!(e, GameEvent::BossSpawned { stage: 1, .. })));

        // Normal spawning is suspended during the fight
        s.director.spawn_timer = 0.0;
        run_stage(&mut s, Stage::Spawn, &InputFrame::default(), DT);
        assert_eq!(s.actors.len(), 1);

        s.actors[boss].hp = 0.0;
        run_stage(&mut s, Stage::Reap, &InputFrame::default(), DT);
        assert!(s.boss_id().is_none());
        assert!(!s.director.in_boss_fight);
        assert_eq!(s.director.boss_grace, s.tuning.wave.boss_grace);
        assert_eq!(s.run_bonus_coins, 10);
        assert_eq!(s.pickups.len(), 18 + 2 + 1);
        assert!(s.events().iter().any(|e| matches!(e, GameEvent::BossKilled { bonus_coins: 10, .. })));
        assert_eq!(s.player.score, 550);
    }

    #[test]
    fn test_pickups_collected_on_overlap() {
        let mut s = quiet_state(7);
        let at = s.player.pos;
        s.drop_pickup(at, PickupKind::Xp { value: 30 });
        s.drop_pickup(
            at,
            PickupKind::Power {
                power: PowerUp::Shield,
            },
        );
        s.drop_pickup(at + Vec2::new(800.0, 0.0), PickupKind::Xp { value: 30 });
        run_stage(&mut s, Stage::Combat, &InputFrame::default(), DT);
        assert_eq!(s.player.xp, 30);
        assert!(s.player.invulnerable());
        assert_eq!(s.pickups.len(), 1);
    }

    #[test]
    fn test_level_up_offers_distinct_choices() {
        let mut s = quiet_state(8);
        s.player.gain_xp(60);
        run_stage(&mut s, Stage::Reap, &InputFrame::default(), DT);
        let choices = s
            .events()
            .iter()
            .find_map(|e| match e {
                GameEvent::LevelUpAvailable { level: 2, choices } => Some(choices.clone()),
                _ => None,
            })
            .expect("level-up event");
        assert_eq!(choices.len(), 3);
        assert!(choices[0] != choices[1] && choices[1] != choices[2] && choices[0] != choices[2]);
    }

    #[test]
    fn test_player_death_ends_run() {
        let mut s = quiet_state(9);
        s.player.hp = 0;
        advance(&mut s, &InputFrame::default(), DT);
        assert_eq!(s.phase, RunPhase::GameOver);
        assert!(s.events().iter().any(|e| matches!(
            e,
            GameEvent::RunEnded {
                reason: EndReason::PlayerDestroyed,
                ..
            }
        )));
        let frame = s.frame;
        advance(&mut s, &InputFrame::default(), DT);
        assert_eq!(s.frame, frame);
    }

    #[test]
    fn test_enemy_pushed_out_of_player() {
        let mut s = quiet_state(10);
        let id = s.spawn_enemy_at(ArchetypeTag::Chaser, s.player.pos + Vec2::new(5.0, 0.0));
        run_stage(&mut s, Stage::Collide, &InputFrame::default(), DT);
        let d = s.actors[id].pos.distance(s.player.pos);
        assert!(d >= s.player.radius + s.actors[id].radius - 1.5);
    }

    #[test]
    fn test_projectiles_culled_by_walls() {
        let mut s = quiet_state(11);
        s.arena = Arena::new(
            s.arena.bounds,
            vec![crate::sim::arena::Rect::new(100.0, 100.0, 50.0, 50.0)],
        );
        s.projectiles.push(shot_at(Vec2::new(120.0, 120.0), 1));
        s.projectiles.push(shot_at(Vec2::new(-5.0, 120.0), 1));
        s.projectiles.push(shot_at(Vec2::new(400.0, 400.0), 1));
        run_stage(&mut s, Stage::Collide, &InputFrame::default(), DT);
        assert_eq!(s.projectiles.len(), 1);
    }

    #[test]
    fn test_autopilot_run_keeps_health_in_bounds() {
        let mut s = SimulationState::with_generated_arena(12, Tuning::default(), WeaponTable::builtin());
        let input = InputFrame {
            idle_mode: true,
            ..InputFrame::default()
        };
        for _ in 0..1800 {
            advance(&mut s, &input, DT);
            for a in s.actors.values() {
                assert!(a.hp >= 0.0 && a.hp <= a.hp_max);
            }
            assert!(s.player.hp >= 0 && s.player.hp <= s.player.max_hp);
            s.drain_events();
            if s.is_over() {
                break;
            }
        }
        assert!(s.director.survival_time > 0.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn test_spawn_never_exceeds_cap(seed in any::<u64>(), survival in 0.0f32..600.0, bursts in any::<bool>()) {
            let mut s = quiet_state(seed);
            s.director.spawn_timer = 0.0;
            s.director.survival_time = survival;
            if bursts {
                s.modifiers.force_set(&[ModifierId::SpawnBursts], 1, 2);
            }
            for _ in 0..400 {
                run_stage(&mut s, Stage::Spawn, &InputFrame::default(), 0.05);
                prop_assert!(s.enemy_count() <= s.director.population_cap());
            }
        }
    }
}

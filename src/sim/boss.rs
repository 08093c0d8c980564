//! Boss encounter state machine
//!
//! Pursuit and volley fire run by default. Dash and rocket-strike specials run
//! on their own timers layered over pursuit. Once enraged, and when the
//! encounter allows it, the sky-slam sequence takes over exclusively:
//! takeoff, hover (tracking a delayed marker), impact, recovery.

use std::collections::VecDeque;

use glam::Vec2;
use rand::Rng;
use serde::Serialize;

use super::actor::{Actor, ArchetypeTag};
use super::arena::{Arena, Rect};
use super::combat::{Projectile, Side};
use crate::tuning::BossTuning;
use crate::{direction_or, exp_smoothing, lerp, rotate_deg};

const BASE_SHOOT_CD: f32 = 1.4;
const MIN_SHOOT_CD: f32 = 0.75;
const BASE_VOLLEY: u32 = 3;
const VOLLEY_SPREAD_DEG: f32 = 12.0;
const BULLET_SPEED: f32 = 270.0;
const BULLET_LIFE: f32 = 1.5;
const BULLET_RADIUS: f32 = 5.0;
const SHOOT_RANGE: f32 = 820.0;
const SHOOT_SCREEN_MARGIN: f32 = 120.0;
const TURN_RATE: f32 = 3.2;

const ENRAGED_ATTACK_SPEED_MULT: f32 = 0.8;
const ENRAGED_MOVE_SPEED_MULT: f32 = 1.2;
const ENRAGED_DASH_SPEED_MULT: f32 = 1.3;
const ENRAGED_ROCKET_REACTION_CUT: f32 = 0.3;
const ENRAGED_ROCKET_RADIUS_MULT: f32 = 1.7;

const DASH_SPEED: f32 = 920.0;
const DASH_DISTANCE: f32 = 420.0;
const DASH_WINDUP: f32 = 1.3;
const ENRAGED_DASH_WINDUP: f32 = 0.8;
const DASH_DAMAGE: i32 = 2;
const DASH_KNOCKBACK: f32 = 420.0;

const ROCKET_FALL: f32 = 0.35;
const ROCKET_REACTION: f32 = 0.7 + ROCKET_FALL;
const ROCKET_RADIUS: f32 = 90.0;
const ROCKET_JITTER: f32 = 120.0;

const SLAM_TAKEOFF: f32 = 0.7;
const SLAM_HOVER: f32 = 3.0;
const SLAM_RECOVERY: f32 = 0.5;
const SLAM_IMPACT_VISIBLE: f32 = 0.45;
const SLAM_MARKER_DELAY: f32 = 0.5;
const SLAM_BUFFER_KEEP: f32 = SLAM_MARKER_DELAY + 0.6;
const SLAM_SCALE_MIN: f32 = 0.2;
pub const SLAM_RADIUS: f32 = 180.0;
const SLAM_DAMAGE: i32 = 3;

/// Sky-slam sub-phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkySlamPhase {
    #[default]
    Idle,
    Takeoff,
    Hover,
    /// Landed; brief grace before pursuit resumes
    Recovery,
}

/// Damage the boss wants dealt to the player this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerHit {
    pub damage: i32,
    pub knockback: Vec2,
}

/// World state the boss reads each frame
pub struct BossContext<'a> {
    pub arena: &'a Arena,
    pub player_pos: Vec2,
    pub player_radius: f32,
    /// Visible window
    pub view: Rect,
    pub eased: f32,
}

/// Everything a boss frame produced
#[derive(Debug, Default)]
pub struct BossOutput {
    pub projectiles: Vec<Projectile>,
    pub strikes: Vec<RocketStrike>,
    pub player_hits: Vec<PlayerHit>,
    /// Enrage happened this frame
    pub enraged: bool,
    /// Slam landed at this position
    pub slam_impact: Option<Vec2>,
}

/// Boss-only state carried inside [`Archetype::Boss`](super::actor::Archetype)
#[derive(Debug, Clone)]
pub struct BossBrain {
    /// `max(1, wave / boss_every)` at spawn
    pub stage: u32,
    pub wave: u32,
    pub enraged: bool,
    pub enrage_fraction: f32,
    pub attacks: bool,
    pub sky_slam: bool,
    pub slam_damage_immune: bool,

    shoot_cd: f32,
    bullet_damage: i32,

    pub dash_cd: f32,
    pub dash_windup: f32,
    pub dash_timer: f32,
    dash_dir: Vec2,
    dash_hit: bool,

    pub rocket_cd: f32,

    pub slam_cd: f32,
    pub slam_phase: SkySlamPhase,
    slam_timer: f32,
    /// Render scale while airborne
    pub slam_scale: f32,
    pub slam_marker: Vec2,
    pub slam_impact_timer: f32,
    /// Recent player positions with their age, oldest first
    slam_buffer: VecDeque<(Vec2, f32)>,
}

impl BossBrain {
    pub fn new<R: Rng + ?Sized>(stage: u32, wave: u32, tuning: &BossTuning, rng: &mut R) -> Self {
        let stage = stage.max(1);
        Self {
            stage,
            wave,
            enraged: false,
            enrage_fraction: tuning.enrage_fraction,
            attacks: tuning.attacks,
            sky_slam: tuning.sky_slam,
            slam_damage_immune: tuning.slam_damage_immune,
            shoot_cd: BASE_SHOOT_CD,
            bullet_damage: 1 + (stage as i32 - 1) * 2,
            dash_cd: rng.random_range(4.0..6.0),
            dash_windup: 0.0,
            dash_timer: 0.0,
            dash_dir: Vec2::X,
            dash_hit: false,
            rocket_cd: rng.random_range(5.0..7.0),
            slam_cd: rng.random_range(10.0..13.0),
            slam_phase: SkySlamPhase::Idle,
            slam_timer: 0.0,
            slam_scale: 1.0,
            slam_marker: Vec2::ZERO,
            slam_impact_timer: 0.0,
            slam_buffer: VecDeque::new(),
        }
    }

    /// Flip to enraged below the threshold. True only on the transition.
    pub fn check_enrage(&mut self, hp: f32, hp_max: f32) -> bool {
        if !self.enraged && hp < hp_max * self.enrage_fraction {
            self.enraged = true;
            return true;
        }
        false
    }

    pub fn dash_windup_time(&self) -> f32 {
        if self.enraged { ENRAGED_DASH_WINDUP } else { DASH_WINDUP }
    }

    pub fn move_speed_mult(&self) -> f32 {
        if self.enraged { ENRAGED_MOVE_SPEED_MULT } else { 1.0 }
    }

    pub fn dash_speed(&self) -> f32 {
        if self.enraged {
            DASH_SPEED * ENRAGED_DASH_SPEED_MULT
        } else {
            DASH_SPEED
        }
    }

    pub fn shoot_cd_base(&self) -> f32 {
        let mult = if self.enraged { ENRAGED_ATTACK_SPEED_MULT } else { 1.0 };
        (BASE_SHOOT_CD * mult).max(MIN_SHOOT_CD)
    }

    pub fn volley_size(&self) -> u32 {
        BASE_VOLLEY + u32::from(self.enraged)
    }

    pub fn rocket_radius(&self) -> f32 {
        if self.enraged {
            ROCKET_RADIUS * ENRAGED_ROCKET_RADIUS_MULT
        } else {
            ROCKET_RADIUS
        }
    }

    /// Seconds between the marker appearing and detonation
    pub fn rocket_reaction(&self) -> f32 {
        let cut = if self.enraged { ENRAGED_ROCKET_REACTION_CUT } else { 0.0 };
        (ROCKET_REACTION - cut).max(0.0)
    }

    /// Takeoff or hover
    pub fn airborne(&self) -> bool {
        matches!(self.slam_phase, SkySlamPhase::Takeoff | SkySlamPhase::Hover)
    }

    pub fn is_dashing(&self) -> bool {
        self.dash_windup > 0.0 || self.dash_timer > 0.0
    }

    fn start_slam(&mut self, player_pos: Vec2) {
        log::debug!("Boss sky-slam takeoff");
        self.slam_phase = SkySlamPhase::Takeoff;
        self.slam_timer = SLAM_TAKEOFF;
        self.slam_scale = 1.0;
        self.slam_buffer.clear();
        self.slam_marker = player_pos;
        self.dash_windup = 0.0;
        self.dash_timer = 0.0;
        self.shoot_cd = self.shoot_cd_base();
    }

    fn record_player(&mut self, player_pos: Vec2, dt: f32) {
        self.slam_buffer.push_back((player_pos, 0.0));
        for (_, age) in self.slam_buffer.iter_mut() {
            *age += dt;
        }
        while self
            .slam_buffer
            .front()
            .is_some_and(|(_, age)| *age > SLAM_BUFFER_KEEP)
        {
            self.slam_buffer.pop_front();
        }
    }

    /// Newest recorded position at least the marker delay old
    fn delayed_target(&self, fallback: Vec2) -> Vec2 {
        self.slam_buffer
            .iter()
            .rev()
            .find(|(_, age)| *age >= SLAM_MARKER_DELAY)
            .or_else(|| self.slam_buffer.front())
            .map_or(fallback, |(pos, _)| *pos)
    }
}

/// A telegraphed area strike dropped by the boss
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RocketStrike {
    pub pos: Vec2,
    pub phase: StrikePhase,
    pub timer: f32,
    pub fall_time: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrikePhase {
    Telegraph,
    Fall,
    Explode,
}

/// Result of advancing a strike one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrikeTick {
    Pending,
    Detonated,
    Expired,
}

impl RocketStrike {
    pub const DAMAGE: i32 = 2;
    pub const KNOCKBACK: f32 = 360.0;
    pub const EXPLODE_TIME: f32 = 0.22;

    pub fn new(pos: Vec2, telegraph: f32, fall_time: f32, radius: f32) -> Self {
        Self {
            pos,
            phase: StrikePhase::Telegraph,
            timer: telegraph,
            fall_time,
            radius,
        }
    }

    pub fn tick(&mut self, dt: f32) -> StrikeTick {
        self.timer -= dt;
        if self.timer > 0.0 {
            return StrikeTick::Pending;
        }
        match self.phase {
            StrikePhase::Telegraph => {
                self.phase = StrikePhase::Fall;
                self.timer = self.fall_time;
                StrikeTick::Pending
            }
            StrikePhase::Fall => {
                self.phase = StrikePhase::Explode;
                self.timer = Self::EXPLODE_TIME;
                StrikeTick::Detonated
            }
            StrikePhase::Explode => StrikeTick::Expired,
        }
    }

    pub fn covers(&self, p: Vec2) -> bool {
        self.pos.distance_squared(p) <= self.radius * self.radius
    }
}

/// Advance a boss actor one frame. Non-boss actors are ignored.
pub fn update_boss<R: Rng + ?Sized>(
    actor: &mut Actor,
    ctx: &BossContext,
    dt: f32,
    rng: &mut R,
    out: &mut BossOutput,
) {
    let Actor {
        archetype,
        pos,
        vel,
        hp,
        hp_max,
        base_speed,
        speed,
        radius,
        contact_damage,
        ..
    } = actor;
    let Some(brain) = archetype.boss_mut() else {
        return;
    };

    if brain.check_enrage(*hp, *hp_max) {
        out.enraged = true;
    }
    *speed = *base_speed * brain.move_speed_mult();

    if brain.slam_phase != SkySlamPhase::Idle {
        *vel = Vec2::ZERO;
        brain.record_player(ctx.player_pos, dt);
        match brain.slam_phase {
            SkySlamPhase::Takeoff => {
                brain.slam_timer -= dt;
                let progress = (1.0 - brain.slam_timer / SLAM_TAKEOFF).clamp(0.0, 1.0);
                brain.slam_scale = lerp(1.0, SLAM_SCALE_MIN, progress);
                if brain.slam_timer <= 0.0 {
                    brain.slam_phase = SkySlamPhase::Hover;
                    brain.slam_timer = SLAM_HOVER;
                }
            }
            SkySlamPhase::Hover => {
                brain.slam_timer -= dt;
                brain.slam_marker = brain.delayed_target(*pos);
                brain.slam_scale = SLAM_SCALE_MIN;
                if brain.slam_timer <= 0.0 {
                    brain.slam_phase = SkySlamPhase::Recovery;
                    brain.slam_timer = SLAM_RECOVERY;
                    brain.slam_scale = 1.0;
                    brain.slam_impact_timer = SLAM_IMPACT_VISIBLE;
                    *pos = brain.slam_marker;
                    *contact_damage = ArchetypeTag::Boss.stats().contact_damage;
                    if ctx.player_pos.distance_squared(brain.slam_marker) <= SLAM_RADIUS * SLAM_RADIUS {
                        out.player_hits.push(PlayerHit {
                            damage: SLAM_DAMAGE,
                            knockback: Vec2::ZERO,
                        });
                    }
                    out.slam_impact = Some(brain.slam_marker);
                }
            }
            SkySlamPhase::Recovery => {
                brain.slam_impact_timer = (brain.slam_impact_timer - dt).max(0.0);
                brain.slam_timer -= dt;
                if brain.slam_timer <= 0.0 {
                    brain.slam_phase = SkySlamPhase::Idle;
                    brain.slam_scale = 1.0;
                    brain.slam_cd = rng.random_range(10.0..13.0);
                }
            }
            SkySlamPhase::Idle => {}
        }
        return;
    }

    if brain.enraged && brain.sky_slam {
        brain.slam_cd = (brain.slam_cd - dt).max(0.0);
        if brain.slam_cd <= 0.0 && !brain.is_dashing() {
            brain.start_slam(ctx.player_pos);
            *vel = Vec2::ZERO;
            *contact_damage = 0;
            return;
        }
    }

    brain.shoot_cd -= dt;

    if brain.attacks {
        brain.dash_cd -= dt;
        let reach_sq = (*radius + ctx.player_radius).powi(2);
        if brain.dash_windup > 0.0 {
            brain.dash_windup -= dt;
            *vel = Vec2::ZERO;
            if brain.dash_windup <= 0.0 {
                brain.dash_timer = DASH_DISTANCE / brain.dash_speed();
                brain.dash_hit = false;
            }
        } else if brain.dash_timer > 0.0 {
            let step = dt.min(brain.dash_timer);
            *pos += brain.dash_dir * brain.dash_speed() * step;
            brain.dash_timer -= step;
            if !brain.dash_hit && pos.distance_squared(ctx.player_pos) <= reach_sq {
                brain.dash_hit = true;
                out.player_hits.push(PlayerHit {
                    damage: DASH_DAMAGE,
                    knockback: direction_or(ctx.player_pos - *pos, brain.dash_dir) * DASH_KNOCKBACK,
                });
            }
        } else if brain.dash_cd <= 0.0 {
            brain.dash_cd = rng.random_range(4.0..6.0);
            brain.dash_windup = brain.dash_windup_time();
            brain.dash_dir = direction_or(ctx.player_pos - *pos, Vec2::X);
        }

        brain.rocket_cd -= dt;
        if brain.rocket_cd <= 0.0 {
            brain.rocket_cd = rng.random_range(5.0..7.0);
            let jitter = Vec2::new(
                rng.random_range(-ROCKET_JITTER..ROCKET_JITTER),
                rng.random_range(-ROCKET_JITTER..ROCKET_JITTER),
            );
            let telegraph = (brain.rocket_reaction() - ROCKET_FALL).max(0.0);
            out.strikes.push(RocketStrike::new(
                ctx.player_pos + jitter,
                telegraph,
                ROCKET_FALL,
                brain.rocket_radius(),
            ));
        }

        if brain.is_dashing() {
            return;
        }
    }

    let to_player = ctx.player_pos - *pos;
    if to_player.length_squared() > 1.0 {
        let desired = to_player.normalize() * *speed;
        *vel = vel.lerp(desired, exp_smoothing(TURN_RATE, dt));
    }
    *pos += *vel * dt;

    let dist = to_player.length();
    if brain.shoot_cd <= 0.0 && dist < SHOOT_RANGE {
        let visible = ctx.view.inflate(SHOOT_SCREEN_MARGIN).contains(*pos);
        if visible && dist > 1.0 && ctx.arena.has_line_of_sight(*pos, ctx.player_pos) {
            let base_dir = to_player / dist;
            let n = brain.volley_size();
            let bullet_speed = BULLET_SPEED + 90.0 * ctx.eased + if brain.enraged { 30.0 } else { 0.0 };
            let damage = (brain.bullet_damage as f32 + 2.0 * ctx.eased) as i32;
            for i in 0..n {
                let angle = if n <= 1 {
                    0.0
                } else {
                    lerp(-VOLLEY_SPREAD_DEG * 0.5, VOLLEY_SPREAD_DEG * 0.5, i as f32 / (n - 1) as f32)
                };
                let dir = rotate_deg(base_dir, angle);
                out.projectiles.push(Projectile::new(
                    *pos + dir * (*radius + 8.0),
                    dir * bullet_speed,
                    damage,
                    Side::Enemy,
                    BULLET_RADIUS,
                    BULLET_LIFE,
                ));
            }
        }
        brain.shoot_cd = brain.shoot_cd_base() + rng.random_range(-0.12..0.18);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::actor::Archetype;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const DT: f32 = 1.0 / 60.0;

    fn boss(tuning: &BossTuning, rng: &mut Pcg32) -> Actor {
        let brain = BossBrain::new(1, 10, tuning, rng);
        Actor::new(Archetype::Boss(Box::new(brain)), Vec2::new(1000.0, 1000.0), 1200.0, 72.0)
    }

    fn ctx(arena: &Arena, player_pos: Vec2) -> BossContext<'_> {
        BossContext {
            arena,
            player_pos,
            player_radius: 16.0,
            view: Rect::from_center(player_pos, Vec2::new(1100.0, 650.0)),
            eased: 0.0,
        }
    }

    fn brain(actor: &Actor) -> &BossBrain {
        actor.archetype.boss().unwrap()
    }

    fn brain_mut(actor: &mut Actor) -> &mut BossBrain {
        actor.archetype.boss_mut().unwrap()
    }

    #[test]
    fn test_enrage_applies_same_frame_and_never_retriggers() {
        let mut rng = Pcg32::seed_from_u64(1);
        let arena = Arena::open(3000.0, 3000.0);
        let mut b = boss(&BossTuning::default(), &mut rng);
        assert_eq!(brain(&b).dash_windup_time(), 1.3);

        b.hp = b.hp_max * 0.30;
        let mut out = BossOutput::default();
        update_boss(&mut b, &ctx(&arena, Vec2::new(1400.0, 1000.0)), DT, &mut rng, &mut out);
        assert!(out.enraged);
        assert_eq!(brain(&b).dash_windup_time(), 0.8);
        assert!((b.speed - 72.0 * 1.2).abs() < 1e-4);

        let mut out = BossOutput::default();
        update_boss(&mut b, &ctx(&arena, Vec2::new(1400.0, 1000.0)), DT, &mut rng, &mut out);
        assert!(!out.enraged);
        assert!(brain(&b).enraged);
    }

    #[test]
    fn test_airborne_boss_ignores_knockback_and_damage() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut b = boss(&BossTuning::default(), &mut rng);
        brain_mut(&mut b).slam_phase = SkySlamPhase::Hover;
        assert!(b.knockback_immune());
        assert!(!b.take_damage(50, Vec2::X, 500.0, None));
        assert_eq!(b.vel, Vec2::ZERO);
        assert_eq!(b.hp, 1200.0);

        let tuning = BossTuning {
            slam_damage_immune: false,
            ..Default::default()
        };
        let mut b = boss(&tuning, &mut rng);
        brain_mut(&mut b).slam_phase = SkySlamPhase::Takeoff;
        assert!(b.take_damage(50, Vec2::X, 500.0, None));
        assert_eq!(b.vel, Vec2::ZERO);
        assert_eq!(b.hp, 1150.0);
    }

    #[test]
    fn test_grounded_boss_takes_reduced_knockback() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut b = boss(&BossTuning::default(), &mut rng);
        b.take_damage(10, Vec2::X, 360.0, None);
        assert!((b.vel.x - 360.0 * 0.35 / 36.0).abs() < 1e-4);
    }

    #[test]
    fn test_slam_sequence_suspends_specials_and_lands_on_marker() {
        let mut rng = Pcg32::seed_from_u64(4);
        let arena = Arena::open(3000.0, 3000.0);
        let tuning = BossTuning {
            sky_slam: true,
            ..Default::default()
        };
        let mut b = boss(&tuning, &mut rng);
        b.hp = 100.0;
        brain_mut(&mut b).slam_cd = 0.0;
        brain_mut(&mut b).rocket_cd = 50.0;
        brain_mut(&mut b).dash_cd = 50.0;

        let player = Vec2::new(1200.0, 1000.0);
        let mut out = BossOutput::default();
        update_boss(&mut b, &ctx(&arena, player), DT, &mut rng, &mut out);
        assert_eq!(brain(&b).slam_phase, SkySlamPhase::Takeoff);
        assert_eq!(b.contact_damage, 0);

        let rocket_cd = brain(&b).rocket_cd;
        let dash_cd = brain(&b).dash_cd;
        let mut landed = None;
        for _ in 0..((SLAM_TAKEOFF + SLAM_HOVER) / DT) as usize + 5 {
            let mut out = BossOutput::default();
            update_boss(&mut b, &ctx(&arena, player), DT, &mut rng, &mut out);
            assert!(out.strikes.is_empty());
            if let Some(p) = out.slam_impact {
                landed = Some(p);
                assert_eq!(out.player_hits.len(), 1);
                assert_eq!(out.player_hits[0].damage, SLAM_DAMAGE);
                break;
            }
        }
        assert_eq!(landed, Some(player));
        assert_eq!(b.pos, player);
        assert_eq!(brain(&b).slam_phase, SkySlamPhase::Recovery);
        assert_eq!(brain(&b).rocket_cd, rocket_cd);
        assert_eq!(brain(&b).dash_cd, dash_cd);
        assert_eq!(b.contact_damage, 1);
    }

    #[test]
    fn test_slam_marker_lags_player() {
        let mut rng = Pcg32::seed_from_u64(5);
        let tuning = BossTuning::default();
        let mut br = BossBrain::new(1, 10, &tuning, &mut rng);
        // Player moves +1 x per 0.1 s frame
        for i in 0..20 {
            br.record_player(Vec2::new(i as f32, 0.0), 0.1);
        }
        // Newest entry aged at least 0.5 s was recorded 4 frames before the last
        let marker = br.delayed_target(Vec2::ZERO);
        assert!((marker.x - 15.0).abs() < 1.01);
        assert!(br.slam_buffer.iter().all(|(_, age)| *age <= SLAM_BUFFER_KEEP));
    }

    #[test]
    fn test_dash_hits_player_once() {
        let mut rng = Pcg32::seed_from_u64(6);
        let arena = Arena::open(3000.0, 3000.0);
        let mut b = boss(&BossTuning::default(), &mut rng);
        brain_mut(&mut b).dash_cd = 0.0;
        brain_mut(&mut b).rocket_cd = 50.0;
        let player = Vec2::new(1200.0, 1000.0);

        let mut hits = 0;
        for _ in 0..180 {
            let mut out = BossOutput::default();
            update_boss(&mut b, &ctx(&arena, player), DT, &mut rng, &mut out);
            hits += out
                .player_hits
                .iter()
                .filter(|h| h.damage == DASH_DAMAGE)
                .count();
            if !brain(&b).is_dashing() && hits > 0 {
                break;
            }
        }
        assert_eq!(hits, 1);
    }

    #[test]
    fn test_volley_spreads_and_grows_when_enraged() {
        let mut rng = Pcg32::seed_from_u64(7);
        let arena = Arena::open(3000.0, 3000.0);
        let tuning = BossTuning {
            attacks: false,
            ..Default::default()
        };
        let mut b = boss(&tuning, &mut rng);
        brain_mut(&mut b).shoot_cd = 0.0;
        let mut out = BossOutput::default();
        update_boss(&mut b, &ctx(&arena, Vec2::new(1300.0, 1000.0)), DT, &mut rng, &mut out);
        assert_eq!(out.projectiles.len(), 3);
        assert!(out.projectiles.iter().all(|p| p.side == Side::Enemy));

        b.hp = 10.0;
        brain_mut(&mut b).shoot_cd = 0.0;
        let mut out = BossOutput::default();
        update_boss(&mut b, &ctx(&arena, Vec2::new(1300.0, 1000.0)), DT, &mut rng, &mut out);
        assert_eq!(out.projectiles.len(), 4);
    }

    #[test]
    fn test_rocket_strike_phases() {
        let mut strike = RocketStrike::new(Vec2::ZERO, 0.7, 0.35, 90.0);
        assert_eq!(strike.tick(0.5), StrikeTick::Pending);
        assert_eq!(strike.tick(0.25), StrikeTick::Pending);
        assert_eq!(strike.phase, StrikePhase::Fall);
        assert_eq!(strike.tick(0.4), StrikeTick::Detonated);
        assert_eq!(strike.tick(0.1), StrikeTick::Pending);
        assert_eq!(strike.tick(0.2), StrikeTick::Expired);
        assert!(strike.covers(Vec2::new(60.0, 60.0)));
        assert!(!strike.covers(Vec2::new(80.0, 80.0)));
    }

    #[test]
    fn test_enraged_rocket_tuning() {
        let mut rng = Pcg32::seed_from_u64(8);
        let mut br = BossBrain::new(1, 10, &BossTuning::default(), &mut rng);
        assert!((br.rocket_reaction() - 1.05).abs() < 1e-5);
        br.check_enrage(10.0, 100.0);
        assert!((br.rocket_reaction() - 0.75).abs() < 1e-5);
        assert!((br.rocket_radius() - 153.0).abs() < 1e-3);
    }
}

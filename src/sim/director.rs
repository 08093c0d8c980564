//! Wave director: difficulty curve, spawn cadence and wave/boss scheduling
//!
//! Everything that scales with difficulty is derived from `eased_difficulty()`
//! on demand. The director stores only clocks and counters.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::actor::ArchetypeTag;
use super::arena::Arena;
use super::modifiers::{ModifierEngine, ModifierId};
use crate::consts::{POWERUP_SPAWN_MAX, POWERUP_SPAWN_MIN};
use crate::tuning::WaveTuning;
use crate::{gaussian, lerp, smoothstep, weighted_pick};

/// Spacing between spawns inside one burst
const BURST_GAP: f32 = 0.12;
/// Extra distance beyond the view edge for ring spawns
const SPAWN_RING_MARGIN: f32 = 260.0;
const SPAWN_INSET: f32 = 60.0;
const SPAWN_OBSTACLE_PAD: f32 = 40.0;
const SPAWN_RETRIES: u32 = 14;
/// Share of `spawn_uneven` spawns drawn around the bias angle
const BIAS_SHARE: f32 = 0.7;
const BIAS_SIGMA: f32 = 0.45;

const BOSS_SPAWN_DIST: f32 = 620.0;
const BOSS_SPAWN_INSET: f32 = 120.0;
const BOSS_OBSTACLE_PAD: f32 = 60.0;
const BOSS_SPAWN_RETRIES: u32 = 24;

/// Wave and difficulty state
#[derive(Debug, Clone)]
pub struct WaveDirector {
    pub tuning: WaveTuning,
    pub wave: u32,
    pub wave_timer: f32,
    pub survival_time: f32,
    pub spawn_timer: f32,
    /// Set while a boss is alive; normal spawning and the wave clock pause
    pub in_boss_fight: bool,
    pub boss_grace: f32,
    pub powerup_timer: f32,
}

impl WaveDirector {
    pub fn new<R: Rng + ?Sized>(tuning: WaveTuning, rng: &mut R) -> Self {
        let wave_timer = tuning.wave_time;
        Self {
            tuning,
            wave: 1,
            wave_timer,
            survival_time: 0.0,
            spawn_timer: 0.0,
            in_boss_fight: false,
            boss_grace: 0.0,
            powerup_timer: rng.random_range(POWERUP_SPAWN_MIN..POWERUP_SPAWN_MAX),
        }
    }

    /// Linear difficulty fraction in [0, 1]
    pub fn raw_difficulty(&self) -> f32 {
        (self.survival_time / self.tuning.ramp_time).clamp(0.0, 1.0)
    }

    pub fn eased_difficulty(&self) -> f32 {
        smoothstep(self.raw_difficulty())
    }

    /// Spawn interval before the per-wave bonus
    pub fn base_spawn_interval(&self) -> f32 {
        lerp(
            self.tuning.spawn_rate_base,
            self.tuning.spawn_rate_hard,
            self.eased_difficulty(),
        )
    }

    pub fn spawn_interval(&self) -> f32 {
        let bonus = self.tuning.spawn_rate_wave_bonus * self.wave.saturating_sub(1) as f32;
        (self.base_spawn_interval() - bonus).max(self.tuning.min_spawn_interval)
    }

    /// Maximum live non-boss enemies
    pub fn population_cap(&self) -> usize {
        lerp(
            self.tuning.enemy_cap_base,
            self.tuning.enemy_cap_hard,
            self.eased_difficulty(),
        )
        .round()
        .max(0.0) as usize
    }

    /// Spawn HP multiplier for normal enemies
    pub fn hp_multiplier(&self) -> f32 {
        lerp(
            self.tuning.hp_mult_base,
            self.tuning.hp_mult_hard,
            self.eased_difficulty(),
        )
    }

    /// Fraction of the current wave already elapsed
    pub fn wave_progress(&self) -> f32 {
        (1.0 - self.wave_timer / self.tuning.wave_time).clamp(0.0, 1.0)
    }

    pub fn can_spawn(&self) -> bool {
        !self.in_boss_fight && self.boss_grace <= 0.0
    }

    pub fn is_boss_wave(&self, wave: u32, overlord: bool) -> bool {
        wave % self.tuning.boss_every.max(1) == 0 || (overlord && wave % 3 == 0)
    }

    /// Boss stage for the current wave, at least 1
    pub fn boss_stage(&self) -> u32 {
        (self.wave / self.tuning.boss_every.max(1)).max(1)
    }

    /// Number of spawn attempts due this frame. Burst state lives on the
    /// modifier engine so a new modifier set resets it.
    pub fn spawn_attempts<R: Rng + ?Sized>(
        &mut self,
        dt: f32,
        modifiers: &mut ModifierEngine,
        rng: &mut R,
    ) -> u32 {
        let interval = self.spawn_interval();
        self.spawn_timer -= dt;
        modifiers.cluster_timer = (modifiers.cluster_timer - dt).max(0.0);

        let mut attempts = 0;
        if modifiers.is_active(ModifierId::SpawnBursts) {
            if modifiers.burst_remaining > 0 {
                modifiers.burst_timer -= dt;
                while modifiers.burst_remaining > 0 && modifiers.burst_timer <= 0.0 {
                    modifiers.burst_timer += BURST_GAP;
                    modifiers.burst_remaining -= 1;
                    attempts += 1;
                }
            }
            if self.spawn_timer <= 0.0 {
                self.spawn_timer = interval * rng.random_range(1.2..1.7);
                modifiers.burst_remaining = rng.random_range(3..=6);
                modifiers.burst_timer = 0.0;
            }
        } else if self.spawn_timer <= 0.0 {
            self.spawn_timer = interval;
            attempts = 1;
        }

        if self.can_spawn() { attempts } else { 0 }
    }

    /// Advance survival time, grace and the wave clock. The wave clock is
    /// frozen during a boss fight. Returns the new wave number on rollover.
    pub fn advance_clock(&mut self, dt: f32) -> Option<u32> {
        self.survival_time += dt;
        self.boss_grace = (self.boss_grace - dt).max(0.0);
        if self.in_boss_fight {
            return None;
        }
        self.wave_timer -= dt;
        if self.wave_timer > 0.0 {
            return None;
        }
        self.wave += 1;
        self.wave_timer = self.tuning.wave_time;
        log::info!(
            "Wave {} started (eased difficulty {:.2})",
            self.wave,
            self.eased_difficulty()
        );
        Some(self.wave)
    }

    /// True when a power-up spawn should be attempted; re-arms the timer
    pub fn powerup_due<R: Rng + ?Sized>(&mut self, dt: f32, rng: &mut R) -> bool {
        self.powerup_timer -= dt;
        if self.powerup_timer > 0.0 {
            return false;
        }
        self.powerup_timer = rng.random_range(POWERUP_SPAWN_MIN..POWERUP_SPAWN_MAX);
        true
    }

    /// Boss grace after a kill
    pub fn end_boss_fight(&mut self) {
        self.in_boss_fight = false;
        self.boss_grace = self.tuning.boss_grace;
    }
}

/// Spawn table for a wave. `knight_weight` comes from active modifiers.
pub fn enemy_weights(wave: u32, knight_weight: f32) -> Vec<(ArchetypeTag, f32)> {
    use ArchetypeTag::*;
    let mut weights = match wave {
        0..=1 => vec![(Chaser, 1.0)],
        2..=3 => vec![(Chaser, 0.8), (Sprinter, 0.2)],
        4..=6 => vec![(Chaser, 0.55), (Ranged, 0.25), (Sprinter, 0.2)],
        7..=10 => vec![(Chaser, 0.45), (Ranged, 0.27), (Tank, 0.14), (Sprinter, 0.14)],
        _ => vec![
            (Chaser, 0.38),
            (Ranged, 0.24),
            (Dasher, 0.16),
            (Tank, 0.12),
            (Sprinter, 0.10),
        ],
    };
    if knight_weight > 0.0 {
        weights.push((Knight, knight_weight));
    }
    weights
}

pub fn pick_enemy_kind<R: Rng + ?Sized>(wave: u32, knight_weight: f32, rng: &mut R) -> ArchetypeTag {
    weighted_pick(&enemy_weights(wave, knight_weight), rng).unwrap_or(ArchetypeTag::Chaser)
}

fn ring_point(center: Vec2, angle: f32, dist: f32, arena: &Arena, inset: f32) -> Vec2 {
    arena.clamp_inset(center + Vec2::from_angle(angle) * dist, inset)
}

/// Point on a ring just outside the view. `bias` is the `spawn_uneven` angle.
pub fn spawn_ring_point<R: Rng + ?Sized>(
    player_pos: Vec2,
    view_size: Vec2,
    arena: &Arena,
    bias: Option<f32>,
    rng: &mut R,
) -> Vec2 {
    let dist = view_size.x.max(view_size.y) * 0.65 + SPAWN_RING_MARGIN;
    let angle = match bias {
        Some(bias) if rng.random::<f32>() < BIAS_SHARE => gaussian(rng, bias, BIAS_SIGMA),
        _ => rng.random_range(0.0..TAU),
    };
    let mut pos = ring_point(player_pos, angle, dist, arena, SPAWN_INSET);
    for _ in 0..SPAWN_RETRIES {
        if !arena.point_blocked_inflated(pos, SPAWN_OBSTACLE_PAD) {
            break;
        }
        pos = ring_point(player_pos, rng.random_range(0.0..TAU), dist, arena, SPAWN_INSET);
    }
    pos
}

/// Uniform arena point at least `min_dist` from `avoid` and clear of
/// obstacles grown by `pad`
pub fn random_open_point<R: Rng + ?Sized>(
    arena: &Arena,
    avoid: Vec2,
    min_dist: f32,
    inset: f32,
    pad: f32,
    attempts: u32,
    rng: &mut R,
) -> Option<Vec2> {
    let area = arena.bounds.inflate(-inset);
    if area.width() <= 0.0 || area.height() <= 0.0 {
        return None;
    }
    (0..attempts).find_map(|_| {
        let p = Vec2::new(
            rng.random_range(area.min.x..=area.max.x),
            rng.random_range(area.min.y..=area.max.y),
        );
        let clear = p.distance_squared(avoid) >= min_dist * min_dist
            && !arena.point_blocked_inflated(p, pad);
        clear.then_some(p)
    })
}

/// Elite spawn point: anywhere in the arena away from the player
pub fn elite_point<R: Rng + ?Sized>(arena: &Arena, player_pos: Vec2, min_dist: f32, rng: &mut R) -> Vec2 {
    random_open_point(arena, player_pos, min_dist, SPAWN_INSET, SPAWN_OBSTACLE_PAD, 40, rng)
        .unwrap_or_else(|| arena.center())
}

/// `tight_clusters` placement around the shared anchor. Re-anchors when the
/// anchor timer has run out.
pub fn cluster_point<R: Rng + ?Sized>(
    modifiers: &mut ModifierEngine,
    fallback: Vec2,
    arena: &Arena,
    player_pos: Vec2,
    rng: &mut R,
) -> Vec2 {
    let anchor = match modifiers.cluster_anchor {
        Some(anchor) if modifiers.cluster_timer > 0.0 => anchor,
        _ => {
            modifiers.cluster_anchor = Some(fallback);
            modifiers.cluster_timer = rng.random_range(1.4..2.6);
            fallback
        }
    };
    let jitter = Vec2::new(rng.random_range(-85.0..85.0), rng.random_range(-85.0..85.0));
    let pos = arena.clamp_inset(anchor + jitter, SPAWN_INSET);
    if arena.point_blocked_inflated(pos, SPAWN_OBSTACLE_PAD) {
        elite_point(arena, player_pos, 120.0, rng)
    } else {
        pos
    }
}

/// Boss entry point: fixed distance from the player at a random angle
pub fn boss_spawn_point<R: Rng + ?Sized>(player_pos: Vec2, arena: &Arena, rng: &mut R) -> Vec2 {
    let mut pos = ring_point(
        player_pos,
        rng.random_range(0.0..TAU),
        BOSS_SPAWN_DIST,
        arena,
        BOSS_SPAWN_INSET,
    );
    for _ in 0..BOSS_SPAWN_RETRIES {
        if !arena.point_blocked_inflated(pos, BOSS_OBSTACLE_PAD) {
            break;
        }
        pos = ring_point(
            player_pos,
            rng.random_range(0.0..TAU),
            BOSS_SPAWN_DIST,
            arena,
            BOSS_SPAWN_INSET,
        );
    }
    pos
}

pub fn boss_hp(stage: u32, eased: f32) -> f32 {
    let base = ArchetypeTag::Boss.stats().base_hp;
    base * (1.0 + 0.85 * stage.saturating_sub(1) as f32) * (1.0 + 0.65 * eased)
}

pub fn boss_speed(eased: f32) -> f32 {
    ArchetypeTag::Boss.speed_at(eased)
}

pub fn boss_score(wave: u32) -> u32 {
    ArchetypeTag::Boss.stats().score + 25 * wave
}

/// Banked coin bonus for killing a boss of this stage
pub fn boss_bonus_coins(stage: u32) -> u32 {
    10 + 4 * stage.saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn director() -> WaveDirector {
        WaveDirector::new(WaveTuning::default(), &mut Pcg32::seed_from_u64(1))
    }

    #[test]
    fn test_full_ramp_reaches_hard_interval() {
        let mut d = director();
        d.tuning.ramp_time = 400.0;
        for _ in 0..400 {
            d.advance_clock(1.0);
        }
        assert!((d.eased_difficulty() - 1.0).abs() < 1e-6);
        assert!((d.base_spawn_interval() - d.tuning.spawn_rate_hard).abs() < 1e-6);
        assert_eq!(d.population_cap(), 20);
    }

    #[test]
    fn test_wave_bonus_floors_at_minimum() {
        let mut d = director();
        d.wave = 500;
        assert_eq!(d.spawn_interval(), d.tuning.min_spawn_interval);
        d.wave = 1;
        assert_eq!(d.spawn_interval(), d.tuning.spawn_rate_base);
    }

    #[test]
    fn test_wave_clock_rolls_into_boss_wave() {
        let mut d = director();
        d.wave = 9;
        d.wave_timer = 0.01;
        assert_eq!(d.advance_clock(0.02), Some(10));
        assert!(d.is_boss_wave(10, false));
        assert_eq!(d.wave_timer, d.tuning.wave_time);
    }

    #[test]
    fn test_wave_clock_frozen_in_boss_fight() {
        let mut d = director();
        d.in_boss_fight = true;
        d.wave_timer = 0.01;
        assert_eq!(d.advance_clock(1.0), None);
        assert_eq!(d.wave, 1);
        assert_eq!(d.survival_time, 1.0);
    }

    #[test]
    fn test_overlord_adds_boss_waves() {
        let d = director();
        assert!(!d.is_boss_wave(6, false));
        assert!(d.is_boss_wave(6, true));
        assert!(d.is_boss_wave(20, false));
    }

    #[test]
    fn test_grace_blocks_spawns() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut d = director();
        let mut mods = ModifierEngine::new(false);
        d.end_boss_fight();
        assert_eq!(d.spawn_attempts(0.1, &mut mods, &mut rng), 0);
        d.advance_clock(d.tuning.boss_grace);
        d.spawn_timer = 0.0;
        assert_eq!(d.spawn_attempts(0.1, &mut mods, &mut rng), 1);
    }

    #[test]
    fn test_burst_schedule() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut d = director();
        let mut mods = ModifierEngine::new(true);
        mods.force_set(&[ModifierId::SpawnBursts], 20, 3);
        // First expiry only arms the burst
        assert_eq!(d.spawn_attempts(0.01, &mut mods, &mut rng), 0);
        let queued = mods.burst_remaining;
        assert!((3..=6).contains(&queued));
        let mut total = 0;
        for _ in 0..200 {
            total += d.spawn_attempts(0.01, &mut mods, &mut rng);
            if mods.burst_remaining == 0 {
                break;
            }
        }
        assert_eq!(total, queued);
    }

    #[test]
    fn test_weights_gate_archetypes() {
        let early = enemy_weights(1, 0.0);
        assert_eq!(early, vec![(ArchetypeTag::Chaser, 1.0)]);
        assert!(enemy_weights(30, 0.0).iter().all(|(t, _)| *t != ArchetypeTag::Knight));
        assert!(enemy_weights(30, 0.26).contains(&(ArchetypeTag::Knight, 0.26)));
        let mut rng = Pcg32::seed_from_u64(4);
        for _ in 0..50 {
            assert_eq!(pick_enemy_kind(1, 0.0, &mut rng), ArchetypeTag::Chaser);
        }
    }

    #[test]
    fn test_ring_spawn_outside_view() {
        let arena = Arena::open(3000.0, 3000.0);
        let mut rng = Pcg32::seed_from_u64(5);
        let player = arena.center();
        for _ in 0..50 {
            let p = spawn_ring_point(player, Vec2::new(1100.0, 650.0), &arena, None, &mut rng);
            assert!((p.distance(player) - 975.0).abs() < 1.0);
        }
    }

    #[test]
    fn test_open_point_respects_distance() {
        let arena = Arena::open(3000.0, 3000.0);
        let mut rng = Pcg32::seed_from_u64(6);
        let player = Vec2::new(1500.0, 1500.0);
        for _ in 0..50 {
            let p = random_open_point(&arena, player, 260.0, 80.0, 0.0, 40, &mut rng).unwrap();
            assert!(p.distance(player) >= 260.0);
            assert!((80.0..=2920.0).contains(&p.x) && (80.0..=2920.0).contains(&p.y));
        }
    }

    #[test]
    fn test_boss_scaling() {
        assert_eq!(boss_hp(1, 0.0), 1200.0);
        assert!((boss_hp(2, 1.0) - 1200.0 * 1.85 * 1.65).abs() < 1e-2);
        assert_eq!(boss_score(10), 550);
        assert_eq!(boss_bonus_coins(3), 18);
        assert_eq!(boss_speed(0.0), 72.0);
    }

    proptest! {
        #[test]
        fn test_eased_difficulty_monotonic(a in 0.0f32..2000.0, b in 0.0f32..2000.0) {
            let mut d = director();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            d.survival_time = lo;
            let e_lo = d.eased_difficulty();
            d.survival_time = hi;
            let e_hi = d.eased_difficulty();
            prop_assert!(e_lo <= e_hi);
            prop_assert!((0.0..=1.0).contains(&e_lo) && (0.0..=1.0).contains(&e_hi));
        }
    }
}

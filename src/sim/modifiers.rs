//! Late-game modifier rotation
//!
//! From wave 20 on, a small weighted bundle of modifiers is active for a few
//! waves at a time. Consumers ask [`ModifierEngine::is_active`]; per-set state
//! such as the spawn bias angle is re-seeded whenever a new set is drawn.

use std::f32::consts::TAU;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::actor::{ActorStore, ArchetypeTag};
use crate::weighted_pick;

pub const EARLY_START_WAVE: u32 = 20;
pub const MID_START_WAVE: u32 = 25;
pub const LATE_START_WAVE: u32 = 35;
const CYCLE_WAVES_MIN: u32 = 2;
const CYCLE_WAVES_MAX: u32 = 3;
const LATE_STACK_MIN: usize = 2;
const LATE_STACK_MAX: usize = 3;

/// Every modifier the rotation can draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierId {
    EnemyAccel,
    SpawnUneven,
    KnightEnemy,
    ResistOverTime,
    TurningSpeed,
    SpawnBursts,
    EliteSpawn,
    TightClusters,
    DoubleRanged,
    KnightFrequent,
    EnemyDashes,
    DeathExplosions,
    CurvingShots,
    EnemyRegen,
    EliteFrenzy,
    OverlordWaves,
    ReviveOnce,
    SpeedRamp,
}

/// Modifier phase, keyed off wave number. Later phases include every
/// earlier tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierPhase {
    Early,
    Mid,
    Late,
}

impl ModifierPhase {
    pub fn from_wave(wave: u32) -> Option<Self> {
        match wave {
            w if w >= LATE_START_WAVE => Some(ModifierPhase::Late),
            w if w >= MID_START_WAVE => Some(ModifierPhase::Mid),
            w if w >= EARLY_START_WAVE => Some(ModifierPhase::Early),
            _ => None,
        }
    }

    /// Draw weight scale for a modifier of `tier` in this phase
    fn weight_for(self, tier: ModifierPhase) -> f32 {
        match (self, tier) {
            (ModifierPhase::Mid, ModifierPhase::Mid) => 1.25,
            (ModifierPhase::Late, ModifierPhase::Late) => 1.4,
            (ModifierPhase::Late, ModifierPhase::Mid) => 1.2,
            _ => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ModifierDef {
    pub id: ModifierId,
    pub name: &'static str,
    pub tier: ModifierPhase,
    pub weight: f32,
}

const fn def(id: ModifierId, name: &'static str, tier: ModifierPhase, weight: f32) -> ModifierDef {
    ModifierDef {
        id,
        name,
        tier,
        weight,
    }
}

pub const MODIFIERS: [ModifierDef; 18] = [
    def(ModifierId::EnemyAccel, "Adrenaline Rush", ModifierPhase::Early, 1.0),
    def(ModifierId::SpawnUneven, "Pressure Spikes", ModifierPhase::Early, 1.0),
    def(ModifierId::KnightEnemy, "Knight Arrival", ModifierPhase::Early, 0.9),
    def(ModifierId::ResistOverTime, "Adaptive Plating", ModifierPhase::Early, 0.95),
    def(ModifierId::TurningSpeed, "Rapid Turns", ModifierPhase::Early, 0.95),
    def(ModifierId::SpawnBursts, "Burst Spawns", ModifierPhase::Early, 0.9),
    def(ModifierId::EliteSpawn, "Elite Vanguard", ModifierPhase::Mid, 1.0),
    def(ModifierId::TightClusters, "Tight Clusters", ModifierPhase::Mid, 1.0),
    def(ModifierId::DoubleRanged, "Double Tap", ModifierPhase::Mid, 1.0),
    def(ModifierId::KnightFrequent, "Knight Legion", ModifierPhase::Mid, 0.9),
    def(ModifierId::EnemyDashes, "Blitz Steps", ModifierPhase::Mid, 1.0),
    def(ModifierId::DeathExplosions, "Volatile Remains", ModifierPhase::Late, 1.0),
    def(ModifierId::CurvingShots, "Homing Rounds", ModifierPhase::Late, 0.95),
    def(ModifierId::EnemyRegen, "Pack Mending", ModifierPhase::Late, 0.9),
    def(ModifierId::EliteFrenzy, "Elite Frenzy", ModifierPhase::Late, 1.0),
    def(ModifierId::OverlordWaves, "Overlord Waves", ModifierPhase::Late, 0.9),
    def(ModifierId::ReviveOnce, "Second Wind", ModifierPhase::Late, 0.95),
    def(ModifierId::SpeedRamp, "Speed Ramp", ModifierPhase::Late, 1.0),
];

impl ModifierId {
    pub fn def(self) -> &'static ModifierDef {
        // MODIFIERS is declared in enum order
        &MODIFIERS[self as usize]
    }
}

/// Active set plus per-set transient state
#[derive(Debug, Clone)]
pub struct ModifierEngine {
    pub enabled: bool,
    active: Vec<ModifierId>,
    last: Vec<ModifierId>,
    cycle_end_wave: u32,
    /// Preferred spawn direction under `spawn_uneven`
    pub spawn_bias_angle: f32,
    pub cluster_anchor: Option<glam::Vec2>,
    pub cluster_timer: f32,
    pub burst_remaining: u32,
    pub burst_timer: f32,
}

impl ModifierEngine {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            active: Vec::new(),
            last: Vec::new(),
            cycle_end_wave: 0,
            spawn_bias_angle: 0.0,
            cluster_anchor: None,
            cluster_timer: 0.0,
            burst_remaining: 0,
            burst_timer: 0.0,
        }
    }

    pub fn active(&self) -> &[ModifierId] {
        &self.active
    }

    pub fn is_active(&self, id: ModifierId) -> bool {
        self.active.contains(&id)
    }

    pub fn waves_remaining(&self, wave: u32) -> u32 {
        if self.active.is_empty() {
            0
        } else {
            self.cycle_end_wave.saturating_sub(wave)
        }
    }

    /// Re-roll if the current set expired. Returns the new set when one was
    /// drawn.
    pub fn advance<R: Rng + ?Sized>(&mut self, wave: u32, rng: &mut R) -> Option<Vec<ModifierId>> {
        let phase = if self.enabled {
            ModifierPhase::from_wave(wave)
        } else {
            None
        };
        let Some(phase) = phase else {
            self.active.clear();
            return None;
        };
        if !self.active.is_empty() && wave < self.cycle_end_wave {
            return None;
        }

        self.cycle_end_wave = wave + rng.random_range(CYCLE_WAVES_MIN..=CYCLE_WAVES_MAX);
        let picks = pick_set(phase, &self.last, rng);
        self.active = picks.clone();
        self.last = picks.clone();

        self.spawn_bias_angle = rng.random_range(0.0..TAU);
        self.cluster_anchor = None;
        self.cluster_timer = 0.0;
        self.burst_remaining = 0;
        self.burst_timer = 0.0;

        let names: Vec<&str> = picks.iter().map(|m| m.def().name).collect();
        log::info!(
            "Wave {wave}: modifiers {names:?} until wave {}",
            self.cycle_end_wave
        );
        Some(picks)
    }

    /// Install a fixed set for `waves` waves from `wave`, skipping the draw.
    /// Scripted encounters use this; the next expiry rolls normally.
    pub fn force_set(&mut self, ids: &[ModifierId], wave: u32, waves: u32) {
        self.active = ids.to_vec();
        self.last = ids.to_vec();
        self.cycle_end_wave = wave + waves.max(1);
        self.cluster_anchor = None;
        self.cluster_timer = 0.0;
        self.burst_remaining = 0;
        self.burst_timer = 0.0;
    }

    /// Steering rate scale for every enemy
    pub fn turn_mult(&self) -> f32 {
        if self.is_active(ModifierId::TurningSpeed) { 1.25 } else { 1.0 }
    }

    /// Speed scale for a non-boss enemy of the given age
    pub fn speed_mult(&self, age: f32, wave_progress: f32) -> f32 {
        let mut mult = 1.0;
        if self.is_active(ModifierId::EnemyAccel) {
            mult *= 1.0 + (age * 0.02).min(0.6);
        }
        if self.is_active(ModifierId::SpeedRamp) {
            mult *= 1.0 + 0.45 * wave_progress.clamp(0.0, 1.0);
        }
        mult
    }

    pub fn elite_chance(&self) -> f32 {
        if self.is_active(ModifierId::EliteFrenzy) {
            0.22
        } else if self.is_active(ModifierId::EliteSpawn) {
            0.12
        } else {
            0.0
        }
    }

    /// Extra weight for the knight entry in the spawn table
    pub fn knight_weight(&self) -> f32 {
        let mut w = 0.0;
        if self.is_active(ModifierId::KnightEnemy) {
            w += 0.08;
        }
        if self.is_active(ModifierId::KnightFrequent) {
            w += 0.18;
        }
        w
    }

    /// Apply the new set to enemies already on the field. Never touches an
    /// actor mid-dash: an already-armed extra dash keeps its timers.
    pub fn retrofit<R: Rng + ?Sized>(&self, actors: &mut ActorStore, rng: &mut R) {
        let dashes = self.is_active(ModifierId::EnemyDashes);
        let revive = self.is_active(ModifierId::ReviveOnce);
        for (_, actor) in actors.iter_mut() {
            let tag = actor.tag();
            if tag == ArchetypeTag::Boss {
                continue;
            }
            if dashes && tag != ArchetypeTag::Dasher && !actor.extra_dash.enabled {
                actor.extra_dash.enabled = true;
                actor.extra_dash.cooldown = rng.random_range(0.6..2.4);
            }
            if revive {
                actor.revives_remaining = actor.revives_remaining.max(1);
            }
        }
    }
}

/// Weighted draw without replacement, avoiding `avoid` unless that leaves
/// nothing to pick from
fn pick_set<R: Rng + ?Sized>(phase: ModifierPhase, avoid: &[ModifierId], rng: &mut R) -> Vec<ModifierId> {
    let count = if phase == ModifierPhase::Late {
        rng.random_range(LATE_STACK_MIN..=LATE_STACK_MAX)
    } else {
        1
    };
    let candidates: Vec<&ModifierDef> = MODIFIERS.iter().filter(|m| m.tier <= phase).collect();

    let mut chosen: Vec<ModifierId> = Vec::with_capacity(count);
    for _ in 0..count {
        let weighted = |skip_avoid: bool| -> Vec<(ModifierId, f32)> {
            candidates
                .iter()
                .filter(|m| !chosen.contains(&m.id))
                .filter(|m| !skip_avoid || !avoid.contains(&m.id))
                .map(|m| (m.id, m.weight * phase.weight_for(m.tier)))
                .collect()
        };
        let mut pool = weighted(true);
        if pool.is_empty() {
            pool = weighted(false);
        }
        match weighted_pick(&pool, rng) {
            Some(id) => chosen.push(id),
            None => break,
        }
    }
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::actor::{Actor, Archetype};
    use crate::sim::boss::BossBrain;
    use crate::tuning::BossTuning;
    use glam::Vec2;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_table_matches_enum_order() {
        for (i, m) in MODIFIERS.iter().enumerate() {
            assert_eq!(m.id as usize, i);
        }
    }

    #[test]
    fn test_phase_thresholds() {
        assert_eq!(ModifierPhase::from_wave(19), None);
        assert_eq!(ModifierPhase::from_wave(20), Some(ModifierPhase::Early));
        assert_eq!(ModifierPhase::from_wave(25), Some(ModifierPhase::Mid));
        assert_eq!(ModifierPhase::from_wave(35), Some(ModifierPhase::Late));
    }

    #[test]
    fn test_early_phase_draws_one_early_modifier() {
        let mut rng = Pcg32::seed_from_u64(1);
        for _ in 0..50 {
            let set = pick_set(ModifierPhase::Early, &[], &mut rng);
            assert_eq!(set.len(), 1);
            assert_eq!(set[0].def().tier, ModifierPhase::Early);
        }
    }

    #[test]
    fn test_late_phase_stacks_distinct() {
        let mut rng = Pcg32::seed_from_u64(2);
        for _ in 0..50 {
            let set = pick_set(ModifierPhase::Late, &[], &mut rng);
            assert!((2..=3).contains(&set.len()));
            let mut ids = set.clone();
            ids.sort_by_key(|m| *m as usize);
            ids.dedup();
            assert_eq!(ids.len(), set.len());
        }
    }

    #[test]
    fn test_avoid_falls_back_when_pool_empty() {
        let mut rng = Pcg32::seed_from_u64(3);
        let every_early: Vec<ModifierId> = MODIFIERS
            .iter()
            .filter(|m| m.tier == ModifierPhase::Early)
            .map(|m| m.id)
            .collect();
        let set = pick_set(ModifierPhase::Early, &every_early, &mut rng);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_rotation_avoids_repeating_previous_set() {
        let mut rng = Pcg32::seed_from_u64(4);
        let mut engine = ModifierEngine::new(true);
        let mut wave = 20;
        let mut prev = engine.advance(wave, &mut rng).unwrap();
        for _ in 0..30 {
            assert!(engine.advance(wave, &mut rng).is_none());
            wave += engine.waves_remaining(wave);
            let next = engine.advance(wave, &mut rng).unwrap();
            if wave < MID_START_WAVE {
                assert_ne!(next, prev);
            }
            prev = next;
            if wave > 60 {
                break;
            }
        }
    }

    #[test]
    fn test_cycle_length_and_countdown() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut engine = ModifierEngine::new(true);
        assert_eq!(engine.waves_remaining(20), 0);
        engine.advance(20, &mut rng);
        let left = engine.waves_remaining(20);
        assert!((2..=3).contains(&left));
        assert_eq!(engine.waves_remaining(21), left - 1);
    }

    #[test]
    fn test_disabled_or_early_waves_stay_empty() {
        let mut rng = Pcg32::seed_from_u64(6);
        let mut off = ModifierEngine::new(false);
        assert!(off.advance(40, &mut rng).is_none());
        assert!(off.active().is_empty());

        let mut on = ModifierEngine::new(true);
        assert!(on.advance(19, &mut rng).is_none());
        assert!(on.active().is_empty());
    }

    #[test]
    fn test_retrofit_revive_and_dash() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut actors = ActorStore::with_key();
        let chaser = actors.insert(Actor::new(Archetype::Chaser, Vec2::ZERO, 42.0, 140.0));
        let mid_dash = actors.insert(Actor::new(Archetype::Tank, Vec2::ZERO, 125.0, 75.0));
        let dasher = actors.insert(Actor::new(
            Archetype::Dasher {
                dash_cd: 2.0,
                lunge: 0.0,
            },
            Vec2::ZERO,
            72.0,
            115.0,
        ));
        let brain = BossBrain::new(1, 10, &BossTuning::default(), &mut rng);
        let boss = actors.insert(Actor::new(Archetype::Boss(Box::new(brain)), Vec2::ZERO, 1200.0, 72.0));

        actors[mid_dash].extra_dash.enabled = true;
        actors[mid_dash].extra_dash.timer = 0.05;
        actors[mid_dash].extra_dash.cooldown = 3.3;

        let mut engine = ModifierEngine::new(true);
        engine.active = vec![ModifierId::EnemyDashes, ModifierId::ReviveOnce];
        engine.retrofit(&mut actors, &mut rng);

        assert!(actors[chaser].extra_dash.enabled);
        assert!((0.6..2.4).contains(&actors[chaser].extra_dash.cooldown));
        assert_eq!(actors[chaser].revives_remaining, 1);
        // In-progress dash untouched
        assert_eq!(actors[mid_dash].extra_dash.timer, 0.05);
        assert_eq!(actors[mid_dash].extra_dash.cooldown, 3.3);
        assert!(!actors[dasher].extra_dash.enabled);
        assert_eq!(actors[boss].revives_remaining, 0);
    }

    #[test]
    fn test_speed_mult_caps() {
        let mut engine = ModifierEngine::new(true);
        engine.active = vec![ModifierId::EnemyAccel, ModifierId::SpeedRamp];
        let m = engine.speed_mult(1000.0, 1.0);
        assert!((m - 1.6 * 1.45).abs() < 1e-5);
    }
}

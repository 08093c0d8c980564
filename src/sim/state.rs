//! Simulation state, events and snapshots
//!
//! Everything a run needs lives in one [`SimulationState`], advanced by
//! [`super::tick::advance`]. Collaborators read a [`Snapshot`] and drain
//! [`GameEvent`]s after each frame.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use super::actor::{Actor, ActorId, ActorStore, Archetype, ArchetypeTag};
use super::arena::{Arena, Rect};
use super::boss::{BossBrain, PlayerHit, RocketStrike, SkySlamPhase};
use super::combat::{PendingBlast, Projectile, Side};
use super::director::{
    WaveDirector, boss_hp, boss_score, boss_spawn_point, boss_speed, cluster_point, elite_point,
    spawn_ring_point,
};
use super::grid::SpatialGrid;
use super::modifiers::{MID_START_WAVE, ModifierEngine, ModifierId};
use super::pickup::{Pickup, PickupKind, PowerUp};
use super::player::{Player, Upgrade};
use crate::consts::*;
use crate::tuning::{ObjectiveConfig, Tuning};
use crate::weapons::WeaponTable;

/// Post-hit grace for the objective
const OBJECTIVE_IFRAMES: f32 = 0.55;
/// Elites avoid spawning this close to the player
const ELITE_MIN_PLAYER_DIST: f32 = 240.0;

/// Run phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Playing,
    GameOver,
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    PlayerDestroyed,
    ObjectiveDestroyed,
}

/// Defended beacon for objective encounters
#[derive(Debug, Clone, Serialize)]
pub struct Objective {
    pub pos: Vec2,
    pub radius: f32,
    pub hp: i32,
    pub hp_max: i32,
    pub iframes: f32,
}

impl Objective {
    pub fn from_config(config: &ObjectiveConfig) -> Self {
        let hp = config.hp.max(1);
        Self {
            pos: config.pos,
            radius: config.radius,
            hp,
            hp_max: hp,
            iframes: 0.0,
        }
    }

    pub fn is_standing(&self) -> bool {
        self.hp > 0
    }

    /// Returns the damage dealt, or `None` during grace or once destroyed
    pub fn take_hit(&mut self, amount: i32) -> Option<i32> {
        if !self.is_standing() || self.iframes > 0.0 {
            return None;
        }
        let dealt = amount.max(1);
        self.hp = (self.hp - dealt).max(0);
        self.iframes = OBJECTIVE_IFRAMES;
        Some(dealt)
    }

    pub fn tick(&mut self, dt: f32) {
        self.iframes = (self.iframes - dt).max(0.0);
    }
}

/// Discrete things that happened during a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    WaveStarted {
        wave: u32,
    },
    EnemySpawned {
        id: ActorId,
        archetype: ArchetypeTag,
        pos: Vec2,
        elite: bool,
    },
    ActorDied {
        id: ActorId,
        archetype: ArchetypeTag,
        pos: Vec2,
        score: u32,
        weapon: Option<String>,
        elite: bool,
    },
    EnemyRevived {
        id: ActorId,
        pos: Vec2,
    },
    BossSpawned {
        id: ActorId,
        pos: Vec2,
        stage: u32,
        hp: f32,
    },
    BossEnraged {
        id: ActorId,
    },
    BossKilled {
        pos: Vec2,
        score: u32,
        bonus_coins: u32,
    },
    PickupDropped {
        pos: Vec2,
        kind: PickupKind,
    },
    PickupCollected {
        kind: PickupKind,
    },
    PlayerDamaged {
        amount: i32,
        hp: i32,
    },
    ObjectiveDamaged {
        amount: i32,
        hp: i32,
    },
    DamageNumber {
        pos: Vec2,
        amount: i32,
        crit: bool,
    },
    HitSpark {
        pos: Vec2,
    },
    Explosion {
        pos: Vec2,
        radius: f32,
    },
    ModifiersChanged {
        active: Vec<ModifierId>,
        waves: u32,
    },
    LevelUpAvailable {
        level: u32,
        choices: Vec<Upgrade>,
    },
    RunEnded {
        reason: EndReason,
        wave: u32,
        score: u64,
        survival_time: f32,
        kills: u32,
        bonus_coins: u32,
    },
}

/// Read-only actor view
#[derive(Debug, Clone, Serialize)]
pub struct ActorView {
    pub id: ActorId,
    pub archetype: ArchetypeTag,
    pub pos: Vec2,
    pub radius: f32,
    pub hp: f32,
    pub hp_max: f32,
    pub hit_flash: f32,
    pub elite: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectileView {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub side: Side,
}

#[derive(Debug, Clone, Serialize)]
pub struct BossView {
    pub id: ActorId,
    pub hp_fraction: f32,
    pub enraged: bool,
    pub slam_phase: SkySlamPhase,
    /// Render scale while airborne
    pub scale: f32,
    /// Delayed landing marker while hovering
    pub slam_marker: Option<Vec2>,
    pub dash_windup: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    pub pos: Vec2,
    pub aim_dir: Vec2,
    pub hp: i32,
    pub max_hp: i32,
    pub level: u32,
    pub xp: u32,
    pub xp_to_next: u32,
    pub score: u64,
    pub dashing: bool,
    pub invulnerable: bool,
    pub weapon: String,
}

/// Everything a renderer or UI may read after a frame
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub frame: u64,
    pub phase: RunPhase,
    pub wave: u32,
    pub survival_time: f32,
    pub eased_difficulty: f32,
    pub player: PlayerView,
    pub actors: Vec<ActorView>,
    pub projectiles: Vec<ProjectileView>,
    pub pickups: Vec<Pickup>,
    pub rocket_strikes: Vec<RocketStrike>,
    pub boss: Option<BossView>,
    pub modifiers: Vec<ModifierId>,
    pub modifier_waves_remaining: u32,
    pub objective: Option<Objective>,
    pub run_bonus_coins: u32,
}

/// Complete run state
pub struct SimulationState {
    pub seed: u64,
    pub rng: Pcg32,
    pub tuning: Tuning,
    pub weapons: WeaponTable,
    pub arena: Arena,
    pub grid: SpatialGrid,
    pub player: Player,
    pub actors: ActorStore,
    pub projectiles: Vec<Projectile>,
    pub pickups: Vec<Pickup>,
    pub director: WaveDirector,
    pub modifiers: ModifierEngine,
    pub rocket_strikes: Vec<RocketStrike>,
    pub pending_blasts: Vec<PendingBlast>,
    /// Boss hits queued during movement, applied in combat
    pub pending_player_hits: Vec<PlayerHit>,
    pub objective: Option<Objective>,
    pub run_bonus_coins: u32,
    pub kills: u32,
    pub phase: RunPhase,
    pub frame: u64,
    pub(crate) events: Vec<GameEvent>,
}

impl SimulationState {
    /// Start a run. The player spawns at the arena center.
    pub fn new(seed: u64, tuning: Tuning, arena: Arena, weapons: WeaponTable) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let weapon = weapons.resolve(&tuning.starting_weapon);
        let player = Player::new(arena.center(), weapon, tuning.meta);
        let director = WaveDirector::new(tuning.wave.clone(), &mut rng);
        let objective = tuning.objective.as_ref().map(Objective::from_config);

        log::info!(
            "Run started: seed={seed} weapon={} obstacles={}",
            player.weapon.id,
            arena.obstacles.len()
        );

        Self {
            seed,
            rng,
            grid: SpatialGrid::new(tuning.separation.cell_size),
            modifiers: ModifierEngine::new(tuning.modifiers_enabled),
            tuning,
            weapons,
            arena,
            player,
            actors: ActorStore::with_key(),
            projectiles: Vec::new(),
            pickups: Vec::new(),
            director,
            rocket_strikes: Vec::new(),
            pending_blasts: Vec::new(),
            pending_player_hits: Vec::new(),
            objective,
            run_bonus_coins: 0,
            kills: 0,
            phase: RunPhase::Playing,
            frame: 0,
            events: Vec::new(),
        }
    }

    /// Start a run on a freshly generated arena of the default size
    pub fn with_generated_arena(seed: u64, tuning: Tuning, weapons: WeaponTable) -> Self {
        let mut arena_rng = Pcg32::seed_from_u64(seed ^ 0x5EED_A7E7A);
        let arena = Arena::generate(&mut arena_rng, ARENA_W, ARENA_H);
        Self::new(seed, tuning, arena, weapons)
    }

    pub fn is_over(&self) -> bool {
        self.phase == RunPhase::GameOver
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Take every event queued since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Visible window centered on the player
    pub fn view_rect(&self) -> Rect {
        Rect::from_center(self.player.pos, self.tuning.view_size)
    }

    /// Where normal enemies head: the objective while it stands, else the player
    pub fn enemy_target(&self) -> Vec2 {
        match &self.objective {
            Some(obj) if obj.is_standing() => obj.pos,
            _ => self.player.pos,
        }
    }

    /// Live non-boss enemies
    pub fn enemy_count(&self) -> usize {
        self.actors.values().filter(|a| !a.is_boss()).count()
    }

    pub fn boss_id(&self) -> Option<ActorId> {
        self.actors
            .iter()
            .find(|(_, a)| a.is_boss())
            .map(|(id, _)| id)
    }

    /// Spawn a normal enemy using ring, elite or cluster placement
    pub fn spawn_enemy(&mut self, tag: ArchetypeTag) -> ActorId {
        if tag == ArchetypeTag::Boss {
            return self.spawn_boss();
        }
        let player_pos = self.player.pos;
        let bias = self
            .modifiers
            .is_active(ModifierId::SpawnUneven)
            .then_some(self.modifiers.spawn_bias_angle);
        let ring = spawn_ring_point(
            player_pos,
            self.tuning.view_size,
            &self.arena,
            bias,
            &mut self.rng,
        );

        let elite_chance = self.modifiers.elite_chance();
        let elite = self.director.wave >= MID_START_WAVE
            && elite_chance > 0.0
            && self.rng.random::<f32>() < elite_chance;
        let pos = if elite {
            elite_point(&self.arena, player_pos, ELITE_MIN_PLAYER_DIST, &mut self.rng)
        } else if self.modifiers.is_active(ModifierId::TightClusters) {
            cluster_point(
                &mut self.modifiers,
                ring,
                &self.arena,
                player_pos,
                &mut self.rng,
            )
        } else {
            ring
        };

        let id = self.insert_enemy(tag, pos);
        if elite {
            if let Some(actor) = self.actors.get_mut(id) {
                actor.make_elite();
            }
        }
        self.push_event(GameEvent::EnemySpawned {
            id,
            archetype: tag,
            pos,
            elite,
        });
        log::debug!("Spawned {} at {pos:?}{}", tag.as_str(), if elite { " (elite)" } else { "" });
        id
    }

    /// Place a normal enemy exactly at `pos` with difficulty-scaled stats
    pub fn spawn_enemy_at(&mut self, tag: ArchetypeTag, pos: Vec2) -> ActorId {
        let id = self.insert_enemy(tag, pos);
        self.push_event(GameEvent::EnemySpawned {
            id,
            archetype: tag,
            pos,
            elite: false,
        });
        id
    }

    fn insert_enemy(&mut self, tag: ArchetypeTag, pos: Vec2) -> ActorId {
        let eased = self.director.eased_difficulty();
        let hp = tag.stats().base_hp * self.director.hp_multiplier();
        let archetype = Archetype::spawn(tag, &mut self.rng);
        let mut actor = Actor::new(archetype, pos, hp, tag.speed_at(eased));

        if self.modifiers.is_active(ModifierId::ReviveOnce) {
            actor.revives_remaining = 1;
        }
        if self.modifiers.is_active(ModifierId::EnemyDashes) && tag != ArchetypeTag::Dasher {
            actor.extra_dash.enabled = true;
            actor.extra_dash.cooldown = self.rng.random_range(1.8..3.2);
        }
        self.actors.insert(actor)
    }

    /// Clear the field and bring in the boss for the current wave
    pub fn spawn_boss(&mut self) -> ActorId {
        self.actors.clear();
        self.projectiles.retain(|p| p.side == Side::Player);

        let wave = self.director.wave;
        let stage = self.director.boss_stage();
        let eased = self.director.eased_difficulty();
        let pos = boss_spawn_point(self.player.pos, &self.arena, &mut self.rng);
        let brain = BossBrain::new(stage, wave, &self.tuning.boss, &mut self.rng);
        let hp = boss_hp(stage, eased);
        let mut boss = Actor::new(Archetype::Boss(Box::new(brain)), pos, hp, boss_speed(eased));
        boss.score_value = boss_score(wave);

        let id = self.actors.insert(boss);
        self.director.in_boss_fight = true;
        log::info!("Boss spawned: wave={wave} stage={stage} hp={hp:.0}");
        self.push_event(GameEvent::BossSpawned { id, pos, stage, hp });
        id
    }

    /// Drop a pickup and announce it
    pub fn drop_pickup(&mut self, pos: Vec2, kind: PickupKind) {
        self.pickups.push(Pickup::new(pos, kind));
        self.push_event(GameEvent::PickupDropped { pos, kind });
    }

    /// Try to place a random power-up away from the player
    pub fn spawn_powerup(&mut self) -> bool {
        let on_map = self.pickups.iter().filter(|p| p.is_power()).count();
        if on_map >= POWERUP_MAX_ON_MAP {
            return false;
        }
        let spot = super::director::random_open_point(
            &self.arena,
            self.player.pos,
            260.0,
            80.0,
            0.0,
            40,
            &mut self.rng,
        );
        let Some(pos) = spot else {
            return false;
        };
        let power = PowerUp::random(&mut self.rng);
        self.drop_pickup(pos, PickupKind::Power { power });
        true
    }

    /// Apply an upgrade chosen from a `LevelUpAvailable` event
    pub fn apply_upgrade(&mut self, upgrade: Upgrade) {
        log::debug!("Upgrade chosen: {upgrade:?}");
        self.player.apply_upgrade(upgrade);
    }

    pub fn snapshot(&self) -> Snapshot {
        let actors = self
            .actors
            .iter()
            .map(|(id, a)| ActorView {
                id,
                archetype: a.tag(),
                pos: a.pos,
                radius: a.radius,
                hp: a.hp,
                hp_max: a.hp_max,
                hit_flash: a.hit_flash,
                elite: a.elite,
            })
            .collect();

        let boss = self.actors.iter().find_map(|(id, a)| {
            let brain = a.archetype.boss()?;
            Some(BossView {
                id,
                hp_fraction: if a.hp_max > 0.0 { a.hp / a.hp_max } else { 0.0 },
                enraged: brain.enraged,
                slam_phase: brain.slam_phase,
                scale: brain.slam_scale,
                slam_marker: (brain.slam_phase == SkySlamPhase::Hover).then_some(brain.slam_marker),
                dash_windup: brain.dash_windup > 0.0,
            })
        });

        let p = &self.player;
        Snapshot {
            frame: self.frame,
            phase: self.phase,
            wave: self.director.wave,
            survival_time: self.director.survival_time,
            eased_difficulty: self.director.eased_difficulty(),
            player: PlayerView {
                pos: p.pos,
                aim_dir: p.aim_dir,
                hp: p.hp,
                max_hp: p.max_hp,
                level: p.level,
                xp: p.xp,
                xp_to_next: p.xp_to_next,
                score: p.score,
                dashing: p.is_dashing(),
                invulnerable: p.invulnerable(),
                weapon: p.weapon.id.clone(),
            },
            actors,
            projectiles: self
                .projectiles
                .iter()
                .map(|pr| ProjectileView {
                    pos: pr.pos,
                    vel: pr.vel,
                    radius: pr.radius,
                    side: pr.side,
                })
                .collect(),
            pickups: self.pickups.clone(),
            rocket_strikes: self.rocket_strikes.clone(),
            boss,
            modifiers: self.modifiers.active().to_vec(),
            modifier_waves_remaining: self.modifiers.waves_remaining(self.director.wave),
            objective: self.objective.clone(),
            run_bonus_coins: self.run_bonus_coins,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SimulationState {
        SimulationState::new(
            7,
            Tuning::default(),
            Arena::open(ARENA_W, ARENA_H),
            WeaponTable::builtin(),
        )
    }

    #[test]
    fn test_new_run_defaults() {
        let s = state();
        assert_eq!(s.player.pos, Vec2::new(1500.0, 1500.0));
        assert_eq!(s.player.weapon.id, "pistol");
        assert_eq!(s.director.wave, 1);
        assert!(s.actors.is_empty());
        assert_eq!(s.phase, RunPhase::Playing);
    }

    #[test]
    fn test_spawn_scales_with_difficulty() {
        let mut s = state();
        s.director.survival_time = s.tuning.wave.ramp_time;
        let id = s.spawn_enemy(ArchetypeTag::Chaser);
        let a = &s.actors[id];
        assert!((a.hp - 42.0 * 1.3).abs() < 1e-3);
        assert_eq!(a.speed, 300.0);
        assert!(matches!(s.events()[0], GameEvent::EnemySpawned { .. }));
    }

    #[test]
    fn test_spawn_applies_active_modifiers() {
        let mut s = state();
        s.modifiers
            .force_set(&[ModifierId::ReviveOnce, ModifierId::EnemyDashes], 1, 2);
        let chaser = s.spawn_enemy(ArchetypeTag::Chaser);
        let dasher = s.spawn_enemy(ArchetypeTag::Dasher);
        assert_eq!(s.actors[chaser].revives_remaining, 1);
        assert!(s.actors[chaser].extra_dash.enabled);
        assert!(!s.actors[dasher].extra_dash.enabled);
    }

    #[test]
    fn test_elites_need_mid_waves() {
        let mut s = state();
        s.modifiers.force_set(&[ModifierId::EliteFrenzy], 1, 2);
        for _ in 0..40 {
            s.spawn_enemy(ArchetypeTag::Chaser);
        }
        assert!(s.actors.values().all(|a| !a.elite));

        s.director.wave = 30;
        for _ in 0..200 {
            s.spawn_enemy(ArchetypeTag::Chaser);
        }
        let elites: Vec<&Actor> = s.actors.values().filter(|a| a.elite).collect();
        assert!(!elites.is_empty());
        assert!(elites.iter().all(|a| a.pos.distance(s.player.pos) >= 240.0));
    }

    #[test]
    fn test_boss_spawn_clears_field() {
        let mut s = state();
        s.director.wave = 10;
        s.spawn_enemy(ArchetypeTag::Chaser);
        s.spawn_enemy(ArchetypeTag::Tank);
        s.projectiles.push(Projectile::new(Vec2::ZERO, Vec2::X, 1, Side::Enemy, 4.0, 1.0));
        s.projectiles.push(Projectile::new(Vec2::ZERO, Vec2::X, 1, Side::Player, 4.0, 1.0));

        let id = s.spawn_boss();
        assert_eq!(s.actors.len(), 1);
        assert!(s.actors[id].is_boss());
        assert_eq!(s.actors[id].score_value, 550);
        assert_eq!(s.projectiles.len(), 1);
        assert_eq!(s.projectiles[0].side, Side::Player);
        assert!(s.director.in_boss_fight);
        assert!((s.actors[id].pos.distance(s.player.pos) - 620.0).abs() < 1.0);
        assert_eq!(s.boss_id(), Some(id));
    }

    #[test]
    fn test_objective_grace_and_targeting() {
        let mut tuning = Tuning::default();
        tuning.objective = Some(ObjectiveConfig {
            pos: Vec2::new(900.0, 900.0),
            radius: 40.0,
            hp: 3,
        });
        let mut s = SimulationState::new(1, tuning, Arena::open(ARENA_W, ARENA_H), WeaponTable::builtin());
        assert_eq!(s.enemy_target(), Vec2::new(900.0, 900.0));

        let obj = s.objective.as_mut().unwrap();
        assert_eq!(obj.take_hit(2), Some(2));
        assert_eq!(obj.take_hit(2), None);
        obj.tick(1.0);
        assert_eq!(obj.take_hit(2), Some(2));
        assert!(!obj.is_standing());
        assert_eq!(s.enemy_target(), s.player.pos);
    }

    #[test]
    fn test_powerup_spawn_limit() {
        let mut s = state();
        assert!(s.spawn_powerup());
        assert!(s.spawn_powerup());
        assert!(!s.spawn_powerup());
        assert!(s
            .pickups
            .iter()
            .all(|p| p.pos.distance(s.player.pos) >= 260.0));
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut s = state();
        s.spawn_enemy(ArchetypeTag::Ranged);
        s.director.wave = 10;
        s.spawn_boss();
        let snap = s.snapshot();
        assert_eq!(snap.actors.len(), 1);
        assert!(snap.boss.as_ref().is_some_and(|b| b.hp_fraction == 1.0));
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"wave\":10"));

        let events = s.drain_events();
        let json = serde_json::to_string(&events).unwrap();
        assert!(json.contains("\"type\":\"boss_spawned\""));
        assert!(s.events().is_empty());
    }
}

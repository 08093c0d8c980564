//! Combat simulation module
//!
//! All gameplay logic lives here:
//! - Variable timestep, clamped to `Tuning::max_frame_dt`
//! - One owned, seeded RNG per run
//! - Six ordered stages per frame (see [`tick::PIPELINE`])
//! - No rendering, audio or persistence dependencies

pub mod actor;
pub mod ai;
pub mod arena;
pub mod boss;
pub mod collision;
pub mod combat;
pub mod director;
pub mod grid;
pub mod modifiers;
pub mod pickup;
pub mod player;
pub mod state;
pub mod tick;

pub use actor::{Actor, ActorId, ActorStore, Archetype, ArchetypeTag};
pub use arena::{Arena, Rect};
pub use boss::{BossBrain, RocketStrike, SkySlamPhase};
pub use combat::{Projectile, Side};
pub use director::WaveDirector;
pub use modifiers::{ModifierEngine, ModifierId, ModifierPhase};
pub use pickup::{Pickup, PickupKind, PowerUp};
pub use player::{Player, Upgrade};
pub use state::{EndReason, GameEvent, Objective, RunPhase, SimulationState, Snapshot};
pub use tick::{InputFrame, PIPELINE, Stage, advance, run_stage};

//! Tank Arena headless runner
//!
//! Plays a seeded run on autopilot and logs what happened.
//! Usage: `tank-arena [tuning.json] [seed]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use tank_arena::sim::{GameEvent, InputFrame, SimulationState, advance};
    use tank_arena::{Tuning, WeaponTable};

    env_logger::init();

    let mut args = std::env::args().skip(1);
    let tuning = match args.next() {
        Some(path) => match Tuning::load(&path) {
            Ok(tuning) => tuning,
            Err(e) => {
                log::error!("Failed to load tuning from {path}: {e}");
                std::process::exit(1);
            }
        },
        None => Tuning::default(),
    };
    let seed = args
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0x7A4C);

    const DT: f32 = 1.0 / 60.0;
    const MAX_FRAMES: u32 = 60 * 60 * 10;

    let mut state = SimulationState::with_generated_arena(seed, tuning, WeaponTable::builtin());
    let input = InputFrame {
        idle_mode: true,
        ..InputFrame::default()
    };

    let mut bosses = 0;
    for _ in 0..MAX_FRAMES {
        advance(&mut state, &input, DT);
        for event in state.drain_events() {
            match &event {
                GameEvent::LevelUpAvailable { choices, .. } => {
                    if let Some(&choice) = choices.first() {
                        state.apply_upgrade(choice);
                    }
                }
                GameEvent::BossKilled { .. } => bosses += 1,
                _ => {}
            }
            log::debug!("{event:?}");
        }
        if state.is_over() {
            break;
        }
    }

    let snap = state.snapshot();
    log::info!(
        "Summary: wave={} time={:.1}s score={} kills={} bosses={} level={} coins={}",
        snap.wave,
        snap.survival_time,
        snap.player.score,
        state.kills,
        bosses,
        snap.player.level,
        snap.run_bonus_coins
    );
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Library-only on wasm; the host drives `advance` directly
}

//! Ghost Runner entry point
//!
//! Headless driver: runs a scripted session against the simulation and logs
//! what both lanes do. Usage: `ghost-runner [tuning.json] [seconds]`

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use ghost_runner::Tuning;
use ghost_runner::sim::{GameEvent, GamePhase, GameState, Side, TickInput, advance, start_run};

/// Frame time of the simulated display
const FRAME_DT: f32 = 1.0 / 60.0;

/// Scripted player: a random trigger roughly every half second
struct Bot {
    rng: Pcg32,
    cooldown: f32,
}

impl Bot {
    fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed ^ 0xb07),
            cooldown: 0.5,
        }
    }

    fn input(&mut self, dt: f32) -> TickInput {
        self.cooldown -= dt;
        if self.cooldown > 0.0 {
            return TickInput::default();
        }
        self.cooldown = self.rng.random_range(0.3..0.8);
        match self.rng.random_range(0..3) {
            0 => TickInput {
                lane_left: true,
                ..Default::default()
            },
            1 => TickInput {
                lane_right: true,
                ..Default::default()
            },
            _ => TickInput {
                jump: true,
                ..Default::default()
            },
        }
    }
}

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::OrbCollected { side, id, pos } => {
            log::debug!("[{}] orb {} collected at z={:.1}", side.as_str(), id, pos.z)
        }
        GameEvent::ObstacleHit { side, id, pos } => {
            log::debug!("[{}] obstacle {} hit at z={:.1}", side.as_str(), id, pos.z)
        }
        GameEvent::LivesChanged(lives) => log::info!("Lives: {}", lives),
        GameEvent::ScoreChanged(score) => log::info!("Score: {}", score),
        GameEvent::GameOver { score } => log::info!("Game over with score {}", score),
        other => log::trace!("{:?}", other),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let tuning = match args.next() {
        Some(path) => Tuning::load(path),
        None => Tuning::default(),
    };
    let seconds: f32 = args
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(60.0);

    let mut bot = Bot::new(tuning.seed);
    let mut state = GameState::new(tuning);
    start_run(&mut state);

    let frames = (seconds / FRAME_DT) as u32;
    for _ in 0..frames {
        let input = bot.input(FRAME_DT);
        advance(&mut state, &input, FRAME_DT);
        for event in state.drain_events() {
            log_event(&event);
        }
        if state.phase == GamePhase::GameOver {
            break;
        }
    }

    let stats = &state.stats;
    log::info!(
        "Finished after {:.1}s: score {}, lives {}, distance {:.0}",
        state.time,
        stats.score,
        stats.lives,
        stats.distance
    );
    log::info!(
        "Active entities: primary {}, mirror {} ({} mirror links, {} snapshots pending)",
        state.pool.active_on_side(Side::Primary).len(),
        state.pool.active_on_side(Side::Mirror).len(),
        state.replication.registry().len(),
        state.replication.pending_states()
    );
}

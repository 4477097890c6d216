//! Arcane Survivors - headless native driver
//!
//! Runs the simulation at a fixed host frame rate with the autopilot
//! steering, picks upgrades as they are offered and logs a running summary.

#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;
#[cfg(not(target_arch = "wasm32"))]
use std::process::ExitCode;
#[cfg(not(target_arch = "wasm32"))]
use std::sync::Arc;

#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;

#[cfg(not(target_arch = "wasm32"))]
use arcane_survivors::{
    Session, Settings,
    renderer::{Frame, Renderer, SpriteKind},
    sim::{GamePhase, TickInput},
    tuning::Content,
};

#[cfg(not(target_arch = "wasm32"))]
#[derive(Parser, Debug)]
#[command(name = "arcane-survivors", about = "Headless autopilot run of the survival simulation")]
struct Args {
    /// Settings JSON file
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Content JSON file (enemies, stages, upgrades)
    #[arg(long)]
    content: Option<PathBuf>,
    /// Run seed, overrides the settings file
    #[arg(long)]
    seed: Option<u64>,
    /// Seconds of play to simulate
    #[arg(long, default_value_t = 300.0)]
    seconds: f64,
    /// Host frame rate
    #[arg(long, default_value_t = 60.0)]
    fps: f64,
}

/// Logs a one-line summary of the frame every few seconds of play
#[cfg(not(target_arch = "wasm32"))]
struct LogRenderer {
    every_ms: f64,
    next_ms: f64,
}

#[cfg(not(target_arch = "wasm32"))]
impl Renderer for LogRenderer {
    fn render(&mut self, frame: &Frame<'_>) {
        let world = frame.world();
        if world.elapsed_ms < self.next_ms {
            return;
        }
        self.next_ms += self.every_ms;

        let sprites = frame.sprites();
        let on_screen = sprites
            .iter()
            .filter(|s| matches!(s.kind, SpriteKind::Enemy { .. }))
            .count();
        log::info!(
            "[{:>6.1}s] stage {} | hp {:.0}/{:.0} | enemies {} ({} on screen) | gems {} | sprites {}",
            world.elapsed_ms / 1000.0,
            world.stages.stage,
            world.stats.health,
            world.stats.max_health,
            world.enemies.len(),
            on_screen,
            world.gems.len(),
            sprites.len()
        );
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let mut settings = match &args.settings {
        Some(path) => Settings::load_or_default(path),
        None => Settings::default(),
    };
    if args.seed.is_some() {
        settings.seed = args.seed;
    }

    let content = match &args.content {
        Some(path) => match Content::load(path) {
            Ok(content) => content,
            Err(err) => {
                log::error!("Cannot load content from {}: {err:?}", path.display());
                eprintln!("Cannot load content from {}: {err}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => Content::default(),
    };

    let viewport = settings.viewport;
    let mut session = Session::new(settings, Arc::new(content));
    let mut renderer = LogRenderer {
        every_ms: 10_000.0,
        next_ms: 0.0,
    };

    let frame_ms = 1000.0 / args.fps.max(1.0);
    let mut now_ms = 0.0;
    session.start(now_ms);
    log::info!("Arcane Survivors (headless) seed {}", session.seed());

    let input = TickInput {
        viewport: Some(viewport),
        autopilot: true,
        ..Default::default()
    };

    while session.world.elapsed_ms < args.seconds * 1000.0 {
        now_ms += frame_ms;
        session.tick(&input, frame_ms, now_ms);

        if let Some(choice) = session.offer.first().cloned() {
            session.choose_upgrade(&choice);
        }
        renderer.render(&session.frame());

        if session.phase() == GamePhase::GameOver {
            break;
        }
    }

    println!(
        "score {} | level {} | stage {} | {:.1}s survived | upgrades: {}",
        session.score,
        session.level,
        session.world.stages.stage,
        session.world.elapsed_ms / 1000.0,
        session.taken.join(", ")
    );
    ExitCode::SUCCESS
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is driven by the embedding host on the web
}

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use nebula_actors::{GameConfig, Session, SessionStats};
use nebula_engine::{EngineSummary, GameEngine, ManualTime, inspector};
use nebula_input::{InputState, Key};
use nebula_scene::{DebugTextRenderer, Environment};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nebula-cli", about = "Headless tools for Nebula Strike")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions
    Info,
    /// Play a scripted session without a window
    Run {
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "600")]
        ticks: u64,
        /// Simulated display refresh rate
        #[arg(long, default_value = "60")]
        fps: f32,
        /// Game config (YAML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Hold the trigger for the whole run
        #[arg(long)]
        fire: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Also print the last rendered frame and every live object
        #[arg(long)]
        dump: bool,
    },
    /// Print the effective game config as YAML
    Config {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Outcome of a headless session.
#[derive(Debug, Serialize)]
struct RunReport {
    ticks: u64,
    game_over: bool,
    summary: EngineSummary,
    stats: SessionStats,
    #[serde(skip)]
    last_frame: String,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<GameConfig> {
    match path {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(GameConfig::default()),
    }
}

/// Weave across the play area, switching direction every two seconds.
fn script_input(input: &mut InputState, tick: u64, fps: f32, fire: bool) {
    let period = (fps * 2.0).max(1.0) as u64;
    let (hold, release) = if (tick / period) % 2 == 0 {
        (Key::KeyD, Key::KeyA)
    } else {
        (Key::KeyA, Key::KeyD)
    };
    input.key_up(release);
    if !input.is_key_down(hold) {
        input.key_down(hold);
    }
    if fire {
        input.click();
    }
}

fn run_session(
    config: &GameConfig,
    ticks: u64,
    fps: f32,
    fire: bool,
) -> anyhow::Result<(GameEngine<DebugTextRenderer>, RunReport)> {
    anyhow::ensure!(fps.is_finite() && fps > 0.0, "fps must be positive, got {fps}");

    let time = ManualTime::new();
    let mut engine = GameEngine::with_config(DebugTextRenderer::new(), config.engine)
        .time_source(time.clone())
        .environment(Environment::space(config.seed));
    let session = Session::start(engine.world_mut(), config)?;
    engine.start();

    let mut last_frame = String::new();
    let mut ran = 0;
    for tick in 0..ticks {
        script_input(engine.input_mut(), tick, fps, fire);
        time.advance_secs(1.0 / fps);
        if let Some(frame) = engine.frame()? {
            last_frame = frame;
        }
        for event in engine.drain_events() {
            tracing::debug!(?event, "world event");
        }
        ran = tick + 1;
        if session.is_over() {
            tracing::info!(tick = ran, "player destroyed");
            break;
        }
    }
    engine.stop();

    let report = RunReport {
        ticks: ran,
        game_over: session.is_over(),
        summary: engine.summary(),
        stats: session.stats(),
        last_frame,
    };
    Ok((engine, report))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("nebula-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("engine: {}", nebula_engine::crate_info());
            println!("actors: {}", nebula_actors::crate_info());
            println!("physics: {}", nebula_physics::crate_info());
            println!("scene: {}", nebula_scene::crate_info());
            println!("input: {}", nebula_input::crate_info());
        }
        Commands::Run {
            ticks,
            fps,
            config,
            fire,
            json,
            dump,
        } => {
            let config = load_config(config.as_deref())?;
            let (engine, report) = run_session(&config, ticks, fps, fire)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Ran {} ticks at {fps} fps", report.ticks);
                println!("{}", report.summary);
                let s = &report.stats;
                println!(
                    "Score: {}  Kills: {}  Health: {:.0}  Lives: {}  Shots: {}",
                    s.score, s.kills, s.health, s.lives, s.shots_fired
                );
                if report.game_over {
                    println!("GAME OVER");
                }
            }

            if dump {
                print!("{}", report.last_frame);
                for info in inspector::list_objects(engine.world()) {
                    println!("  {info}");
                }
            }
        }
        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            print!("{}", config.to_yaml()?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nebula_input::Action;

    #[test]
    fn script_alternates_direction() {
        let mut input = InputState::new();
        script_input(&mut input, 0, 60.0, false);
        assert!(input.is_held(Action::Right));
        script_input(&mut input, 120, 60.0, false);
        assert!(input.is_held(Action::Left));
        assert!(!input.is_held(Action::Right));
        assert!(!input.take_fire());
    }

    #[test]
    fn scripted_run_fires_and_reports() {
        let (_, report) = run_session(&GameConfig::default(), 180, 60.0, true).unwrap();
        assert_eq!(report.ticks, 180);
        assert_eq!(report.summary.tick, 180);
        assert!(report.stats.shots_fired > 0);
        assert!(report.last_frame.contains("Frame 180"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["ticks"], 180);
        assert!(json.get("last_frame").is_none());
    }

    #[test]
    fn long_run_leaves_no_backlog_of_events() {
        let (engine, report) = run_session(&GameConfig::default(), 2_000, 60.0, true).unwrap();
        assert!(report.ticks > 0);
        assert_eq!(engine.world().events().len(), 0);
        assert_eq!(engine.world().dropped_events(), 0);
    }

    #[test]
    fn zero_fps_is_rejected() {
        assert!(run_session(&GameConfig::default(), 10, 0.0, false).is_err());
    }

    #[test]
    fn missing_config_file_names_the_path() {
        let err = load_config(Some(Path::new("/no/such/game.yaml"))).unwrap_err();
        assert!(format!("{err:#}").contains("/no/such/game.yaml"));
    }
}

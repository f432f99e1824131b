use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use grazer::sim::{load_detector, SimConfig, Simulation};
use grazer::{PilotConfig, Session, StopSignal};
use grazer_core::player::PositionLocation;
use grazer_core::{OperatorControls, PointerChainReader, Vec2};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "grazer")]
#[command(about = "Potential-field dodging assistant for vertical bullet-hell shooters")]
struct Cli {
    /// JSON configuration file; omitted fields keep their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the loop against the built-in simulated game
    Simulate {
        /// Stop after this many ticks (default: run until Enter is pressed)
        #[arg(long)]
        ticks: Option<u64>,
        #[arg(long, default_value_t = 7)]
        seed: u64,
        /// Game profile whose memory layout the simulator serves
        #[arg(long)]
        game: Option<String>,
        /// Assist point in game space, as "x,y"
        #[arg(long, value_parser = parse_point)]
        assist: Option<Vec2>,
        /// Start with movement switched off (fire only)
        #[arg(long)]
        no_movement: bool,
        /// Write annotated frames here
        #[arg(long)]
        dump_dir: Option<PathBuf>,
        #[arg(long, default_value_t = 60)]
        dump_every: u64,
    },
    /// List the known game profiles
    Games,
    /// Print the resolved configuration as JSON
    Config,
}

fn parse_point(value: &str) -> Result<Vec2> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| anyhow!("expected x,y, got '{value}'"))?;
    let x = x.trim().parse::<f64>().with_context(|| format!("invalid x in '{value}'"))?;
    let y = y.trim().parse::<f64>().with_context(|| format!("invalid y in '{value}'"))?;
    Ok(Vec2::new(x, y))
}

/// `RUST_LOG` when set and valid, `info` otherwise.
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(log_filter()).init();

    let cli = Cli::parse();
    let mut config = PilotConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate {
            ticks,
            seed,
            game,
            assist,
            no_movement,
            dump_dir,
            dump_every,
        } => {
            if let Some(game) = game {
                config.game = game;
            }
            if let Some(dir) = dump_dir {
                config.detection.visualization.enabled = true;
                config.detection.visualization.output_dir = dir;
                config.detection.visualization.every_n_ticks = dump_every;
            }
            config.validate()?;
            simulate(&config, seed, ticks, assist, !no_movement)
        }
        Commands::Games => {
            for game in &config.games {
                let layout = match game.location {
                    PositionLocation::Pointer {
                        static_offset,
                        field_offset,
                    } => format!("[{:#x} + {:#x}] + {:#x}", game.base_address, static_offset, field_offset),
                    PositionLocation::Direct { address } => format!("{:#x}", address),
                };
                println!("{:<6} {:<28} {:<8} {}", game.id, game.title, game.process_name, layout);
            }
            Ok(())
        }
        Commands::Config => {
            config.validate()?;
            println!("{}", config.to_json_pretty()?);
            Ok(())
        }
    }
}

fn simulate(
    config: &PilotConfig,
    seed: u64,
    ticks: Option<u64>,
    assist: Option<Vec2>,
    movement_enabled: bool,
) -> Result<()> {
    let profile = config.profile()?.clone();
    let sim_config = SimConfig {
        seed,
        keys: config.keys,
        ..Default::default()
    };
    let sim = Simulation::new(sim_config, config.capture_box, profile.clone());

    let (detector, icon) = load_detector(&config.detection)?;
    sim.with_world(|w| w.set_icon(icon));

    let controls = Arc::new(OperatorControls::new(movement_enabled));
    if let Some(point) = assist {
        controls.set_assist_point(Some(point));
        controls.set_assist(true);
    }

    let stop = StopSignal::new();
    if ticks.is_none() {
        let stop = stop.clone();
        thread::Builder::new()
            .name("stdin-stop".into())
            .spawn(move || watch_stdin(std::io::stdin().lock(), &stop))
            .context("failed to spawn stdin watcher")?;
        println!("Running; press Enter to stop.");
    }

    info!(game = %profile.id, seed, "starting simulation");
    let mut session = Session::new(
        config,
        detector,
        sim.frame_source(),
        PointerChainReader::new(sim.memory(), profile),
        sim.key_sink(),
        controls,
    );
    let summary = session.run(&stop, ticks);
    let stats = sim.stats();

    println!("Simulation finished:");
    println!("  - Ticks:        {} ({} aborted)", summary.ticks, summary.aborted());
    println!("  - Panics:       {}", summary.panics);
    println!("  - Final radius: {:.2}", summary.final_radius);
    println!("  - Hits taken:   {}", stats.hits);
    println!("  - Power-ups:    {}", stats.power_ups);
    Ok(())
}

/// Raises `stop` once a line arrives. A closed or failing stdin leaves the loop running.
fn watch_stdin<R: BufRead>(mut input: R, stop: &StopSignal) {
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(n) if n > 0 => stop.stop(),
        Ok(_) => info!("stdin closed; stop with Ctrl-C"),
        Err(err) => warn!(error = %err, "stdin unreadable; stop with Ctrl-C"),
    }
}

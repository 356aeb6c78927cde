use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use grid_snake::game::GameConfig;
use grid_snake::modes::{HumanMode, ScriptMode, parse_script};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "grid_snake")]
#[command(version, about = "Classic Snake on a square grid")]
struct Cli {
    /// Game mode
    #[arg(long, default_value = "human")]
    mode: Mode,

    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Board width and height in cells
    #[arg(long)]
    grid_size: Option<usize>,

    /// Milliseconds between ticks
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Seed for food placement (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Script mode input, e.g. "up . . left wait down"
    #[arg(long, default_value = "")]
    moves: String,

    /// Where human mode writes its log
    #[arg(long, default_value = "grid_snake.log")]
    log_file: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Play snake with keyboard controls
    Human,
    /// Play a fixed list of moves and print every state as JSON
    Script,
}

impl Cli {
    fn game_config(&self) -> Result<GameConfig> {
        let mut config = match &self.config {
            Some(path) => GameConfig::load(path)?,
            None => GameConfig::default(),
        };
        if let Some(grid_size) = self.grid_size {
            config.grid_size = grid_size;
        }
        if let Some(tick_ms) = self.tick_ms {
            config.tick_interval_ms = tick_ms;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.validate().context("Invalid game options")?;
        Ok(config)
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// The terminal belongs to the game while it runs, so logs go to a file
fn init_file_logging(path: &Path) -> Result<()> {
    let log_file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create log file {:?}", path))?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .try_init();
    Ok(())
}

/// Stdout carries the JSON states, so logs go to stderr
fn init_stderr_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init();
}

fn rng_for(config: &GameConfig) -> StdRng {
    match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.game_config()?;
    let rng = rng_for(&config);

    match cli.mode {
        Mode::Human => {
            init_file_logging(&cli.log_file)?;
            info!(?config, "human mode");
            let mut human_mode = HumanMode::new(config, rng);
            human_mode.run().await?;
        }
        Mode::Script => {
            init_stderr_logging();
            let steps = parse_script(&cli.moves).context("Invalid --moves")?;
            info!(?config, steps = steps.len(), "script mode");
            let mut script_mode = ScriptMode::new(config, rng, steps);
            let stdout = std::io::stdout();
            script_mode.run(&mut stdout.lock())?;
        }
    }

    Ok(())
}

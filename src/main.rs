use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flappy_evo::Config;
use flappy_evo::simulation::replay::Replay;
use flappy_evo::simulation::trainer::Trainer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evolve a population with the given settings
    Train {
        /// Settings file
        #[arg(short, long, default_value = "settings.toml")]
        config: PathBuf,
    },
    /// Play back a saved generation without rendering
    Replay {
        /// Settings file used for training
        #[arg(short, long, default_value = "settings.toml")]
        config: PathBuf,

        /// Generation to play back, the earliest saved one if omitted
        #[arg(short, long)]
        generation: Option<u32>,

        /// Obstacle seed shared by all replayed agents
        #[arg(short, long)]
        seed: Option<u64>,

        /// Stop after this many ticks even if agents are still alive
        #[arg(long, default_value_t = 100_000)]
        max_ticks: u64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    match args.command {
        Command::Train { config } => train(&config),
        Command::Replay {
            config,
            generation,
            seed,
            max_ticks,
        } => replay(&config, generation, seed, max_ticks),
    }
}

fn train(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("Failed to load settings from {}", config_path.display()))?;

    let mut trainer = Trainer::new(config).context("Failed to set up training")?;
    let summary = trainer.run().context("Training aborted")?;

    if summary.goal_reached {
        println!(
            "Goal score reached after {} generations, edit total_generations in the settings to reflect how long it took.",
            summary.reports.len()
        );
    } else {
        println!("Finished {} generations.", summary.reports.len());
    }
    Ok(())
}

fn replay(config_path: &Path, generation: Option<u32>, seed: Option<u64>, max_ticks: u64) -> Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("Failed to load settings from {}", config_path.display()))?;

    let mut replay = Replay::open(&config.history.folder, config.history_mode()?)
        .context("Failed to open history")?;
    if let Some(generation) = generation {
        replay.set_generation(generation)?;
    }
    let generation = replay.current_generation();

    let seed = seed.unwrap_or_else(rand::random);
    let mut run = replay.start_run(seed);
    tracing::info!(
        "replaying {} genomes of generation {} on seed {}",
        replay.current_genomes().len(),
        generation,
        seed
    );

    while !run.is_finished() && run.tick() < max_ticks {
        run.step()?;
        let frame = run.frame();
        tracing::debug!(
            "tick {}: {} alive, score {}",
            frame.tick,
            frame.agents.len(),
            frame.agents.iter().map(|a| a.score).max().unwrap_or(0)
        );
    }

    let best = run.agents().iter().map(|a| a.score).max().unwrap_or(0);
    println!(
        "Generation {}: best score {} after {} ticks.",
        generation,
        best,
        run.tick()
    );
    Ok(())
}

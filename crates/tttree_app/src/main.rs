// SPDX-License-Identifier: MIT OR Apache-2.0
//! `tttree` - headless TTTree player.
//!
//! Opens a saved graph, evaluates it at a fixed tick rate and writes every
//! new presentation message to stdout as one JSON line. Logs go to stderr.

mod player;
mod settings;

use anyhow::Context as _;
use clap::Parser;
use player::Player;
use settings::RuntimeSettings;
use std::io::Write as _;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "tttree", version, about = "Play a TTTree graph and stream its presentation")]
struct Cli {
    /// Saved graph JSON.
    #[arg(required_unless_present = "write_settings")]
    graph: Option<PathBuf>,

    /// Runtime settings (RON). Defaults to ./tttree.ron when present.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Stop after this many ticks.
    #[arg(long)]
    ticks: Option<u64>,

    /// Print every message, including repeats of the previous one.
    #[arg(long, default_value_t = false)]
    repeats: bool,

    /// Write the effective settings to this file and exit.
    #[arg(long, value_name = "PATH")]
    write_settings: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().context("failed to read working directory")?;
    let (settings, settings_path) = RuntimeSettings::resolve(cli.settings.as_deref(), &cwd)
        .context("failed to load settings")?;

    init_logging(&settings.log_filter);
    tracing::info!("Starting TTTree player v{}", env!("CARGO_PKG_VERSION"));
    match &settings_path {
        Some(path) => tracing::info!("Settings from {}", path.display()),
        None => tracing::debug!("Using default settings"),
    }

    if let Some(path) = &cli.write_settings {
        settings
            .save(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!("Settings written to {}", path.display());
        return Ok(());
    }
    let Some(graph_path) = &cli.graph else {
        anyhow::bail!("no graph given");
    };

    let mut player = Player::open(graph_path, settings)?;
    tracing::info!(
        "Playing '{}' on channel '{}'",
        player.graph().name,
        player.channel()
    );
    player.wait_for_media();

    let stdout = std::io::stdout();
    let ticks = player.run(cli.ticks, cli.repeats, |message| {
        let mut out = stdout.lock();
        writeln!(out, "{}", message.to_json()?)?;
        out.flush()?;
        Ok(())
    })?;

    tracing::info!("Stopped after {ticks} ticks");
    Ok(())
}

fn init_logging(default_filter: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

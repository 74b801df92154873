#![doc = include_str!("../README.md")]

mod cli;

use std::io::{self, BufWriter, Write};

use clap::Parser;
use cli::config::{CliArgs, CliConfig};
use cli::telemetry::init_telemetry;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = CliConfig::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    cli::command::run(&config, &mut out)?;
    out.flush()?;
    Ok(())
}

fn log_startup_info(config: &CliConfig) {
    if cfg!(debug_assertions) {
        tracing::debug!("Starting with full config: {:#?}", config);
    } else {
        tracing::debug!(
            worker_id = ?config.worker_id,
            layout = ?config.generator.layout,
            "Starting"
        );
    }
}

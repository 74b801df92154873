use std::io::Write;

use anyhow::Context;
use keyflake::{IdState, KeyGenerator, SnowflakeId, StaticWorkerId, SystemClock};

use super::config::{CliConfig, Command};

/// Runs the configured subcommand, writing its output to `out`.
pub fn run(config: &CliConfig, out: &mut impl Write) -> anyhow::Result<()> {
    let keys = KeyGenerator::from_config(config.generator)?;
    if let Some(worker_id) = config.worker_id {
        keys.bind_with(&StaticWorkerId(worker_id))?;
    }

    match &config.command {
        Command::Generate { count } => generate(&keys, *count, out),
        Command::Decode { ids } => {
            for id in ids {
                let state = decode(&keys, id)?;
                writeln!(out, "{state}")?;
            }
            Ok(())
        }
    }
}

fn generate(
    keys: &KeyGenerator<SystemClock>,
    count: usize,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let batch = keys
        .generate_keys(count)
        .context("set --worker-id or WORKER_ID to generate keys")?;
    tracing::debug!(count = batch.len(), "generated keys");
    for key in batch {
        writeln!(out, "{key}")?;
    }
    Ok(())
}

fn decode(keys: &KeyGenerator<SystemClock>, input: &str) -> anyhow::Result<IdState> {
    let state = if keys.config().as_string {
        keys.decode_str(input)?
    } else {
        let raw: u64 = input
            .parse()
            .with_context(|| format!("{input:?} is not a numeric ID"))?;
        keys.decode(SnowflakeId::from_raw(raw))?
    };
    Ok(state)
}

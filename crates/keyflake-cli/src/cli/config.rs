use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use keyflake::{GeneratorConfig, Layout, RollbackPolicy, SequenceReset};

/// Command-line configuration for the `keyflake` binary.
///
/// Every setting can also come from an environment variable, and a `.env`
/// file in the working directory is loaded before parsing. The defaults
/// reproduce the classic 41/10/12 layout on the 2016-11-01 epoch.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "keyflake",
    version,
    about = "Generate and decode Snowflake-style keys"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Start of time for the timestamp field, in milliseconds since
    /// 1970-01-01 UTC.
    ///
    /// Environment variable: `EPOCH_MILLIS`
    #[arg(long, env = "EPOCH_MILLIS", default_value_t = 1_477_958_400_000, global = true)]
    pub epoch_millis: u64,

    /// Bits reserved for the timestamp.
    ///
    /// Environment variable: `TIMESTAMP_BITS`
    #[arg(long, env = "TIMESTAMP_BITS", default_value_t = 41, global = true)]
    pub timestamp_bits: u8,

    /// Bits reserved for the worker ID.
    ///
    /// Environment variable: `MACHINE_BITS`
    #[arg(long, env = "MACHINE_BITS", default_value_t = 10, global = true)]
    pub machine_bits: u8,

    /// Bits reserved for the per-millisecond sequence.
    ///
    /// Environment variable: `SEQUENCE_BITS`
    #[arg(long, env = "SEQUENCE_BITS", default_value_t = 12, global = true)]
    pub sequence_bits: u8,

    /// Emit and accept fixed-width radix-62 keys instead of integers.
    ///
    /// Environment variable: `AS_STRING`
    #[arg(long, env = "AS_STRING", default_value_t = false, global = true)]
    pub as_string: bool,

    /// Worker ID of this process, in `0..2^MACHINE_BITS`.
    ///
    /// Required to generate; decoding works without it.
    ///
    /// Environment variable: `WORKER_ID`
    #[arg(long, env = "WORKER_ID", allow_hyphen_values = true, global = true)]
    pub worker_id: Option<i64>,

    /// What to do when the system clock moves backwards.
    ///
    /// Environment variable: `ROLLBACK_POLICY`
    #[arg(
        long = "rollback",
        env = "ROLLBACK_POLICY",
        value_enum,
        default_value_t = RollbackArg::Wait,
        global = true
    )]
    pub rollback: RollbackArg,

    /// Largest clock regression waited out under `--rollback wait`.
    ///
    /// Environment variable: `MAX_DRIFT_MILLIS`
    #[arg(
        long,
        env = "MAX_DRIFT_MILLIS",
        default_value_t = RollbackPolicy::DEFAULT_MAX_DRIFT_MILLIS,
        global = true
    )]
    pub max_drift_millis: u64,

    /// Continue the sequence across ticks and reset it once it reaches this
    /// value. `0` starts every tick at sequence 0. Without it, the threshold
    /// is half the sequence range.
    ///
    /// Environment variable: `SEQUENCE_RESET_THRESHOLD`
    #[arg(long, env = "SEQUENCE_RESET_THRESHOLD", global = true)]
    pub sequence_reset_threshold: Option<u64>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print new IDs, one per line.
    Generate {
        /// How many IDs to generate.
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },
    /// Print `unix_millis machine_id sequence` for each ID.
    Decode {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackArg {
    Wait,
    Fail,
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub generator: GeneratorConfig,
    pub worker_id: Option<i64>,
    pub command: Command,
}

impl TryFrom<CliArgs> for CliConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let layout = Layout::new(args.timestamp_bits, args.machine_bits, args.sequence_bits)
            .context("TIMESTAMP_BITS, MACHINE_BITS and SEQUENCE_BITS do not form a valid layout")?;

        let rollback = match args.rollback {
            RollbackArg::Wait => RollbackPolicy::Wait {
                max_drift_millis: args.max_drift_millis,
            },
            RollbackArg::Fail => RollbackPolicy::Fail,
        };

        let sequence_reset = args
            .sequence_reset_threshold
            .map_or(SequenceReset::HalfRange, SequenceReset::Threshold);

        let generator = GeneratorConfig {
            epoch_millis: args.epoch_millis,
            layout,
            as_string: args.as_string,
            rollback,
            sequence_reset,
        };
        generator.validate()?;

        Ok(Self {
            generator,
            worker_id: args.worker_id,
            command: args.command,
        })
    }
}

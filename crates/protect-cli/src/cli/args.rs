use clap::{Parser, Subcommand, ValueEnum};
use protect_core::DuplicatePolicy;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "protect",
    version,
    about = "TTL-indexed protection registry: upsert protections, list the live ones"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(clap::Args, Clone, Debug, Default)]
pub struct GlobalArgs {
    /// YAML config file (duplicate_policy, storage, sweep_interval_secs, log_file)
    #[arg(long, global = true, env = "PROTECT_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database; overrides the configured storage
    #[arg(long, global = true, env = "PROTECT_DB")]
    pub db: Option<PathBuf>,

    /// Duplicate policy; overrides the configured one
    #[arg(long, global = true, value_enum)]
    pub policy: Option<PolicyArg>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyArg {
    Upsert,
    Reject,
}

impl From<PolicyArg> for DuplicatePolicy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::Upsert => DuplicatePolicy::Upsert,
            PolicyArg::Reject => DuplicatePolicy::Reject,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Read JSON command envelopes from stdin, one per line; write one reply per line
    Serve(ServeArgs),
    /// Protect an id for TTL seconds (durable store only)
    Set(SetArgs),
    /// Print every live protection, ordered by id (durable store only)
    Pull,
    /// Purge expired protections now (durable store only)
    Sweep,
    Version,
}

#[derive(clap::Args, Clone, Debug)]
pub struct ServeArgs {
    /// Background sweep every N seconds (0 disables); overrides config
    #[arg(long)]
    pub sweep_interval: Option<u64>,
}

#[derive(clap::Args, Clone, Debug)]
pub struct SetArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub id: i64,

    /// Defense level, 1..=3
    #[arg(long, allow_negative_numbers = true)]
    pub defense: i64,

    /// Seconds of protection, 1..=3600
    #[arg(long, allow_negative_numbers = true)]
    pub ttl: i64,
}

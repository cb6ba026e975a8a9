use super::args::*;
use crate::exit_codes::SUCCESS;
use anyhow::Context;
use protect_core::{ProtectConfig, StorageConfig};

pub mod oneshot;
pub mod serve;

/// File config with CLI/env overrides applied.
pub fn resolve_config(global: &GlobalArgs) -> anyhow::Result<ProtectConfig> {
    let mut cfg = match &global.config {
        Some(path) => ProtectConfig::load(path)?,
        None => ProtectConfig::default(),
    };
    if let Some(db) = &global.db {
        cfg.storage = StorageConfig::Sqlite { path: db.clone() };
    }
    if let Some(policy) = global.policy {
        cfg.duplicate_policy = policy.into();
    }
    Ok(cfg)
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    if let Command::Version = cli.cmd {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    let cfg = resolve_config(&cli.global)?;
    crate::logging::init(cfg.log_file.as_deref()).context("logging setup")?;

    match cli.cmd {
        Command::Serve(args) => serve::run(cfg, args).await,
        Command::Set(args) => oneshot::set(&cfg, &args),
        Command::Pull => oneshot::pull(&cfg),
        Command::Sweep => oneshot::sweep(&cfg),
        Command::Version => Ok(SUCCESS),
    }
}

//! One-shot commands against the durable store.

use crate::cli::args::SetArgs;
use crate::exit_codes;
use protect_core::{
    handle, Command, ProtectConfig, ProtectionRegistry, Reply, SetCommand, StorageConfig,
};
use tracing::warn;

pub fn set(cfg: &ProtectConfig, args: &SetArgs) -> anyhow::Result<i32> {
    require_durable(cfg)?;
    let command = match SetCommand::new(args.id, args.defense, args.ttl) {
        Ok(c) => c,
        Err(e) => return Ok(emit(&Reply::from(e))),
    };
    with_registry(cfg, |registry| handle(registry, Command::Set(command)))
}

pub fn pull(cfg: &ProtectConfig) -> anyhow::Result<i32> {
    require_durable(cfg)?;
    with_registry(cfg, |registry| handle(registry, Command::Pull))
}

pub fn sweep(cfg: &ProtectConfig) -> anyhow::Result<i32> {
    require_durable(cfg)?;
    let registry = match cfg.open_registry() {
        Ok(r) => r,
        Err(e) => return Ok(emit(&Reply::from(e))),
    };
    let code = match registry.sweep() {
        Ok(removed) => {
            println!("{}", serde_json::json!({ "removed": removed }));
            exit_codes::SUCCESS
        }
        Err(e) => emit(&Reply::from(e)),
    };
    close(registry);
    Ok(code)
}

fn with_registry(
    cfg: &ProtectConfig,
    f: impl FnOnce(&ProtectionRegistry) -> Reply,
) -> anyhow::Result<i32> {
    let registry = match cfg.open_registry() {
        Ok(r) => r,
        Err(e) => return Ok(emit(&Reply::from(e))),
    };
    let reply = f(&registry);
    close(registry);
    Ok(emit(&reply))
}

fn require_durable(cfg: &ProtectConfig) -> anyhow::Result<()> {
    match cfg.storage {
        StorageConfig::Sqlite { .. } => Ok(()),
        StorageConfig::Memory => anyhow::bail!(
            "one-shot commands need a durable store: pass --db <path> or set storage.backend: sqlite"
        ),
    }
}

fn close(registry: ProtectionRegistry) {
    if let Err(e) = registry.close() {
        warn!(error = %e, "failed to close protection store");
    }
}

fn emit(reply: &Reply) -> i32 {
    println!("{}", reply.to_json());
    exit_codes::for_reply(reply)
}

//! Line-delimited JSON request loop over stdio.

use crate::cli::args::ServeArgs;
use crate::exit_codes::{STORE_UNAVAILABLE, SUCCESS};
use anyhow::Context;
use protect_core::{handle_envelope, spawn_sweeper, ProtectConfig, RegistryError, Reply};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

pub async fn run(mut cfg: ProtectConfig, args: ServeArgs) -> anyhow::Result<i32> {
    if let Some(secs) = args.sweep_interval {
        cfg.sweep_interval_secs = Some(secs);
    }

    let registry = match cfg.open_registry() {
        Ok(r) => Arc::new(r),
        Err(e) => {
            error!(error = %e, "cannot open protection registry");
            eprintln!("fatal: {e}");
            return Ok(STORE_UNAVAILABLE);
        }
    };
    info!(
        policy = ?registry.policy(),
        sweep_interval_secs = cfg.sweep_interval().map(|d| d.as_secs()),
        "protection service start"
    );
    let sweeper = cfg
        .sweep_interval()
        .map(|every: Duration| spawn_sweeper(Arc::clone(&registry), every));

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut line = Vec::new();
    loop {
        line.clear();
        if stdin.read_until(b'\n', &mut line).await.context("read request")? == 0 {
            break;
        }
        let reply = match std::str::from_utf8(&line) {
            Ok(text) => {
                let request = text.trim().to_string();
                if request.is_empty() {
                    continue;
                }
                let reg = Arc::clone(&registry);
                tokio::task::spawn_blocking(move || handle_envelope(&reg, &request))
                    .await
                    .context("request handler panicked")?
            }
            Err(e) => {
                warn!(error = %e, "request is not valid UTF-8");
                Reply::from(RegistryError::invalid_input(
                    "$",
                    format!("request is not valid UTF-8: {e}"),
                ))
            }
        };

        let mut out = reply.to_json();
        out.push('\n');
        stdout.write_all(out.as_bytes()).await.context("write reply")?;
        stdout.flush().await.context("flush reply")?;
    }

    if let Some(sweeper) = sweeper {
        sweeper.shutdown().await;
    }
    let code = match Arc::try_unwrap(registry) {
        Ok(registry) => match registry.close() {
            Ok(()) => SUCCESS,
            Err(e) => {
                error!(error = %e, "failed to close protection registry");
                eprintln!("fatal: {e}");
                STORE_UNAVAILABLE
            }
        },
        Err(_) => {
            warn!("registry still shared at shutdown; dropping without close");
            SUCCESS
        }
    };
    info!("protection service stop");
    Ok(code)
}

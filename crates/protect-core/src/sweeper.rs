//! Optional active expiry.
//!
//! Operations still sweep before they run; this task only shortens the time
//! a dead record stays physically present when no requests arrive.

use crate::registry::ProtectionRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

pub struct SweeperHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the task and wait for an in-flight sweep to finish.
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            error!(error = %e, "sweeper task failed");
        }
    }
}

/// Sweep `registry` every `every` on the current tokio runtime.
pub fn spawn_sweeper(registry: Arc<ProtectionRegistry>, every: Duration) -> SweeperHandle {
    let (stop, mut stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;
        debug!(interval = ?every, "sweeper started");

        loop {
            tokio::select! {
                _ = &mut stopped => break,
                _ = ticker.tick() => {
                    let reg = Arc::clone(&registry);
                    match tokio::task::spawn_blocking(move || reg.sweep()).await {
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => error!(error = %e, "background sweep failed"),
                        Err(e) => error!(error = %e, "background sweep panicked"),
                    }
                }
            }
        }
        debug!("sweeper stopped");
    });
    SweeperHandle { stop, task }
}

use crate::command::{Command, SetCommand};
use crate::errors::RegistryError;
use crate::registry::ProtectionRegistry;
use crate::reply::{PullReply, Reply, SetReply, SetResult};
use tracing::{debug, error};

/// Run one validated command against the registry.
pub fn handle(registry: &ProtectionRegistry, command: Command) -> Reply {
    let result = match command {
        Command::Set(SetCommand { id, defense, ttl }) => {
            registry.set(id, defense, ttl).map(|out| {
                Reply::Set(SetReply {
                    id: out.record.id,
                    result: SetResult::Ok,
                })
            })
        }
        Command::Pull => registry.pull().map(|records| Reply::Pull(PullReply(records))),
    };

    result.unwrap_or_else(|e| {
        if matches!(e, RegistryError::StoreUnavailable(_)) {
            error!(error = %e, "protection store unavailable");
        }
        Reply::from(e)
    })
}

/// Parse, validate and run one raw JSON envelope.
pub fn handle_envelope(registry: &ProtectionRegistry, json: &str) -> Reply {
    match Command::parse(json) {
        Ok(command) => {
            debug!(request = json, "request");
            handle(registry, command)
        }
        Err(e) => {
            error!(error = %e, "rejected request");
            Reply::from(e)
        }
    }
}

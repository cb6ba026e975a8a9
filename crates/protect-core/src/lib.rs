//! TTL-indexed protection registry.
//!
//! ```text
//!   request ──▶ command (typed, range-checked)
//!                  │
//!                  ▼
//!          ProtectionRegistry ── lock ─▶ sweep(now) ─▶ set / pull
//!                  │
//!           RecordStore: MemoryStore | SqliteStore
//! ```
//!
//! Records expire lazily: every `set`/`pull` removes dead records before it
//! runs. An optional background sweeper shortens how long dead records stay
//! physically present but is never needed for correctness.

pub mod clock;
pub mod command;
pub mod config;
pub mod errors;
pub mod handler;
pub mod model;
pub mod registry;
pub mod reply;
pub mod store;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use command::{Command, SetCommand};
pub use config::{ProtectConfig, StorageConfig};
pub use errors::RegistryError;
pub use handler::{handle, handle_envelope};
pub use model::{DefenseLevel, ProtectionId, ProtectionRecord, Ttl};
pub use registry::{DuplicatePolicy, ProtectionRegistry, SetAction, SetOutcome};
pub use reply::Reply;
pub use sweeper::{spawn_sweeper, SweeperHandle};

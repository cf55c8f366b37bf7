//! Fleet engine: keeps one watcher per enrolled device in sync with its
//! container runtime, runs remote automation, and guards the credentials
//! both need.

pub mod automation;
pub mod client;
pub mod conf;
pub mod context;
pub mod error;
pub mod events;
pub mod model;
pub mod notify;
pub mod store;
pub mod usecase;
pub mod vault;
pub mod watcher;

pub use context::{EngineContext, RunnerParts};
pub use error::{EngineError, Result};
pub use events::{EventBus, EventKind, Payload};
pub use vault::Vault;

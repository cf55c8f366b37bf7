//! Component registry and the docker watcher it manages.

pub mod component;
pub mod docker;
pub mod engine;
pub mod map;
pub mod schedule;

pub use component::{build_id, Component, ComponentKey, Kind, Provider};
pub use docker::{DockerWatcher, PassOutcome, WatcherDeps};
pub use engine::{WatcherEngine, WatcherStates};
pub use schedule::Schedule;

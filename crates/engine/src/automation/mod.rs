//! Remote automation: inventories, the runner seam, execution tracking.

pub mod inventory;
pub mod runner;
pub mod service;
pub mod tracker;

pub use inventory::{AdHocTarget, Inventory, TRANSIENT_UUID};
pub use runner::{PlaybookRun, PlaybookRunner};
pub use service::PlaybookService;
pub use tracker::ExecutionTracker;

//! Playbook runner seam. The backend that actually runs playbooks is
//! opaque: it takes a run description and hands back an execution id.

use async_trait::async_trait;

use super::inventory::Inventory;
use crate::error::Result;
use crate::model::{ExecutionMode, ExtraVar, Playbook, User};

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybookRun {
    pub playbook: Playbook,
    pub user: User,
    /// Device uuids. `None` targets every device.
    pub target: Option<Vec<String>>,
    pub extra_vars: Vec<ExtraVar>,
    pub mode: ExecutionMode,
}

impl PlaybookRun {
    /// Human-readable command line recorded on the task.
    pub fn describe(&self) -> String {
        match self.mode {
            ExecutionMode::Apply => self.playbook.path.clone(),
            ExecutionMode::Check => format!("{} --check", self.playbook.path),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlaybookRunner: Send + Sync {
    /// Start `run` against stored devices and return its execution id.
    async fn execute(&self, run: PlaybookRun) -> Result<String>;

    /// Start `playbook` against an explicit inventory and return its
    /// execution id.
    async fn execute_on_inventory(&self, playbook: Playbook, user: User, inventory: Inventory) -> Result<String>;
}

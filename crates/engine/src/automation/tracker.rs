//! Execution tracker: task records plus append-only log and status lines,
//! keyed by execution id.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error};

use crate::error::Result;
use crate::events::{EventBus, EventKind};
use crate::model::{AutomationTask, ExecutionLog, ExecutionStatus, TaskStatus};
use crate::store::ExecutionRepository;

pub struct ExecutionTracker {
    executions: Arc<dyn ExecutionRepository>,
}

impl ExecutionTracker {
    pub fn new(executions: Arc<dyn ExecutionRepository>) -> Self {
        Self { executions }
    }

    /// Create the task record. Runners may report status before the record
    /// exists, so the latest status line already logged is carried over.
    pub async fn start_task(&self, ident: &str, cmd: &str, target: Vec<String>) -> Result<AutomationTask> {
        let mut task = AutomationTask {
            ident: ident.to_string(),
            status: TaskStatus::Created.as_str().to_string(),
            cmd: cmd.to_string(),
            target,
            created_at: Utc::now(),
        };
        self.executions.create_task(task.clone()).await?;
        if let Some(latest) = self.executions.find_statuses_by_ident(ident).await?.pop() {
            self.executions.update_task_status(ident, &latest.status).await?;
            task.status = latest.status;
        }
        debug!(ident, cmd, status = %task.status, "Execution recorded");
        Ok(task)
    }

    pub async fn append_log(&self, ident: &str, stdout: &str) -> Result<ExecutionLog> {
        self.executions.append_log(ident, stdout).await
    }

    /// Append a status line and keep the task record's latest status in step.
    pub async fn append_status(&self, ident: &str, status: &str) -> Result<ExecutionStatus> {
        let line = self.executions.append_status(ident, status).await?;
        self.executions.update_task_status(ident, status).await?;
        Ok(line)
    }

    pub async fn get_task(&self, ident: &str) -> Result<Option<AutomationTask>> {
        self.executions.find_task(ident).await
    }

    /// Log lines in append order. Unknown ids yield an empty list.
    pub async fn get_logs(&self, ident: &str) -> Result<Vec<ExecutionLog>> {
        self.executions.find_logs_by_ident(ident).await
    }

    /// Status lines in append order. Unknown ids yield an empty list.
    pub async fn get_status(&self, ident: &str) -> Result<Vec<ExecutionStatus>> {
        self.executions.find_statuses_by_ident(ident).await
    }

    /// Record a `failed` status for every automation failure that names an
    /// execution id.
    pub fn subscribe(self: &Arc<Self>, bus: &EventBus) {
        let tracker = Arc::downgrade(self);
        bus.on(EventKind::AutomationFailed, move |_, payload| {
            let Some(ident) = payload.module_id.clone() else {
                return Ok(());
            };
            let Some(tracker) = tracker.upgrade() else {
                return Ok(());
            };
            let handle = tokio::runtime::Handle::try_current()?;
            handle.spawn(async move {
                if let Err(e) = tracker.append_status(&ident, TaskStatus::Failed.as_str()).await {
                    error!(ident = %ident, "Failed to record execution failure: {}", e);
                }
            });
            Ok(())
        });
    }
}

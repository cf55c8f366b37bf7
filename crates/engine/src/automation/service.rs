//! Playbook service: resolves playbooks, calls the runner, and records the
//! resulting execution.

use std::sync::Arc;

use tracing::info;

use super::inventory::Inventory;
use super::runner::{PlaybookRun, PlaybookRunner};
use super::tracker::ExecutionTracker;
use crate::error::{EngineError, Result};
use crate::model::{ExecutionMode, ExtraVar, Playbook, User};
use crate::store::PlaybookRepository;

pub struct PlaybookService {
    playbooks: Arc<dyn PlaybookRepository>,
    runner: Arc<dyn PlaybookRunner>,
    tracker: Arc<ExecutionTracker>,
    check_ref: String,
}

impl PlaybookService {
    pub fn new(
        playbooks: Arc<dyn PlaybookRepository>,
        runner: Arc<dyn PlaybookRunner>,
        tracker: Arc<ExecutionTracker>,
        check_ref: impl Into<String>,
    ) -> Self {
        Self {
            playbooks,
            runner,
            tracker,
            check_ref: check_ref.into(),
        }
    }

    pub async fn find_by_uuid(&self, uuid: &str) -> Result<Playbook> {
        self.playbooks
            .find_one_by_uuid(uuid)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Playbook {} not found", uuid)))
    }

    /// The playbook every automation connectivity check runs.
    pub async fn find_check_playbook(&self) -> Result<Playbook> {
        self.playbooks
            .find_one_by_quick_ref(&self.check_ref)
            .await?
            .ok_or_else(|| EngineError::Configuration(format!("_{}.yml not found.", self.check_ref)))
    }

    pub async fn execute_playbook(
        &self,
        playbook: &Playbook,
        user: &User,
        target: Option<Vec<String>>,
        extra_vars: Vec<ExtraVar>,
        mode: ExecutionMode,
    ) -> Result<String> {
        let run = PlaybookRun {
            playbook: playbook.clone(),
            user: user.clone(),
            target: target.clone(),
            extra_vars,
            mode,
        };
        let cmd = run.describe();
        let ident = self.runner.execute(run).await?;
        self.tracker.start_task(&ident, &cmd, target.unwrap_or_default()).await?;

        info!(ident = %ident, playbook = %playbook.name, user = %user.username, "Playbook execution started");
        Ok(ident)
    }

    pub async fn execute_playbook_by_quick_ref(
        &self,
        quick_ref: &str,
        user: &User,
        target: Option<Vec<String>>,
        extra_vars: Vec<ExtraVar>,
        mode: ExecutionMode,
    ) -> Result<String> {
        let playbook = self
            .playbooks
            .find_one_by_quick_ref(quick_ref)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Playbook {} not found", quick_ref)))?;
        self.execute_playbook(&playbook, user, target, extra_vars, mode).await
    }

    pub async fn execute_on_inventory(&self, playbook: &Playbook, user: &User, inventory: Inventory) -> Result<String> {
        let hosts = inventory.hosts();
        let ident = self
            .runner
            .execute_on_inventory(playbook.clone(), user.clone(), inventory)
            .await?;
        self.tracker.start_task(&ident, &playbook.path, hosts).await?;

        info!(ident = %ident, playbook = %playbook.name, "Playbook execution started on inventory");
        Ok(ident)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::runner::MockPlaybookRunner;
    use crate::store::Store;
    use mockall::predicate::*;

    fn check_playbook() -> Playbook {
        Playbook {
            uuid: "pb-1".to_string(),
            name: "Check device".to_string(),
            path: "_checkDeviceBeforeAdd.yml".to_string(),
            quick_ref: Some("checkDeviceBeforeAdd".to_string()),
        }
    }

    fn service(runner: MockPlaybookRunner, store: &Store) -> (PlaybookService, Arc<ExecutionTracker>) {
        let tracker = Arc::new(ExecutionTracker::new(store.executions.clone()));
        let service = PlaybookService::new(
            store.playbooks.clone(),
            Arc::new(runner),
            tracker.clone(),
            "checkDeviceBeforeAdd",
        );
        (service, tracker)
    }

    #[tokio::test]
    async fn test_execute_records_task_without_status() {
        let store = Store::in_memory();
        let mut runner = MockPlaybookRunner::new();
        runner
            .expect_execute()
            .withf(|run| run.mode == ExecutionMode::Check && run.target.as_deref() == Some(&["dev-1".to_string()][..]))
            .times(1)
            .returning(|_| Ok("exec-42".to_string()));
        let (service, tracker) = service(runner, &store);

        let ident = service
            .execute_playbook(
                &check_playbook(),
                &User::new("admin"),
                Some(vec!["dev-1".to_string()]),
                vec![],
                ExecutionMode::Check,
            )
            .await
            .unwrap();

        assert_eq!(ident, "exec-42");
        let task = tracker.get_task("exec-42").await.unwrap().unwrap();
        assert_eq!(task.cmd, "_checkDeviceBeforeAdd.yml --check");
        assert_eq!(task.target, vec!["dev-1"]);
        assert!(tracker.get_status("exec-42").await.unwrap().is_empty());
    }

    /// Reports a status line for its execution before handing back the id.
    struct EagerRunner {
        tracker: Arc<ExecutionTracker>,
    }

    #[async_trait::async_trait]
    impl PlaybookRunner for EagerRunner {
        async fn execute(&self, _run: PlaybookRun) -> Result<String> {
            self.tracker.append_status("exec-7", "running").await?;
            Ok("exec-7".to_string())
        }

        async fn execute_on_inventory(&self, _playbook: Playbook, _user: User, _inventory: Inventory) -> Result<String> {
            self.tracker.append_status("exec-8", "failed").await?;
            Ok("exec-8".to_string())
        }
    }

    #[tokio::test]
    async fn test_status_reported_while_starting_survives_task_creation() {
        let store = Store::in_memory();
        let tracker = Arc::new(ExecutionTracker::new(store.executions.clone()));
        let runner = Arc::new(EagerRunner {
            tracker: tracker.clone(),
        });
        let service = PlaybookService::new(store.playbooks.clone(), runner, tracker.clone(), "checkDeviceBeforeAdd");

        let ident = service
            .execute_playbook(&check_playbook(), &User::new("admin"), None, vec![], ExecutionMode::Apply)
            .await
            .unwrap();
        assert_eq!(tracker.get_task(&ident).await.unwrap().unwrap().status, "running");

        let ident = service
            .execute_on_inventory(&check_playbook(), &User::new("admin"), Inventory::default())
            .await
            .unwrap();
        assert_eq!(tracker.get_task(&ident).await.unwrap().unwrap().status, "failed");
        let statuses = tracker.get_status(&ident).await.unwrap();
        assert_eq!(statuses.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_check_playbook_is_configuration_error() {
        let store = Store::in_memory();
        let (service, _) = service(MockPlaybookRunner::new(), &store);

        let err = service.find_check_playbook().await.unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION_ERROR");
        assert!(err.to_string().contains("_checkDeviceBeforeAdd.yml not found."));
    }

    #[tokio::test]
    async fn test_unknown_quick_ref_is_not_found_and_never_runs() {
        let store = Store::in_memory();
        let mut runner = MockPlaybookRunner::new();
        runner.expect_execute().times(0);
        let (service, _) = service(runner, &store);

        let err = service
            .execute_playbook_by_quick_ref("reboot", &User::new("admin"), None, vec![], ExecutionMode::Apply)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_runner_error_propagates() {
        let store = Store::in_memory();
        store.playbooks.save(check_playbook()).await.unwrap();
        let mut runner = MockPlaybookRunner::new();
        runner
            .expect_execute_on_inventory()
            .with(eq(check_playbook()), always(), always())
            .returning(|_, _, _| Err(EngineError::Connectivity("runner unavailable".to_string())));
        let (service, tracker) = service(runner, &store);

        let playbook = service.find_check_playbook().await.unwrap();
        let err = service
            .execute_on_inventory(&playbook, &User::new("admin"), Inventory::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CONNECTIVITY_ERROR");
        assert!(tracker.get_logs("anything").await.unwrap().is_empty());
    }
}

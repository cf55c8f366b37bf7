//! Playbook runner backed by the `ansible-playbook` command line.
//!
//! Each run gets a fresh execution id, returned immediately. The process runs
//! in the background with a private inventory file; its stdout is recorded
//! line by line in the execution tracker.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use engine::automation::{ExecutionTracker, Inventory, PlaybookRun, PlaybookRunner};
use engine::model::task::extra_vars_map;
use engine::model::{Device, DeviceAuth, ExecutionMode, Playbook, TaskStatus, User};
use engine::store::Store;
use engine::{EngineError, EventBus, EventKind, Payload, RunnerParts, Vault};

const MODULE: &str = "PlaybookRunner";

pub struct CommandRunner {
    binary: String,
    playbooks_dir: PathBuf,
    store: Store,
    vault: Arc<Vault>,
    bus: Arc<EventBus>,
    tracker: Arc<ExecutionTracker>,
}

struct Invocation {
    ident: String,
    playbook: Playbook,
    inventory: Inventory,
    mode: ExecutionMode,
    extra_vars: Option<String>,
}

impl CommandRunner {
    pub fn new(parts: &RunnerParts) -> Self {
        Self {
            binary: parts.automation.runner_binary.clone(),
            playbooks_dir: PathBuf::from(&parts.automation.playbooks_dir),
            store: parts.store.clone(),
            vault: parts.vault.clone(),
            bus: parts.bus.clone(),
            tracker: parts.tracker.clone(),
        }
    }

    /// Stored devices and credentials for `target`; every device with
    /// credentials when `target` is `None`.
    async fn resolve_targets(&self, target: Option<&[String]>) -> engine::Result<Vec<(Device, DeviceAuth)>> {
        let devices = match target {
            Some(uuids) => {
                let mut devices = Vec::with_capacity(uuids.len());
                for uuid in uuids {
                    let device = self
                        .store
                        .devices
                        .find_one_by_uuid(uuid)
                        .await?
                        .ok_or_else(|| EngineError::not_found("Device", uuid))?;
                    devices.push(device);
                }
                devices
            }
            None => self.store.devices.find_all().await?,
        };

        let mut resolved = Vec::with_capacity(devices.len());
        for device in devices {
            match self.store.auths.find_one_by_device(&device.uuid).await? {
                Some(auth) => resolved.push((device, auth)),
                None if target.is_some() => {
                    return Err(EngineError::Configuration(format!("Device {} has no credentials", device.uuid)))
                }
                None => debug!(device_uuid = %device.uuid, "Skipping device without credentials"),
            }
        }
        Ok(resolved)
    }

    fn launch(&self, invocation: Invocation) -> engine::Result<String> {
        // Decrypt up front so a bad secret fails the call, not the background task
        let inventory = invocation.inventory.revealed(&self.vault)?.to_json()?;
        let ident = invocation.ident.clone();
        let job = Job {
            binary: self.binary.clone(),
            playbook_path: self.playbooks_dir.join(&invocation.playbook.path),
            tracker: self.tracker.clone(),
            bus: self.bus.clone(),
        };

        tokio::spawn(async move {
            if let Err(message) = job.run(&invocation, &inventory).await {
                warn!(ident = %invocation.ident, "Playbook execution failed: {}", message);
                job.bus
                    .emit(EventKind::AutomationFailed, Payload::error(MODULE, &invocation.ident, message));
            }
        });
        Ok(ident)
    }
}

struct Job {
    binary: String,
    playbook_path: PathBuf,
    tracker: Arc<ExecutionTracker>,
    bus: Arc<EventBus>,
}

impl Job {
    async fn status(&self, ident: &str, status: TaskStatus) {
        if let Err(e) = self.tracker.append_status(ident, status.as_str()).await {
            error!(ident, "Failed to record execution status: {}", e);
        }
    }

    async fn log(&self, ident: &str, line: &str) {
        if let Err(e) = self.tracker.append_log(ident, line).await {
            error!(ident, "Failed to record execution log: {}", e);
        }
    }

    /// Returns the failure message when the run did not succeed.
    async fn run(&self, invocation: &Invocation, inventory: &str) -> Result<(), String> {
        let ident = invocation.ident.as_str();
        self.status(ident, TaskStatus::Starting).await;

        // NamedTempFile is created 0600 and removed on drop
        let inventory_file = tempfile::Builder::new()
            .prefix("fleet-inventory-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| format!("Cannot create inventory file: {}", e))?;
        tokio::fs::write(inventory_file.path(), inventory)
            .await
            .map_err(|e| format!("Cannot write inventory file: {}", e))?;

        let mut cmd = Command::new(&self.binary);
        cmd.arg("-i").arg(inventory_file.path()).arg(&self.playbook_path);
        if invocation.mode == ExecutionMode::Check {
            cmd.arg("--check");
        }
        if let Some(vars) = &invocation.extra_vars {
            cmd.arg("--extra-vars").arg(vars);
        }
        cmd.env("ANSIBLE_HOST_KEY_CHECKING", "False")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| format!("Cannot start {}: {}", self.binary, e))?;
        info!(ident, playbook = %invocation.playbook.path, "Playbook process started");
        self.status(ident, TaskStatus::Running).await;

        let stdout = child.stdout.take().ok_or("stdout was not captured")?;
        let stderr = child.stderr.take().ok_or("stderr was not captured")?;
        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut stderr_lines = BufReader::new(stderr).lines();
        let mut last_error = None;
        let (mut stdout_open, mut stderr_open) = (true, true);

        let exit = loop {
            tokio::select! {
                line = stdout_lines.next_line(), if stdout_open => match line {
                    Ok(Some(line)) => self.log(ident, &line).await,
                    Ok(None) => stdout_open = false,
                    Err(e) => {
                        warn!(ident, "Error reading stdout: {}", e);
                        stdout_open = false;
                    }
                },
                line = stderr_lines.next_line(), if stderr_open => match line {
                    Ok(Some(line)) => {
                        debug!(ident, "stderr: {}", line);
                        last_error = Some(line);
                    }
                    _ => stderr_open = false,
                },
                status = child.wait() => break status,
            }
        };

        // Lines still buffered when the process exited
        while stdout_open {
            match stdout_lines.next_line().await {
                Ok(Some(line)) => self.log(ident, &line).await,
                _ => stdout_open = false,
            }
        }

        match exit {
            Ok(status) if status.success() => {
                self.status(ident, TaskStatus::Successful).await;
                info!(ident, "✓ Playbook execution finished");
                Ok(())
            }
            Ok(status) => Err(match last_error {
                Some(line) => format!("{} exited with {}: {}", self.binary, status, line),
                None => format!("{} exited with {}", self.binary, status),
            }),
            Err(e) => Err(format!("Failed to wait for {}: {}", self.binary, e)),
        }
    }
}

#[async_trait]
impl PlaybookRunner for CommandRunner {
    async fn execute(&self, run: PlaybookRun) -> engine::Result<String> {
        let targets = self.resolve_targets(run.target.as_deref()).await?;
        let inventory = Inventory::for_targets(targets.iter().map(|(d, a)| (d, a)))?;
        let extra_vars = if run.extra_vars.is_empty() {
            None
        } else {
            let vars = serde_json::to_string(&extra_vars_map(&run.extra_vars))
                .map_err(|e| EngineError::Configuration(format!("Cannot encode extra vars: {}", e)))?;
            Some(vars)
        };

        self.launch(Invocation {
            ident: uuid::Uuid::new_v4().to_string(),
            playbook: run.playbook,
            inventory,
            mode: run.mode,
            extra_vars,
        })
    }

    async fn execute_on_inventory(&self, playbook: Playbook, user: User, inventory: Inventory) -> engine::Result<String> {
        debug!(user = %user.username, hosts = ?inventory.hosts(), "Running playbook on explicit inventory");
        self.launch(Invocation {
            ident: uuid::Uuid::new_v4().to_string(),
            playbook,
            inventory,
            mode: ExecutionMode::Check,
            extra_vars: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::conf::AutomationConfig;
    use engine::model::DeviceStatus;
    use engine::vault::DEFAULT_VAULT_ID;
    use std::time::Duration;

    fn runner(binary: &str) -> (CommandRunner, Arc<ExecutionTracker>, Store) {
        let store = Store::in_memory();
        let tracker = Arc::new(ExecutionTracker::new(store.executions.clone()));
        let bus = Arc::new(EventBus::new());
        tracker.subscribe(&bus);
        let parts = RunnerParts {
            store: store.clone(),
            vault: Arc::new(Vault::new("fleetd-runner-test-secret", DEFAULT_VAULT_ID)),
            bus,
            tracker: tracker.clone(),
            automation: AutomationConfig {
                runner_binary: binary.to_string(),
                ..Default::default()
            },
        };
        (CommandRunner::new(&parts), tracker, store)
    }

    fn playbook() -> Playbook {
        Playbook {
            uuid: "pb-1".to_string(),
            name: "ping".to_string(),
            path: "ping.yml".to_string(),
            quick_ref: None,
        }
    }

    async fn wait_for_status(tracker: &ExecutionTracker, ident: &str, wanted: &str) -> Vec<String> {
        let mut statuses = Vec::new();
        for _ in 0..100 {
            statuses = tracker
                .get_status(ident)
                .await
                .unwrap()
                .into_iter()
                .map(|s| s.status)
                .collect();
            if statuses.iter().any(|s| s == wanted) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        statuses
    }

    #[tokio::test]
    async fn test_unknown_target_is_not_found() {
        let (runner, _, _) = runner("true");
        let run = PlaybookRun {
            playbook: playbook(),
            user: User::new("admin"),
            target: Some(vec!["ghost".to_string()]),
            extra_vars: vec![],
            mode: ExecutionMode::Apply,
        };
        assert_eq!(runner.execute(run).await.unwrap_err().code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_target_without_credentials_is_rejected() {
        let (runner, _, store) = runner("true");
        store.devices.update(Device::new("dev-1", "10.0.0.1", DeviceStatus::Online)).await.unwrap();
        let run = PlaybookRun {
            playbook: playbook(),
            user: User::new("admin"),
            target: Some(vec!["dev-1".to_string()]),
            extra_vars: vec![],
            mode: ExecutionMode::Apply,
        };
        assert_eq!(runner.execute(run).await.unwrap_err().code(), "CONFIGURATION_ERROR");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_process_records_lifecycle() {
        // `echo` prints its arguments and exits 0
        let (runner, tracker, _) = runner("echo");
        let ident = runner
            .execute_on_inventory(playbook(), User::new("admin"), Inventory::default())
            .await
            .unwrap();

        let statuses = wait_for_status(&tracker, &ident, "successful").await;
        assert_eq!(statuses, vec!["starting", "running", "successful"]);
        let logs = tracker.get_logs(&ident).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].stdout.contains("ping.yml"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_process_records_failed() {
        let (runner, tracker, _) = runner("false");
        let ident = runner
            .execute_on_inventory(playbook(), User::new("admin"), Inventory::default())
            .await
            .unwrap();

        let statuses = wait_for_status(&tracker, &ident, "failed").await;
        assert_eq!(statuses.last().map(String::as_str), Some("failed"));
    }

    #[tokio::test]
    async fn test_missing_binary_records_failed() {
        let (runner, tracker, _) = runner("fleetd-no-such-binary");
        let ident = runner
            .execute_on_inventory(playbook(), User::new("admin"), Inventory::default())
            .await
            .unwrap();

        let statuses = wait_for_status(&tracker, &ident, "failed").await;
        assert_eq!(statuses, vec!["starting", "failed"]);
    }
}

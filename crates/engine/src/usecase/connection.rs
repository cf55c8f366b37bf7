//! Connectivity checks for the automation channel and the container runtime.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::automation::{AdHocTarget, Inventory};
use crate::client::{with_timeout, ConnectionOptions, RuntimeError, RuntimeOps};
use crate::context::EngineContext;
use crate::error::{EngineError, Result};
use crate::model::{Device, DeviceAuth, ExecutionMode, User};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskHandle {
    pub task_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Successful,
    Failed,
}

/// Outcome of a runtime probe. Probes report failures here, never as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub status: ProbeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProbeResult {
    fn successful() -> Self {
        Self {
            status: ProbeStatus::Successful,
            message: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Failed,
            message: Some(message.into()),
        }
    }

    pub fn is_successful(&self) -> bool {
        self.status == ProbeStatus::Successful
    }
}

impl EngineContext {
    /// Run the check playbook in check mode against a registered device.
    pub async fn check_device_ansible_connection(&self, user: &User, device_uuid: &str) -> Result<TaskHandle> {
        self.store
            .devices
            .find_one_by_uuid(device_uuid)
            .await?
            .ok_or_else(|| EngineError::not_found("Device", device_uuid))?;
        let playbook = self.playbooks.find_check_playbook().await?;
        let task_id = self
            .playbooks
            .execute_playbook(
                &playbook,
                user,
                Some(vec![device_uuid.to_string()]),
                vec![],
                ExecutionMode::Check,
            )
            .await?;
        Ok(TaskHandle { task_id })
    }

    /// Run the check playbook against a host that is not registered yet.
    pub async fn check_ansible_connection(&self, user: &User, target: &AdHocTarget) -> Result<TaskHandle> {
        let playbook = self.playbooks.find_check_playbook().await?;
        let (device, auth) = target.to_transient(&self.vault)?;
        let inventory = Inventory::for_targets([(&device, &auth)])?;
        let task_id = self.playbooks.execute_on_inventory(&playbook, user, inventory).await?;
        Ok(TaskHandle { task_id })
    }

    pub async fn check_device_docker_connection(&self, device_uuid: &str) -> ProbeResult {
        let loaded = async {
            let device = self
                .store
                .devices
                .find_one_by_uuid(device_uuid)
                .await?
                .ok_or_else(|| EngineError::not_found("Device", device_uuid))?;
            let auth = self
                .store
                .auths
                .find_one_by_device(device_uuid)
                .await?
                .ok_or_else(|| EngineError::Configuration(format!("Device {} has no credentials", device_uuid)))?;
            Ok::<_, EngineError>((device, auth))
        }
        .await;

        match loaded {
            Ok((device, auth)) => self.probe_runtime(&device, &auth).await,
            Err(e) => ProbeResult::failed(e.to_string()),
        }
    }

    /// Probe a runtime from ad-hoc credentials without storing anything.
    pub async fn check_docker_connection(&self, target: &AdHocTarget) -> ProbeResult {
        match target.to_transient(&self.vault) {
            Ok((device, auth)) => self.probe_runtime(&device, &auth).await,
            Err(e) => ProbeResult::failed(e.to_string()),
        }
    }

    async fn probe_runtime(&self, device: &Device, auth: &DeviceAuth) -> ProbeResult {
        let options = match ConnectionOptions::resolve(device, auth, &self.vault, &self.config.runtime) {
            Ok(options) => options,
            Err(e) => return ProbeResult::failed(e.to_string()),
        };
        let limit = self.config.runtime.operation_timeout();

        let probe = async {
            let ops: Arc<dyn RuntimeOps> = with_timeout(limit, "connect", self.connector.connect(&options)).await?;
            with_timeout(limit, "ping", ops.ping()).await?;
            with_timeout(limit, "info", ops.info()).await?;
            Ok::<_, RuntimeError>(())
        };

        match probe.await {
            Ok(()) => {
                info!(device_uuid = %device.uuid, host = options.host(), "✓ Runtime reachable");
                ProbeResult::successful()
            }
            Err(e) => {
                warn!(device_uuid = %device.uuid, host = options.host(), "Runtime probe failed: {}", e);
                ProbeResult::failed(e.to_string())
            }
        }
    }
}

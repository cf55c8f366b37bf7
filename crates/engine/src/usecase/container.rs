use tracing::debug;

use crate::context::EngineContext;
use crate::error::{EngineError, Result};
use crate::model::{Container, ContainerAction};

impl EngineContext {
    pub async fn find_container(&self, device_uuid: &str, container_id: &str) -> Result<Container> {
        self.store
            .containers
            .find_one(device_uuid, container_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Container", container_id))
    }

    /// The custom name survives every later reconciliation pass.
    pub async fn update_custom_name(&self, device_uuid: &str, container_id: &str, name: &str) -> Result<Container> {
        let mut container = self.find_container(device_uuid, container_id).await?;
        container.custom_name = Some(name.to_string()).filter(|n| !n.is_empty());
        self.store.containers.update(container.clone()).await?;
        debug!(device_uuid, container_id, "Custom name updated");
        Ok(container)
    }

    /// Dispatch a lifecycle action through the device's registered watcher.
    /// Nothing is opened when the action is unknown or no watcher exists.
    pub async fn perform_action(&self, device_uuid: &str, container_id: &str, action: &str) -> Result<()> {
        let action: ContainerAction = action.parse()?;
        let watcher = self
            .watchers
            .docker_watcher(device_uuid)
            .ok_or_else(|| EngineError::NotFound("Watcher is not registered".to_string()))?;
        watcher.perform(action, container_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;

    use crate::model::{Container, Device, DeviceAuth, DeviceStatus, WatchFlag};
    use crate::usecase::test_support::context;

    fn container(device_uuid: &str, id: &str) -> Container {
        Container {
            id: id.to_string(),
            device_uuid: device_uuid.to_string(),
            name: "web".to_string(),
            custom_name: None,
            image: "nginx:1.27".to_string(),
            state: "running".to_string(),
            status: "Up 3 hours".to_string(),
            labels: HashMap::new(),
            created: 0,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_custom_name_round_trip() {
        let (ctx, _) = context();
        ctx.store.containers.update(container("dev-1", "c1")).await.unwrap();

        ctx.update_custom_name("dev-1", "c1", "frontend").await.unwrap();
        let c = ctx.find_container("dev-1", "c1").await.unwrap();
        assert_eq!(c.custom_name.as_deref(), Some("frontend"));

        let err = ctx.update_custom_name("dev-1", "nope", "x").await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_action_without_watcher_opens_nothing() {
        let (ctx, connector) = context();
        let err = ctx.perform_action("dev-1", "c1", "restart").await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
        assert!(err.to_string().contains("Watcher is not registered"));
        assert_eq!(connector.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_action_is_rejected_first() {
        let (ctx, connector) = context();
        let err = ctx.perform_action("dev-1", "c1", "explode").await.unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_OPERATION");
        assert_eq!(connector.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_action_reaches_runtime() {
        let (ctx, connector) = context();
        let runtime = connector.runtime("10.0.0.5");
        runtime.add_container("c1", "web", "running").await;

        let mut device = Device::new("dev-1", "10.0.0.5", DeviceStatus::Online);
        device.capabilities.runtime = WatchFlag::every("1h");
        device.capabilities.stats.enabled = false;
        device.capabilities.events.enabled = false;
        ctx.store.devices.update(device.clone()).await.unwrap();
        let mut auth = DeviceAuth::new("dev-1");
        auth.ssh_user = Some("pi".to_string());
        auth.ssh_password = Some(ctx.vault.encrypt_default("raspberry").unwrap());
        ctx.store.auths.update(auth).await.unwrap();
        ctx.watchers.register_watcher(&device).await.unwrap();

        ctx.perform_action("dev-1", "c1", "STOP").await.unwrap();
        assert!(runtime.calls().await.contains(&"stop:c1".to_string()));

        let err = ctx.perform_action("dev-1", "ghost", "start").await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
        ctx.shutdown().await;
    }
}

//! Device use cases: overview, fact refresh, watcher flags, deletion.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::context::EngineContext;
use crate::error::{EngineError, Result};
use crate::model::{CapabilityFlags, Device, DeviceFacts, DeviceStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceOverviewEntry {
    pub uuid: String,
    pub name: Option<String>,
    pub status: DeviceStatus,
    pub cpu: Option<f64>,
    pub mem: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DevicesOverview {
    pub overview: Vec<DeviceOverviewEntry>,
    pub online: usize,
    pub offline: usize,
    /// GHz summed over devices, `None` when nothing reported
    pub total_cpu: Option<f64>,
    /// GB summed over devices, `None` when nothing reported
    pub total_mem: Option<f64>,
}

/// What a device agent reports about itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactsReport {
    pub ip: Option<String>,
    #[serde(flatten)]
    pub facts: DeviceFacts,
}

const RASPBIAN_LOGO: &str = "raspbian";

fn is_raspberry(facts: &DeviceFacts) -> bool {
    let contains = |field: &Option<String>, needle: &str| {
        field
            .as_deref()
            .map(|v| v.to_ascii_lowercase().contains(needle))
            .unwrap_or(false)
    };
    facts.raspberry.as_deref().is_some_and(|r| !r.is_empty())
        || contains(&facts.os_distro, "raspbian")
        || contains(&facts.os_platform, "raspberry")
}

impl EngineContext {
    async fn require_device(&self, uuid: &str) -> Result<Device> {
        self.store
            .devices
            .find_one_by_uuid(uuid)
            .await?
            .ok_or_else(|| EngineError::not_found("Device", uuid))
    }

    pub async fn devices_overview(&self) -> Result<DevicesOverview> {
        let devices = self.store.devices.find_all().await?;

        let count = |status: DeviceStatus| devices.iter().filter(|d| d.status == status).count();
        let total_cpu: f64 = devices.iter().filter_map(|d| d.facts.cpu_speed).sum();
        let total_mem: u64 = devices.iter().filter_map(|d| d.facts.mem).sum();

        Ok(DevicesOverview {
            overview: devices
                .iter()
                .map(|d| DeviceOverviewEntry {
                    uuid: d.uuid.clone(),
                    name: d.display_name(),
                    status: d.status,
                    cpu: d.facts.cpu_speed,
                    mem: d.facts.mem,
                })
                .collect(),
            online: count(DeviceStatus::Online),
            offline: count(DeviceStatus::Offline),
            total_cpu: (total_cpu > 0.0).then_some(total_cpu),
            total_mem: (total_mem > 0).then(|| total_mem as f64 / 1024.0),
        })
    }

    /// Store freshly reported facts. A device that reports is online.
    pub async fn update_device_from_facts(&self, uuid: &str, report: FactsReport) -> Result<Device> {
        let mut device = self.require_device(uuid).await?;
        debug!(device_uuid = %uuid, "Updating device facts");

        let mut facts = report.facts;
        if is_raspberry(&facts) {
            facts.os_logo = Some(RASPBIAN_LOGO.to_string());
        }
        if report.ip.is_some() {
            device.ip = report.ip;
        }
        device.facts = facts;
        if device.status != DeviceStatus::Online {
            info!(device_uuid = %uuid, from = ?device.status, "Device back online");
            device.status = DeviceStatus::Online;
        }
        self.store.devices.update(device).await
    }

    /// Replace the device's capability flags and schedules, then rebuild its
    /// watchers in the background.
    pub async fn update_docker_watcher(&self, uuid: &str, flags: CapabilityFlags) -> Result<Device> {
        let mut device = self.require_device(uuid).await?;
        device.capabilities = flags;
        let device = self.store.devices.update(device).await?;
        self.watchers.spawn_reregister(uuid);
        Ok(device)
    }

    pub async fn devices_to_watch(&self) -> Result<Vec<Device>> {
        self.store
            .devices
            .find_with_filter(&|d: &Device| d.capabilities.runtime.enabled)
            .await
    }

    pub async fn update_docker_info(&self, uuid: &str, runtime_id: &str, runtime_version: &str) -> Result<Device> {
        let mut device = self.require_device(uuid).await?;
        device.runtime_id = Some(runtime_id.to_string());
        device.runtime_version = Some(runtime_version.to_string());
        self.store.devices.update(device).await
    }

    /// Stop the device's watchers, then remove everything it owns.
    pub async fn delete_device(&self, uuid: &str) -> Result<()> {
        let device = self.require_device(uuid).await?;
        self.watchers.deregister_watcher(&device.uuid).await;

        // Re-registration reads the device under its slot: once the row is
        // gone none can be installed, and the second sweep stops any that
        // won the slot in between.
        let store = &self.store;
        store.devices.delete_by_uuid(uuid).await?;
        self.watchers.deregister_watcher(uuid).await;

        let stats = store.stats.delete_by_device(uuid).await?;
        store.auths.delete_by_device(uuid).await?;
        let containers = store.containers.delete_by_device(uuid).await?;
        store.images.delete_by_device(uuid).await?;
        store.volumes.delete_by_device(uuid).await?;
        store.networks.delete_by_device(uuid).await?;

        info!(device_uuid = %uuid, containers, stats, "Device deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::context;

    fn with_facts(uuid: &str, status: DeviceStatus, fqdn: &str, cpu: f64, mem: u64) -> Device {
        let mut d = Device::new(uuid, format!("10.0.0.{}", uuid.len()), status);
        d.facts.fqdn = Some(fqdn.to_string());
        d.facts.cpu_speed = Some(cpu);
        d.facts.mem = Some(mem);
        d
    }

    #[tokio::test]
    async fn test_overview_aggregates() {
        let (ctx, _) = context();
        ctx.store.devices.update(with_facts("a", DeviceStatus::Online, "a.lan", 1.5, 2048)).await.unwrap();
        ctx.store.devices.update(with_facts("bb", DeviceStatus::Offline, "b.lan", 2.5, 1024)).await.unwrap();
        ctx.store.devices.update(with_facts("ccc", DeviceStatus::Unmanaged, "c.lan", 0.0, 0)).await.unwrap();

        let o = ctx.devices_overview().await.unwrap();
        assert_eq!((o.online, o.offline), (1, 1));
        assert_eq!(o.total_cpu, Some(4.0));
        assert_eq!(o.total_mem, Some(3.0));
        let unmanaged = o.overview.iter().find(|e| e.uuid == "ccc").unwrap();
        assert_eq!(unmanaged.name.as_deref(), Some("10.0.0.3"));
    }

    #[tokio::test]
    async fn test_overview_totals_absent_when_zero() {
        let (ctx, _) = context();
        ctx.store.devices.update(Device::new("a", "10.0.0.1", DeviceStatus::Registering)).await.unwrap();
        let o = ctx.devices_overview().await.unwrap();
        assert_eq!(o.total_cpu, None);
        assert_eq!(o.total_mem, None);
    }

    #[tokio::test]
    async fn test_fact_refresh_forces_online_and_logo() {
        let (ctx, _) = context();
        ctx.store.devices.update(Device::new("a", "10.0.0.1", DeviceStatus::Offline)).await.unwrap();

        let mut report = FactsReport::default();
        report.ip = Some("10.0.0.99".to_string());
        report.facts.raspberry = Some("4B".to_string());
        let d = ctx.update_device_from_facts("a", report).await.unwrap();

        assert_eq!(d.status, DeviceStatus::Online);
        assert_eq!(d.ip.as_deref(), Some("10.0.0.99"));
        assert_eq!(d.facts.os_logo.as_deref(), Some("raspbian"));
    }

    #[tokio::test]
    async fn test_unknown_device_is_not_found() {
        let (ctx, _) = context();
        assert_eq!(ctx.update_docker_info("nope", "id", "27").await.unwrap_err().code(), "NOT_FOUND");
        assert_eq!(ctx.delete_device("nope").await.unwrap_err().code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_pending_reregister_does_not_revive_deleted_device() {
        let (ctx, _) = context();
        ctx.store.devices.update(Device::new("a", "10.0.0.1", DeviceStatus::Online)).await.unwrap();
        ctx.update_docker_watcher("a", CapabilityFlags::default()).await.unwrap();
        ctx.delete_device("a").await.unwrap();

        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(ctx.watchers.docker_watcher("a").is_none());
        assert!(ctx.watchers.is_empty());
    }

    #[tokio::test]
    async fn test_devices_to_watch() {
        let (ctx, _) = context();
        ctx.store.devices.update(Device::new("a", "10.0.0.1", DeviceStatus::Online)).await.unwrap();
        let mut idle = Device::new("b", "10.0.0.2", DeviceStatus::Online);
        idle.capabilities = CapabilityFlags::disabled();
        ctx.store.devices.update(idle).await.unwrap();

        let watched: Vec<String> = ctx.devices_to_watch().await.unwrap().into_iter().map(|d| d.uuid).collect();
        assert_eq!(watched, vec!["a"]);
    }
}

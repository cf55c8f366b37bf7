//! In-memory repositories.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;

use super::{
    DeviceAuthRepository, DevicePredicate, DeviceRepository, ExecutionRepository, ObjectRepository,
    PlaybookRepository, StatsRepository,
};
use crate::error::Result;
use crate::model::{
    AutomationTask, ContainerStat, Device, DeviceAuth, ExecutionLog, ExecutionStatus, Playbook,
    RuntimeObject,
};

// ── Devices ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryDevices {
    devices: DashMap<String, Device>,
}

#[async_trait]
impl DeviceRepository for MemoryDevices {
    async fn find_one_by_uuid(&self, uuid: &str) -> Result<Option<Device>> {
        Ok(self.devices.get(uuid).map(|d| d.clone()))
    }

    async fn find_all(&self) -> Result<Vec<Device>> {
        let mut all: Vec<Device> = self.devices.iter().map(|d| d.value().clone()).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.uuid.cmp(&b.uuid)));
        Ok(all)
    }

    async fn find_with_filter(&self, predicate: DevicePredicate<'_>) -> Result<Vec<Device>> {
        let mut all = self.find_all().await?;
        all.retain(|d| predicate(d));
        Ok(all)
    }

    async fn update(&self, mut device: Device) -> Result<Device> {
        device.updated_at = Utc::now();
        self.devices.insert(device.uuid.clone(), device.clone());
        Ok(device)
    }

    async fn delete_by_uuid(&self, uuid: &str) -> Result<bool> {
        Ok(self.devices.remove(uuid).is_some())
    }
}

// ── Device auth ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryDeviceAuths {
    auths: DashMap<String, DeviceAuth>,
}

#[async_trait]
impl DeviceAuthRepository for MemoryDeviceAuths {
    async fn find_one_by_device(&self, device_uuid: &str) -> Result<Option<DeviceAuth>> {
        Ok(self.auths.get(device_uuid).map(|a| a.clone()))
    }

    async fn update(&self, auth: DeviceAuth) -> Result<DeviceAuth> {
        self.auths.insert(auth.device_uuid.clone(), auth.clone());
        Ok(auth)
    }

    async fn delete_by_device(&self, device_uuid: &str) -> Result<bool> {
        Ok(self.auths.remove(device_uuid).is_some())
    }
}

// ── Runtime objects ─────────────────────────────────────────────

/// One generic table for every [`RuntimeObject`] kind.
pub struct MemoryObjects<T: RuntimeObject> {
    rows: DashMap<(String, String), T>,
}

impl<T: RuntimeObject> Default for MemoryObjects<T> {
    fn default() -> Self {
        Self { rows: DashMap::new() }
    }
}

fn key_of<T: RuntimeObject>(object: &T) -> (String, String) {
    (object.device_uuid().to_string(), object.object_id().to_string())
}

fn sorted<T: RuntimeObject>(mut objects: Vec<T>) -> Vec<T> {
    objects.sort_by(|a, b| {
        a.device_uuid()
            .cmp(b.device_uuid())
            .then_with(|| a.object_id().cmp(b.object_id()))
    });
    objects
}

#[async_trait]
impl<T: RuntimeObject> ObjectRepository<T> for MemoryObjects<T> {
    async fn find_all(&self) -> Result<Vec<T>> {
        Ok(sorted(self.rows.iter().map(|r| r.value().clone()).collect()))
    }

    async fn find_by_device(&self, device_uuid: &str) -> Result<Vec<T>> {
        Ok(sorted(
            self.rows
                .iter()
                .filter(|r| r.key().0 == device_uuid)
                .map(|r| r.value().clone())
                .collect(),
        ))
    }

    async fn find_one(&self, device_uuid: &str, id: &str) -> Result<Option<T>> {
        Ok(self
            .rows
            .get(&(device_uuid.to_string(), id.to_string()))
            .map(|r| r.clone()))
    }

    async fn upsert_many(&self, objects: Vec<T>) -> Result<()> {
        for object in objects {
            self.rows.insert(key_of(&object), object);
        }
        Ok(())
    }

    async fn update(&self, object: T) -> Result<()> {
        self.rows.insert(key_of(&object), object);
        Ok(())
    }

    async fn delete_many(&self, device_uuid: &str, ids: &[String]) -> Result<usize> {
        let mut removed = 0;
        for id in ids {
            if self.rows.remove(&(device_uuid.to_string(), id.clone())).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn delete_by_device(&self, device_uuid: &str) -> Result<usize> {
        let before = self.rows.len();
        self.rows.retain(|(device, _), _| device != device_uuid);
        Ok(before - self.rows.len())
    }
}

// ── Stats ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStats {
    samples: Mutex<Vec<ContainerStat>>,
}

#[async_trait]
impl StatsRepository for MemoryStats {
    async fn insert_many(&self, stats: Vec<ContainerStat>) -> Result<()> {
        self.samples.lock().extend(stats);
        Ok(())
    }

    async fn find_by_container(&self, device_uuid: &str, container_id: &str) -> Result<Vec<ContainerStat>> {
        Ok(self
            .samples
            .lock()
            .iter()
            .filter(|s| s.device_uuid == device_uuid && s.container_id == container_id)
            .cloned()
            .collect())
    }

    async fn delete_by_container(&self, device_uuid: &str, container_id: &str) -> Result<usize> {
        let mut samples = self.samples.lock();
        let before = samples.len();
        samples.retain(|s| !(s.device_uuid == device_uuid && s.container_id == container_id));
        Ok(before - samples.len())
    }

    async fn delete_by_device(&self, device_uuid: &str) -> Result<usize> {
        let mut samples = self.samples.lock();
        let before = samples.len();
        samples.retain(|s| s.device_uuid != device_uuid);
        Ok(before - samples.len())
    }
}

// ── Executions ──────────────────────────────────────────────────

#[derive(Default)]
struct ExecutionTables {
    tasks: HashMap<String, AutomationTask>,
    logs: HashMap<String, Vec<ExecutionLog>>,
    statuses: HashMap<String, Vec<ExecutionStatus>>,
}

#[derive(Default)]
pub struct MemoryExecutions {
    tables: Mutex<ExecutionTables>,
}

#[async_trait]
impl ExecutionRepository for MemoryExecutions {
    async fn create_task(&self, task: AutomationTask) -> Result<()> {
        self.tables.lock().tasks.insert(task.ident.clone(), task);
        Ok(())
    }

    async fn find_task(&self, ident: &str) -> Result<Option<AutomationTask>> {
        Ok(self.tables.lock().tasks.get(ident).cloned())
    }

    async fn update_task_status(&self, ident: &str, status: &str) -> Result<()> {
        if let Some(task) = self.tables.lock().tasks.get_mut(ident) {
            task.status = status.to_string();
        }
        Ok(())
    }

    async fn append_log(&self, ident: &str, stdout: &str) -> Result<ExecutionLog> {
        let mut tables = self.tables.lock();
        let lines = tables.logs.entry(ident.to_string()).or_default();
        let line = ExecutionLog {
            ident: ident.to_string(),
            seq: lines.len() as u64,
            stdout: stdout.to_string(),
            created_at: Utc::now(),
        };
        lines.push(line.clone());
        Ok(line)
    }

    async fn append_status(&self, ident: &str, status: &str) -> Result<ExecutionStatus> {
        let entry = ExecutionStatus {
            ident: ident.to_string(),
            status: status.to_string(),
            created_at: Utc::now(),
        };
        self.tables
            .lock()
            .statuses
            .entry(ident.to_string())
            .or_default()
            .push(entry.clone());
        Ok(entry)
    }

    async fn find_logs_by_ident(&self, ident: &str) -> Result<Vec<ExecutionLog>> {
        Ok(self.tables.lock().logs.get(ident).cloned().unwrap_or_default())
    }

    async fn find_statuses_by_ident(&self, ident: &str) -> Result<Vec<ExecutionStatus>> {
        Ok(self.tables.lock().statuses.get(ident).cloned().unwrap_or_default())
    }
}

// ── Playbooks ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryPlaybooks {
    playbooks: DashMap<String, Playbook>,
}

#[async_trait]
impl PlaybookRepository for MemoryPlaybooks {
    async fn find_one_by_uuid(&self, uuid: &str) -> Result<Option<Playbook>> {
        Ok(self.playbooks.get(uuid).map(|p| p.clone()))
    }

    async fn find_one_by_quick_ref(&self, quick_ref: &str) -> Result<Option<Playbook>> {
        Ok(self
            .playbooks
            .iter()
            .find(|p| p.quick_ref.as_deref() == Some(quick_ref))
            .map(|p| p.value().clone()))
    }

    async fn save(&self, playbook: Playbook) -> Result<()> {
        self.playbooks.insert(playbook.uuid.clone(), playbook);
        Ok(())
    }
}

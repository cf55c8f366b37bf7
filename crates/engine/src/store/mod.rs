//! Storage-agnostic repositories.
//!
//! The engine treats the store as crash-consistent and synchronous per
//! call, with no transaction spanning more than one entity. `memory`
//! provides the reference implementation used by the daemon's seed file
//! and by tests.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{
    AutomationTask, Container, ContainerImage, ContainerNetwork, ContainerStat, ContainerVolume,
    Device, DeviceAuth, ExecutionLog, ExecutionStatus, Playbook, RuntimeObject,
};

pub use memory::{
    MemoryDeviceAuths, MemoryDevices, MemoryExecutions, MemoryObjects, MemoryPlaybooks,
    MemoryStats,
};

pub type DevicePredicate<'a> = &'a (dyn Fn(&Device) -> bool + Send + Sync);

#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn find_one_by_uuid(&self, uuid: &str) -> Result<Option<Device>>;
    async fn find_all(&self) -> Result<Vec<Device>>;
    async fn find_with_filter(&self, predicate: DevicePredicate<'_>) -> Result<Vec<Device>>;
    /// Insert or replace by uuid.
    async fn update(&self, device: Device) -> Result<Device>;
    async fn delete_by_uuid(&self, uuid: &str) -> Result<bool>;
}

#[async_trait]
pub trait DeviceAuthRepository: Send + Sync {
    async fn find_one_by_device(&self, device_uuid: &str) -> Result<Option<DeviceAuth>>;
    /// Insert or replace by device uuid.
    async fn update(&self, auth: DeviceAuth) -> Result<DeviceAuth>;
    async fn delete_by_device(&self, device_uuid: &str) -> Result<bool>;
}

/// Containers, images, volumes and networks, keyed by `(device_uuid, id)`.
#[async_trait]
pub trait ObjectRepository<T: RuntimeObject>: Send + Sync {
    async fn find_all(&self) -> Result<Vec<T>>;
    async fn find_by_device(&self, device_uuid: &str) -> Result<Vec<T>>;
    async fn find_one(&self, device_uuid: &str, id: &str) -> Result<Option<T>>;
    async fn upsert_many(&self, objects: Vec<T>) -> Result<()>;
    async fn update(&self, object: T) -> Result<()>;
    async fn delete_many(&self, device_uuid: &str, ids: &[String]) -> Result<usize>;
    async fn delete_by_device(&self, device_uuid: &str) -> Result<usize>;
}

#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn insert_many(&self, stats: Vec<ContainerStat>) -> Result<()>;
    async fn find_by_container(&self, device_uuid: &str, container_id: &str) -> Result<Vec<ContainerStat>>;
    async fn delete_by_container(&self, device_uuid: &str, container_id: &str) -> Result<usize>;
    async fn delete_by_device(&self, device_uuid: &str) -> Result<usize>;
}

/// Append-only execution records keyed by execution id.
#[async_trait]
pub trait ExecutionRepository: Send + Sync {
    async fn create_task(&self, task: AutomationTask) -> Result<()>;
    async fn find_task(&self, ident: &str) -> Result<Option<AutomationTask>>;
    async fn update_task_status(&self, ident: &str, status: &str) -> Result<()>;
    async fn append_log(&self, ident: &str, stdout: &str) -> Result<ExecutionLog>;
    async fn append_status(&self, ident: &str, status: &str) -> Result<ExecutionStatus>;
    async fn find_logs_by_ident(&self, ident: &str) -> Result<Vec<ExecutionLog>>;
    async fn find_statuses_by_ident(&self, ident: &str) -> Result<Vec<ExecutionStatus>>;
}

#[async_trait]
pub trait PlaybookRepository: Send + Sync {
    async fn find_one_by_uuid(&self, uuid: &str) -> Result<Option<Playbook>>;
    async fn find_one_by_quick_ref(&self, quick_ref: &str) -> Result<Option<Playbook>>;
    async fn save(&self, playbook: Playbook) -> Result<()>;
}

/// Every repository the engine touches, behind trait objects.
#[derive(Clone)]
pub struct Store {
    pub devices: Arc<dyn DeviceRepository>,
    pub auths: Arc<dyn DeviceAuthRepository>,
    pub containers: Arc<dyn ObjectRepository<Container>>,
    pub images: Arc<dyn ObjectRepository<ContainerImage>>,
    pub volumes: Arc<dyn ObjectRepository<ContainerVolume>>,
    pub networks: Arc<dyn ObjectRepository<ContainerNetwork>>,
    pub stats: Arc<dyn StatsRepository>,
    pub executions: Arc<dyn ExecutionRepository>,
    pub playbooks: Arc<dyn PlaybookRepository>,
}

impl Store {
    pub fn in_memory() -> Self {
        Self {
            devices: Arc::new(MemoryDevices::default()),
            auths: Arc::new(MemoryDeviceAuths::default()),
            containers: Arc::new(MemoryObjects::<Container>::default()),
            images: Arc::new(MemoryObjects::<ContainerImage>::default()),
            volumes: Arc::new(MemoryObjects::<ContainerVolume>::default()),
            networks: Arc::new(MemoryObjects::<ContainerNetwork>::default()),
            stats: Arc::new(MemoryStats::default()),
            executions: Arc::new(MemoryExecutions::default()),
            playbooks: Arc::new(MemoryPlaybooks::default()),
        }
    }
}

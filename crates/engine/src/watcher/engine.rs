//! Watcher engine: the registry of live components, at most one per
//! `(kind, provider, device)` key.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::component::{build_id, Component, ComponentKey, Kind, Provider};
use super::docker::{DockerWatcher, WatcherDeps};
use crate::error::Result;
use crate::model::Device;

/// Snapshot of the registry. Entries are live references.
#[derive(Debug, Clone, Default)]
pub struct WatcherStates {
    pub watcher: HashMap<ComponentKey, Component>,
}

pub struct WatcherEngine {
    deps: WatcherDeps,
    components: DashMap<ComponentKey, Component>,
    // Serialises register/deregister per key
    slots: DashMap<ComponentKey, Arc<Mutex<()>>>,
}

impl WatcherEngine {
    pub fn new(deps: WatcherDeps) -> Self {
        Self {
            deps,
            components: DashMap::new(),
            slots: DashMap::new(),
        }
    }

    fn slot(&self, key: &ComponentKey) -> Arc<Mutex<()>> {
        self.slots
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the key's slot once nobody else holds or waits on it.
    fn release_slot(&self, key: &ComponentKey) {
        self.slots.remove_if(key, |_, slot| Arc::strong_count(slot) == 1);
    }

    /// Remove and stop the instance under `key`. Caller holds the slot.
    async fn evict(&self, key: &ComponentKey) -> bool {
        match self.components.remove(key) {
            Some((_, component)) => {
                component.deregister().await;
                true
            }
            None => false,
        }
    }

    /// Build and start the device's instance under `key`. Caller holds the slot.
    fn install(&self, key: &ComponentKey, device: &Device) -> Result<Option<ComponentKey>> {
        if !device.capabilities.any_enabled() {
            debug!(key = %key, "No capability enabled, not registering");
            return Ok(None);
        }

        let watcher = DockerWatcher::new(key.clone(), device, self.deps.clone());
        let component = Component::Docker(Arc::new(watcher));
        component.init()?;
        self.components.insert(key.clone(), component);

        info!(
            key = %key,
            capabilities = ?device.capabilities.enabled(),
            "✓ Watcher registered"
        );
        Ok(Some(key.clone()))
    }

    /// Register the device's docker watcher, replacing any existing instance.
    /// Returns `None` when the device has no capability enabled.
    pub async fn register_watcher(&self, device: &Device) -> Result<Option<ComponentKey>> {
        let key = build_id(Kind::Watcher, Provider::Docker, &device.uuid);
        let slot = self.slot(&key);
        let guard = slot.lock().await;

        if self.evict(&key).await {
            debug!(key = %key, "Replacing registered watcher");
        }
        let registered = self.install(&key, device);

        drop(guard);
        drop(slot);
        if !matches!(registered, Ok(Some(_))) {
            self.release_slot(&key);
        }
        registered
    }

    /// Rebuild the device's watcher from the device as stored once the slot
    /// is held. A device deleted meanwhile, or with nothing enabled, ends up
    /// with no watcher.
    pub async fn reregister(&self, device_uuid: &str) -> Result<Option<ComponentKey>> {
        let key = build_id(Kind::Watcher, Provider::Docker, device_uuid);
        let slot = self.slot(&key);
        let guard = slot.lock().await;

        self.evict(&key).await;
        let registered = match self.deps.store.devices.find_one_by_uuid(device_uuid).await {
            Ok(Some(device)) => self.install(&key, &device),
            Ok(None) => {
                debug!(device_uuid = %device_uuid, "Device gone, nothing to re-register");
                Ok(None)
            }
            Err(e) => Err(e),
        };

        drop(guard);
        drop(slot);
        if !matches!(registered, Ok(Some(_))) {
            self.release_slot(&key);
        }
        registered
    }

    /// Register every stored device with at least one capability enabled.
    /// A device that fails to register is logged and skipped.
    pub async fn register_watchers(&self) -> Result<usize> {
        let devices = self
            .deps
            .store
            .devices
            .find_with_filter(&|d: &Device| d.capabilities.any_enabled())
            .await?;

        let mut registered = 0;
        for device in &devices {
            match self.register_watcher(device).await {
                Ok(Some(_)) => registered += 1,
                Ok(None) => {}
                Err(e) => warn!(device_uuid = %device.uuid, "Failed to register watcher: {}", e),
            }
        }
        info!("✓ {} watcher(s) registered", registered);
        Ok(registered)
    }

    async fn deregister_key(&self, key: &ComponentKey) -> bool {
        let slot = self.slot(key);
        let guard = slot.lock().await;
        let removed = self.evict(key).await;
        drop(guard);
        drop(slot);
        self.release_slot(key);
        removed
    }

    /// Remove every watcher of the device. No-op when none is registered.
    pub async fn deregister_watcher(&self, device_uuid: &str) -> usize {
        let mut removed = 0;
        for provider in Provider::ALL {
            let key = build_id(Kind::Watcher, provider, device_uuid);
            if self.deregister_key(&key).await {
                removed += 1;
            }
        }
        removed
    }

    pub async fn deregister_watchers(&self) -> usize {
        let keys: Vec<ComponentKey> = self.components.iter().map(|e| e.key().clone()).collect();
        let mut removed = 0;
        for key in &keys {
            if self.deregister_key(key).await {
                removed += 1;
            }
        }
        if removed > 0 {
            info!("✓ {} watcher(s) deregistered", removed);
        }
        removed
    }

    pub fn get_states(&self) -> WatcherStates {
        WatcherStates {
            watcher: self
                .components
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
        }
    }

    pub fn docker_watcher(&self, device_uuid: &str) -> Option<Arc<DockerWatcher>> {
        let key = build_id(Kind::Watcher, Provider::Docker, device_uuid);
        self.components
            .get(&key)
            .and_then(|c| c.as_docker().cloned())
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    // ── Background re-registration ──────────────────────────────

    /// Drop and rebuild the device's watchers from its current stored state.
    /// Errors are logged, never returned.
    pub fn spawn_reregister(self: &Arc<Self>, device_uuid: &str) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        let device_uuid = device_uuid.to_string();
        tokio::spawn(async move {
            if let Err(e) = engine.reregister(&device_uuid).await {
                error!(device_uuid = %device_uuid, "Re-registration failed: {}", e);
            }
        })
    }
}

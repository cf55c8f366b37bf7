//! Docker watcher: keeps one device's stored runtime objects in sync with
//! what its daemon reports.
//!
//! Each enabled capability gets its own loop:
//! - **runtime-watch** enumerates containers, images, volumes and networks
//!   and reconciles the store by mark-and-sweep
//! - **stats-watch** samples every stored running container once
//! - **events-watch** follows the daemon's event stream and triggers an
//!   out-of-band runtime-watch pass on container events
//!
//! Passes of one capability never overlap: a pass that finds the previous one
//! still running is skipped. Every remote call runs under the configured
//! ceiling. A failed pass drops the cached channel, writes nothing, and emits
//! exactly one failure event. After [`DockerWatcher::deregister`] nothing is
//! written or emitted, even by a pass that was already in flight.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bollard::models::SystemInfo;
use futures_util::stream::StreamExt;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::component::ComponentKey;
use super::map;
use super::schedule::Schedule;
use crate::client::ops::with_timeout;
use crate::client::{ConnectionOptions, RuntimeConnector, RuntimeError, RuntimeOps};
use crate::conf::RuntimeConfig;
use crate::error::{EngineError, Result};
use crate::events::{EventBus, EventKind, Payload};
use crate::model::{
    Capability, CapabilityFlags, Container, ContainerAction, ContainerImage, ContainerNetwork,
    ContainerStat, ContainerVolume, Device, RuntimeObject,
};
use crate::store::{ObjectRepository, Store};
use crate::vault::Vault;

const MODULE: &str = "DockerWatcher";

/// Collaborators shared by every watcher instance.
#[derive(Clone)]
pub struct WatcherDeps {
    pub store: Store,
    pub vault: Arc<Vault>,
    pub bus: Arc<EventBus>,
    pub connector: Arc<dyn RuntimeConnector>,
    pub settings: RuntimeConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Completed,
    /// The previous pass of the same capability was still running
    Skipped,
    Failed,
    /// The watcher was deregistered before the result could be written
    Discarded,
}

struct Observed {
    containers: Vec<Container>,
    images: Vec<ContainerImage>,
    volumes: Vec<ContainerVolume>,
    networks: Vec<ContainerNetwork>,
    info: SystemInfo,
}

pub struct DockerWatcher {
    key: ComponentKey,
    device_uuid: String,
    capabilities: CapabilityFlags,
    deps: WatcherDeps,
    channel: parking_lot::Mutex<Option<Arc<dyn RuntimeOps>>>,
    live: RwLock<bool>,
    started: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    runtime_pass: Mutex<()>,
    stats_pass: Mutex<()>,
    tasks: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl DockerWatcher {
    pub fn new(key: ComponentKey, device: &Device, deps: WatcherDeps) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            key,
            device_uuid: device.uuid.clone(),
            capabilities: device.capabilities.clone(),
            deps,
            channel: parking_lot::Mutex::new(None),
            live: RwLock::new(true),
            started: AtomicBool::new(false),
            shutdown_tx,
            runtime_pass: Mutex::new(()),
            stats_pass: Mutex::new(()),
            tasks: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn key(&self) -> &ComponentKey {
        &self.key
    }

    pub fn device_uuid(&self) -> &str {
        &self.device_uuid
    }

    pub fn capabilities(&self) -> &CapabilityFlags {
        &self.capabilities
    }

    pub async fn is_live(&self) -> bool {
        *self.live.read().await
    }

    /// Number of background loops currently attached.
    pub fn loop_count(&self) -> usize {
        self.tasks.lock().iter().filter(|t| !t.is_finished()).count()
    }

    fn schedule_for(&self, capability: Capability) -> Result<Schedule> {
        let fallback = match capability {
            Capability::RuntimeWatch => &self.deps.settings.default_watch_schedule,
            Capability::StatsWatch => &self.deps.settings.default_stats_schedule,
            Capability::EventsWatch => {
                return match &self.capabilities.events.schedule {
                    Some(expr) => Schedule::parse(expr),
                    None => Ok(Schedule::every(Duration::from_secs(
                        self.deps.settings.events_reconnect_secs,
                    ))),
                };
            }
        };
        let expr = self.capabilities.get(capability).schedule.as_ref().unwrap_or(fallback);
        Schedule::parse(expr)
    }

    /// Spawn one loop per enabled capability. Schedules are validated before
    /// anything is spawned. Calling it again is a no-op.
    pub fn init(self: &Arc<Self>) -> Result<()> {
        let capabilities = self.capabilities.enabled();
        let mut plan = Vec::with_capacity(capabilities.len());
        for capability in capabilities {
            plan.push((capability, self.schedule_for(capability)?));
        }

        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut tasks = self.tasks.lock();
        for (capability, schedule) in plan {
            let shutdown = self.shutdown_tx.subscribe();
            let watcher = Arc::clone(self);
            let handle = match capability {
                Capability::EventsWatch => tokio::spawn(watcher.run_events(schedule, shutdown)),
                _ => tokio::spawn(watcher.run_periodic(capability, schedule, shutdown)),
            };
            debug!(key = %self.key, capability = %capability, schedule = %schedule, "Watcher loop started");
            tasks.push(handle);
        }
        Ok(())
    }

    /// Close the live gate, then stop every loop. Waits for an in-flight
    /// write-back to finish; later write-backs are discarded.
    pub async fn deregister(&self) {
        {
            let mut live = self.live.write().await;
            if !*live {
                return;
            }
            *live = false;
        }
        let _ = self.shutdown_tx.send(true);
        for handle in self.tasks.lock().drain(..) {
            handle.abort();
        }
        self.drop_channel();
        info!(key = %self.key, "Watcher deregistered");
    }

    // ── Loops ───────────────────────────────────────────────────

    async fn run_periodic(
        self: Arc<Self>,
        capability: Capability,
        schedule: Schedule,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut interval = time::interval(schedule.interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let outcome = match capability {
                        Capability::StatsWatch => self.stats_now().await,
                        _ => self.reconcile_now().await,
                    };
                    debug!(key = %self.key, capability = %capability, ?outcome, "Pass finished");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    async fn run_events(self: Arc<Self>, reconnect: Schedule, mut shutdown: watch::Receiver<bool>) {
        loop {
            match self.follow_events(&mut shutdown).await {
                Ok(()) => break,
                Err(e) => {
                    self.drop_channel();
                    if self.report(EventKind::RuntimeWatchFailed, &e).await == PassOutcome::Discarded {
                        break;
                    }
                }
            }

            tokio::select! {
                _ = time::sleep(reconnect.interval()) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    /// Returns `Ok` only on shutdown.
    async fn follow_events(&self, shutdown: &mut watch::Receiver<bool>) -> Result<()> {
        let ops = self.channel().await?;
        let mut stream = with_timeout(self.limit(), "events", ops.stream_events()).await?;

        loop {
            tokio::select! {
                item = stream.next() => match item {
                    Some(Ok(event)) => {
                        debug!(
                            key = %self.key,
                            action = event.action.as_deref().unwrap_or("unknown"),
                            "Container event, reconciling"
                        );
                        self.reconcile_now().await;
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        return Err(EngineError::Connectivity("event stream closed by daemon".to_string()))
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return Ok(());
                    }
                }
            }
        }
    }

    // ── Passes ──────────────────────────────────────────────────

    /// Run one runtime-watch pass now.
    pub async fn reconcile_now(&self) -> PassOutcome {
        let Ok(_pass) = self.runtime_pass.try_lock() else {
            debug!(key = %self.key, "Runtime pass still running, skipping");
            return PassOutcome::Skipped;
        };
        if !self.is_live().await {
            return PassOutcome::Discarded;
        }

        let observed = match self.observe().await {
            Ok(observed) => observed,
            Err(e) => {
                self.drop_channel();
                return self.report(EventKind::RuntimeWatchFailed, &e).await;
            }
        };

        let live = self.live.read().await;
        if !*live {
            debug!(key = %self.key, "Watcher deregistered mid-pass, discarding result");
            return PassOutcome::Discarded;
        }
        match self.write_back(observed).await {
            Ok(()) => PassOutcome::Completed,
            Err(e) => {
                drop(live);
                self.report(EventKind::RuntimeWatchFailed, &e).await
            }
        }
    }

    /// Run one stats-watch pass now.
    pub async fn stats_now(&self) -> PassOutcome {
        let Ok(_pass) = self.stats_pass.try_lock() else {
            debug!(key = %self.key, "Stats pass still running, skipping");
            return PassOutcome::Skipped;
        };
        if !self.is_live().await {
            return PassOutcome::Discarded;
        }

        let samples = match self.sample().await {
            Ok(samples) => samples,
            Err(e) => {
                self.drop_channel();
                return self.report(EventKind::RuntimeStatFailed, &e).await;
            }
        };

        let live = self.live.read().await;
        if !*live {
            return PassOutcome::Discarded;
        }
        if samples.is_empty() {
            return PassOutcome::Completed;
        }
        match self.deps.store.stats.insert_many(samples).await {
            Ok(()) => PassOutcome::Completed,
            Err(e) => {
                drop(live);
                self.report(EventKind::RuntimeStatFailed, &e).await
            }
        }
    }

    /// Dispatch a lifecycle action. Stored state is left to the next pass.
    pub async fn perform(&self, action: ContainerAction, container_id: &str) -> Result<()> {
        let ops = self.channel().await?;
        let limit = self.limit();
        let result = match action {
            ContainerAction::Kill => with_timeout(limit, "kill", ops.kill_container(container_id)).await,
            ContainerAction::Pause => with_timeout(limit, "pause", ops.pause_container(container_id)).await,
            ContainerAction::Restart => {
                with_timeout(limit, "restart", ops.restart_container(container_id)).await
            }
            ContainerAction::Stop => with_timeout(limit, "stop", ops.stop_container(container_id)).await,
            ContainerAction::Start => with_timeout(limit, "start", ops.start_container(container_id)).await,
        };

        match result {
            Ok(()) => {
                info!(key = %self.key, container_id, action = action.as_str(), "Container action dispatched");
                Ok(())
            }
            Err(RuntimeError::ContainerNotFound(id)) => Err(EngineError::not_found("Container", &id)),
            Err(e) => {
                self.drop_channel();
                Err(e.into())
            }
        }
    }

    // ── Internals ───────────────────────────────────────────────

    fn limit(&self) -> Duration {
        self.deps.settings.operation_timeout()
    }

    fn drop_channel(&self) {
        self.channel.lock().take();
    }

    /// Emit one failure event unless the watcher is gone.
    async fn report(&self, kind: EventKind, err: &EngineError) -> PassOutcome {
        let live = self.live.read().await;
        if !*live {
            return PassOutcome::Discarded;
        }
        warn!(key = %self.key, device_uuid = %self.device_uuid, event = %kind, "Watcher pass failed: {}", err);
        self.deps
            .bus
            .emit(kind, Payload::error(MODULE, &self.device_uuid, err.to_string()));
        PassOutcome::Failed
    }

    /// Cached channel, or a fresh one built from the device's credentials.
    /// Either way it must answer `ping`.
    async fn channel(&self) -> Result<Arc<dyn RuntimeOps>> {
        let cached = self.channel.lock().clone();
        let ops = match cached {
            Some(ops) => ops,
            None => {
                let store = &self.deps.store;
                let device = store
                    .devices
                    .find_one_by_uuid(&self.device_uuid)
                    .await?
                    .ok_or_else(|| EngineError::not_found("Device", &self.device_uuid))?;
                let auth = store
                    .auths
                    .find_one_by_device(&self.device_uuid)
                    .await?
                    .ok_or_else(|| {
                        EngineError::Configuration(format!("Device {} has no credentials", self.device_uuid))
                    })?;
                let options = ConnectionOptions::resolve(&device, &auth, &self.deps.vault, &self.deps.settings)?;
                with_timeout(self.limit(), "connect", self.deps.connector.connect(&options)).await?
            }
        };

        with_timeout(self.limit(), "ping", ops.ping()).await?;
        *self.channel.lock() = Some(Arc::clone(&ops));
        Ok(ops)
    }

    async fn observe(&self) -> Result<Observed> {
        let ops = self.channel().await?;
        let limit = self.limit();
        let uuid = self.device_uuid.as_str();

        let containers = with_timeout(limit, "list_containers", ops.list_containers()).await?;
        let images = with_timeout(limit, "list_images", ops.list_images()).await?;
        let volumes = with_timeout(limit, "list_volumes", ops.list_volumes()).await?;
        let networks = with_timeout(limit, "list_networks", ops.list_networks()).await?;
        let info = with_timeout(limit, "info", ops.info()).await?;

        Ok(Observed {
            containers: containers.into_iter().map(|c| map::container(uuid, c)).collect(),
            images: images.into_iter().map(|i| map::image(uuid, i)).collect(),
            volumes: volumes.into_iter().map(|v| map::volume(uuid, v)).collect(),
            networks: networks.into_iter().map(|n| map::network(uuid, n)).collect(),
            info,
        })
    }

    async fn write_back(&self, observed: Observed) -> Result<()> {
        let store = &self.deps.store;
        let uuid = self.device_uuid.as_str();

        // User-assigned names survive re-observation
        let stored = store.containers.find_by_device(uuid).await?;
        let custom: HashMap<String, Option<String>> =
            stored.iter().map(|c| (c.id.clone(), c.custom_name.clone())).collect();
        let mut containers = observed.containers;
        for container in &mut containers {
            if let Some(name) = custom.get(&container.id) {
                container.custom_name = name.clone();
            }
        }

        let removed = sweep(store.containers.as_ref(), uuid, stored.into_iter().map(|c| c.id), containers).await?;
        for container_id in &removed {
            store.stats.delete_by_container(uuid, container_id).await?;
        }

        let stale_images = store.images.find_by_device(uuid).await?.into_iter().map(|i| i.id);
        sweep(store.images.as_ref(), uuid, stale_images, observed.images).await?;
        let stale_volumes = store.volumes.find_by_device(uuid).await?.into_iter().map(|v| v.name);
        sweep(store.volumes.as_ref(), uuid, stale_volumes, observed.volumes).await?;
        let stale_networks = store.networks.find_by_device(uuid).await?.into_iter().map(|n| n.id);
        sweep(store.networks.as_ref(), uuid, stale_networks, observed.networks).await?;

        if let Some(mut device) = store.devices.find_one_by_uuid(uuid).await? {
            if device.runtime_id != observed.info.id || device.runtime_version != observed.info.server_version {
                device.runtime_id = observed.info.id;
                device.runtime_version = observed.info.server_version;
                store.devices.update(device).await?;
            }
        }

        if !removed.is_empty() {
            debug!(key = %self.key, removed = removed.len(), "Tombstoned vanished containers");
        }
        Ok(())
    }

    async fn sample(&self) -> Result<Vec<ContainerStat>> {
        let running: Vec<Container> = self
            .deps
            .store
            .containers
            .find_by_device(&self.device_uuid)
            .await?
            .into_iter()
            .filter(Container::is_running)
            .collect();
        if running.is_empty() {
            return Ok(Vec::new());
        }

        let ops = self.channel().await?;
        let mut samples = Vec::with_capacity(running.len());
        for container in &running {
            match with_timeout(self.limit(), "stats", ops.container_stats(&container.id)).await {
                Ok(stats) => samples.push(map::stat(&self.device_uuid, &container.id, &stats)),
                // Removed since the last runtime pass
                Err(RuntimeError::ContainerNotFound(id)) => {
                    debug!(key = %self.key, container_id = %id, "Container vanished before sampling");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(samples)
    }
}

/// Mark-and-sweep: upsert everything observed, delete what was stored but
/// not observed. Returns the deleted ids.
async fn sweep<T>(
    repo: &dyn ObjectRepository<T>,
    device_uuid: &str,
    stored_ids: impl Iterator<Item = String>,
    observed: Vec<T>,
) -> Result<Vec<String>>
where
    T: RuntimeObject,
{
    let seen: HashSet<&str> = observed.iter().map(|o| o.object_id()).collect();
    let stale: Vec<String> = stored_ids.filter(|id| !seen.contains(id.as_str())).collect();

    repo.upsert_many(observed).await?;
    if !stale.is_empty() {
        repo.delete_many(device_uuid, &stale).await?;
    }
    Ok(stale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FakeConnector;
    use crate::model::{DeviceAuth, DeviceStatus, WatchFlag};
    use crate::vault::DEFAULT_VAULT_ID;
    use crate::watcher::component::{build_id, Kind, Provider};
    use std::sync::Mutex as StdMutex;

    struct Harness {
        store: Store,
        connector: Arc<FakeConnector>,
        events: Arc<StdMutex<Vec<(EventKind, Payload)>>>,
        deps: WatcherDeps,
    }

    fn harness() -> Harness {
        let store = Store::in_memory();
        let vault = Arc::new(Vault::new("docker-watcher-test-secret", DEFAULT_VAULT_ID));
        let bus = Arc::new(EventBus::new());
        let events = Arc::new(StdMutex::new(Vec::new()));
        for kind in [EventKind::RuntimeWatchFailed, EventKind::RuntimeStatFailed] {
            let sink = Arc::clone(&events);
            bus.on(kind, move |k, p| {
                sink.lock().unwrap().push((k, p.clone()));
                Ok(())
            });
        }
        let connector = Arc::new(FakeConnector::new());
        let deps = WatcherDeps {
            store: store.clone(),
            vault,
            bus,
            connector: connector.clone(),
            settings: RuntimeConfig::default(),
        };
        Harness { store, connector, events, deps }
    }

    async fn enroll(h: &Harness, uuid: &str, ip: &str) -> Device {
        let mut device = Device::new(uuid, ip, DeviceStatus::Online);
        device.capabilities = CapabilityFlags::disabled();
        device.capabilities.runtime = WatchFlag::enabled();
        let device = h.store.devices.update(device).await.unwrap();

        let mut auth = DeviceAuth::new(uuid);
        auth.ssh_user = Some("pi".to_string());
        auth.ssh_password = Some(h.deps.vault.encrypt_default("raspberry").unwrap());
        h.store.auths.update(auth).await.unwrap();
        device
    }

    fn watcher(h: &Harness, device: &Device) -> Arc<DockerWatcher> {
        let key = build_id(Kind::Watcher, Provider::Docker, &device.uuid);
        Arc::new(DockerWatcher::new(key, device, h.deps.clone()))
    }

    #[tokio::test]
    async fn test_pass_syncs_objects_and_runtime_facts() {
        let h = harness();
        let device = enroll(&h, "dev-1", "10.0.0.1").await;
        let runtime = h.connector.runtime("10.0.0.1");
        runtime.add_container("c1", "web", "running").await;
        runtime.add_container("c2", "db", "exited").await;

        let w = watcher(&h, &device);
        assert_eq!(w.reconcile_now().await, PassOutcome::Completed);

        let stored = h.store.containers.find_by_device("dev-1").await.unwrap();
        assert_eq!(stored.len(), 2);
        let refreshed = h.store.devices.find_one_by_uuid("dev-1").await.unwrap().unwrap();
        assert_eq!(refreshed.runtime_id.as_deref(), Some("FAKE:RUNTIME:ID"));
        assert_eq!(refreshed.runtime_version.as_deref(), Some("27.0.0-fake"));
    }

    #[tokio::test]
    async fn test_custom_name_survives_reconciliation() {
        let h = harness();
        let device = enroll(&h, "dev-1", "10.0.0.1").await;
        h.connector.runtime("10.0.0.1").add_container("c1", "web", "running").await;

        let w = watcher(&h, &device);
        w.reconcile_now().await;
        let mut c = h.store.containers.find_one("dev-1", "c1").await.unwrap().unwrap();
        c.custom_name = Some("frontend".to_string());
        h.store.containers.update(c).await.unwrap();

        assert_eq!(w.reconcile_now().await, PassOutcome::Completed);
        let c = h.store.containers.find_one("dev-1", "c1").await.unwrap().unwrap();
        assert_eq!(c.custom_name.as_deref(), Some("frontend"));
    }

    #[tokio::test]
    async fn test_missing_credentials_emit_one_event() {
        let h = harness();
        let device = h.store.devices.update(Device::new("dev-9", "10.0.0.9", DeviceStatus::Online)).await.unwrap();

        let w = watcher(&h, &device);
        assert_eq!(w.reconcile_now().await, PassOutcome::Failed);

        let events = h.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, EventKind::RuntimeWatchFailed);
        assert_eq!(events[0].1.module, "DockerWatcher");
        assert_eq!(events[0].1.module_id.as_deref(), Some("dev-9"));
    }

    #[tokio::test]
    async fn test_stats_pass_samples_running_containers_only() {
        let h = harness();
        let device = enroll(&h, "dev-1", "10.0.0.1").await;
        let runtime = h.connector.runtime("10.0.0.1");
        runtime.add_container("c1", "web", "running").await;
        runtime.add_container("c2", "db", "exited").await;

        let w = watcher(&h, &device);
        w.reconcile_now().await;
        assert_eq!(w.stats_now().await, PassOutcome::Completed);

        assert_eq!(h.store.stats.find_by_container("dev-1", "c1").await.unwrap().len(), 1);
        assert!(h.store.stats.find_by_container("dev-1", "c2").await.unwrap().is_empty());
        assert!(runtime.calls().await.contains(&"stats:c1".to_string()));
    }

    #[tokio::test]
    async fn test_stats_failure_emits_stat_event() {
        let h = harness();
        let device = enroll(&h, "dev-1", "10.0.0.1").await;
        let runtime = h.connector.runtime("10.0.0.1");
        runtime.add_container("c1", "web", "running").await;

        let w = watcher(&h, &device);
        w.reconcile_now().await;
        runtime.fail_with("connection reset").await;
        assert_eq!(w.stats_now().await, PassOutcome::Failed);

        let events = h.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, EventKind::RuntimeStatFailed);
        assert!(events[0].1.message.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_deregister_is_idempotent_and_stops_loops() {
        let h = harness();
        let device = enroll(&h, "dev-1", "10.0.0.1").await;
        h.connector.runtime("10.0.0.1");

        let w = watcher(&h, &device);
        w.init().unwrap();
        assert_eq!(w.loop_count(), 1);

        w.deregister().await;
        w.deregister().await;
        assert!(!w.is_live().await);
        assert_eq!(w.loop_count(), 0);
        assert_eq!(w.reconcile_now().await, PassOutcome::Discarded);
    }

    #[tokio::test]
    async fn test_invalid_schedule_rejected_at_init() {
        let h = harness();
        let mut device = enroll(&h, "dev-1", "10.0.0.1").await;
        device.capabilities.runtime = WatchFlag::every("whenever");

        let w = watcher(&h, &device);
        assert_eq!(w.init().unwrap_err().code(), "CONFIGURATION_ERROR");
        assert_eq!(w.loop_count(), 0);
    }

    #[tokio::test]
    async fn test_action_on_missing_container_is_not_found() {
        let h = harness();
        let device = enroll(&h, "dev-1", "10.0.0.1").await;
        h.connector.runtime("10.0.0.1");

        let w = watcher(&h, &device);
        let err = w.perform(ContainerAction::Start, "ghost").await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }
}

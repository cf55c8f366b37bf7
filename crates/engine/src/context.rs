use std::sync::Arc;

use tracing::info;

use crate::automation::{ExecutionTracker, PlaybookRunner, PlaybookService};
use crate::client::RuntimeConnector;
use crate::conf::{AutomationConfig, EngineConfig};
use crate::error::Result;
use crate::events::EventBus;
use crate::notify::NotificationCenter;
use crate::store::Store;
use crate::vault::Vault;
use crate::watcher::{WatcherDeps, WatcherEngine};

/// What a playbook runner backend may need to build itself.
pub struct RunnerParts {
    pub store: Store,
    pub vault: Arc<Vault>,
    pub bus: Arc<EventBus>,
    pub tracker: Arc<ExecutionTracker>,
    pub automation: AutomationConfig,
}

/// Shared engine state (thread-safe). Every use case hangs off this.
#[derive(Clone)]
pub struct EngineContext {
    pub config: Arc<EngineConfig>,
    pub vault: Arc<Vault>,
    pub bus: Arc<EventBus>,
    pub store: Store,
    pub connector: Arc<dyn RuntimeConnector>,
    pub watchers: Arc<WatcherEngine>,
    pub tracker: Arc<ExecutionTracker>,
    pub playbooks: Arc<PlaybookService>,
    pub notifications: Arc<NotificationCenter>,
}

impl EngineContext {
    /// Wire every component. Event subscriptions are made here, so events
    /// emitted before [`EngineContext::start`] are already tracked.
    pub fn new<F>(config: EngineConfig, store: Store, connector: Arc<dyn RuntimeConnector>, make_runner: F) -> Self
    where
        F: FnOnce(&RunnerParts) -> Arc<dyn PlaybookRunner>,
    {
        let vault = Arc::new(Vault::from_config(&config.vault));
        let bus = Arc::new(EventBus::new());

        let tracker = Arc::new(ExecutionTracker::new(store.executions.clone()));
        tracker.subscribe(&bus);

        let notifications = Arc::new(NotificationCenter::new(config.notifications.capacity));
        notifications.subscribe(&bus);

        let runner = make_runner(&RunnerParts {
            store: store.clone(),
            vault: vault.clone(),
            bus: bus.clone(),
            tracker: tracker.clone(),
            automation: config.automation.clone(),
        });
        let playbooks = Arc::new(PlaybookService::new(
            store.playbooks.clone(),
            runner,
            tracker.clone(),
            config.automation.check_playbook_ref.clone(),
        ));

        let watchers = Arc::new(WatcherEngine::new(WatcherDeps {
            store: store.clone(),
            vault: vault.clone(),
            bus: bus.clone(),
            connector: connector.clone(),
            settings: config.runtime.clone(),
        }));

        Self {
            config: Arc::new(config),
            vault,
            bus,
            store,
            connector,
            watchers,
            tracker,
            playbooks,
            notifications,
        }
    }

    /// Register watchers for every device that has monitoring enabled.
    pub async fn start(&self) -> Result<usize> {
        info!("Starting watcher engine...");
        let registered = self.watchers.register_watchers().await?;
        info!("✓ Watcher engine started ({} watcher(s))", registered);
        Ok(registered)
    }

    /// Stop every watcher. In-flight passes write nothing.
    pub async fn shutdown(&self) {
        let stopped = self.watchers.deregister_watchers().await;
        info!("✓ Watcher engine stopped ({} watcher(s))", stopped);
    }
}

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use engine::automation::{Inventory, PlaybookRun, PlaybookRunner};
use engine::client::FakeConnector;
use engine::conf::EngineConfig;
use engine::events::{EventKind, Payload};
use engine::model::{CapabilityFlags, Device, DeviceAuth, DeviceStatus, Playbook, User, WatchFlag};
use engine::store::Store;
use engine::EngineContext;

/// Hands out `exec-<n>` ids and remembers what it was asked to run.
#[derive(Default)]
pub struct CountingRunner {
    next: AtomicUsize,
    pub runs: Mutex<Vec<PlaybookRun>>,
    pub inventories: Mutex<Vec<Inventory>>,
}

#[async_trait]
impl PlaybookRunner for CountingRunner {
    async fn execute(&self, run: PlaybookRun) -> engine::Result<String> {
        self.runs.lock().unwrap().push(run);
        Ok(format!("exec-{}", self.next.fetch_add(1, Ordering::SeqCst)))
    }

    async fn execute_on_inventory(&self, _: Playbook, _: User, inventory: Inventory) -> engine::Result<String> {
        self.inventories.lock().unwrap().push(inventory);
        Ok(format!("exec-{}", self.next.fetch_add(1, Ordering::SeqCst)))
    }
}

pub struct Fixture {
    pub ctx: EngineContext,
    pub connector: Arc<FakeConnector>,
    pub runner: Arc<CountingRunner>,
    pub events: Arc<Mutex<Vec<(EventKind, Payload)>>>,
}

pub fn fixture() -> Fixture {
    let mut config = EngineConfig::default();
    config.vault.secret = "integration-test-secret".to_string();
    config.runtime.operation_timeout_secs = 1;

    let connector = Arc::new(FakeConnector::new());
    let runner = Arc::new(CountingRunner::default());
    let handed = runner.clone();
    let ctx = EngineContext::new(config, Store::in_memory(), connector.clone(), move |_| {
        handed as Arc<dyn PlaybookRunner>
    });

    let events = Arc::new(Mutex::new(Vec::new()));
    for kind in [EventKind::RuntimeWatchFailed, EventKind::RuntimeStatFailed] {
        let sink = events.clone();
        ctx.bus.on(kind, move |k, p| {
            sink.lock().unwrap().push((k, p.clone()));
            Ok(())
        });
    }

    Fixture { ctx, connector, runner, events }
}

/// A device with only runtime-watch enabled, on an hourly schedule so the
/// loop's first tick is the only automatic pass.
pub async fn enroll(f: &Fixture, uuid: &str, ip: &str) -> Device {
    let mut device = Device::new(uuid, ip, DeviceStatus::Online);
    device.capabilities = CapabilityFlags::disabled();
    device.capabilities.runtime = WatchFlag::every("1h");
    let device = f.ctx.store.devices.update(device).await.unwrap();

    let mut auth = DeviceAuth::new(uuid);
    auth.ssh_user = Some("pi".to_string());
    auth.ssh_password = Some(f.ctx.vault.encrypt_default("raspberry").unwrap());
    f.ctx.store.auths.update(auth).await.unwrap();
    device
}

pub fn check_playbook() -> Playbook {
    Playbook {
        uuid: "pb-check".to_string(),
        name: "Check device".to_string(),
        path: "_checkDeviceBeforeAdd.yml".to_string(),
        quick_ref: Some("checkDeviceBeforeAdd".to_string()),
    }
}

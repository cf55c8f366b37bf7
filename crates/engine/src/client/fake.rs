//! Fake: test double for a device's container runtime.
//!
//! [`FakeRuntime`] implements [`RuntimeOps`] over in-memory state and can be
//! told to fail or to stall. [`FakeConnector`] hands out fake runtimes by
//! host, and refuses hosts it does not know.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bollard::models::{
    ContainerStatsResponse, ContainerSummary, ContainerSummaryStateEnum, EventMessage,
    ImageSummary, Network, SystemInfo, Volume,
};
use dashmap::DashMap;
use tokio::sync::Mutex;

use super::connect::{ConnectFuture, RuntimeConnector};
use super::error::RuntimeError;
use super::ops::{EventStream, OpFuture, RuntimeOps};
use super::options::ConnectionOptions;

// ── In-memory state ─────────────────────────────────────────────

#[derive(Default)]
struct Inner {
    containers: Vec<ContainerSummary>,
    images: Vec<ImageSummary>,
    volumes: Vec<Volume>,
    networks: Vec<Network>,
    info: SystemInfo,
    stats: HashMap<String, ContainerStatsResponse>,
    events: Vec<EventMessage>,
    failure: Option<String>,
    delay: Option<Duration>,
    calls: Vec<String>,
}

/// A fake runtime for deterministic testing.
pub struct FakeRuntime {
    inner: Mutex<Inner>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        let info = SystemInfo {
            id: Some("FAKE:RUNTIME:ID".to_string()),
            server_version: Some("27.0.0-fake".to_string()),
            ..Default::default()
        };
        Self { inner: Mutex::new(Inner { info, ..Default::default() }) }
    }

    /// Seed a container with the given state (`running`, `exited`, ...).
    pub async fn add_container(&self, id: &str, name: &str, state: &str) {
        let summary = ContainerSummary {
            id: Some(id.to_string()),
            names: Some(vec![format!("/{}", name)]),
            image: Some("nginx:latest".to_string()),
            state: Some(parse_state(state)),
            status: Some(format!("{} (fake)", state)),
            created: Some(1_700_000_000),
            ..Default::default()
        };
        self.inner.lock().await.containers.push(summary);
    }

    pub async fn remove_container(&self, id: &str) {
        self.inner
            .lock()
            .await
            .containers
            .retain(|c| c.id.as_deref() != Some(id));
    }

    pub async fn add_image(&self, image: ImageSummary) {
        self.inner.lock().await.images.push(image);
    }

    pub async fn add_volume(&self, volume: Volume) {
        self.inner.lock().await.volumes.push(volume);
    }

    pub async fn add_network(&self, network: Network) {
        self.inner.lock().await.networks.push(network);
    }

    pub async fn set_stats(&self, container_id: &str, stats: ContainerStatsResponse) {
        self.inner.lock().await.stats.insert(container_id.to_string(), stats);
    }

    pub async fn push_event(&self, event: EventMessage) {
        self.inner.lock().await.events.push(event);
    }

    /// Make every subsequent call fail with `message`.
    pub async fn fail_with(&self, message: &str) {
        self.inner.lock().await.failure = Some(message.to_string());
    }

    pub async fn heal(&self) {
        self.inner.lock().await.failure = None;
    }

    /// Stall every subsequent call for `delay` before answering.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        self.inner.lock().await.delay = delay;
    }

    /// Names of the calls received so far, oldest first.
    pub async fn calls(&self) -> Vec<String> {
        self.inner.lock().await.calls.clone()
    }

    async fn enter(&self, call: String) -> Result<(), RuntimeError> {
        let delay = {
            let mut state = self.inner.lock().await;
            state.calls.push(call);
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match &self.inner.lock().await.failure {
            Some(message) => Err(RuntimeError::ConnectionFailed(message.clone())),
            None => Ok(()),
        }
    }

    async fn set_state(
        &self,
        call: &str,
        container_id: &str,
        state: ContainerSummaryStateEnum,
    ) -> Result<(), RuntimeError> {
        self.enter(format!("{}:{}", call, container_id)).await?;
        let mut inner = self.inner.lock().await;
        let container = inner
            .containers
            .iter_mut()
            .find(|c| c.id.as_deref() == Some(container_id))
            .ok_or_else(|| RuntimeError::ContainerNotFound(container_id.to_string()))?;
        container.state = Some(state);
        Ok(())
    }
}

fn parse_state(state: &str) -> ContainerSummaryStateEnum {
    match state {
        "created" => ContainerSummaryStateEnum::CREATED,
        "running" => ContainerSummaryStateEnum::RUNNING,
        "paused" => ContainerSummaryStateEnum::PAUSED,
        "restarting" => ContainerSummaryStateEnum::RESTARTING,
        "removing" => ContainerSummaryStateEnum::REMOVING,
        "dead" => ContainerSummaryStateEnum::DEAD,
        _ => ContainerSummaryStateEnum::EXITED,
    }
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

// ── RuntimeOps implementation ───────────────────────────────────

impl RuntimeOps for FakeRuntime {
    fn ping(&self) -> OpFuture<'_, ()> {
        Box::pin(self.enter("ping".to_string()))
    }

    fn info(&self) -> OpFuture<'_, SystemInfo> {
        Box::pin(async move {
            self.enter("info".to_string()).await?;
            Ok(self.inner.lock().await.info.clone())
        })
    }

    fn list_containers(&self) -> OpFuture<'_, Vec<ContainerSummary>> {
        Box::pin(async move {
            self.enter("list_containers".to_string()).await?;
            Ok(self.inner.lock().await.containers.clone())
        })
    }

    fn list_images(&self) -> OpFuture<'_, Vec<ImageSummary>> {
        Box::pin(async move {
            self.enter("list_images".to_string()).await?;
            Ok(self.inner.lock().await.images.clone())
        })
    }

    fn list_volumes(&self) -> OpFuture<'_, Vec<Volume>> {
        Box::pin(async move {
            self.enter("list_volumes".to_string()).await?;
            Ok(self.inner.lock().await.volumes.clone())
        })
    }

    fn list_networks(&self) -> OpFuture<'_, Vec<Network>> {
        Box::pin(async move {
            self.enter("list_networks".to_string()).await?;
            Ok(self.inner.lock().await.networks.clone())
        })
    }

    fn container_stats<'a>(&'a self, container_id: &'a str) -> OpFuture<'a, ContainerStatsResponse> {
        Box::pin(async move {
            self.enter(format!("stats:{}", container_id)).await?;
            Ok(self
                .inner
                .lock()
                .await
                .stats
                .get(container_id)
                .cloned()
                .unwrap_or_default())
        })
    }

    fn stream_events(&self) -> OpFuture<'_, EventStream<'_>> {
        Box::pin(async move {
            self.enter("events".to_string()).await?;
            let backlog = std::mem::take(&mut self.inner.lock().await.events);
            let queued: Vec<Result<EventMessage, RuntimeError>> = backlog.into_iter().map(Ok).collect();
            // Like the daemon, the stream stays open after the backlog
            let stream = futures_util::stream::StreamExt::chain(
                futures_util::stream::iter(queued),
                futures_util::stream::pending(),
            );
            Ok(Box::pin(stream) as EventStream<'_>)
        })
    }

    fn kill_container<'a>(&'a self, container_id: &'a str) -> OpFuture<'a, ()> {
        Box::pin(self.set_state("kill", container_id, ContainerSummaryStateEnum::EXITED))
    }

    fn pause_container<'a>(&'a self, container_id: &'a str) -> OpFuture<'a, ()> {
        Box::pin(self.set_state("pause", container_id, ContainerSummaryStateEnum::PAUSED))
    }

    fn restart_container<'a>(&'a self, container_id: &'a str) -> OpFuture<'a, ()> {
        Box::pin(self.set_state("restart", container_id, ContainerSummaryStateEnum::RUNNING))
    }

    fn stop_container<'a>(&'a self, container_id: &'a str) -> OpFuture<'a, ()> {
        Box::pin(self.set_state("stop", container_id, ContainerSummaryStateEnum::EXITED))
    }

    fn start_container<'a>(&'a self, container_id: &'a str) -> OpFuture<'a, ()> {
        Box::pin(self.set_state("start", container_id, ContainerSummaryStateEnum::RUNNING))
    }
}

// ── Connector ───────────────────────────────────────────────────

/// Resolves hosts to registered fake runtimes.
#[derive(Default)]
pub struct FakeConnector {
    runtimes: DashMap<String, Arc<FakeRuntime>>,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or fetch) the fake runtime answering for `host`.
    pub fn runtime(&self, host: &str) -> Arc<FakeRuntime> {
        self.runtimes
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(FakeRuntime::new()))
            .clone()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl RuntimeConnector for FakeConnector {
    fn connect<'a>(&'a self, options: &'a ConnectionOptions) -> ConnectFuture<'a> {
        Box::pin(async move {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let host = options.host();
            match self.runtimes.get(host) {
                Some(runtime) => Ok(runtime.clone() as Arc<dyn RuntimeOps>),
                None => Err(RuntimeError::ConnectionFailed(format!(
                    "connect ECONNREFUSED {}",
                    host
                ))),
            }
        })
    }
}

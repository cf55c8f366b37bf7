//! RuntimeOps: abstract interface over one device's container runtime.
//!
//! `live.rs` implements it for the Bollard-backed [`RuntimeClient`](super::runtime::RuntimeClient).
//! `fake.rs` provides an in-memory double for tests.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bollard::models::{
    ContainerStatsResponse, ContainerSummary, EventMessage, ImageSummary, Network, SystemInfo,
    Volume,
};

use super::error::RuntimeError;

pub type OpFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RuntimeError>> + Send + 'a>>;

pub type EventStream<'a> =
    Pin<Box<dyn tokio_stream::Stream<Item = Result<EventMessage, RuntimeError>> + Send + 'a>>;

/// Object-safe so a watcher can cache an `Arc<dyn RuntimeOps>` per device.
pub trait RuntimeOps: Send + Sync {
    // ── Health ──────────────────────────────────────────────────

    fn ping(&self) -> OpFuture<'_, ()>;

    fn info(&self) -> OpFuture<'_, SystemInfo>;

    // ── Enumeration ─────────────────────────────────────────────

    fn list_containers(&self) -> OpFuture<'_, Vec<ContainerSummary>>;

    fn list_images(&self) -> OpFuture<'_, Vec<ImageSummary>>;

    fn list_volumes(&self) -> OpFuture<'_, Vec<Volume>>;

    fn list_networks(&self) -> OpFuture<'_, Vec<Network>>;

    // ── Stats & events ──────────────────────────────────────────

    /// One sample (non-streaming) for a container.
    fn container_stats<'a>(&'a self, container_id: &'a str) -> OpFuture<'a, ContainerStatsResponse>;

    fn stream_events(&self) -> OpFuture<'_, EventStream<'_>>;

    // ── Container lifecycle ─────────────────────────────────────

    fn kill_container<'a>(&'a self, container_id: &'a str) -> OpFuture<'a, ()>;

    fn pause_container<'a>(&'a self, container_id: &'a str) -> OpFuture<'a, ()>;

    fn restart_container<'a>(&'a self, container_id: &'a str) -> OpFuture<'a, ()>;

    fn stop_container<'a>(&'a self, container_id: &'a str) -> OpFuture<'a, ()>;

    fn start_container<'a>(&'a self, container_id: &'a str) -> OpFuture<'a, ()>;
}

/// Run a remote operation under the configured ceiling. Elapsing maps to
/// [`RuntimeError::Timeout`].
pub async fn with_timeout<T, F>(limit: Duration, operation: &str, fut: F) -> Result<T, RuntimeError>
where
    F: Future<Output = Result<T, RuntimeError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(RuntimeError::Timeout {
            operation: operation.to_string(),
            secs: limit.as_secs(),
        }),
    }
}

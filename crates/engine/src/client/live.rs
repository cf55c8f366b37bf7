//! Live: implements `RuntimeOps` for the Bollard-backed `RuntimeClient`.

use bollard::models::{
    ContainerStatsResponse, ContainerSummary, ImageSummary, Network, SystemInfo, Volume,
};

use super::ops::{EventStream, OpFuture, RuntimeOps};
use super::runtime::RuntimeClient;

impl RuntimeOps for RuntimeClient {
    // ── Health ──────────────────────────────────────────────────

    fn ping(&self) -> OpFuture<'_, ()> {
        Box::pin(RuntimeClient::ping(self))
    }

    fn info(&self) -> OpFuture<'_, SystemInfo> {
        Box::pin(self.system_info())
    }

    // ── Enumeration ─────────────────────────────────────────────

    fn list_containers(&self) -> OpFuture<'_, Vec<ContainerSummary>> {
        Box::pin(RuntimeClient::list_containers(self))
    }

    fn list_images(&self) -> OpFuture<'_, Vec<ImageSummary>> {
        Box::pin(RuntimeClient::list_images(self))
    }

    fn list_volumes(&self) -> OpFuture<'_, Vec<Volume>> {
        Box::pin(RuntimeClient::list_volumes(self))
    }

    fn list_networks(&self) -> OpFuture<'_, Vec<Network>> {
        Box::pin(RuntimeClient::list_networks(self))
    }

    // ── Stats & events ──────────────────────────────────────────

    fn container_stats<'a>(&'a self, container_id: &'a str) -> OpFuture<'a, ContainerStatsResponse> {
        Box::pin(self.stats_once(container_id))
    }

    fn stream_events(&self) -> OpFuture<'_, EventStream<'_>> {
        Box::pin(async move { Ok(Box::pin(self.container_events()) as EventStream<'_>) })
    }

    // ── Container lifecycle ─────────────────────────────────────

    fn kill_container<'a>(&'a self, container_id: &'a str) -> OpFuture<'a, ()> {
        Box::pin(RuntimeClient::kill_container(self, container_id))
    }

    fn pause_container<'a>(&'a self, container_id: &'a str) -> OpFuture<'a, ()> {
        Box::pin(RuntimeClient::pause_container(self, container_id))
    }

    fn restart_container<'a>(&'a self, container_id: &'a str) -> OpFuture<'a, ()> {
        Box::pin(RuntimeClient::restart_container(self, container_id))
    }

    fn stop_container<'a>(&'a self, container_id: &'a str) -> OpFuture<'a, ()> {
        Box::pin(RuntimeClient::stop_container(self, container_id))
    }

    fn start_container<'a>(&'a self, container_id: &'a str) -> OpFuture<'a, ()> {
        Box::pin(RuntimeClient::start_container(self, container_id))
    }
}

//! Runtime client: Bollard connection to one device, plus the resources
//! (ssh tunnel, TLS material on disk) that must live as long as it does.

use std::collections::HashMap;
use std::path::Path;

use bollard::models::{
    ContainerStatsResponse, ContainerSummary, EventMessage, ImageSummary, Network, SystemInfo,
    Volume,
};
use bollard::query_parameters::{
    EventsOptionsBuilder, KillContainerOptions, ListContainersOptions, ListImagesOptions,
    ListNetworksOptions, ListVolumesOptions, RestartContainerOptions, StartContainerOptions,
    StatsOptions, StopContainerOptions,
};
use bollard::Docker;
use futures_util::stream::StreamExt;
use tempfile::TempDir;

use super::error::RuntimeError;
use super::tunnel::SshTunnel;

pub struct RuntimeClient {
    pub(super) client: Docker,
    endpoint: String,
    _tunnel: Option<SshTunnel>,
    _material: Option<TempDir>,
}

impl std::fmt::Debug for RuntimeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl RuntimeClient {
    pub fn over_socket(socket_path: &str, timeout_secs: u64) -> Result<Self, RuntimeError> {
        let clean_path = socket_path.trim_start_matches("unix://");
        let client = Docker::connect_with_socket(clean_path, timeout_secs, &bollard::API_DEFAULT_VERSION)
            .map_err(|e| RuntimeError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("unix://{}", clean_path),
            _tunnel: None,
            _material: None,
        })
    }

    /// Talks to the remote daemon through the local end of an ssh forward.
    pub fn over_tunnel(tunnel: SshTunnel, timeout_secs: u64) -> Result<Self, RuntimeError> {
        let socket = tunnel.local_socket().display().to_string();
        let client = Docker::connect_with_socket(&socket, timeout_secs, &bollard::API_DEFAULT_VERSION)
            .map_err(|e| RuntimeError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("ssh://{}", tunnel.destination()),
            _tunnel: Some(tunnel),
            _material: None,
        })
    }

    /// `material` must contain `ca.pem`, `cert.pem` and `key.pem`.
    pub fn over_tls(host: &str, port: u16, material: TempDir, timeout_secs: u64) -> Result<Self, RuntimeError> {
        let addr = if host.contains(':') {
            format!("tcp://[{}]:{}", host, port)
        } else {
            format!("tcp://{}:{}", host, port)
        };
        let dir: &Path = material.path();
        let client = Docker::connect_with_ssl(
            &addr,
            &dir.join("key.pem"),
            &dir.join("cert.pem"),
            &dir.join("ca.pem"),
            timeout_secs,
            &bollard::API_DEFAULT_VERSION,
        )
        .map_err(|e| RuntimeError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: addr,
            _tunnel: None,
            _material: Some(material),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    // ── Health ──────────────────────────────────────────────────

    pub async fn ping(&self) -> Result<(), RuntimeError> {
        self.client.ping().await?;
        Ok(())
    }

    pub async fn system_info(&self) -> Result<SystemInfo, RuntimeError> {
        self.client.info().await.map_err(RuntimeError::from)
    }

    // ── Enumeration ─────────────────────────────────────────────

    pub async fn list_containers(&self) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let options = Some(ListContainersOptions {
            all: true,
            ..Default::default()
        });
        self.client.list_containers(options).await.map_err(RuntimeError::from)
    }

    pub async fn list_images(&self) -> Result<Vec<ImageSummary>, RuntimeError> {
        let options = Some(ListImagesOptions {
            all: false,
            ..Default::default()
        });
        self.client.list_images(options).await.map_err(RuntimeError::from)
    }

    pub async fn list_volumes(&self) -> Result<Vec<Volume>, RuntimeError> {
        let response = self
            .client
            .list_volumes(None::<ListVolumesOptions>)
            .await?;
        Ok(response.volumes.unwrap_or_default())
    }

    pub async fn list_networks(&self) -> Result<Vec<Network>, RuntimeError> {
        self.client
            .list_networks(None::<ListNetworksOptions>)
            .await
            .map_err(RuntimeError::from)
    }

    // ── Stats & events ──────────────────────────────────────────

    /// Single non-streaming sample. The daemon waits for a second reading
    /// so `precpu_stats` is populated.
    pub async fn stats_once(&self, container_id: &str) -> Result<ContainerStatsResponse, RuntimeError> {
        let options = Some(StatsOptions {
            stream: false,
            ..Default::default()
        });
        let mut stream = self.client.stats(container_id, options);
        match stream.next().await {
            Some(Ok(stats)) => Ok(stats),
            Some(Err(e)) => Err(RuntimeError::for_container(e, container_id)),
            None => Err(RuntimeError::ConnectionFailed(format!(
                "stats stream for {} closed without a sample",
                container_id
            ))),
        }
    }

    /// Container lifecycle events from the daemon.
    pub fn container_events(
        &self,
    ) -> impl futures_util::Stream<Item = Result<EventMessage, RuntimeError>> + '_ {
        let mut filters = HashMap::new();
        filters.insert("type", vec!["container"]);
        let options = EventsOptionsBuilder::default().filters(&filters).build();

        self.client
            .events(Some(options))
            .map(|r| r.map_err(RuntimeError::from))
    }

    // ── Container lifecycle ─────────────────────────────────────

    pub async fn kill_container(&self, container_id: &str) -> Result<(), RuntimeError> {
        self.client
            .kill_container(container_id, None::<KillContainerOptions>)
            .await
            .map_err(|e| RuntimeError::for_container(e, container_id))
    }

    pub async fn pause_container(&self, container_id: &str) -> Result<(), RuntimeError> {
        self.client
            .pause_container(container_id)
            .await
            .map_err(|e| RuntimeError::for_container(e, container_id))
    }

    pub async fn restart_container(&self, container_id: &str) -> Result<(), RuntimeError> {
        self.client
            .restart_container(container_id, None::<RestartContainerOptions>)
            .await
            .map_err(|e| RuntimeError::for_container(e, container_id))
    }

    pub async fn stop_container(&self, container_id: &str) -> Result<(), RuntimeError> {
        self.client
            .stop_container(container_id, None::<StopContainerOptions>)
            .await
            .map_err(|e| RuntimeError::for_container(e, container_id))
    }

    pub async fn start_container(&self, container_id: &str) -> Result<(), RuntimeError> {
        self.client
            .start_container(container_id, None::<StartContainerOptions>)
            .await
            .map_err(|e| RuntimeError::for_container(e, container_id))
    }
}

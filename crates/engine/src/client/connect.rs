//! Connector: turns [`ConnectionOptions`] into a live [`RuntimeOps`] handle.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use super::error::RuntimeError;
use super::ops::RuntimeOps;
use super::options::{ConnectionOptions, TlsParams, Transport};
use super::runtime::RuntimeClient;
use super::tunnel::SshTunnel;
use crate::conf::RuntimeConfig;

pub type ConnectFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Arc<dyn RuntimeOps>, RuntimeError>> + Send + 'a>>;

pub trait RuntimeConnector: Send + Sync {
    /// Open a channel. Implementations need not verify it; callers `ping`.
    fn connect<'a>(&'a self, options: &'a ConnectionOptions) -> ConnectFuture<'a>;
}

/// Opens real connections: ssh forwards, TLS or the local socket.
pub struct LiveConnector {
    settings: RuntimeConfig,
}

impl LiveConnector {
    pub fn new(settings: RuntimeConfig) -> Self {
        Self { settings }
    }
}

impl RuntimeConnector for LiveConnector {
    fn connect<'a>(&'a self, options: &'a ConnectionOptions) -> ConnectFuture<'a> {
        Box::pin(async move {
            let timeout_secs = options.timeout.as_secs().max(1);
            let client = match &options.transport {
                Transport::Socket(path) => RuntimeClient::over_socket(path, timeout_secs)?,
                Transport::Ssh(params) => {
                    let tunnel = SshTunnel::open(params, &self.settings.ssh_binary, options.timeout).await?;
                    RuntimeClient::over_tunnel(tunnel, timeout_secs)?
                }
                Transport::Tls(params) => {
                    let material = write_tls_material(params)?;
                    RuntimeClient::over_tls(&params.host, params.port, material, timeout_secs)?
                }
            };

            debug!(device_uuid = %options.device_uuid, endpoint = client.endpoint(), "Runtime channel opened");
            Ok(Arc::new(client) as Arc<dyn RuntimeOps>)
        })
    }
}

fn write_tls_material(params: &TlsParams) -> Result<tempfile::TempDir, RuntimeError> {
    let dir = tempfile::Builder::new()
        .prefix("fleet-tls-")
        .tempdir()
        .map_err(|e| RuntimeError::ConnectionFailed(format!("cannot stage TLS material: {}", e)))?;

    for (name, contents) in [("ca.pem", &params.ca), ("cert.pem", &params.cert), ("key.pem", &params.key)] {
        std::fs::write(dir.path().join(name), contents)
            .map_err(|e| RuntimeError::ConnectionFailed(format!("cannot write {}: {}", name, e)))?;
    }
    Ok(dir)
}

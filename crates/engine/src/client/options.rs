//! Connection options: how to reach one device's runtime, with secrets
//! already decrypted from the vault.

use std::time::Duration;

use crate::conf::RuntimeConfig;
use crate::error::{EngineError, Result};
use crate::model::{Device, DeviceAuth, SshAuthType};
use crate::vault::Vault;

/// Decrypted secret. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SshCredential {
    Password(Secret),
    Key { key: Secret, passphrase: Option<Secret> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub credential: SshCredential,
    /// Docker socket path on the remote side of the forward
    pub remote_socket: String,
    pub force_ipv4: bool,
    pub force_ipv6: bool,
    pub agent_forward: bool,
    pub try_keyboard: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsParams {
    pub host: String,
    pub port: u16,
    pub ca: Vec<u8>,
    pub cert: Vec<u8>,
    pub key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Local daemon socket
    Socket(String),
    Ssh(SshParams),
    Tls(TlsParams),
}

#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    pub device_uuid: String,
    pub transport: Transport,
    pub timeout: Duration,
}

impl ConnectionOptions {
    /// Resolve connection options for `device` from its stored credentials.
    ///
    /// A `unix://` runtime socket means the device is this host. A complete
    /// set of uploaded TLS material selects the TLS transport. Otherwise the
    /// runtime goes through an ssh forward, using the runtime override
    /// credentials when `custom_ssh` is set and the automation channel's
    /// credentials otherwise.
    pub fn resolve(device: &Device, auth: &DeviceAuth, vault: &Vault, settings: &RuntimeConfig) -> Result<Self> {
        let host = device
            .ip
            .clone()
            .filter(|ip| !ip.is_empty())
            .ok_or_else(|| EngineError::Configuration(format!("Device {} has no ip address", device.uuid)))?;

        let runtime = &auth.runtime;
        let local_socket = runtime.socket.as_deref().filter(|s| s.starts_with("unix://"));
        let transport = if let Some(socket) = local_socket {
            Transport::Socket(socket.to_string())
        } else if runtime.has_tls() {
            Transport::Tls(TlsParams {
                host,
                port: settings.tls_port,
                ca: runtime.ca.clone().unwrap_or_default(),
                cert: runtime.cert.clone().unwrap_or_default(),
                key: runtime.key_pem.clone().unwrap_or_default(),
            })
        } else {
            let (auth_type, user, password, key, passphrase) = if runtime.custom_ssh {
                (
                    runtime.auth_type.unwrap_or(auth.auth_type),
                    runtime.user.clone(),
                    runtime.password.as_deref(),
                    runtime.key.as_deref(),
                    runtime.key_passphrase.as_deref(),
                )
            } else {
                (
                    auth.auth_type,
                    auth.ssh_user.clone(),
                    auth.ssh_password.as_deref(),
                    auth.ssh_key.as_deref(),
                    auth.ssh_key_passphrase.as_deref(),
                )
            };

            let user = user
                .filter(|u| !u.is_empty())
                .ok_or_else(|| EngineError::Configuration(format!("Device {} has no ssh user", device.uuid)))?;

            let credential = match auth_type {
                SshAuthType::Password => {
                    let password = vault.reveal(password)?.ok_or_else(|| {
                        EngineError::Configuration(format!("Device {} has no ssh password", device.uuid))
                    })?;
                    SshCredential::Password(Secret::new(password))
                }
                SshAuthType::Key => {
                    let key = vault.reveal(key)?.ok_or_else(|| {
                        EngineError::Configuration(format!("Device {} has no ssh key", device.uuid))
                    })?;
                    SshCredential::Key {
                        key: Secret::new(key),
                        passphrase: vault.reveal(passphrase)?.map(Secret::new),
                    }
                }
            };

            Transport::Ssh(SshParams {
                host,
                port: auth.ssh_port,
                user,
                credential,
                remote_socket: runtime
                    .socket
                    .clone()
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| settings.remote_socket.clone()),
                force_ipv4: runtime.force_ipv4,
                force_ipv6: runtime.force_ipv6,
                agent_forward: runtime.agent_forward,
                try_keyboard: runtime.try_keyboard,
            })
        };

        Ok(Self {
            device_uuid: device.uuid.clone(),
            transport,
            timeout: settings.operation_timeout(),
        })
    }

    pub fn host(&self) -> &str {
        match &self.transport {
            Transport::Socket(path) => path,
            Transport::Ssh(p) => &p.host,
            Transport::Tls(p) => &p.host,
        }
    }
}

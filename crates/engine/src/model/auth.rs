use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SshAuthType {
    #[default]
    Password,
    Key,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SshConnection {
    #[default]
    Paramiko,
    Ssh,
}

/// Uploaded TLS material for the runtime channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CertKind {
    Ca,
    Cert,
    Key,
}

impl CertKind {
    /// Label shown in place of the stored blob.
    pub fn label(&self) -> &'static str {
        match self {
            CertKind::Ca => "MY_CA.pem",
            CertKind::Cert => "MY_CERT.cert",
            CertKind::Key => "MY_KEY.key",
        }
    }
}

impl FromStr for CertKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ca" => Ok(CertKind::Ca),
            "cert" => Ok(CertKind::Cert),
            "key" => Ok(CertKind::Key),
            other => Err(EngineError::UnsupportedOperation(format!(
                "Invalid certificate type '{}' (expected ca, cert or key)",
                other
            ))),
        }
    }
}

/// Runtime-specific credentials that replace the automation channel's
/// when `custom_ssh` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeAuthOverride {
    pub custom_ssh: bool,
    pub auth_type: Option<SshAuthType>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub key: Option<String>,
    pub key_passphrase: Option<String>,
    pub force_ipv4: bool,
    pub force_ipv6: bool,
    pub agent_forward: bool,
    pub try_keyboard: bool,
    pub socket: Option<String>,
    pub ca: Option<Vec<u8>>,
    pub cert: Option<Vec<u8>>,
    pub key_pem: Option<Vec<u8>>,
}

impl RuntimeAuthOverride {
    pub fn blob(&self, kind: CertKind) -> Option<&Vec<u8>> {
        match kind {
            CertKind::Ca => self.ca.as_ref(),
            CertKind::Cert => self.cert.as_ref(),
            CertKind::Key => self.key_pem.as_ref(),
        }
    }

    pub fn set_blob(&mut self, kind: CertKind, value: Option<Vec<u8>>) {
        match kind {
            CertKind::Ca => self.ca = value,
            CertKind::Cert => self.cert = value,
            CertKind::Key => self.key_pem = value,
        }
    }

    pub fn has_tls(&self) -> bool {
        self.ca.is_some() && self.cert.is_some() && self.key_pem.is_some()
    }
}

/// Stored credentials. Password, key and passphrase fields hold vault
/// ciphertext only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAuth {
    pub device_uuid: String,
    #[serde(default)]
    pub auth_type: SshAuthType,
    pub ssh_user: Option<String>,
    pub ssh_password: Option<String>,
    pub ssh_key: Option<String>,
    pub ssh_key_passphrase: Option<String>,
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,
    #[serde(default)]
    pub ssh_connection: SshConnection,
    pub become_method: Option<String>,
    pub become_user: Option<String>,
    pub become_password: Option<String>,
    #[serde(default)]
    pub runtime: RuntimeAuthOverride,
}

pub fn default_ssh_port() -> u16 {
    22
}

impl DeviceAuth {
    pub fn new(device_uuid: impl Into<String>) -> Self {
        Self {
            device_uuid: device_uuid.into(),
            auth_type: SshAuthType::Password,
            ssh_user: None,
            ssh_password: None,
            ssh_key: None,
            ssh_key_passphrase: None,
            ssh_port: default_ssh_port(),
            ssh_connection: SshConnection::Paramiko,
            become_method: None,
            become_user: None,
            become_password: None,
            runtime: RuntimeAuthOverride::default(),
        }
    }
}

/// Automation-channel write request. Secret fields carry plaintext, the
/// redaction marker, or nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceAuthInput {
    pub auth_type: SshAuthType,
    pub ssh_user: Option<String>,
    pub ssh_password: Option<String>,
    pub ssh_key: Option<String>,
    pub ssh_key_passphrase: Option<String>,
    pub ssh_port: Option<u16>,
    pub ssh_connection: SshConnection,
    pub become_method: Option<String>,
    pub become_user: Option<String>,
    pub become_password: Option<String>,
}

/// Runtime override write request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeAuthInput {
    pub custom_ssh: bool,
    pub auth_type: Option<SshAuthType>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub key: Option<String>,
    pub key_passphrase: Option<String>,
    pub force_ipv4: bool,
    pub force_ipv6: bool,
    pub agent_forward: bool,
    pub try_keyboard: bool,
    pub socket: Option<String>,
}

/// DeviceAuth as presented to callers: no secret ever leaves in plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceAuthView {
    pub auth_type: SshAuthType,
    pub ssh_user: Option<String>,
    pub ssh_password: Option<String>,
    pub ssh_key: Option<String>,
    pub ssh_key_passphrase: Option<String>,
    pub ssh_port: u16,
    pub ssh_connection: SshConnection,
    pub become_method: Option<String>,
    pub become_user: Option<String>,
    pub become_password: Option<String>,
    pub custom_docker_ssh: bool,
    pub docker_auth_type: Option<SshAuthType>,
    pub docker_ssh_user: Option<String>,
    pub docker_ssh_password: Option<String>,
    pub docker_ssh_key: Option<String>,
    pub docker_ssh_key_passphrase: Option<String>,
    pub docker_force_ipv4: bool,
    pub docker_force_ipv6: bool,
    pub docker_agent_forward: bool,
    pub docker_try_keyboard: bool,
    pub docker_socket: Option<String>,
    pub docker_ca: Option<String>,
    pub docker_cert: Option<String>,
    pub docker_key: Option<String>,
}

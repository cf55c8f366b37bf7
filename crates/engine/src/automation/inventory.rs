//! Inventory: host variables handed to the playbook runner.
//!
//! Secrets stay vault ciphertext inside an [`Inventory`]. Only a runner
//! about to spawn the backend calls [`Inventory::revealed`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::model::auth::default_ssh_port;
use crate::model::{Device, DeviceAuth, DeviceStatus, SshAuthType, SshConnection};
use crate::vault::Vault;

/// Uuid given to devices that exist only for the duration of a check.
pub const TRANSIENT_UUID: &str = "tmp";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostVars {
    pub ansible_host: String,
    pub ansible_port: u16,
    pub ansible_connection: SshConnection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ansible_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ansible_ssh_pass: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ansible_ssh_private_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ansible_ssh_private_key_passphrase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ansible_become_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ansible_become_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ansible_become_pass: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryGroup {
    pub hosts: BTreeMap<String, HostVars>,
}

/// Static inventory in the `{"all": {"hosts": {...}}}` shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub all: InventoryGroup,
}

impl Inventory {
    /// One host per device, keyed by device uuid.
    pub fn for_targets<'a, I>(targets: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a Device, &'a DeviceAuth)>,
    {
        let mut hosts = BTreeMap::new();
        for (device, auth) in targets {
            let ip = device
                .ip
                .clone()
                .filter(|ip| !ip.is_empty())
                .ok_or_else(|| EngineError::Configuration(format!("Device {} has no ip address", device.uuid)))?;

            let (password, key) = match auth.auth_type {
                SshAuthType::Password => (auth.ssh_password.clone(), None),
                SshAuthType::Key => (None, auth.ssh_key.clone()),
            };
            hosts.insert(
                device.uuid.clone(),
                HostVars {
                    ansible_host: ip,
                    ansible_port: auth.ssh_port,
                    ansible_connection: auth.ssh_connection,
                    ansible_user: auth.ssh_user.clone(),
                    ansible_ssh_pass: password,
                    ansible_ssh_private_key: key,
                    ansible_ssh_private_key_passphrase: auth.ssh_key_passphrase.clone(),
                    ansible_become_method: auth.become_method.clone(),
                    ansible_become_user: auth.become_user.clone(),
                    ansible_become_pass: auth.become_password.clone(),
                },
            );
        }
        Ok(Self { all: InventoryGroup { hosts } })
    }

    pub fn hosts(&self) -> Vec<String> {
        self.all.hosts.keys().cloned().collect()
    }

    /// Copy with every secret decrypted.
    pub fn revealed(&self, vault: &Vault) -> Result<Self> {
        let mut copy = self.clone();
        for vars in copy.all.hosts.values_mut() {
            for field in [
                &mut vars.ansible_ssh_pass,
                &mut vars.ansible_ssh_private_key,
                &mut vars.ansible_ssh_private_key_passphrase,
                &mut vars.ansible_become_pass,
            ] {
                *field = vault.reveal(field.as_deref())?;
            }
        }
        Ok(copy)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::Configuration(format!("Cannot serialize inventory: {}", e)))
    }
}

/// Connection parameters for a host that is not enrolled. Secrets are
/// plaintext here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AdHocTarget {
    pub ip: String,
    pub auth_type: SshAuthType,
    pub ssh_connection: SshConnection,
    pub ssh_user: Option<String>,
    pub ssh_password: Option<String>,
    pub ssh_key: Option<String>,
    pub ssh_key_passphrase: Option<String>,
    pub ssh_port: Option<u16>,
    pub become_method: Option<String>,
    pub become_password: Option<String>,
}

impl AdHocTarget {
    /// A `REGISTERING` device with uuid `tmp` and its credentials, secrets
    /// sealed under the default vault id.
    pub fn to_transient(&self, vault: &Vault) -> Result<(Device, DeviceAuth)> {
        let seal = |value: &Option<String>| -> Result<Option<String>> {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| vault.encrypt_default(v))
                .transpose()
        };

        let device = Device::new(TRANSIENT_UUID, self.ip.clone(), DeviceStatus::Registering);
        let mut auth = DeviceAuth::new(TRANSIENT_UUID);
        auth.auth_type = self.auth_type;
        auth.ssh_connection = self.ssh_connection;
        auth.ssh_user = self.ssh_user.clone();
        auth.ssh_password = seal(&self.ssh_password)?;
        auth.ssh_key = seal(&self.ssh_key)?;
        auth.ssh_key_passphrase = seal(&self.ssh_key_passphrase)?;
        auth.ssh_port = self.ssh_port.unwrap_or_else(default_ssh_port);
        auth.become_method = self.become_method.clone();
        auth.become_password = seal(&self.become_password)?;
        Ok((device, auth))
    }
}

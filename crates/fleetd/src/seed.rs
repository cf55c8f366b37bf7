//! Inventory seed file: devices, credentials and playbooks loaded into the
//! store at startup. Secrets in the file are plaintext and sealed on load.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use engine::model::{
    CapabilityFlags, Device, DeviceAuth, DeviceAuthInput, DeviceStatus, Playbook, RuntimeAuthInput,
};
use engine::store::Store;
use engine::Vault;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedFile {
    pub devices: Vec<SeedDevice>,
    pub playbooks: Vec<Playbook>,
}

#[derive(Debug, Deserialize)]
pub struct SeedDevice {
    pub uuid: String,
    pub ip: String,
    #[serde(default = "default_status")]
    pub status: DeviceStatus,
    #[serde(default)]
    pub capabilities: CapabilityFlags,
    pub auth: Option<DeviceAuthInput>,
    pub docker: Option<RuntimeAuthInput>,
}

fn default_status() -> DeviceStatus {
    DeviceStatus::Online
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub devices: usize,
    pub credentials: usize,
    pub playbooks: usize,
}

impl SeedFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read inventory file {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse inventory file {}", path.display()))
    }

    pub async fn apply(self, store: &Store, vault: &Vault) -> Result<SeedSummary> {
        let mut summary = SeedSummary::default();

        for seed in self.devices {
            let mut device = Device::new(&seed.uuid, &seed.ip, seed.status);
            device.capabilities = seed.capabilities;
            store.devices.update(device).await?;
            summary.devices += 1;

            if let Some(input) = seed.auth {
                let auth = seal(&seed.uuid, input, seed.docker, vault)
                    .with_context(|| format!("Failed to seal credentials of device {}", seed.uuid))?;
                store.auths.update(auth).await?;
                summary.credentials += 1;
            }
            debug!(device_uuid = %seed.uuid, "Device seeded");
        }

        for playbook in self.playbooks {
            store.playbooks.save(playbook).await?;
            summary.playbooks += 1;
        }

        info!(
            "✓ Inventory seeded ({} device(s), {} credential set(s), {} playbook(s))",
            summary.devices, summary.credentials, summary.playbooks
        );
        Ok(summary)
    }
}

fn seal(
    uuid: &str,
    input: DeviceAuthInput,
    docker: Option<RuntimeAuthInput>,
    vault: &Vault,
) -> engine::Result<DeviceAuth> {
    let mut auth = DeviceAuth::new(uuid);
    auth.auth_type = input.auth_type;
    auth.ssh_user = input.ssh_user;
    auth.ssh_password = vault.prepare_write(input.ssh_password.as_deref(), None)?;
    auth.ssh_key = vault.prepare_write(input.ssh_key.as_deref(), None)?;
    auth.ssh_key_passphrase = vault.prepare_write(input.ssh_key_passphrase.as_deref(), None)?;
    if let Some(port) = input.ssh_port {
        auth.ssh_port = port;
    }
    auth.ssh_connection = input.ssh_connection;
    auth.become_method = input.become_method;
    auth.become_user = input.become_user;
    auth.become_password = vault.prepare_write(input.become_password.as_deref(), None)?;

    if let Some(docker) = docker {
        let r = &mut auth.runtime;
        r.custom_ssh = docker.custom_ssh;
        r.auth_type = docker.auth_type;
        r.user = docker.user;
        r.password = vault.prepare_write(docker.password.as_deref(), None)?;
        r.key = vault.prepare_write(docker.key.as_deref(), None)?;
        r.key_passphrase = vault.prepare_write(docker.key_passphrase.as_deref(), None)?;
        r.force_ipv4 = docker.force_ipv4;
        r.force_ipv6 = docker.force_ipv6;
        r.agent_forward = docker.agent_forward;
        r.try_keyboard = docker.try_keyboard;
        r.socket = docker.socket;
    }
    Ok(auth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::vault::DEFAULT_VAULT_ID;
    use std::io::Write;

    const SAMPLE: &str = r#"
[[devices]]
uuid = "pi-kitchen"
ip = "192.168.1.20"

[devices.auth]
auth_type = "password"
ssh_user = "pi"
ssh_password = "raspberry"

[[devices]]
uuid = "nas"
ip = "192.168.1.30"
status = "UNMANAGED"

[[playbooks]]
uuid = "pb-check"
name = "Check device"
path = "_checkDeviceBeforeAdd.yml"
quick_ref = "checkDeviceBeforeAdd"
"#;

    #[test]
    fn test_parse_sample() {
        let seed: SeedFile = toml::from_str(SAMPLE).unwrap();
        assert_eq!(seed.devices.len(), 2);
        assert_eq!(seed.devices[0].status, DeviceStatus::Online);
        assert_eq!(seed.devices[1].status, DeviceStatus::Unmanaged);
        assert!(seed.devices[1].auth.is_none());
        assert_eq!(seed.playbooks[0].quick_ref.as_deref(), Some("checkDeviceBeforeAdd"));
    }

    #[tokio::test]
    async fn test_apply_seals_secrets() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let store = Store::in_memory();
        let vault = Vault::new("fleetd-seed-test-secret", DEFAULT_VAULT_ID);
        let seed = tokio_test::assert_ok!(SeedFile::load(file.path()));
        let summary = tokio_test::assert_ok!(seed.apply(&store, &vault).await);
        assert_eq!(
            summary,
            SeedSummary {
                devices: 2,
                credentials: 1,
                playbooks: 1
            }
        );

        let auth = store.auths.find_one_by_device("pi-kitchen").await.unwrap().unwrap();
        let sealed = auth.ssh_password.unwrap();
        assert!(!sealed.contains("raspberry"));
        assert_eq!(vault.decrypt_default(&sealed).unwrap(), "raspberry");
        assert_eq!(auth.ssh_port, 22);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = SeedFile::load("/nonexistent/fleet-inventory.toml").unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read inventory file"));
    }
}

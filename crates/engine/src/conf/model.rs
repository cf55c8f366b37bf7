//! Model: EngineConfig and its sections.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub vault: VaultConfig,
    pub runtime: RuntimeConfig,
    pub automation: AutomationConfig,
    pub notifications: NotificationConfig,
    pub logging: LoggingConfig,
    /// TOML file with devices, credentials and playbooks seeded at startup
    pub inventory_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Process-wide secret every vault key is derived from
    pub secret: String,
    pub default_vault_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Ceiling for every remote runtime call (connect, ping, enumerate, actions)
    pub operation_timeout_secs: u64,
    pub default_watch_schedule: String,
    pub default_stats_schedule: String,
    pub events_reconnect_secs: u64,
    /// Docker socket path on the remote host, forwarded through ssh
    pub remote_socket: String,
    pub ssh_binary: String,
    /// Port used when a device carries TLS material
    pub tls_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Quick reference of the playbook used for connectivity checks
    pub check_playbook_ref: String,
    pub runner_binary: String,
    pub playbooks_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    File { path: String },
}

impl RuntimeConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vault: VaultConfig::default(),
            runtime: RuntimeConfig::default(),
            automation: AutomationConfig::default(),
            notifications: NotificationConfig::default(),
            logging: LoggingConfig::default(),
            inventory_file: None,
        }
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            default_vault_id: "ssm".to_string(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            operation_timeout_secs: 60,
            default_watch_schedule: "60s".to_string(),
            default_stats_schedule: "5m".to_string(),
            events_reconnect_secs: 30,
            remote_socket: "/var/run/docker.sock".to_string(),
            ssh_binary: "ssh".to_string(),
            tls_port: 2376,
        }
    }
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            check_playbook_ref: "checkDeviceBeforeAdd".to_string(),
            runner_binary: "ansible-playbook".to_string(),
            playbooks_dir: "playbooks".to_string(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { capacity: 500 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info,engine=debug,fleetd=debug".to_string(),
            format: LogFormat::Pretty,
            output: LogOutput::Stdout,
        }
    }
}

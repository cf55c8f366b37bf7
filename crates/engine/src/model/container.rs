use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A runtime object owned by exactly one device. Identity is the
/// runtime-native id scoped to that device.
pub trait RuntimeObject: Clone + Send + Sync + 'static {
    fn object_id(&self) -> &str;
    fn device_uuid(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub id: String,
    pub device_uuid: String,
    pub name: String,
    /// User-assigned label, kept across reconciliation passes
    pub custom_name: Option<String>,
    pub image: String,
    pub state: String,
    pub status: String,
    pub labels: HashMap<String, String>,
    pub created: i64,
    pub updated_at: DateTime<Utc>,
}

impl Container {
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }
}

/// Lifecycle actions dispatched to a device's runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContainerAction {
    Kill,
    Pause,
    Restart,
    Stop,
    Start,
}

impl ContainerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerAction::Kill => "kill",
            ContainerAction::Pause => "pause",
            ContainerAction::Restart => "restart",
            ContainerAction::Stop => "stop",
            ContainerAction::Start => "start",
        }
    }
}

impl std::str::FromStr for ContainerAction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kill" => Ok(ContainerAction::Kill),
            "pause" => Ok(ContainerAction::Pause),
            "restart" => Ok(ContainerAction::Restart),
            "stop" => Ok(ContainerAction::Stop),
            "start" => Ok(ContainerAction::Start),
            _ => Err(EngineError::UnsupportedOperation(format!("Unknown container action '{}'", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerImage {
    pub id: String,
    pub device_uuid: String,
    pub repo_tags: Vec<String>,
    pub size: i64,
    pub created: i64,
    pub containers: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerVolume {
    /// Volumes are identified by name on the runtime
    pub name: String,
    pub device_uuid: String,
    pub driver: String,
    pub mountpoint: String,
    pub scope: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerNetwork {
    pub id: String,
    pub device_uuid: String,
    pub name: String,
    pub driver: Option<String>,
    pub scope: Option<String>,
    pub internal: bool,
    pub attachable: bool,
    pub ingress: bool,
    pub enable_ipv6: bool,
    pub created: Option<String>,
}

/// One resource sample for a running container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerStat {
    pub device_uuid: String,
    pub container_id: String,
    pub cpu_percent: f64,
    pub memory_usage: u64,
    pub memory_limit: u64,
    pub memory_percent: f64,
    pub net_rx_bytes: u64,
    pub net_tx_bytes: u64,
    pub sampled_at: DateTime<Utc>,
}

impl RuntimeObject for Container {
    fn object_id(&self) -> &str {
        &self.id
    }
    fn device_uuid(&self) -> &str {
        &self.device_uuid
    }
}

impl RuntimeObject for ContainerImage {
    fn object_id(&self) -> &str {
        &self.id
    }
    fn device_uuid(&self) -> &str {
        &self.device_uuid
    }
}

impl RuntimeObject for ContainerVolume {
    fn object_id(&self) -> &str {
        &self.name
    }
    fn device_uuid(&self) -> &str {
        &self.device_uuid
    }
}

impl RuntimeObject for ContainerNetwork {
    fn object_id(&self) -> &str {
        &self.id
    }
    fn device_uuid(&self) -> &str {
        &self.device_uuid
    }
}

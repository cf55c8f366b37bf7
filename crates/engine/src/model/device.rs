use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceStatus {
    Registering,
    Online,
    Offline,
    Unmanaged,
}

/// Monitoring capabilities a device can enable independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    RuntimeWatch,
    StatsWatch,
    EventsWatch,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::RuntimeWatch,
        Capability::StatsWatch,
        Capability::EventsWatch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::RuntimeWatch => "runtime-watch",
            Capability::StatsWatch => "stats-watch",
            Capability::EventsWatch => "events-watch",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchFlag {
    pub enabled: bool,
    /// Falls back to the configured default schedule when absent
    #[serde(default)]
    pub schedule: Option<String>,
}

impl WatchFlag {
    pub fn enabled() -> Self {
        Self { enabled: true, schedule: None }
    }

    pub fn every(schedule: &str) -> Self {
        Self { enabled: true, schedule: Some(schedule.to_string()) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityFlags {
    pub runtime: WatchFlag,
    pub stats: WatchFlag,
    pub events: WatchFlag,
}

impl Default for CapabilityFlags {
    fn default() -> Self {
        Self {
            runtime: WatchFlag::enabled(),
            stats: WatchFlag::enabled(),
            events: WatchFlag::enabled(),
        }
    }
}

impl CapabilityFlags {
    pub fn disabled() -> Self {
        Self {
            runtime: WatchFlag::default(),
            stats: WatchFlag::default(),
            events: WatchFlag::default(),
        }
    }

    pub fn get(&self, capability: Capability) -> &WatchFlag {
        match capability {
            Capability::RuntimeWatch => &self.runtime,
            Capability::StatsWatch => &self.stats,
            Capability::EventsWatch => &self.events,
        }
    }

    pub fn enabled(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.get(*c).enabled)
            .collect()
    }

    pub fn any_enabled(&self) -> bool {
        Capability::ALL.iter().any(|c| self.get(*c).enabled)
    }
}

/// Hardware and OS facts reported by the device agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceFacts {
    pub hostname: Option<String>,
    pub fqdn: Option<String>,
    pub uptime: Option<u64>,
    pub os_arch: Option<String>,
    pub os_platform: Option<String>,
    pub os_distro: Option<String>,
    pub os_codename: Option<String>,
    pub os_kernel: Option<String>,
    pub os_logo: Option<String>,
    pub cpu_brand: Option<String>,
    pub cpu_family: Option<String>,
    /// GHz
    pub cpu_speed: Option<f64>,
    /// MB
    pub mem: Option<u64>,
    pub system_manufacturer: Option<String>,
    pub system_model: Option<String>,
    pub system_version: Option<String>,
    pub system_uuid: Option<String>,
    pub system_sku: Option<String>,
    pub system_virtual: Option<bool>,
    pub raspberry: Option<String>,
    pub agent_version: Option<String>,
    pub agent_type: Option<String>,
    pub agent_log_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub uuid: String,
    pub ip: Option<String>,
    pub status: DeviceStatus,
    #[serde(default)]
    pub capabilities: CapabilityFlags,
    #[serde(default)]
    pub facts: DeviceFacts,
    #[serde(default)]
    pub runtime_id: Option<String>,
    #[serde(default)]
    pub runtime_version: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Device {
    pub fn new(uuid: impl Into<String>, ip: impl Into<String>, status: DeviceStatus) -> Self {
        let now = Utc::now();
        Self {
            uuid: uuid.into(),
            ip: Some(ip.into()),
            status,
            capabilities: CapabilityFlags::default(),
            facts: DeviceFacts::default(),
            runtime_id: None,
            runtime_version: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Unmanaged devices have no agent reporting an fqdn; their ip stands in.
    pub fn display_name(&self) -> Option<String> {
        if self.status == DeviceStatus::Unmanaged {
            self.ip.clone()
        } else {
            self.facts.fqdn.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_screaming() {
        let json = serde_json::to_string(&DeviceStatus::Registering).unwrap();
        assert_eq!(json, "\"REGISTERING\"");
    }

    #[test]
    fn test_enabled_capabilities_preserve_order() {
        let mut flags = CapabilityFlags::disabled();
        assert!(!flags.any_enabled());
        flags.events = WatchFlag::enabled();
        flags.runtime = WatchFlag::every("30s");
        assert_eq!(
            flags.enabled(),
            vec![Capability::RuntimeWatch, Capability::EventsWatch]
        );
    }

    #[test]
    fn test_display_name_uses_ip_for_unmanaged() {
        let mut device = Device::new("d1", "10.0.0.5", DeviceStatus::Online);
        device.facts.fqdn = Some("node1.lan".to_string());
        assert_eq!(device.display_name().as_deref(), Some("node1.lan"));

        device.status = DeviceStatus::Unmanaged;
        assert_eq!(device.display_name().as_deref(), Some("10.0.0.5"));
    }
}

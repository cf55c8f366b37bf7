//! Registry keys and the closed set of component variants.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::docker::DockerWatcher;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Watcher,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Watcher => "watcher",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Docker,
}

impl Provider {
    pub const ALL: [Provider; 1] = [Provider::Docker];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Docker => "docker",
        }
    }
}

/// Composite registry key: `<kind>.<provider>.<device uuid>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ComponentKey(String);

impl ComponentKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn build_id(kind: Kind, provider: Provider, device_uuid: &str) -> ComponentKey {
    ComponentKey(format!("{}.{}.{}", kind.as_str(), provider.as_str(), device_uuid))
}

/// A registered monitor. Dispatch is by variant.
#[derive(Clone)]
pub enum Component {
    Docker(Arc<DockerWatcher>),
}

impl Component {
    pub fn kind(&self) -> Kind {
        match self {
            Component::Docker(_) => Kind::Watcher,
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            Component::Docker(_) => Provider::Docker,
        }
    }

    pub fn key(&self) -> &ComponentKey {
        match self {
            Component::Docker(w) => w.key(),
        }
    }

    pub fn device_uuid(&self) -> &str {
        match self {
            Component::Docker(w) => w.device_uuid(),
        }
    }

    /// Start the component's background loops.
    pub fn init(&self) -> Result<()> {
        match self {
            Component::Docker(w) => w.init(),
        }
    }

    /// Stop loops and discard in-flight results. Safe to call repeatedly.
    pub async fn deregister(&self) {
        match self {
            Component::Docker(w) => w.deregister().await,
        }
    }

    pub fn as_docker(&self) -> Option<&Arc<DockerWatcher>> {
        match self {
            Component::Docker(w) => Some(w),
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("kind", &self.kind())
            .field("provider", &self.provider())
            .field("key", self.key())
            .finish()
    }
}

//! In-process publish/subscribe for domain events.
//!
//! Producers (watchers, runners) and consumers (notifications, the
//! execution tracker) only know the bus. Handlers run synchronously on the
//! emitter's task, in subscription order. A failing or panicking handler is
//! logged and skipped.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "automation-failure")]
    AutomationFailed,
    #[serde(rename = "runtime-stat-failure")]
    RuntimeStatFailed,
    #[serde(rename = "runtime-watch-failure")]
    RuntimeWatchFailed,
    #[serde(rename = "notifications-updated")]
    NotificationsUpdated,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::AutomationFailed => "automation-failure",
            EventKind::RuntimeStatFailed => "runtime-stat-failure",
            EventKind::RuntimeWatchFailed => "runtime-watch-failure",
            EventKind::NotificationsUpdated => "notifications-updated",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub message: String,
    pub severity: Severity,
    pub module: String,
    pub module_id: Option<String>,
}

impl Payload {
    pub fn error(module: &str, module_id: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Error,
            module: module.to_string(),
            module_id: Some(module_id.to_string()),
        }
    }

    pub fn info(module: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Info,
            module: module.to_string(),
            module_id: None,
        }
    }
}

pub type Handler = Arc<dyn Fn(EventKind, &Payload) -> anyhow::Result<()> + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<EventKind, Vec<Handler>>>,
    emitted: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to `kind`. Delivery follows subscription order.
    pub fn on<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(EventKind, &Payload) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .entry(kind)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Deliver `payload` to every handler currently subscribed to `kind`.
    /// Returns how many handlers completed without error.
    pub fn emit(&self, kind: EventKind, payload: Payload) -> usize {
        self.emitted.fetch_add(1, Ordering::Relaxed);

        // Snapshot so handlers may subscribe or emit without deadlocking
        let handlers: Vec<Handler> = match self.handlers.read().get(&kind) {
            Some(list) => list.clone(),
            None => {
                debug!(event = %kind, "No subscribers for event");
                return 0;
            }
        };

        let mut delivered = 0;
        for (index, handler) in handlers.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| handler(kind, &payload))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    error!(event = %kind, handler = index, "Event handler failed: {:#}", e);
                }
                Err(_) => {
                    error!(event = %kind, handler = index, "Event handler panicked");
                }
            }
        }
        delivered
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.handlers.read().get(&kind).map(|l| l.len()).unwrap_or(0)
    }

    /// Total number of emit calls since construction.
    pub fn emitted_total(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }
}

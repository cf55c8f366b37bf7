//! In-app notifications raised from failure events.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use crate::events::{EventBus, EventKind, Payload, Severity};

const WATCHED: [EventKind; 3] = [
    EventKind::AutomationFailed,
    EventKind::RuntimeStatFailed,
    EventKind::RuntimeWatchFailed,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub event: EventKind,
    pub message: String,
    pub severity: Severity,
    pub module: String,
    pub module_id: Option<String>,
    pub seen: bool,
    pub created_at: DateTime<Utc>,
}

/// Bounded inbox. The oldest entry is dropped once `capacity` is reached.
pub struct NotificationCenter {
    capacity: usize,
    inbox: Mutex<VecDeque<Notification>>,
}

impl NotificationCenter {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inbox: Mutex::new(VecDeque::new()),
        }
    }

    /// Subscribe to every failure kind. Each recorded notification is
    /// followed by `notifications-updated` on the same bus.
    pub fn subscribe(self: &Arc<Self>, bus: &Arc<EventBus>) {
        for kind in WATCHED {
            let center = Arc::downgrade(self);
            let weak_bus: Weak<EventBus> = Arc::downgrade(bus);
            bus.on(kind, move |event, payload| {
                if let Some(center) = center.upgrade() {
                    center.record(event, payload);
                }
                if let Some(bus) = weak_bus.upgrade() {
                    bus.emit(
                        EventKind::NotificationsUpdated,
                        Payload::info("Notification", "Updated Notification"),
                    );
                }
                Ok(())
            });
        }
        info!("✓ Notifications subscribed to {} event kinds", WATCHED.len());
    }

    fn record(&self, event: EventKind, payload: &Payload) {
        let mut inbox = self.inbox.lock();
        if inbox.len() == self.capacity {
            inbox.pop_front();
        }
        inbox.push_back(Notification {
            event,
            message: payload.message.clone(),
            severity: payload.severity,
            module: payload.module.clone(),
            module_id: payload.module_id.clone(),
            seen: false,
            created_at: Utc::now(),
        });
    }

    /// Newest first.
    pub fn list(&self) -> Vec<Notification> {
        self.inbox.lock().iter().rev().cloned().collect()
    }

    pub fn unread_count(&self) -> usize {
        self.inbox.lock().iter().filter(|n| !n.seen).count()
    }

    pub fn mark_all_seen(&self) -> usize {
        let mut marked = 0;
        for n in self.inbox.lock().iter_mut().filter(|n| !n.seen) {
            n.seen = true;
            marked += 1;
        }
        marked
    }
}

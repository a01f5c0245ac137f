use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use sea_orm::DatabaseConnection;
use serde::Deserialize;

use crate::webhook::WebhookClient;

/// Destructive admin actions that need a second request to go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PendingAction {
    RemoveWebhook,
    DeleteLink,
    DetachService,
    DeleteService,
    DeleteGroup,
}

impl fmt::Display for PendingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PendingAction::RemoveWebhook => "remove webhook",
            PendingAction::DeleteLink => "delete link",
            PendingAction::DetachService => "detach service from all groups",
            PendingAction::DeleteService => "delete service",
            PendingAction::DeleteGroup => "delete group",
        };
        f.write_str(label)
    }
}

/// Per-action confirmation state keyed by (entity id, action).
///
/// The first request for an action marks it pending; a repeat within the
/// window confirms it and clears the entry.
pub struct Confirmations {
    pending: DashMap<(i32, PendingAction), Instant>,
    window: Duration,
}

impl Confirmations {
    pub fn new(window: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            window,
        }
    }

    /// Returns true if the action is confirmed and may run now.
    pub fn confirm(&self, id: i32, action: PendingAction) -> bool {
        let now = Instant::now();
        let key = (id, action);
        if let Some((_, since)) = self.pending.remove(&key) {
            if now.duration_since(since) < self.window {
                return true;
            }
        }
        self.pending.insert(key, now);
        false
    }

    /// Drop a pending confirmation without running the action.
    pub fn cancel(&self, id: i32, action: PendingAction) -> bool {
        self.pending.remove(&(id, action)).is_some()
    }

    #[cfg(test)]
    pub fn is_pending(&self, id: i32, action: PendingAction) -> bool {
        self.pending
            .get(&(id, action))
            .is_some_and(|since| since.elapsed() < self.window)
    }

    /// Periodically clean up expired entries (call from a background task)
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.pending
            .retain(|_, since| now.duration_since(*since) < self.window);
    }
}

/// How disable announcements are signed.
#[derive(Debug, Clone)]
pub struct NotifySettings {
    pub username: String,
    pub contact: Option<String>,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            username: "Webhook Manager".to_string(),
            contact: None,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub webhooks: WebhookClient,
    pub notify: Arc<NotifySettings>,
    pub confirmations: Arc<Confirmations>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, webhooks: WebhookClient, notify: NotifySettings) -> Self {
        Self {
            db,
            webhooks,
            notify: Arc::new(notify),
            confirmations: Arc::new(Confirmations::new(Duration::from_secs(60))),
        }
    }
}

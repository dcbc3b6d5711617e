//! Notification collaborators.
//!
//! Notifications are fire-and-forget: a failing notifier is logged and never
//! affects reconciliation.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Totals reported when a run finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub collections: usize,
    pub changed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub added: usize,
    pub removed: usize,
    pub requested: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotifyEvent {
    RunStarted {
        run_id: String,
        libraries: usize,
        collections: usize,
    },
    /// A collection's membership changed or acquisitions were requested.
    CollectionChanged {
        library: String,
        collection: String,
        added: Vec<String>,
        removed: Vec<String>,
        requested: Vec<String>,
    },
    RunFinished {
        run_id: String,
        cancelled: bool,
        summary: RunSummary,
    },
}

impl NotifyEvent {
    pub fn name(&self) -> &'static str {
        match self {
            NotifyEvent::RunStarted { .. } => "run_started",
            NotifyEvent::CollectionChanged { .. } => "collection_changed",
            NotifyEvent::RunFinished { .. } => "run_finished",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("Notifier unavailable: {0}")]
    Unavailable(String),

    #[error("Notification rejected: {0}")]
    Rejected(String),
}

/// A notification sink (chat webhook, mail, ...).
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns the name of this notifier.
    fn name(&self) -> &str;

    async fn notify(&self, event: &NotifyEvent) -> Result<(), NotifyError>;
}

/// Deliver `event` to every notifier, logging failures.
pub async fn dispatch(notifiers: &[Arc<dyn Notifier>], event: &NotifyEvent) {
    for notifier in notifiers {
        match notifier.notify(event).await {
            Ok(()) => debug!("Sent {} via {}", event.name(), notifier.name()),
            Err(e) => warn!(
                "Notifier {} failed to send {}: {}",
                notifier.name(),
                event.name(),
                e
            ),
        }
    }
}

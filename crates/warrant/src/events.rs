//! Session observers.
//!
//! The issuer notifies its observer after a session has been persisted.
//! Observers cannot veto or alter the session; they are notification only.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::claims::SessionPayload;

/// How a session came to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    Login,
    Renewal { previous: String },
}

impl IssueKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            IssueKind::Login => "login",
            IssueKind::Renewal { .. } => "renewal",
        }
    }
}

/// A session was issued and persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIssued {
    pub kind: IssueKind,
    pub payload: SessionPayload,
}

/// Receives [`SessionIssued`] notifications.
#[async_trait]
pub trait SessionObserver: Send + Sync {
    /// Returns the observer name for logging.
    fn name(&self) -> &str {
        "anonymous"
    }

    /// Handle one notification. Should not block.
    async fn on_session_issued(&self, event: &SessionIssued);
}

/// Ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

#[async_trait]
impl SessionObserver for NoopObserver {
    fn name(&self) -> &str {
        "noop"
    }

    async fn on_session_issued(&self, _event: &SessionIssued) {}
}

/// Fans notifications out over a `tokio::sync::broadcast` channel.
///
/// Sends with no subscribers are dropped silently.
#[derive(Debug, Clone)]
pub struct BroadcastObserver {
    sender: broadcast::Sender<SessionIssued>,
}

impl BroadcastObserver {
    /// Creates an observer whose channel buffers `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionIssued> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl SessionObserver for BroadcastObserver {
    fn name(&self) -> &str {
        "broadcast"
    }

    async fn on_session_issued(&self, event: &SessionIssued) {
        let _ = self.sender.send(event.clone());
    }
}

/// Writes an audit line per session via `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

#[async_trait]
impl SessionObserver for TracingObserver {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn on_session_issued(&self, event: &SessionIssued) {
        let payload = &event.payload;
        match &event.kind {
            IssueKind::Login => tracing::info!(
                target: "warrant::audit",
                kind = event.kind.as_str(),
                session_id = %payload.id,
                username = %payload.username,
                "session issued"
            ),
            IssueKind::Renewal { previous } => tracing::info!(
                target: "warrant::audit",
                kind = event.kind.as_str(),
                session_id = %payload.id,
                previous = %previous,
                username = %payload.username,
                "session issued"
            ),
        }
    }
}

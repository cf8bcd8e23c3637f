use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::AuditEvent;

/// Envelope wrapping an audit event with metadata
#[derive(Debug, Clone)]
pub struct AuditEventEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
}

/// Sending side of the audit log.
///
/// The requester, the renewal scheduler and the API handlers each hold a
/// clone. Delivery problems are logged and never surface to the caller, so a
/// full or closed log cannot fail a certificate request.
#[derive(Clone)]
pub struct AuditHandle {
    tx: mpsc::Sender<AuditEventEnvelope>,
}

impl AuditHandle {
    /// Create a new audit handle from a channel sender
    pub fn new(tx: mpsc::Sender<AuditEventEnvelope>) -> Self {
        Self { tx }
    }

    fn envelope(event: AuditEvent) -> AuditEventEnvelope {
        AuditEventEnvelope {
            timestamp: Utc::now(),
            event,
        }
    }

    /// Queue an event, waiting while the writer catches up.
    pub async fn emit(&self, event: AuditEvent) {
        let event_type = event.event_type();
        if self.tx.send(Self::envelope(event)).await.is_err() {
            tracing::warn!(event_type, "Audit log closed, event dropped");
        }
    }

    /// Queue an event without waiting. Returns false if it was dropped.
    ///
    /// Used from request handlers, where a slow audit log should not add
    /// latency.
    pub fn try_emit(&self, event: AuditEvent) -> bool {
        let event_type = event.event_type();
        match self.tx.try_send(Self::envelope(event)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(event_type, "Audit log full, event dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(event_type, "Audit log closed, event dropped");
                false
            }
        }
    }

    /// Whether the writer has stopped receiving.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

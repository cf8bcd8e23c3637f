use std::sync::Arc;

use tokio::sync::mpsc;

use super::{AuditEventEnvelope, AuditHandle, AuditRecord, AuditStore};

/// Background task that receives audit events and writes them to storage
pub struct AuditWriter {
    rx: mpsc::Receiver<AuditEventEnvelope>,
    store: Arc<dyn AuditStore>,
}

impl AuditWriter {
    /// Create a new audit writer
    pub fn new(rx: mpsc::Receiver<AuditEventEnvelope>, store: Arc<dyn AuditStore>) -> Self {
        Self { rx, store }
    }

    /// Run the writer, consuming events until the channel is closed
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        tracing::info!("Audit writer started");

        let mut written: u64 = 0;
        while let Some(envelope) = self.rx.recv().await {
            let record = Self::record_for(envelope);

            match self.store.insert(&record) {
                Ok(id) => {
                    written += 1;
                    tracing::debug!(
                        id,
                        event_type = %record.event_type,
                        item_id = record.item_id.as_deref().unwrap_or("-"),
                        "Audit event written"
                    );
                }
                Err(e) => tracing::error!(
                    event_type = %record.event_type,
                    item_id = record.item_id.as_deref().unwrap_or("-"),
                    "Failed to write audit event: {}",
                    e
                ),
            }
        }

        tracing::info!(written, "Audit writer drained");
    }

    /// Flatten an envelope into a storable record. Item and actor columns
    /// are lifted out of the event so they can be filtered on.
    fn record_for(envelope: AuditEventEnvelope) -> AuditRecord {
        AuditRecord {
            id: 0,
            timestamp: envelope.timestamp,
            event_type: envelope.event.event_type().to_string(),
            item_id: envelope.event.item_id().map(String::from),
            actor: envelope.event.actor().map(String::from),
            data: envelope.event,
        }
    }
}

/// Create a complete audit system
///
/// Returns:
/// - `AuditHandle` - for emitting events (clone this to share across tasks)
/// - `AuditWriter` - spawn this as a background task with `tokio::spawn(writer.run())`
///
/// # Arguments
/// * `store` - The audit store to write events to
/// * `buffer_size` - Size of the channel buffer (`emit` waits and `try_emit` drops when full)
pub fn create_audit_system(
    store: Arc<dyn AuditStore>,
    buffer_size: usize,
) -> (AuditHandle, AuditWriter) {
    let (tx, rx) = mpsc::channel(buffer_size);
    let handle = AuditHandle::new(tx);
    let writer = AuditWriter::new(rx, store);
    (handle, writer)
}

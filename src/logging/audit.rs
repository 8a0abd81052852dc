//! Audit trail for operator-visible decisions
//!
//! Status overrides, released claims, settlement confirmations, and
//! rejected proofs are appended as JSONL for later review. Audit I/O is
//! never allowed to fail the operation being audited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Audit event kinds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// Operator wrote a raw status, bypassing transition checks
    StatusOverride,
    /// Provider or operator released a request (accepted, no state change)
    ClaimReleased,
    /// A settlement proof was accepted and both records finalized
    SettlementConfirmed,
    /// A settlement proof did not match the expected keyed hash
    ProofRejected,
    /// Payment reached Success but the request write failed; needs a
    /// compensating retry
    SettlementIncomplete,
}

/// One audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: AuditKind,
    /// Gateway node that recorded the event
    pub node_id: String,
    /// Acting account identifier, when authenticated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// Affected entity id (request or payment)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    /// Event-specific detail (target status, order ref, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditEvent {
    pub fn new(kind: AuditKind, node_id: String) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            node_id,
            actor: None,
            entity_id: None,
            detail: None,
        }
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_entity(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Convert to JSONL line
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Appends audit events to a JSONL file
#[derive(Clone)]
pub struct AuditLogger {
    inner: Arc<Mutex<Option<BufWriter<File>>>>,
    node_id: String,
}

impl AuditLogger {
    /// Create a logger with no file attached; events still go to tracing
    pub fn new(node_id: String) -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
            node_id,
        }
    }

    /// Attach the JSONL file sink
    pub async fn init_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let mut inner = self.inner.lock().await;
        *inner = Some(BufWriter::new(file));

        info!("Audit logging initialized to {}", path.display());
        Ok(())
    }

    /// Record an event with this node's id filled in
    pub fn record(&self, kind: AuditKind) -> AuditEventSink<'_> {
        AuditEventSink {
            logger: self,
            event: AuditEvent::new(kind, self.node_id.clone()),
        }
    }

    async fn write(&self, event: AuditEvent) {
        info!(
            kind = ?event.kind,
            actor = event.actor.as_deref().unwrap_or("-"),
            entity = event.entity_id.as_deref().unwrap_or("-"),
            detail = event.detail.as_deref().unwrap_or("-"),
            "audit"
        );

        let jsonl = match event.to_jsonl() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize audit event: {}", e);
                return;
            }
        };

        let mut inner = self.inner.lock().await;
        if let Some(ref mut writer) = *inner {
            if let Err(e) = writeln!(writer, "{}", jsonl) {
                error!("Failed to write audit event: {}", e);
            }
            if let Err(e) = writer.flush() {
                error!("Failed to flush audit log: {}", e);
            }
        }
    }
}

/// Builder handed out by [`AuditLogger::record`]; submit with `emit`
pub struct AuditEventSink<'a> {
    logger: &'a AuditLogger,
    event: AuditEvent,
}

impl AuditEventSink<'_> {
    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.event = self.event.with_actor(actor);
        self
    }

    pub fn entity(mut self, entity_id: impl Into<String>) -> Self {
        self.event = self.event.with_entity(entity_id);
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.event = self.event.with_detail(detail);
        self
    }

    pub async fn emit(self) {
        self.logger.write(self.event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = AuditEvent::new(AuditKind::StatusOverride, "node-1".to_string())
            .with_actor("ops@wayside.example")
            .with_entity("64f000000000000000000000")
            .with_detail("Settled -> Pending");

        let jsonl = event.to_jsonl().unwrap();
        assert!(jsonl.contains("status_override"));
        assert!(jsonl.contains("ops@wayside.example"));
        assert!(jsonl.contains("Settled -> Pending"));
    }

    #[tokio::test]
    async fn test_fileless_logger_is_noop_safe() {
        let logger = AuditLogger::new("node-1".into());
        // No file attached; must not panic or error
        logger
            .record(AuditKind::ProofRejected)
            .entity("pay-1")
            .emit()
            .await;
    }
}

//! DM-audit sink collaborator (spec.md §1, §4.4 step 3: "a DM-audit
//! notice" on broadcaster-registration failure). Out of scope: only the
//! interface matters.

use async_trait::async_trait;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditNotice {
    pub subject: Uuid,
    pub message: String,
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn notify(&self, notice: AuditNotice);
}

/// Discards everything; used where no audit backend is configured.
pub struct NullAuditSink;

#[async_trait]
impl AuditSink for NullAuditSink {
    async fn notify(&self, _notice: AuditNotice) {}
}

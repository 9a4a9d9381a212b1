//! `AuditSink` seam (§7). Persistent storage is external (Non-goals);
//! the core only needs somewhere to hand off each completed record.

use std::sync::Mutex;

use super::record::AuditRecord;

pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord);
}

/// Discards every record. The default for deployments that forward
/// audit records through a different channel (e.g. a log shipper
/// reading structured `log::info!` lines instead).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _record: AuditRecord) {}
}

/// In-memory recorder for tests.
#[derive(Default)]
pub struct VecAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl VecAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl AuditSink for VecAuditSink {
    fn record(&self, record: AuditRecord) {
        self.records.lock().unwrap().push(record);
    }
}

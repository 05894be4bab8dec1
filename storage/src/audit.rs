//! Audit-record emitters.

use async_trait::async_trait;
use cr_core::traits::AuditEmitter;
use cr_core::types::AuditRecord;
use errors::AuditError;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

/// Writes audit records to the log stream.
#[derive(Default)]
pub struct TracingAuditEmitter;

#[async_trait]
impl AuditEmitter for TracingAuditEmitter {
    async fn emit(&self, record: AuditRecord) -> Result<(), AuditError> {
        info!(
            audit_id = %record.id,
            action = %record.action,
            family = %record.family,
            schema_version = %record.schema_version,
            iteration_number = record.iteration_number,
            "audit"
        );
        Ok(())
    }
}

/// Collects audit records in memory so tests can assert on emissions.
#[derive(Default, Clone)]
pub struct RecordingAuditEmitter {
    records: Arc<RwLock<Vec<AuditRecord>>>,
}

impl RecordingAuditEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.read().clone()
    }
}

#[async_trait]
impl AuditEmitter for RecordingAuditEmitter {
    async fn emit(&self, record: AuditRecord) -> Result<(), AuditError> {
        self.records.write().push(record);
        Ok(())
    }
}

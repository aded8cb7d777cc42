//! Schema provenance record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of the most recent provisioning run for a schema.
///
/// This is an observation, not a transactional guarantee — a `Failed`
/// record is repaired by re-running provisioning, which is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MigrationStatus {
    Pending,
    Completed,
    Failed,
}

impl MigrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationStatus::Pending => "PENDING",
            MigrationStatus::Completed => "COMPLETED",
            MigrationStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<MigrationStatus> {
        match s {
            "PENDING" => Some(MigrationStatus::Pending),
            "COMPLETED" => Some(MigrationStatus::Completed),
            "FAILED" => Some(MigrationStatus::Failed),
            _ => None,
        }
    }
}

/// One row per (tenant, service) pair, upserted on every
/// (re-)provisioning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRecord {
    pub tenant_id: Uuid,
    pub schema_name: String,
    pub service_name: String,
    /// Highest migration version applied, as recorded by the last run.
    pub migration_version: Option<String>,
    pub migration_status: MigrationStatus,
    pub last_validation_at: Option<DateTime<Utc>>,
}

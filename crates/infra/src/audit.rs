//! Write audit trail.
//!
//! Every successful mutation appends one immutable [`EditRecord`]. Records are
//! never updated or deleted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use petstore_auth::IdentityClaims;
use petstore_core::EditId;

use crate::store::{EditLog, StoreError};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditOperation {
    Create,
    Update,
    Delete,
}

impl EditOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl core::fmt::Display for EditOperation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for EditOperation {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(StoreError::Corrupt(format!("unknown edit operation '{other}'"))),
        }
    }
}

/// One audited mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRecord {
    pub id: EditId,
    pub timestamp: DateTime<Utc>,
    pub operation: EditOperation,
    pub collection: String,
    pub target: String,
    pub payload: JsonValue,
    /// Identity that performed the change; absent for self-registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acting: Option<IdentityClaims>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    #[error("audit write failed: {0}")]
    Write(#[from] StoreError),
}

/// Appends edit records to an [`EditLog`].
#[derive(Clone)]
pub struct AuditRecorder {
    log: Arc<dyn EditLog>,
}

impl core::fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuditRecorder").finish_non_exhaustive()
    }
}

impl AuditRecorder {
    pub fn new(log: Arc<dyn EditLog>) -> Self {
        Self { log }
    }

    /// Record a mutation that has already been applied.
    ///
    /// For deletes, `payload` is the snapshot captured before deletion.
    pub async fn record(
        &self,
        operation: EditOperation,
        collection: &str,
        target: impl ToString,
        payload: JsonValue,
        acting: Option<&IdentityClaims>,
    ) -> Result<EditId, AuditError> {
        let record = EditRecord {
            id: EditId::new(),
            timestamp: Utc::now(),
            operation,
            collection: collection.to_string(),
            target: target.to_string(),
            payload,
            acting: acting.cloned(),
        };

        self.log.append_edit(&record).await.map_err(|e| {
            tracing::error!(
                error = %e,
                operation = %record.operation,
                collection = %record.collection,
                target = %record.target,
                "audit write failed"
            );
            AuditError::from(e)
        })?;

        tracing::debug!(
            edit_id = %record.id,
            operation = %record.operation,
            collection = %record.collection,
            target = %record.target,
            "edit recorded"
        );
        Ok(record.id)
    }
}

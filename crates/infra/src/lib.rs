//! Infrastructure layer: document stores and the audit trail.

pub mod audit;
pub mod store;

pub use audit::{AuditError, AuditRecorder, EditOperation, EditRecord};
pub use store::{
    CredentialStore, DeleteOutcome, EditLog, InMemoryStore, PetStore, PostgresStore, StoreError,
    UpdateOutcome,
};

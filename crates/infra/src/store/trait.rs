use async_trait::async_trait;
use thiserror::Error;

use petstore_auth::{Role, RoleLookupError, RoleSource, UserAccount, UserChanges};
use petstore_core::{PetId, UserId};
use petstore_pets::{Pet, PetFilter, PetUpdate};

use crate::audit::EditRecord;

/// Store operation error.
///
/// Infrastructure failures only; "not found" is expressed as `Ok(None)` or a
/// zero count in the outcome types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique field (user email) already exists.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    /// A stored document could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<StoreError> for RoleLookupError {
    fn from(value: StoreError) -> Self {
        RoleLookupError(value.to_string())
    }
}

/// Result of an update: how many documents matched the id.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched_count: u64,
}

/// Result of a delete: how many documents were removed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted_count: u64,
}

/// Users and role-permission tables.
///
/// Role lookups come from the [`RoleSource`] supertrait so the permission
/// resolver can run directly against a credential store.
#[async_trait]
pub trait CredentialStore: RoleSource {
    /// Case-insensitive lookup.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError>;

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<UserAccount>, StoreError>;

    /// Insert a new account. Fails with [`StoreError::Duplicate`] when the email is taken.
    async fn insert_user(&self, user: &UserAccount) -> Result<(), StoreError>;

    async fn update_user(&self, id: UserId, changes: &UserChanges) -> Result<UpdateOutcome, StoreError>;

    /// Insert `role` unless a role with that name already exists.
    async fn ensure_role(&self, role: &Role) -> Result<(), StoreError>;
}

#[async_trait]
pub trait PetStore: Send + Sync {
    /// Pets matching `filter`, oldest first.
    async fn list_pets(&self, filter: &PetFilter) -> Result<Vec<Pet>, StoreError>;

    async fn find_pet_by_id(&self, id: PetId) -> Result<Option<Pet>, StoreError>;

    async fn insert_pet(&self, pet: &Pet) -> Result<(), StoreError>;

    async fn update_pet(&self, id: PetId, update: &PetUpdate) -> Result<UpdateOutcome, StoreError>;

    async fn delete_pet(&self, id: PetId) -> Result<DeleteOutcome, StoreError>;
}

/// Append-only edit record log.
#[async_trait]
pub trait EditLog: Send + Sync {
    async fn append_edit(&self, record: &EditRecord) -> Result<(), StoreError>;

    /// Records in append order, optionally narrowed by collection and/or target.
    async fn find_edits(
        &self,
        collection: Option<&str>,
        target: Option<&str>,
    ) -> Result<Vec<EditRecord>, StoreError>;
}

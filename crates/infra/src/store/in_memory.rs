use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use petstore_auth::{default_roles, Role, RoleLookupError, RoleName, RoleSource, UserAccount, UserChanges};
use petstore_core::{Entity, PetId, UserId};
use petstore_pets::{Pet, PetFilter, PetUpdate};

use super::r#trait::{
    CredentialStore, DeleteOutcome, EditLog, PetStore, StoreError, UpdateOutcome,
};
use crate::audit::EditRecord;

/// In-memory document store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    roles: RwLock<HashMap<RoleName, Role>>,
    users: RwLock<HashMap<UserId, UserAccount>>,
    pets: RwLock<HashMap<PetId, Pet>>,
    edits: RwLock<Vec<EditRecord>>,
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

/// Insert `entity` keyed by its id, refusing to overwrite an existing document.
fn insert_new<E: Entity + Clone>(collection: &mut HashMap<E::Id, E>, entity: &E) -> Result<(), StoreError> {
    let id = entity.id();
    if collection.contains_key(&id) {
        return Err(StoreError::Duplicate(format!("{} id {id}", E::collection())));
    }
    collection.insert(id, entity.clone());
    Ok(())
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `Customer`, `Employee` and `Admin`.
    pub fn with_default_roles() -> Self {
        let roles = default_roles()
            .into_iter()
            .map(|r| (r.name.clone(), r))
            .collect();
        Self {
            roles: RwLock::new(roles),
            ..Self::default()
        }
    }

    /// Snapshot of every edit record, in append order.
    pub fn edits(&self) -> Vec<EditRecord> {
        self.edits.read().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl RoleSource for InMemoryStore {
    async fn find_role_by_name(&self, name: &RoleName) -> Result<Option<Role>, RoleLookupError> {
        let roles = self.roles.read().map_err(poisoned)?;
        Ok(roles.get(name).cloned())
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.get(&id).cloned())
    }

    async fn insert_user(&self, user: &UserAccount) -> Result<(), StoreError> {
        // Uniqueness check and insert happen under one write lock.
        let mut users = self.users.write().map_err(poisoned)?;
        if users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(StoreError::Duplicate(format!("email {}", user.email)));
        }
        insert_new(&mut users, user)
    }

    async fn update_user(&self, id: UserId, changes: &UserChanges) -> Result<UpdateOutcome, StoreError> {
        let mut users = self.users.write().map_err(poisoned)?;
        let matched_count = match users.get_mut(&id) {
            Some(user) => {
                user.apply(changes);
                1
            }
            None => 0,
        };
        Ok(UpdateOutcome { matched_count })
    }

    async fn ensure_role(&self, role: &Role) -> Result<(), StoreError> {
        let mut roles = self.roles.write().map_err(poisoned)?;
        roles.entry(role.name.clone()).or_insert_with(|| role.clone());
        Ok(())
    }
}

#[async_trait]
impl PetStore for InMemoryStore {
    async fn list_pets(&self, filter: &PetFilter) -> Result<Vec<Pet>, StoreError> {
        let pets = self.pets.read().map_err(poisoned)?;
        let mut found: Vec<Pet> = pets.values().filter(|p| filter.matches(p)).cloned().collect();
        found.sort_by(|a, b| (a.created_date, a.id).cmp(&(b.created_date, b.id)));
        Ok(found)
    }

    async fn find_pet_by_id(&self, id: PetId) -> Result<Option<Pet>, StoreError> {
        let pets = self.pets.read().map_err(poisoned)?;
        Ok(pets.get(&id).cloned())
    }

    async fn insert_pet(&self, pet: &Pet) -> Result<(), StoreError> {
        let mut pets = self.pets.write().map_err(poisoned)?;
        insert_new(&mut pets, pet)
    }

    async fn update_pet(&self, id: PetId, update: &PetUpdate) -> Result<UpdateOutcome, StoreError> {
        let mut pets = self.pets.write().map_err(poisoned)?;
        let matched_count = match pets.get_mut(&id) {
            Some(pet) => {
                pet.apply(update);
                1
            }
            None => 0,
        };
        Ok(UpdateOutcome { matched_count })
    }

    async fn delete_pet(&self, id: PetId) -> Result<DeleteOutcome, StoreError> {
        let mut pets = self.pets.write().map_err(poisoned)?;
        let deleted_count = u64::from(pets.remove(&id).is_some());
        Ok(DeleteOutcome { deleted_count })
    }
}

#[async_trait]
impl EditLog for InMemoryStore {
    async fn append_edit(&self, record: &EditRecord) -> Result<(), StoreError> {
        let mut edits = self.edits.write().map_err(poisoned)?;
        edits.push(record.clone());
        Ok(())
    }

    async fn find_edits(
        &self,
        collection: Option<&str>,
        target: Option<&str>,
    ) -> Result<Vec<EditRecord>, StoreError> {
        let edits = self.edits.read().map_err(poisoned)?;
        Ok(edits
            .iter()
            .filter(|e| collection.is_none_or(|c| e.collection == c))
            .filter(|e| target.is_none_or(|t| e.target == t))
            .cloned()
            .collect())
    }
}

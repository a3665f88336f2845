use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use petstore_core::{Entity, UserId};

use crate::{Actor, IdentityClaims, PermissionSet, Roles};

/// Stored user document.
///
/// `email` is kept lowercased; uniqueness is enforced case-insensitively by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: Roles,
    pub created_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_by: Option<Actor>,
}

impl Entity for UserAccount {
    type Id = UserId;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn collection() -> &'static str {
        "users"
    }
}

impl UserAccount {
    pub fn new(email: String, password_hash: String, full_name: String, role: Roles, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            email,
            password_hash,
            full_name,
            role,
            created_date: now,
            last_updated_on: None,
            last_updated_by: None,
        }
    }

    /// Claim set for a token, given the permissions resolved from `self.role`.
    pub fn claims(&self, permissions: PermissionSet) -> IdentityClaims {
        IdentityClaims {
            id: self.id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            role: self.role.clone(),
            permissions,
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            role: self.role.clone(),
            created_date: self.created_date,
            last_updated_on: self.last_updated_on,
            last_updated_by: self.last_updated_by.clone(),
        }
    }

    /// Apply `changes` in place (what a store does on a matched update).
    pub fn apply(&mut self, changes: &UserChanges) {
        if let Some(hash) = &changes.password_hash {
            self.password_hash = hash.clone();
        }
        if let Some(name) = &changes.full_name {
            self.full_name = name.clone();
        }
        self.last_updated_on = Some(changes.last_updated_on);
        self.last_updated_by = Some(changes.last_updated_by.clone());
    }

    /// Audit payload for a newly registered account. Never contains the hash.
    pub fn audit_payload(&self) -> Value {
        json!({
            "email": self.email,
            "fullName": self.full_name,
            "role": self.role,
            "createdDate": self.created_date,
        })
    }
}

/// Public view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    pub role: Roles,
    pub created_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated_on: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated_by: Option<Actor>,
}

/// Partial update to a user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserChanges {
    pub password_hash: Option<String>,
    pub full_name: Option<String>,
    pub last_updated_on: DateTime<Utc>,
    pub last_updated_by: Actor,
}

impl UserChanges {
    /// Payload for the `update/users` edit record.
    ///
    /// The new hash is replaced by a `passwordChanged` flag.
    pub fn audit_payload(&self) -> Value {
        let mut payload = Map::new();
        if let Some(name) = &self.full_name {
            payload.insert("fullName".to_string(), json!(name));
        }
        if self.password_hash.is_some() {
            payload.insert("passwordChanged".to_string(), json!(true));
        }
        payload.insert("lastUpdatedOn".to_string(), json!(self.last_updated_on));
        payload.insert("lastUpdatedBy".to_string(), json!(self.last_updated_by));
        Value::Object(payload)
    }
}

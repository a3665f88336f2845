//! Postgres-backed document store.
//!
//! Users, roles, pets and edit records live in four tables created by
//! [`PostgresStore::ensure_schema`]. Nested documents (role lists, permission
//! maps, actor snapshots, payloads) are stored as JSONB.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Duplicate` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / Other | N/A | `Backend` |
//! | Row decode failure | N/A | `Corrupt` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::instrument;

use petstore_auth::{
    Actor, PermissionSet, Role, RoleLookupError, RoleName, RoleSource, Roles, UserAccount,
    UserChanges,
};
use petstore_core::{EditId, PetId, UserId};
use petstore_pets::{Pet, PetFilter, PetUpdate};

use super::r#trait::{
    CredentialStore, DeleteOutcome, EditLog, PetStore, StoreError, UpdateOutcome,
};
use crate::audit::{EditOperation, EditRecord};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS roles (
        name        TEXT PRIMARY KEY,
        permissions JSONB NOT NULL DEFAULT '{}'::jsonb
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id              UUID PRIMARY KEY,
        email           TEXT NOT NULL,
        password_hash   TEXT NOT NULL,
        full_name       TEXT NOT NULL,
        role            JSONB NOT NULL,
        created_date    TIMESTAMPTZ NOT NULL,
        last_updated_on TIMESTAMPTZ NULL,
        last_updated_by JSONB NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS users_email_lower_idx ON users (lower(email))",
    r#"
    CREATE TABLE IF NOT EXISTS pets (
        id           UUID PRIMARY KEY,
        species      TEXT NOT NULL,
        name         TEXT NOT NULL,
        age          BIGINT NOT NULL CHECK (age >= 0),
        gender       TEXT NOT NULL,
        created_date TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS edits (
        id         UUID PRIMARY KEY,
        timestamp  TIMESTAMPTZ NOT NULL,
        operation  TEXT NOT NULL,
        collection TEXT NOT NULL,
        target     TEXT NOT NULL,
        payload    JSONB NOT NULL,
        acting     JSONB NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS edits_collection_target_idx ON edits (collection, target)",
];

/// Postgres-backed store for users, roles, pets and edits.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl RoleSource for PostgresStore {
    #[instrument(skip(self), fields(role = %name), err)]
    async fn find_role_by_name(&self, name: &RoleName) -> Result<Option<Role>, RoleLookupError> {
        let row = sqlx::query("SELECT name, permissions FROM roles WHERE name = $1")
            .bind(name.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_role_by_name", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let role = decode("roles", || {
            let name: String = row.try_get("name")?;
            let permissions: Json<PermissionSet> = row.try_get("permissions")?;
            Ok(Role {
                name: RoleName::new(name),
                permissions: permissions.0,
            })
        })?;
        Ok(Some(role))
    }
}

const USER_COLUMNS: &str =
    "id, email, password_hash, full_name, role, created_date, last_updated_on, last_updated_by";

fn user_from_row(row: &PgRow) -> Result<UserAccount, StoreError> {
    decode("users", || {
        let role: Json<Roles> = row.try_get("role")?;
        let last_updated_by: Option<Json<Actor>> = row.try_get("last_updated_by")?;
        Ok(UserAccount {
            id: UserId::from_uuid(row.try_get("id")?),
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            full_name: row.try_get("full_name")?,
            role: role.0,
            created_date: row.try_get("created_date")?,
            last_updated_on: row.try_get::<Option<DateTime<Utc>>, _>("last_updated_on")?,
            last_updated_by: last_updated_by.map(|j| j.0),
        })
    })
}

#[async_trait]
impl CredentialStore for PostgresStore {
    #[instrument(skip(self, email), err)]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_user_by_email", e))?;

        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn find_user_by_id(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_id", e))?;

        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn insert_user(&self, user: &UserAccount) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(Json(&user.role))
        .bind(user.created_date)
        .bind(user.last_updated_on)
        .bind(user.last_updated_by.as_ref().map(Json))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(())
    }

    #[instrument(skip(self, changes), fields(user_id = %id), err)]
    async fn update_user(&self, id: UserId, changes: &UserChanges) -> Result<UpdateOutcome, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                password_hash   = COALESCE($2, password_hash),
                full_name       = COALESCE($3, full_name),
                last_updated_on = $4,
                last_updated_by = $5
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(changes.password_hash.as_deref())
        .bind(changes.full_name.as_deref())
        .bind(changes.last_updated_on)
        .bind(Json(&changes.last_updated_by))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;

        Ok(UpdateOutcome {
            matched_count: result.rows_affected(),
        })
    }

    #[instrument(skip(self, role), fields(role = %role.name), err)]
    async fn ensure_role(&self, role: &Role) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO roles (name, permissions) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING",
        )
        .bind(role.name.as_str())
        .bind(Json(&role.permissions))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("ensure_role", e))?;
        Ok(())
    }
}

const PET_COLUMNS: &str = "id, species, name, age, gender, created_date";

fn pet_from_row(row: &PgRow) -> Result<Pet, StoreError> {
    decode("pets", || {
        let age: i64 = row.try_get("age")?;
        let age = u32::try_from(age).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        Ok(Pet {
            id: PetId::from_uuid(row.try_get("id")?),
            species: row.try_get("species")?,
            name: row.try_get("name")?,
            age,
            gender: row.try_get("gender")?,
            created_date: row.try_get("created_date")?,
        })
    })
}

#[async_trait]
impl PetStore for PostgresStore {
    #[instrument(skip(self), err)]
    async fn list_pets(&self, filter: &PetFilter) -> Result<Vec<Pet>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PET_COLUMNS} FROM pets
            WHERE ($1::text IS NULL OR lower(species) = lower($1))
              AND ($2::text IS NULL OR lower(gender) = lower($2))
              AND ($3::bigint IS NULL OR age >= $3)
              AND ($4::bigint IS NULL OR age <= $4)
            ORDER BY created_date ASC, id ASC
            "#
        ))
        .bind(filter.species.as_deref())
        .bind(filter.gender.as_deref())
        .bind(filter.min_age.map(i64::from))
        .bind(filter.max_age.map(i64::from))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_pets", e))?;

        rows.iter().map(pet_from_row).collect()
    }

    #[instrument(skip(self), fields(pet_id = %id), err)]
    async fn find_pet_by_id(&self, id: PetId) -> Result<Option<Pet>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PET_COLUMNS} FROM pets WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_pet_by_id", e))?;

        row.as_ref().map(pet_from_row).transpose()
    }

    #[instrument(skip(self, pet), fields(pet_id = %pet.id), err)]
    async fn insert_pet(&self, pet: &Pet) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO pets ({PET_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)"
        ))
        .bind(pet.id.as_uuid())
        .bind(&pet.species)
        .bind(&pet.name)
        .bind(i64::from(pet.age))
        .bind(&pet.gender)
        .bind(pet.created_date)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_pet", e))?;
        Ok(())
    }

    #[instrument(skip(self, update), fields(pet_id = %id), err)]
    async fn update_pet(&self, id: PetId, update: &PetUpdate) -> Result<UpdateOutcome, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE pets SET
                species = COALESCE($2, species),
                name    = COALESCE($3, name),
                age     = COALESCE($4, age),
                gender  = COALESCE($5, gender)
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(update.species.as_deref())
        .bind(update.name.as_deref())
        .bind(update.age.map(i64::from))
        .bind(update.gender.as_deref())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_pet", e))?;

        Ok(UpdateOutcome {
            matched_count: result.rows_affected(),
        })
    }

    #[instrument(skip(self), fields(pet_id = %id), err)]
    async fn delete_pet(&self, id: PetId) -> Result<DeleteOutcome, StoreError> {
        let result = sqlx::query("DELETE FROM pets WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_pet", e))?;

        Ok(DeleteOutcome {
            deleted_count: result.rows_affected(),
        })
    }
}

fn edit_from_row(row: &PgRow) -> Result<EditRecord, StoreError> {
    let operation: String = decode("edits", || row.try_get("operation"))?;
    let operation: EditOperation = operation.parse()?;
    decode("edits", || {
        let payload: Json<serde_json::Value> = row.try_get("payload")?;
        let acting: Option<Json<petstore_auth::IdentityClaims>> = row.try_get("acting")?;
        Ok(EditRecord {
            id: EditId::from_uuid(row.try_get("id")?),
            timestamp: row.try_get("timestamp")?,
            operation,
            collection: row.try_get("collection")?,
            target: row.try_get("target")?,
            payload: payload.0,
            acting: acting.map(|j| j.0),
        })
    })
}

#[async_trait]
impl EditLog for PostgresStore {
    #[instrument(
        skip(self, record),
        fields(edit_id = %record.id, operation = %record.operation, collection = %record.collection),
        err
    )]
    async fn append_edit(&self, record: &EditRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO edits (id, timestamp, operation, collection, target, payload, acting)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.timestamp)
        .bind(record.operation.as_str())
        .bind(&record.collection)
        .bind(&record.target)
        .bind(Json(&record.payload))
        .bind(record.acting.as_ref().map(Json))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("append_edit", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn find_edits(
        &self,
        collection: Option<&str>,
        target: Option<&str>,
    ) -> Result<Vec<EditRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, timestamp, operation, collection, target, payload, acting
            FROM edits
            WHERE ($1::text IS NULL OR collection = $1)
              AND ($2::text IS NULL OR target = $2)
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(collection)
        .bind(target)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_edits", e))?;

        rows.iter().map(edit_from_row).collect()
    }
}

fn decode<T>(table: &str, f: impl FnOnce() -> Result<T, sqlx::Error>) -> Result<T, StoreError> {
    f().map_err(|e| StoreError::Corrupt(format!("failed to decode {table} row: {e}")))
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code() {
                Some(code) if code.as_ref() == "23505" => StoreError::Duplicate(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

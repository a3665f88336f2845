//! Store and codec wiring shared by all handlers.

use std::sync::Arc;

use anyhow::Context;

use petstore_auth::{default_roles, TokenCodec};
use petstore_infra::{
    AuditRecorder, CredentialStore, EditLog, InMemoryStore, PetStore, PostgresStore,
};

use crate::config::AppConfig;
use crate::middleware::{AuthState, SessionCookie};

#[derive(Clone)]
pub struct AppServices {
    pub credentials: Arc<dyn CredentialStore>,
    pub pets: Arc<dyn PetStore>,
    pub edits: Arc<dyn EditLog>,
    pub audit: AuditRecorder,
    pub tokens: Arc<TokenCodec>,
    pub cookie: SessionCookie,
}

impl AppServices {
    /// Wire every store handle to one backing store.
    pub fn with_store<S>(store: Arc<S>, config: &AppConfig) -> Self
    where
        S: CredentialStore + PetStore + EditLog + 'static,
    {
        Self {
            credentials: store.clone(),
            pets: store.clone(),
            edits: store.clone(),
            audit: AuditRecorder::new(store),
            tokens: Arc::new(TokenCodec::new(config.auth.secret.as_bytes(), config.auth.token_ttl)),
            cookie: SessionCookie::new(config.auth.cookie_name.clone(), config.auth.cookie_max_age),
        }
    }

    /// In-memory store seeded with the default roles.
    pub fn in_memory(config: &AppConfig) -> Self {
        Self::with_store(Arc::new(InMemoryStore::with_default_roles()), config)
    }

    /// Postgres when `DATABASE_URL` is set, in-memory otherwise.
    pub async fn build(config: &AppConfig) -> anyhow::Result<Self> {
        let Some(url) = config.database_url.as_deref() else {
            tracing::info!("DATABASE_URL not set; using in-memory store");
            return Ok(Self::in_memory(config));
        };

        let store = PostgresStore::connect(url)
            .await
            .context("failed to connect to Postgres")?;
        store.ensure_schema().await.context("failed to create schema")?;
        for role in default_roles() {
            store
                .ensure_role(&role)
                .await
                .with_context(|| format!("failed to seed role {}", role.name))?;
        }
        tracing::info!("using Postgres store");

        Ok(Self::with_store(Arc::new(store), config))
    }

    pub fn auth_state(&self) -> AuthState {
        AuthState {
            tokens: self.tokens.clone(),
            cookie: self.cookie.clone(),
        }
    }
}

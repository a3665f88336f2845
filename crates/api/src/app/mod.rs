//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store/codec wiring
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request payload schemas
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{middleware::from_fn_with_state, Extension, Router};
use serde::Serialize;
use serde_json::Value;

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use errors::ApiError;
use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let services = AppServices::build(config).await?;
    Ok(build_router(services))
}

/// Router over already-wired services (tests inject their own store here).
pub fn build_router(services: AppServices) -> Router {
    let auth_state = services.auth_state();

    routes::router()
        .layer(Extension(Arc::new(services)))
        .layer(from_fn_with_state(auth_state, middleware::auth_middleware))
}

/// Serialize an audit payload.
pub(crate) fn to_payload<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::internal(format!("payload serialization failed: {e}")))
}

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde_json::json;

use petstore_auth::roles::CUSTOMER;
use petstore_auth::{
    hash_password, resolve_permissions, verify_password, Roles, UserAccount, UserChanges,
    UserProfile,
};
use petstore_core::{Entity, UserId};
use petstore_infra::{EditOperation, StoreError};

use crate::app::dto::{LoginRequest, RegisterRequest, UserUpdateRequest};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::AuthContext;
use crate::validation::Validated;

const INVALID_CREDENTIALS: &str = "Invalid Credentials";

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(Validated(body)): Extension<Validated<RegisterRequest>>,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let taken = || ApiError::Conflict(format!("Email {} is already in use.", body.email));

    if services.credentials.find_user_by_email(&body.email).await?.is_some() {
        return Err(taken());
    }

    let password_hash = hash_in_background(body.password.clone()).await?;
    let user = UserAccount::new(
        body.email.clone(),
        password_hash,
        body.full_name.clone(),
        Roles::single(CUSTOMER),
        Utc::now(),
    );

    match services.credentials.insert_user(&user).await {
        Ok(()) => {}
        // Lost a race with a concurrent registration for the same address.
        Err(StoreError::Duplicate(_)) => return Err(taken()),
        Err(e) => return Err(e.into()),
    }

    services
        .audit
        .record(
            EditOperation::Create,
            UserAccount::collection(),
            user.id,
            user.audit_payload(),
            None,
        )
        .await?;

    let (jar, token) = start_session(&services, &user, jar).await?;
    tracing::info!(user_id = %user.id, "user registered");

    Ok((
        jar,
        Json(json!({ "message": "New User Registered!", "userId": user.id, "token": token })),
    )
        .into_response())
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(Validated(body)): Extension<Validated<LoginRequest>>,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let invalid = || ApiError::bad_request("invalid_credentials", INVALID_CREDENTIALS);

    let user = services
        .credentials
        .find_user_by_email(&body.email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_in_background(body.password, user.password_hash.clone()).await? {
        tracing::debug!(user_id = %user.id, "login rejected: wrong password");
        return Err(invalid());
    }

    let (jar, token) = start_session(&services, &user, jar).await?;
    Ok((
        jar,
        Json(json!({ "message": "Welcome back!", "userId": user.id, "token": token })),
    )
        .into_response())
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = services
        .credentials
        .find_user_by_id(auth.user_id())
        .await?
        .ok_or_else(|| ApiError::not_found("User Not Found!"))?;
    Ok(Json(user.profile()))
}

/// Self-service update; reissues the token so it reflects the new profile.
pub async fn update_me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Extension(Validated(body)): Extension<Validated<UserUpdateRequest>>,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let user_id = auth.user_id();
    apply_update(&services, &auth, user_id, body).await?;

    let user = services
        .credentials
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User Not Found!"))?;
    let (jar, token) = start_session(&services, &user, jar).await?;

    Ok((
        jar,
        Json(json!({ "message": "User Updated!", "userId": user_id, "token": token })),
    )
        .into_response())
}

/// Administrative update of any account.
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Extension(Validated(body)): Extension<Validated<UserUpdateRequest>>,
    Path(user_id): Path<String>,
) -> Result<Response, ApiError> {
    let user_id: UserId = user_id.parse()?;
    apply_update(&services, &auth, user_id, body).await?;

    Ok(Json(json!({ "message": "User Updated!", "userId": user_id })).into_response())
}

/// Write `body` to `user_id` and audit it. Nothing is audited when no account matched.
async fn apply_update(
    services: &AppServices,
    auth: &AuthContext,
    user_id: UserId,
    body: UserUpdateRequest,
) -> Result<(), ApiError> {
    let password_hash = match body.password {
        Some(password) => Some(hash_in_background(password).await?),
        None => None,
    };
    let changes = UserChanges {
        password_hash,
        full_name: body.full_name,
        last_updated_on: Utc::now(),
        last_updated_by: auth.actor(),
    };

    let outcome = services.credentials.update_user(user_id, &changes).await?;
    if outcome.matched_count == 0 {
        return Err(ApiError::not_found("User Not Found!"));
    }

    services
        .audit
        .record(
            EditOperation::Update,
            UserAccount::collection(),
            user_id,
            changes.audit_payload(),
            Some(auth.claims()),
        )
        .await?;

    tracing::info!(user_id = %user_id, updated_by = %auth.user_id(), "user updated");
    Ok(())
}

/// Resolve permissions for `user`, sign a token and set the session cookie.
async fn start_session(
    services: &AppServices,
    user: &UserAccount,
    jar: CookieJar,
) -> Result<(CookieJar, String), ApiError> {
    let permissions = resolve_permissions(&*services.credentials, &user.role).await?;
    let token = services.tokens.issue(&user.claims(permissions))?;
    let jar = jar.add(services.cookie.build(token.clone()));
    Ok((jar, token))
}

async fn hash_in_background(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::internal(format!("password hashing task failed: {e}")))?
        .map_err(ApiError::from)
}

async fn verify_in_background(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::internal(format!("password verification task failed: {e}")))?
        .map_err(ApiError::from)
}

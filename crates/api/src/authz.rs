//! Per-route authorization gate.
//!
//! Each route declares an [`AccessPolicy`]; this one middleware enforces it
//! before the handler (and so before any audit write) can run.

use axum::{
    extract::{Request, State},
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response},
    routing::MethodRouter,
};

use petstore_auth::{authorize, AccessPolicy};

use crate::app::errors::ApiError;
use crate::context::AuthContext;

pub async fn authorization_gate(State(policy): State<AccessPolicy>, req: Request, next: Next) -> Response {
    let identity = req.extensions().get::<AuthContext>().map(AuthContext::claims);
    let caller = identity.map(|c| c.id);

    if let Err(e) = authorize(identity, &policy) {
        tracing::debug!(
            user_id = ?caller,
            required = ?policy.requires_permission.as_ref().map(|p| p.as_str()),
            reason = %e,
            "request denied"
        );
        return ApiError::from(e).into_response();
    }

    next.run(req).await
}

/// Wrap `route` so `policy` is enforced before its handler.
pub fn guard<S>(route: MethodRouter<S>, policy: AccessPolicy) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    route.route_layer(from_fn_with_state(policy, authorization_gate))
}

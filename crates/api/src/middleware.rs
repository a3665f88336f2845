use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Utc;

use petstore_auth::TokenCodec;

use crate::context::AuthContext;

/// Name and lifetime of the session cookie that carries a token.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    name: String,
    max_age: chrono::Duration,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, max_age: chrono::Duration) -> Self {
        Self {
            name: name.into(),
            max_age,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `HttpOnly`, `Path=/` cookie holding `token`.
    pub fn build(&self, token: impl Into<String>) -> Cookie<'static> {
        Cookie::build((self.name.clone(), token.into()))
            .http_only(true)
            .path("/")
            .max_age(time::Duration::seconds(self.max_age.num_seconds()))
            .build()
    }
}

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<TokenCodec>,
    pub cookie: SessionCookie,
}

/// Resolve the caller identity, if any. Never rejects.
///
/// An `Authorization` header wins over the cookie even when it does not hold a
/// usable bearer token. A valid cookie token is re-set on the response so the
/// cookie's max-age slides forward.
pub async fn auth_middleware(State(state): State<AuthState>, mut req: Request, next: Next) -> Response {
    let now = Utc::now();
    let mut refresh: Option<String> = None;

    let claims = match req.headers().get(header::AUTHORIZATION) {
        Some(value) => match extract_bearer(value) {
            Some(token) => state.tokens.verify_at(token, now).ok(),
            None => {
                tracing::debug!("authorization header is not a bearer token; ignoring");
                None
            }
        },
        None => {
            let jar = CookieJar::from_headers(req.headers());
            jar.get(state.cookie.name()).and_then(|cookie| {
                let claims = state.tokens.verify_at(cookie.value(), now).ok()?;
                refresh = Some(cookie.value().to_string());
                Some(claims)
            })
        }
    };

    if let Some(claims) = claims {
        req.extensions_mut().insert(AuthContext::new(claims));
    }

    let response = next.run(req).await;

    match refresh {
        // A handler that issued a fresh session cookie takes precedence.
        Some(token) if !sets_cookie(&response, state.cookie.name()) => {
            (CookieJar::new().add(state.cookie.build(token)), response).into_response()
        }
        _ => response,
    }
}

/// `<scheme> <token>`: the token is the text between the first and second space.
fn extract_bearer(value: &HeaderValue) -> Option<&str> {
    let mut parts = value.to_str().ok()?.split(' ');
    if parts.next()? != "Bearer" {
        return None;
    }
    parts.next().filter(|token| !token.is_empty())
}

fn sets_cookie(response: &Response, name: &str) -> bool {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split_once('='))
        .any(|(n, _)| n.trim() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer(&HeaderValue::from_static("Bearer abc")), Some("abc"));
        assert_eq!(extract_bearer(&HeaderValue::from_static("Bearer abc def")), Some("abc"));
        assert_eq!(extract_bearer(&HeaderValue::from_static("Bearer  abc")), None);
        assert_eq!(extract_bearer(&HeaderValue::from_static("Bearer ")), None);
        assert_eq!(extract_bearer(&HeaderValue::from_static("Basic abc")), None);
        assert_eq!(extract_bearer(&HeaderValue::from_static("bearer abc")), None);
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = SessionCookie::new("authToken", chrono::Duration::minutes(15)).build("t0k");
        let rendered = cookie.to_string();

        assert!(rendered.starts_with("authToken=t0k"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Max-Age=900"));
    }
}

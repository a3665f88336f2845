//! Request payload validation gate.
//!
//! A route opts in with [`with_body`]; the body is parsed once, validated
//! against the operation's [`Schema`], and handed to the handler as
//! `Extension<Validated<S>>`. Invalid payloads never reach authorization or
//! the handler.

use std::collections::HashMap;

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    middleware::{from_fn, Next},
    response::{IntoResponse, Response},
    routing::MethodRouter,
};
use serde_json::{Map, Value};

use petstore_core::{Schema, ValidationErrors};

use crate::app::errors::ApiError;

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// A payload that passed its schema.
#[derive(Debug, Clone)]
pub struct Validated<S>(pub S);

pub async fn validate_body<S>(req: Request, next: Next) -> Response
where
    S: Schema + Clone + Send + Sync + 'static,
{
    let (mut parts, body) = req.into_parts();

    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return ApiError::from(ValidationErrors::single(
                "body",
                format!("\"body\" must not exceed {MAX_BODY_BYTES} bytes"),
            ))
            .into_response();
        }
    };

    let value = if bytes.is_empty() {
        Value::Null
    } else {
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => value,
            Err(_) => {
                return ApiError::from(ValidationErrors::single("body", "\"body\" must be valid JSON"))
                    .into_response();
            }
        }
    };

    match S::from_json(&value) {
        Ok(payload) => {
            parts.extensions.insert(Validated(payload));
            next.run(Request::from_parts(parts, Body::from(bytes))).await
        }
        Err(errors) => ApiError::from(errors).into_response(),
    }
}

/// Validate the request body against `S` before anything else on `route` runs.
///
/// Apply after [`crate::authz::guard`] so validation is the outer layer.
pub fn with_body<S, T>(route: MethodRouter<T>) -> MethodRouter<T>
where
    S: Schema + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    route.route_layer(from_fn(validate_body::<S>))
}

/// Validate query-string parameters against `S`.
///
/// Parameters arrive as strings; schemas coerce numeric fields themselves.
pub fn validate_query<S: Schema>(params: HashMap<String, String>) -> Result<S, ApiError> {
    let object: Map<String, Value> = params.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
    S::from_json(&Value::Object(object)).map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, http::StatusCode, routing::post, Extension, Router};
    use petstore_pets::{NewPet, PetFilter};
    use tower::ServiceExt;

    async fn echo(Extension(Validated(pet)): Extension<Validated<NewPet>>) -> String {
        format!("{}:{}", pet.name, pet.age)
    }

    fn app() -> Router {
        Router::new().route("/pets", with_body::<NewPet, ()>(post(echo)))
    }

    fn request(body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/pets")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn valid_payload_reaches_handler_coerced() {
        let response = app()
            .oneshot(request(r#"{"species":"Dog","name":" Fido ","age":"3","gender":"M"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Fido:3");
    }

    #[tokio::test]
    async fn invalid_payload_is_rejected_with_every_violation() {
        let response = app().oneshot(request(r#"{"name":"","age":-1}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["details"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn unparsable_and_empty_bodies_yield_one_body_violation() {
        for raw in ["{not json", ""] {
            let response = app().oneshot(request(raw)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);

            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body: Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(body["details"][0]["field"], "body");
            assert_eq!(body["details"].as_array().unwrap().len(), 1);
        }
    }

    #[test]
    fn query_values_are_coerced_by_the_schema() {
        let params = HashMap::from([
            ("species".to_string(), "Cat".to_string()),
            ("minAge".to_string(), "2".to_string()),
        ]);
        let filter: PetFilter = validate_query(params).unwrap();
        assert_eq!(filter.min_age, Some(2));

        let bad = HashMap::from([("minAge".to_string(), "old".to_string())]);
        assert!(validate_query::<PetFilter>(bad).is_err());
    }
}

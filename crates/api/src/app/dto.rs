use serde_json::Value;

use petstore_core::validation::Presence;
use petstore_core::{Fields, Schema, ValidationErrors};

// -------------------------
// Request DTOs
// -------------------------

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

impl Schema for RegisterRequest {
    fn from_json(value: &Value) -> Result<Self, ValidationErrors> {
        let mut f = Fields::new(value);
        let email = f.email("email", Presence::Required);
        let password = f.string("password", MIN_PASSWORD_LEN, Presence::Required);
        let full_name = f.string("fullName", 1, Presence::Required);

        f.finish(&["email", "password", "fullName"], || {
            Some(RegisterRequest {
                email: email?,
                password: password?,
                full_name: full_name?,
            })
        })
    }
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Schema for LoginRequest {
    fn from_json(value: &Value) -> Result<Self, ValidationErrors> {
        let mut f = Fields::new(value);
        let email = f.email("email", Presence::Required);
        let password = f.string("password", MIN_PASSWORD_LEN, Presence::Required);

        f.finish(&["email", "password"], || {
            Some(LoginRequest {
                email: email?,
                password: password?,
            })
        })
    }
}

/// Self-service and admin user update. At least one field is present.
#[derive(Debug, Clone)]
pub struct UserUpdateRequest {
    pub password: Option<String>,
    pub full_name: Option<String>,
}

impl Schema for UserUpdateRequest {
    fn from_json(value: &Value) -> Result<Self, ValidationErrors> {
        let mut f = Fields::new(value);
        f.at_least_one(&["password", "fullName"]);
        let password = f.string("password", MIN_PASSWORD_LEN, Presence::Optional);
        let full_name = f.string("fullName", 1, Presence::Optional);

        f.finish(&["password", "fullName"], || {
            Some(UserUpdateRequest {
                password,
                full_name,
            })
        })
    }
}

/// `GET /api/edits` filter.
#[derive(Debug, Clone, Default)]
pub struct EditsQuery {
    pub collection: Option<String>,
    pub target: Option<String>,
}

impl Schema for EditsQuery {
    fn from_json(value: &Value) -> Result<Self, ValidationErrors> {
        let mut f = Fields::new(value);
        let collection = f.string("collection", 1, Presence::Optional);
        let target = f.string("target", 1, Presence::Optional);

        f.finish(&["collection", "target"], || Some(EditsQuery { collection, target }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn register_normalizes_email_and_collects_errors() {
        let ok = RegisterRequest::from_json(&json!({
            "email": "  Alice@Example.COM ",
            "password": "password1",
            "fullName": " Alice ",
        }))
        .unwrap();
        assert_eq!(ok.email, "alice@example.com");
        assert_eq!(ok.full_name, "Alice");

        let err = RegisterRequest::from_json(&json!({
            "email": "not-an-email",
            "password": "short",
            "role": "Admin",
        }))
        .unwrap_err();
        let mut fields = err.fields();
        fields.sort_unstable();
        assert_eq!(fields, vec!["email", "fullName", "password", "role"]);
    }

    #[test]
    fn user_update_requires_a_field() {
        assert!(UserUpdateRequest::from_json(&json!({})).is_err());

        let update = UserUpdateRequest::from_json(&json!({ "fullName": "Bob" })).unwrap();
        assert_eq!(update.full_name.as_deref(), Some("Bob"));
        assert!(update.password.is_none());
    }

    #[test]
    fn login_rejects_unknown_keys() {
        let err = LoginRequest::from_json(&json!({
            "email": "a@x.com",
            "password": "password1",
            "remember": true,
        }))
        .unwrap_err();
        assert_eq!(err.fields(), vec!["remember"]);
    }
}

//! Request payload validation.
//!
//! Schemas pull typed values out of a JSON object through [`Fields`], which
//! coerces as it goes (trimming strings, lowercasing emails, parsing numeric
//! strings) and records every violation instead of stopping at the first one.

use core::ops::RangeInclusive;

use serde::Serialize;
use serde_json::{Map, Value};

/// A single field-level violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// All violations found while validating one payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Field names with at least one violation, in report order.
    pub fn fields(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.field.as_str()).collect()
    }
}

impl core::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut first = true;
        for e in &self.0 {
            if !first {
                f.write_str(". ")?;
            }
            f.write_str(&e.message)?;
            first = false;
        }
        Ok(())
    }
}

/// A payload type with one canonical validation schema.
pub trait Schema: Sized {
    fn from_json(value: &Value) -> Result<Self, ValidationErrors>;
}

/// Whether a field must be present.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
}

/// Cursor over a JSON object that accumulates violations.
#[derive(Debug)]
pub struct Fields<'a> {
    object: Option<&'a Map<String, Value>>,
    errors: ValidationErrors,
}

impl<'a> Fields<'a> {
    pub fn new(value: &'a Value) -> Self {
        let mut errors = ValidationErrors::new();
        let object = value.as_object();
        if object.is_none() {
            errors.push("body", "\"body\" must be of type object");
        }
        Self { object, errors }
    }

    fn raw(&self, name: &str) -> Option<&'a Value> {
        self.object.and_then(|o| o.get(name))
    }

    fn missing(&mut self, name: &str, presence: Presence) {
        if presence == Presence::Required && self.object.is_some() {
            self.errors.push(name, format!("\"{name}\" is required"));
        }
    }

    /// Trimmed string of at least `min_len` characters.
    pub fn string(&mut self, name: &str, min_len: usize, presence: Presence) -> Option<String> {
        let Some(raw) = self.raw(name) else {
            self.missing(name, presence);
            return None;
        };
        let Some(s) = raw.as_str() else {
            self.errors.push(name, format!("\"{name}\" must be a string"));
            return None;
        };
        let trimmed = s.trim();
        if trimmed.is_empty() && min_len > 0 {
            self.errors
                .push(name, format!("\"{name}\" is not allowed to be empty"));
            return None;
        }
        if trimmed.chars().count() < min_len {
            self.errors.push(
                name,
                format!("\"{name}\" length must be at least {min_len} characters long"),
            );
            return None;
        }
        Some(trimmed.to_string())
    }

    /// Trimmed, lowercased email address.
    pub fn email(&mut self, name: &str, presence: Presence) -> Option<String> {
        let value = self.string(name, 1, presence)?.to_lowercase();
        if !looks_like_email(&value) {
            self.errors
                .push(name, format!("\"{name}\" must be a valid email"));
            return None;
        }
        Some(value)
    }

    /// Integer from a JSON number or a numeric string, within `range`.
    pub fn integer(
        &mut self,
        name: &str,
        range: RangeInclusive<i64>,
        presence: Presence,
    ) -> Option<i64> {
        let Some(raw) = self.raw(name) else {
            self.missing(name, presence);
            return None;
        };
        let parsed = match raw {
            Value::Number(n) => match n.as_i64() {
                Some(v) => Ok(v),
                None => n.as_f64().and_then(whole).ok_or("integer"),
            },
            Value::String(s) => match s.trim().parse::<i64>() {
                Ok(v) => Ok(v),
                Err(_) => match s.trim().parse::<f64>() {
                    Ok(f) => whole(f).ok_or("integer"),
                    Err(_) => Err("number"),
                },
            },
            _ => Err("number"),
        };
        let value = match parsed {
            Ok(v) => v,
            Err(kind) => {
                let article = if kind == "integer" { "an" } else { "a" };
                self.errors
                    .push(name, format!("\"{name}\" must be {article} {kind}"));
                return None;
            }
        };
        if value < *range.start() {
            self.errors.push(
                name,
                format!("\"{name}\" must be greater than or equal to {}", range.start()),
            );
            return None;
        }
        if value > *range.end() {
            self.errors.push(
                name,
                format!("\"{name}\" must be less than or equal to {}", range.end()),
            );
            return None;
        }
        Some(value)
    }

    /// Require at least one of `names` to be present in the object.
    pub fn at_least_one(&mut self, names: &[&str]) {
        let Some(object) = self.object else {
            return;
        };
        if !names.iter().any(|n| object.contains_key(*n)) {
            self.errors.push(
                "body",
                format!("\"body\" must contain at least one of [{}]", names.join(", ")),
            );
        }
    }

    /// Reject keys outside `allowed`, then build the value if nothing failed.
    ///
    /// `build` returns `None` only if a required field was skipped, which means
    /// a violation was already recorded for it.
    pub fn finish<T>(
        mut self,
        allowed: &[&str],
        build: impl FnOnce() -> Option<T>,
    ) -> Result<T, ValidationErrors> {
        if let Some(object) = self.object {
            for key in object.keys() {
                if !allowed.contains(&key.as_str()) {
                    self.errors.push(key.as_str(), format!("\"{key}\" is not allowed"));
                }
            }
        }
        if !self.errors.is_empty() {
            return Err(self.errors);
        }
        build().ok_or_else(|| ValidationErrors::single("body", "\"body\" is incomplete"))
    }
}

/// `f` as an `i64` when it has no fractional part and fits.
fn whole(f: f64) -> Option<i64> {
    if f.fract() != 0.0 || !(i64::MIN as f64..i64::MAX as f64).contains(&f) {
        return None;
    }
    Some(f as i64)
}

fn looks_like_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    struct Signup {
        email: String,
        password: String,
        age: Option<i64>,
    }

    impl Schema for Signup {
        fn from_json(value: &Value) -> Result<Self, ValidationErrors> {
            let mut v = Fields::new(value);
            let email = v.email("email", Presence::Required);
            let password = v.string("password", 8, Presence::Required);
            let age = v.integer("age", 0..=150, Presence::Optional);
            v.finish(&["email", "password", "age"], || {
                Some(Signup {
                    email: email?,
                    password: password?,
                    age,
                })
            })
        }
    }

    #[test]
    fn coerces_strings_and_numbers() {
        let parsed = Signup::from_json(&json!({
            "email": "  Someone@Example.COM ",
            "password": "  password1  ",
            "age": " 42 ",
        }))
        .unwrap();

        assert_eq!(
            parsed,
            Signup {
                email: "someone@example.com".to_string(),
                password: "password1".to_string(),
                age: Some(42),
            }
        );
    }

    #[test]
    fn collects_every_violation() {
        let errors = Signup::from_json(&json!({
            "email": "nope",
            "password": "short",
            "age": "old",
            "role": "Admin",
        }))
        .unwrap_err();

        assert_eq!(errors.fields(), vec!["email", "password", "age", "role"]);
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn missing_required_fields_are_reported() {
        let errors = Signup::from_json(&json!({})).unwrap_err();
        let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["\"email\" is required", "\"password\" is required"]
        );
    }

    #[test]
    fn non_object_body_is_one_violation() {
        let errors = Signup::from_json(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(errors.fields(), vec!["body"]);
    }

    #[test]
    fn whole_floats_count_as_integers() {
        for age in [json!(3.0), json!("3.0"), json!(3)] {
            let parsed = Signup::from_json(&json!({
                "email": "a@x.com",
                "password": "password1",
                "age": age,
            }))
            .unwrap();
            assert_eq!(parsed.age, Some(3));
        }

        let errors = Signup::from_json(&json!({
            "email": "a@x.com",
            "password": "password1",
            "age": "2.5",
        }))
        .unwrap_err();
        assert_eq!(errors.iter().next().unwrap().message, "\"age\" must be an integer");
    }

    #[test]
    fn range_and_fraction_checks() {
        let errors = Signup::from_json(&json!({
            "email": "a@x.com",
            "password": "password1",
            "age": 2.5,
        }))
        .unwrap_err();
        assert_eq!(errors.iter().next().unwrap().message, "\"age\" must be an integer");

        let errors = Signup::from_json(&json!({
            "email": "a@x.com",
            "password": "password1",
            "age": 151,
        }))
        .unwrap_err();
        assert_eq!(
            errors.iter().next().unwrap().message,
            "\"age\" must be less than or equal to 150"
        );
    }

    #[test]
    fn at_least_one_field() {
        let value = json!({});
        let mut v = Fields::new(&value);
        v.at_least_one(&["name", "age"]);
        let errors = v.finish(&["name", "age"], || Some(())).unwrap_err();
        assert_eq!(
            errors.iter().next().unwrap().message,
            "\"body\" must contain at least one of [name, age]"
        );
    }

    #[test]
    fn email_shapes() {
        assert!(looks_like_email("a@x.com"));
        assert!(looks_like_email("first.last@sub.example.org"));
        assert!(!looks_like_email("a@x"));
        assert!(!looks_like_email("@x.com"));
        assert!(!looks_like_email("a@@x.com"));
        assert!(!looks_like_email("a b@x.com"));
    }
}

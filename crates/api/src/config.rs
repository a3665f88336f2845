//! Process configuration, read once at startup from the environment.

use chrono::Duration;
use thiserror::Error;

use petstore_observability::LogFormat;

pub const DEFAULT_COOKIE_NAME: &str = "authToken";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Token and cookie settings.
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 signing secret.
    pub secret: String,
    pub token_ttl: Duration,
    pub cookie_name: String,
    pub cookie_max_age: Duration,
}

impl core::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("cookie_name", &self.cookie_name)
            .field("cookie_max_age", &self.cookie_max_age)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl HttpConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub auth: AuthConfig,
    /// Postgres connection string; `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub http: HttpConfig,
    pub log_format: LogFormat,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("auth", &self.auth)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("http", &self.http)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map here).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let secret = get("AUTH_SECRET").ok_or(ConfigError::Missing("AUTH_SECRET"))?;

        let token_ttl = match get("AUTH_TOKEN_EXPIRES_IN") {
            Some(v) => parse_duration("AUTH_TOKEN_EXPIRES_IN", &v)?,
            None => Duration::hours(1),
        };
        let cookie_max_age = match get("AUTH_COOKIE_MAX_AGE") {
            Some(v) => parse_duration("AUTH_COOKIE_MAX_AGE", &v)?,
            None => Duration::minutes(15),
        };
        let cookie_name = get("AUTH_COOKIE_NAME").unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string());

        let host = get("HTTP_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = match get("HTTP_PORT") {
            Some(v) => v.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                var: "HTTP_PORT",
                value: v.clone(),
                reason: e.to_string(),
            })?,
            None => 8080,
        };

        let log_format = match get("LOG_FORMAT") {
            Some(v) => v.parse::<LogFormat>().map_err(|e| ConfigError::Invalid {
                var: "LOG_FORMAT",
                value: v.clone(),
                reason: e.to_string(),
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            auth: AuthConfig {
                secret,
                token_ttl,
                cookie_name,
                cookie_max_age,
            },
            database_url: get("DATABASE_URL"),
            http: HttpConfig { host, port },
            log_format,
        })
    }
}

/// Parse `<n>[s|m|h|d]`; a bare number is seconds. Must be positive.
fn parse_duration(var: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        var,
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    let s = raw.trim();
    let (digits, unit) = match s.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&s[..i], c),
        _ => (s, 's'),
    };
    let n: i64 = digits
        .parse()
        .map_err(|_| invalid("expected <number>[s|m|h|d]"))?;
    if n <= 0 {
        return Err(invalid("must be positive"));
    }

    let duration = match unit {
        's' => Duration::try_seconds(n),
        'm' => Duration::try_minutes(n),
        'h' => Duration::try_hours(n),
        'd' => Duration::try_days(n),
        _ => return Err(invalid("unknown unit (expected s, m, h or d)")),
    };
    duration.ok_or_else(|| invalid("out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = AppConfig::from_lookup(lookup(&[("AUTH_SECRET", "s3cret")])).unwrap();

        assert_eq!(config.auth.token_ttl, Duration::hours(1));
        assert_eq!(config.auth.cookie_max_age, Duration::minutes(15));
        assert_eq!(config.auth.cookie_name, "authToken");
        assert_eq!(config.http.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.database_url, None);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn secret_is_required() {
        assert_eq!(
            AppConfig::from_lookup(lookup(&[])).unwrap_err(),
            ConfigError::Missing("AUTH_SECRET")
        );
        assert_eq!(
            AppConfig::from_lookup(lookup(&[("AUTH_SECRET", "  ")])).unwrap_err(),
            ConfigError::Missing("AUTH_SECRET")
        );
    }

    #[test]
    fn overrides_are_parsed() {
        let config = AppConfig::from_lookup(lookup(&[
            ("AUTH_SECRET", "s3cret"),
            ("AUTH_TOKEN_EXPIRES_IN", "2d"),
            ("AUTH_COOKIE_MAX_AGE", "90"),
            ("AUTH_COOKIE_NAME", "session"),
            ("HTTP_PORT", "9000"),
            ("LOG_FORMAT", "pretty"),
            ("DATABASE_URL", "postgres://localhost/pets"),
        ]))
        .unwrap();

        assert_eq!(config.auth.token_ttl, Duration::days(2));
        assert_eq!(config.auth.cookie_max_age, Duration::seconds(90));
        assert_eq!(config.auth.cookie_name, "session");
        assert_eq!(config.http.port, 9000);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/pets"));
    }

    #[test]
    fn bad_values_fail_startup() {
        for (var, value) in [
            ("AUTH_TOKEN_EXPIRES_IN", "soon"),
            ("AUTH_TOKEN_EXPIRES_IN", "0h"),
            ("AUTH_COOKIE_MAX_AGE", "5w"),
            ("AUTH_TOKEN_EXPIRES_IN", "9999999999999d"),
            ("AUTH_COOKIE_MAX_AGE", "9223372036854775807m"),
            ("HTTP_PORT", "70000"),
            ("LOG_FORMAT", "xml"),
        ] {
            let err = AppConfig::from_lookup(lookup(&[("AUTH_SECRET", "s"), (var, value)])).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { var: v, .. } if v == var),
                "{var}={value} gave {err:?}"
            );
        }
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = AppConfig::from_lookup(lookup(&[
            ("AUTH_SECRET", "super-secret-value"),
            ("DATABASE_URL", "postgres://user:hunter2@db/pets"),
        ]))
        .unwrap();

        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret-value"));
        assert!(!debug.contains("hunter2"));
    }
}

//! API server configuration.

use thiserror::Error;
use webnotes_core::auth::SigningKey;

/// Default avatar assigned at registration.
pub const DEFAULT_AVATAR_URL: &str = "/static/default-avatar.jpg";

/// Body limit of the sync ingress, 64 MiB. Other routes keep axum's 2 MB.
pub const DEFAULT_SYNC_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// Configuration errors. Any of these stops the server before it binds.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Session cookie attributes.
#[derive(Clone, Debug)]
pub struct CookieSettings {
    /// Send the cookie over HTTPS only.
    pub secure: bool,
    /// Pin `SameSite=None` for cross-origin front-ends.
    pub same_site_none: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            secure: true,
            same_site_none: false,
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener.
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Key that signs every session token and auth code.
    pub signing_key: SigningKey,
    pub cookie: CookieSettings,
    /// Origin allowed to make credentialed cross-origin requests.
    pub frontend_origin: Option<String>,
    pub default_avatar_url: String,
    /// Largest request body `POST /notes/list` accepts, in bytes.
    pub sync_body_limit: usize,
}

impl ApiConfig {
    /// Defaults for everything but the signing key.
    pub fn new(signing_key: SigningKey) -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".into(),
            database_url: "postgres://localhost:5432/webnotes".into(),
            signing_key,
            cookie: CookieSettings::default(),
            frontend_origin: None,
            default_avatar_url: DEFAULT_AVATAR_URL.into(),
            sync_body_limit: DEFAULT_SYNC_BODY_LIMIT,
        }
    }

    /// Reads configuration from environment variables.
    ///
    /// | Variable                | Default                              |
    /// |-------------------------|--------------------------------------|
    /// | `BIND_ADDR`             | `127.0.0.1:8080`                     |
    /// | `DATABASE_URL`          | `postgres://localhost:5432/webnotes` |
    /// | `TOKEN_SIGNING_KEY`     | required, hex, at least 32 bytes     |
    /// | `COOKIE_SECURE`         | `true`                               |
    /// | `COOKIE_SAME_SITE_NONE` | `false`                              |
    /// | `FRONTEND_ORIGIN`       | unset                                |
    /// | `DEFAULT_AVATAR_URL`    | `/static/default-avatar.jpg`         |
    /// | `SYNC_BODY_LIMIT_BYTES` | `67108864` (64 MiB)                  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let hex_key = var("TOKEN_SIGNING_KEY").ok_or(ConfigError::Missing("TOKEN_SIGNING_KEY"))?;
        let signing_key = SigningKey::from_hex(&hex_key).map_err(|e| ConfigError::Invalid {
            name: "TOKEN_SIGNING_KEY",
            reason: e.to_string(),
        })?;

        let mut config = Self::new(signing_key);
        if let Some(addr) = var("BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(url) = var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(flag) = var("COOKIE_SECURE") {
            config.cookie.secure = parse_flag("COOKIE_SECURE", &flag)?;
        }
        if let Some(flag) = var("COOKIE_SAME_SITE_NONE") {
            config.cookie.same_site_none = parse_flag("COOKIE_SAME_SITE_NONE", &flag)?;
        }
        config.frontend_origin = var("FRONTEND_ORIGIN").map(|o| o.trim_end_matches('/').to_string());
        if let Some(url) = var("DEFAULT_AVATAR_URL") {
            config.default_avatar_url = url;
        }
        if let Some(limit) = var("SYNC_BODY_LIMIT_BYTES") {
            config.sync_body_limit = parse_limit("SYNC_BODY_LIMIT_BYTES", &limit)?;
        }
        Ok(config)
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            name,
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

fn parse_limit(name: &'static str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err(ConfigError::Invalid {
            name,
            reason: "must be greater than zero".into(),
        }),
        Ok(limit) => Ok(limit),
        Err(e) => Err(ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn signing_key_is_required() {
        let err = ApiConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("TOKEN_SIGNING_KEY")));
    }

    #[test]
    fn short_or_non_hex_key_is_rejected() {
        for key in ["abcd", "not hex at all"] {
            let err = ApiConfig::from_lookup(lookup(&[("TOKEN_SIGNING_KEY", key)])).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { name: "TOKEN_SIGNING_KEY", .. }));
        }
    }

    #[test]
    fn defaults_apply() {
        let key = "ab".repeat(32);
        let config = ApiConfig::from_lookup(lookup(&[("TOKEN_SIGNING_KEY", &key)])).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert!(config.cookie.secure);
        assert!(!config.cookie.same_site_none);
        assert!(config.frontend_origin.is_none());
        assert_eq!(config.default_avatar_url, DEFAULT_AVATAR_URL);
        assert_eq!(config.sync_body_limit, DEFAULT_SYNC_BODY_LIMIT);
    }

    #[test]
    fn overrides_are_read() {
        let key = "ab".repeat(32);
        let config = ApiConfig::from_lookup(lookup(&[
            ("TOKEN_SIGNING_KEY", &key),
            ("COOKIE_SECURE", "false"),
            ("COOKIE_SAME_SITE_NONE", "1"),
            ("FRONTEND_ORIGIN", "https://notes.example.com/"),
        ]))
        .unwrap();
        assert!(!config.cookie.secure);
        assert!(config.cookie.same_site_none);
        assert_eq!(
            config.frontend_origin.as_deref(),
            Some("https://notes.example.com")
        );
    }

    #[test]
    fn bad_flag_is_rejected() {
        let key = "ab".repeat(32);
        let err = ApiConfig::from_lookup(lookup(&[
            ("TOKEN_SIGNING_KEY", &key),
            ("COOKIE_SECURE", "maybe"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "COOKIE_SECURE", .. }));
    }

    #[test]
    fn sync_body_limit_is_configurable() {
        let key = "ab".repeat(32);
        let config = ApiConfig::from_lookup(lookup(&[
            ("TOKEN_SIGNING_KEY", &key),
            ("SYNC_BODY_LIMIT_BYTES", "1048576"),
        ]))
        .unwrap();
        assert_eq!(config.sync_body_limit, 1_048_576);

        for bad in ["0", "lots", "-5"] {
            let err = ApiConfig::from_lookup(lookup(&[
                ("TOKEN_SIGNING_KEY", &key),
                ("SYNC_BODY_LIMIT_BYTES", bad),
            ]))
            .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { name: "SYNC_BODY_LIMIT_BYTES", .. }));
        }
    }
}

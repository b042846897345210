// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Every optional setting has its default listed in [`defaults`], so the rest
//! of the crate never reads the environment directly.

use chrono_tz::Tz;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default values for optional settings.
pub mod defaults {
    pub const OURA_SCOPES: &[&str] = &["email", "personal", "daily"];
    pub const OURA_AUTHORIZE_URL: &str = "https://cloud.ouraring.com/oauth/authorize";
    pub const OURA_TOKEN_URL: &str = "https://api.ouraring.com/oauth/token";
    pub const OURA_REVOKE_URL: &str = "https://api.ouraring.com/oauth/revoke";
    pub const OURA_API_BASE_URL: &str = "https://api.ouraring.com";
    pub const OPENAI_MODEL: &str = "gpt-5";
    pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
    pub const APP_TIMEZONE: &str = "UTC";
    pub const CACHE_TTL_MINUTES: u32 = 15;
    pub const DATA_FALLBACK_DAYS: u32 = 1;
    pub const HTTP_TIMEOUT_SECS: u64 = 15;
    pub const PUBLIC_BASE_URL: &str = "http://localhost:8000";
    pub const TOKEN_STORE_PATH: &str = "var/tokens.json";
    pub const PORT: u16 = 8000;
}

/// How the app authenticates against the Oura API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OuraCredentials {
    /// Static personal access token; the OAuth flow is never used.
    PersonalAccessToken(String),
    /// OAuth application credentials; tokens live in the token store.
    OAuth {
        client_id: String,
        client_secret: String,
    },
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Oura ---
    pub oura_credentials: OuraCredentials,
    /// Requested OAuth scopes. Empty means the scope parameter is omitted.
    pub oura_scopes: Vec<String>,
    pub oura_authorize_url: String,
    pub oura_token_url: String,
    pub oura_revoke_url: String,
    pub oura_api_base_url: String,

    // --- OpenAI ---
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,

    // --- Behaviour ---
    pub app_timezone: Tz,
    pub cache_ttl_minutes: u32,
    pub data_fallback_days: u32,
    pub http_timeout: Duration,

    // --- Server / session ---
    /// Public base URL without a trailing slash.
    pub public_base_url: String,
    pub token_store_path: PathBuf,
    /// Key used to sign session JWTs (raw bytes)
    pub session_signing_key: Vec<u8>,
    pub auth_username: String,
    pub auth_password: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated as unset, except for `OURA_SCOPES` where a
    /// blank value explicitly requests no scopes.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let oura_credentials = match (
            get("OURA_PERSONAL_ACCESS_TOKEN"),
            get("OURA_CLIENT_ID"),
            get("OURA_CLIENT_SECRET"),
        ) {
            (Some(token), _, _) => OuraCredentials::PersonalAccessToken(token),
            (None, Some(client_id), Some(client_secret)) => OuraCredentials::OAuth {
                client_id,
                client_secret,
            },
            _ => return Err(ConfigError::MissingCredentials),
        };

        let oura_scopes = match lookup("OURA_SCOPES") {
            None => defaults::OURA_SCOPES.iter().map(|s| s.to_string()).collect(),
            Some(raw) => raw.split_whitespace().map(str::to_string).collect(),
        };

        let tz_name = get("APP_TIMEZONE").unwrap_or_else(|| defaults::APP_TIMEZONE.to_string());
        let app_timezone = Tz::from_str(&tz_name).map_err(|_| ConfigError::Invalid {
            key: "APP_TIMEZONE",
            value: tz_name.clone(),
        })?;

        Ok(Self {
            oura_credentials,
            oura_scopes,
            oura_authorize_url: get("OURA_AUTHORIZE_URL")
                .unwrap_or_else(|| defaults::OURA_AUTHORIZE_URL.to_string()),
            oura_token_url: get("OURA_TOKEN_URL")
                .unwrap_or_else(|| defaults::OURA_TOKEN_URL.to_string()),
            oura_revoke_url: get("OURA_REVOKE_URL")
                .unwrap_or_else(|| defaults::OURA_REVOKE_URL.to_string()),
            oura_api_base_url: trim_base_url(
                get("OURA_API_BASE_URL")
                    .unwrap_or_else(|| defaults::OURA_API_BASE_URL.to_string()),
            ),
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_model: get("OPENAI_MODEL")
                .unwrap_or_else(|| defaults::OPENAI_MODEL.to_string()),
            openai_base_url: trim_base_url(
                get("OPENAI_BASE_URL").unwrap_or_else(|| defaults::OPENAI_BASE_URL.to_string()),
            ),
            app_timezone,
            cache_ttl_minutes: parse_or(
                get("CACHE_TTL_MINUTES"),
                "CACHE_TTL_MINUTES",
                defaults::CACHE_TTL_MINUTES,
            )?,
            data_fallback_days: parse_or(
                get("DATA_FALLBACK_DAYS"),
                "DATA_FALLBACK_DAYS",
                defaults::DATA_FALLBACK_DAYS,
            )?,
            http_timeout: Duration::from_secs(parse_or(
                get("HTTP_TIMEOUT_SECS"),
                "HTTP_TIMEOUT_SECS",
                defaults::HTTP_TIMEOUT_SECS,
            )?),
            public_base_url: trim_base_url(
                get("PUBLIC_BASE_URL").unwrap_or_else(|| defaults::PUBLIC_BASE_URL.to_string()),
            ),
            token_store_path: get("TOKEN_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(defaults::TOKEN_STORE_PATH)),
            session_signing_key: required("APP_SECRET_KEY")?.into_bytes(),
            auth_username: required("APP_USERNAME")?,
            auth_password: required("APP_PASSWORD")?,
            port: parse_or(get("PORT"), "PORT", defaults::PORT)?,
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            oura_credentials: OuraCredentials::PersonalAccessToken("test_pat".to_string()),
            oura_scopes: defaults::OURA_SCOPES.iter().map(|s| s.to_string()).collect(),
            oura_authorize_url: defaults::OURA_AUTHORIZE_URL.to_string(),
            oura_token_url: defaults::OURA_TOKEN_URL.to_string(),
            oura_revoke_url: defaults::OURA_REVOKE_URL.to_string(),
            oura_api_base_url: defaults::OURA_API_BASE_URL.to_string(),
            openai_api_key: "test_openai_key".to_string(),
            openai_model: "test-model".to_string(),
            openai_base_url: defaults::OPENAI_BASE_URL.to_string(),
            app_timezone: Tz::UTC,
            cache_ttl_minutes: defaults::CACHE_TTL_MINUTES,
            data_fallback_days: defaults::DATA_FALLBACK_DAYS,
            http_timeout: Duration::from_secs(5),
            public_base_url: "http://localhost:8000".to_string(),
            token_store_path: PathBuf::from("var/test-tokens.json"),
            session_signing_key: b"test_session_key_32_bytes_min!!!".to_vec(),
            auth_username: "coach".to_string(),
            auth_password: "hunter2".to_string(),
            port: defaults::PORT,
        }
    }

    /// Whether the OAuth flow is in use (as opposed to a personal access token).
    pub fn uses_oauth(&self) -> bool {
        matches!(self.oura_credentials, OuraCredentials::OAuth { .. })
    }

    /// OAuth redirect URI registered with Oura.
    pub fn oauth_redirect_uri(&self) -> String {
        format!("{}/oauth/callback", self.public_base_url)
    }

    /// Whether cookies should carry the `Secure` attribute.
    pub fn cookies_secure(&self) -> bool {
        self.public_base_url.starts_with("https://")
    }

    /// Cache time-to-live as a chrono duration.
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.cache_ttl_minutes))
    }
}

fn trim_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

fn parse_or<T: FromStr>(
    value: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Provide OURA_PERSONAL_ACCESS_TOKEN or both OURA_CLIENT_ID and OURA_CLIENT_SECRET")]
    MissingCredentials,

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

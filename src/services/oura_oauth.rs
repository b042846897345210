// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Oura OAuth token lifecycle.
//!
//! Handles:
//! - Building the authorization redirect
//! - Authorization-code exchange (with anti-forgery state check)
//! - Refresh when the stored token is about to expire
//! - Best-effort revocation on disconnect

use crate::config::{Config, OuraCredentials};
use crate::db::TokenStore;
use crate::error::AppError;
use crate::models::token::mask_token;
use crate::models::OAuthTokenRecord;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use serde::Deserialize;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;

/// Margin before token expiration when we proactively refresh (30 seconds).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 30;

/// Generate an unguessable OAuth `state` value.
pub fn generate_state_token() -> Result<String, AppError> {
    let mut bytes = [0u8; 16];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG unavailable")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// OAuth service that owns the token store and the refresh critical section.
#[derive(Clone)]
pub struct OuraOAuthService {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    authorize_url: String,
    token_url: String,
    revoke_url: String,
    redirect_uri: String,
    scopes: Vec<String>,
    store: TokenStore,
    /// Serializes load-check-refresh so concurrent requests refresh only once.
    refresh_lock: Arc<Mutex<()>>,
}

impl OuraOAuthService {
    /// Build the service from config. Returns `None` in personal-access-token mode.
    pub fn from_config(config: &Config, http: reqwest::Client) -> Option<Self> {
        let OuraCredentials::OAuth {
            client_id,
            client_secret,
        } = &config.oura_credentials
        else {
            return None;
        };

        if config.oura_scopes.is_empty() {
            tracing::warn!("No Oura scopes configured; relying on application defaults");
        }

        Some(Self {
            http,
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
            authorize_url: config.oura_authorize_url.clone(),
            token_url: config.oura_token_url.clone(),
            revoke_url: config.oura_revoke_url.clone(),
            redirect_uri: config.oauth_redirect_uri(),
            scopes: config.oura_scopes.clone(),
            store: TokenStore::new(config.token_store_path.clone()),
            refresh_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    // ─── Authorization ───────────────────────────────────────────────────────

    /// Build the Oura authorization URL carrying `state_token`.
    ///
    /// The caller must keep `state_token` (session-scoped) and pass it back
    /// to [`exchange_code`](Self::exchange_code) as the expected state.
    pub fn build_authorize_url(&self, state_token: &str) -> Result<String, AppError> {
        let scope = self.scopes.join(" ");
        let mut params = vec![
            ("response_type", "code"),
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("state", state_token),
        ];
        if !scope.is_empty() {
            params.push(("scope", scope.as_str()));
        }

        let url = reqwest::Url::parse_with_params(&self.authorize_url, &params).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Invalid OURA_AUTHORIZE_URL: {}", e))
        })?;

        tracing::info!(
            scopes = %scope,
            redirect_uri = %self.redirect_uri,
            "Starting Oura OAuth flow"
        );
        Ok(url.into())
    }

    /// Exchange an authorization code for tokens and store them.
    ///
    /// Fails with `AuthMismatch` before any network call if the state does not
    /// match the one issued for this session.
    pub async fn exchange_code(
        &self,
        code: &str,
        state_token: &str,
        expected_state: &str,
    ) -> Result<OAuthTokenRecord, AppError> {
        let states_match = !state_token.is_empty()
            && !expected_state.is_empty()
            && bool::from(state_token.as_bytes().ct_eq(expected_state.as_bytes()));
        if !states_match {
            tracing::warn!("OAuth state validation failed");
            return Err(AppError::AuthMismatch);
        }

        tracing::info!("Exchanging OAuth code for tokens");
        let record = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .await?;

        let _guard = self.refresh_lock.lock().await;
        self.store.save(&record).await?;

        tracing::info!(
            expires_at = ?record.expires_at,
            scope = ?record.scope,
            "Stored new Oura tokens"
        );
        Ok(record)
    }

    // ─── Token Management ────────────────────────────────────────────────────

    /// Get a non-expired access token, refreshing it if it is about to expire.
    ///
    /// A failed refresh clears the store: the user has to authorize again.
    pub async fn get_valid_token(&self) -> Result<String, AppError> {
        let _guard = self.refresh_lock.lock().await;

        let record = self.store.load().await.ok_or_else(|| {
            tracing::warn!("No OAuth tokens stored when requesting access token");
            AppError::NotConnected
        })?;

        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);
        if !record.needs_refresh(Utc::now(), margin) {
            tracing::debug!(token = %record.masked_access_token(), "Using stored Oura access token");
            return Ok(record.access_token);
        }

        tracing::info!(expires_at = ?record.expires_at, "Oura access token expiring, refreshing");
        let renewed = self.refresh_locked(&record).await?;
        Ok(renewed.access_token)
    }

    /// Refresh unconditionally (the API rejected the current token).
    pub async fn force_refresh(&self) -> Result<String, AppError> {
        let _guard = self.refresh_lock.lock().await;

        let record = self.store.load().await.ok_or(AppError::NotConnected)?;
        tracing::info!(token = %record.masked_access_token(), "Forcing Oura token refresh");
        let renewed = self.refresh_locked(&record).await?;
        Ok(renewed.access_token)
    }

    /// Whether tokens are currently stored.
    pub async fn is_connected(&self) -> bool {
        self.store.load().await.is_some()
    }

    /// Clear stored tokens after attempting to revoke them with Oura.
    pub async fn disconnect(&self) -> Result<(), AppError> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(record) = self.store.load().await {
            if let Err(e) = self.revoke(&record.access_token).await {
                tracing::warn!(error = %e, "Oura token revocation failed, clearing locally anyway");
            }
        }

        self.store.clear().await?;
        tracing::info!("Disconnected Oura account");
        Ok(())
    }

    /// Refresh `record` and persist the result. Caller must hold `refresh_lock`.
    async fn refresh_locked(&self, record: &OAuthTokenRecord) -> Result<OAuthTokenRecord, AppError> {
        let Some(refresh_token) = record.refresh_token.as_deref().filter(|t| !t.is_empty())
        else {
            tracing::warn!("Stored Oura tokens have no refresh token, clearing");
            self.clear_after_failure().await;
            return Err(AppError::NotConnected);
        };

        let result = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .await;

        let mut renewed = match result {
            Ok(renewed) => renewed,
            Err(e) => {
                tracing::warn!(error = %e, "Oura token refresh failed, clearing stored tokens");
                self.clear_after_failure().await;
                return Err(AppError::NotConnected);
            }
        };

        // Oura normally rotates the refresh token; keep the old one if it did not.
        if renewed.refresh_token.is_none() {
            renewed.refresh_token = Some(refresh_token.to_string());
        }
        if renewed.scope.is_none() {
            renewed.scope = record.scope.clone();
        }

        self.store.save(&renewed).await?;
        tracing::info!(
            expires_at = ?renewed.expires_at,
            token = %renewed.masked_access_token(),
            "Oura token refreshed"
        );
        Ok(renewed)
    }

    async fn clear_after_failure(&self) {
        if let Err(e) = self.store.clear().await {
            tracing::error!(error = %e, "Failed to clear token store after refresh failure");
        }
    }

    /// POST to the token endpoint and convert the response into a record.
    async fn request_token(&self, form: &[(&str, &str)]) -> Result<OAuthTokenRecord, AppError> {
        let grant_type = form
            .iter()
            .find(|(k, _)| *k == "grant_type")
            .map(|(_, v)| *v)
            .unwrap_or("unknown");
        tracing::debug!(grant_type, "Requesting Oura token");

        let response = self
            .http
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::AuthExchangeFailed(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                grant_type,
                body = %body.chars().take(200).collect::<String>(),
                "Oura token endpoint returned an error"
            );
            return Err(AppError::AuthExchangeFailed(format!(
                "token endpoint returned HTTP {}",
                status
            )));
        }

        let data: TokenResponse = response.json().await.map_err(|e| {
            AppError::AuthExchangeFailed(format!("failed to parse token response: {}", e))
        })?;

        Ok(data.into_record(Utc::now()))
    }

    async fn revoke(&self, access_token: &str) -> Result<(), AppError> {
        tracing::debug!(token = %mask_token(access_token), "Revoking Oura token");
        let response = self
            .http
            .get(&self.revoke_url)
            .query(&[("access_token", access_token)])
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("revoke request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamUnavailable(format!(
                "revoke returned HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Token endpoint response (authorization code and refresh grants).
#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

impl TokenResponse {
    fn into_record(self, now: DateTime<Utc>) -> OAuthTokenRecord {
        OAuthTokenRecord {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_in.map(|secs| now + Duration::seconds(secs)),
            scope: self.scope,
            token_type: self.token_type,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AccessTokenSource - what the data client asks for bearer tokens
// ─────────────────────────────────────────────────────────────────────────────

/// Where Oura bearer tokens come from.
#[derive(Clone)]
pub enum AccessTokenSource {
    /// Static personal access token: never expires, OAuth is bypassed.
    PersonalToken(String),
    OAuth(OuraOAuthService),
}

impl AccessTokenSource {
    pub fn from_config(
        config: &Config,
        oauth: Option<&OuraOAuthService>,
    ) -> Result<Self, AppError> {
        match (&config.oura_credentials, oauth) {
            (OuraCredentials::PersonalAccessToken(token), _) => {
                Ok(Self::PersonalToken(token.clone()))
            }
            (OuraCredentials::OAuth { .. }, Some(service)) => Ok(Self::OAuth(service.clone())),
            (OuraCredentials::OAuth { .. }, None) => Err(AppError::OAuthNotConfigured),
        }
    }

    pub async fn get_valid_token(&self) -> Result<String, AppError> {
        match self {
            Self::PersonalToken(token) => Ok(token.clone()),
            Self::OAuth(service) => service.get_valid_token().await,
        }
    }

    /// Called after a 401. A personal token cannot be refreshed, so it is returned as-is.
    pub async fn force_refresh(&self) -> Result<String, AppError> {
        match self {
            Self::PersonalToken(token) => Ok(token.clone()),
            Self::OAuth(service) => service.force_refresh().await,
        }
    }

    /// Identity used to partition cached briefings.
    pub fn identity(&self) -> &'static str {
        match self {
            Self::PersonalToken(_) => "personal-token",
            Self::OAuth(_) => "oauth",
        }
    }
}

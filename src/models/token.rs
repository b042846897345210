// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Oura OAuth token record persisted by the token store.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// OAuth tokens for the single connected Oura account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthTokenRecord {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Absolute expiry. `None` when the provider did not send `expires_in`,
    /// in which case the token is treated as non-expiring.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Granted scopes, space separated as returned by Oura
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl OAuthTokenRecord {
    /// Whether the token expires within `margin` of `now`.
    pub fn needs_refresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => now + margin >= expires_at,
            None => false,
        }
    }

    /// Short prefix of the access token, safe to log.
    pub fn masked_access_token(&self) -> String {
        mask_token(&self.access_token)
    }
}

/// Mask a bearer token for logging (first six characters only).
pub fn mask_token(token: &str) -> String {
    match token.get(..6) {
        Some(prefix) if token.len() > 6 => format!("{}...", prefix),
        _ => "***".to_string(),
    }
}

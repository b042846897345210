// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Single-user login sessions carried in a signed JWT cookie.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "oura_coach_session";

/// Session lifetime in seconds (14 days).
pub const SESSION_TTL_SECS: u64 = 14 * 24 * 60 * 60;

/// JWT claims for a logged-in session.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    /// Username that logged in
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at (Unix timestamp)
    pub iat: u64,
}

/// Checks credentials and issues/verifies session tokens.
#[derive(Clone)]
pub struct SessionManager {
    username: String,
    password: String,
    signing_key: Vec<u8>,
}

impl SessionManager {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        signing_key: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            signing_key: signing_key.into(),
        }
    }

    /// Return a session token if the credentials match.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<String> {
        let user_ok = username.as_bytes().ct_eq(self.username.as_bytes());
        let pass_ok = password.as_bytes().ct_eq(self.password.as_bytes());
        if !bool::from(user_ok & pass_ok) {
            tracing::warn!("Rejected login attempt");
            return None;
        }

        match self.issue(username) {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::error!(error = %e, "Failed to sign session token");
                None
            }
        }
    }

    fn issue(&self, username: &str) -> anyhow::Result<String> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        let claims = SessionClaims {
            sub: username.to_string(),
            iat: now,
            exp: now + SESSION_TTL_SECS,
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.signing_key),
        )?)
    }

    /// Decode a session token. Expired, forged or stale-user tokens yield `None`.
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        let key = DecodingKey::from_secret(&self.signing_key);
        let validation = Validation::new(Algorithm::HS256);

        let claims = decode::<SessionClaims>(token, &key, &validation)
            .map_err(|e| tracing::debug!(error = %e, "Invalid session token"))
            .ok()?
            .claims;

        (claims.sub == self.username).then_some(claims)
    }
}

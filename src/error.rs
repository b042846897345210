// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent HTML responses.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::views::{render_template, ErrorBannerTemplate};

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Oura account not connected. Connect your Oura account to continue.")]
    NotConnected,

    #[error("OAuth state mismatch. Please start the connection again.")]
    AuthMismatch,

    #[error("Oura token exchange failed: {0}")]
    AuthExchangeFailed(String),

    #[error("Oura OAuth is not configured (personal access token in use)")]
    OAuthNotConfigured,

    /// Oura answered 401 for a bearer token. Only seen inside the data client,
    /// which retries once after refreshing before surfacing `UpstreamUnavailable`.
    #[error("Oura rejected the access token")]
    TokenRejected,

    #[error("Oura API unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Coaching message generation failed: {0}")]
    GenerationFailed(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Token store error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the user must (re)authorize the Oura connection to recover.
    pub fn is_reauthorization_required(&self) -> bool {
        matches!(
            self,
            AppError::NotConnected | AppError::AuthMismatch | AppError::AuthExchangeFailed(_)
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NotConnected => StatusCode::CONFLICT,
            AppError::AuthMismatch | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::OAuthNotConfigured => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::AuthExchangeFailed(_)
            | AppError::TokenRejected
            | AppError::UpstreamUnavailable(_)
            | AppError::GenerationFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the user. Internal details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Storage(_) | AppError::Internal(_) => {
                "Something went wrong on our side. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Storage(msg) => tracing::error!(error = %msg, "Token store error"),
            AppError::Internal(err) => tracing::error!(error = %err, "Internal server error"),
            other => tracing::warn!(error = %other, status = %status, "Request failed"),
        }

        let banner = ErrorBannerTemplate {
            message: self.user_message(),
            reconnect: self.is_reauthorization_required(),
        };

        match render_template(&banner) {
            Ok(html) => (status, html).into_response(),
            Err(_) => (status, Html(self.user_message())).into_response(),
        }
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

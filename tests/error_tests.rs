// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use oura_coach::error::AppError;

mod common;

#[test]
fn test_is_reauthorization_required_matches() {
    assert!(AppError::NotConnected.is_reauthorization_required());
    assert!(AppError::AuthMismatch.is_reauthorization_required());
    assert!(AppError::AuthExchangeFailed("invalid_grant".to_string()).is_reauthorization_required());
}

#[test]
fn test_is_reauthorization_required_no_match() {
    assert!(!AppError::UpstreamUnavailable("HTTP 503".to_string()).is_reauthorization_required());
    assert!(!AppError::GenerationFailed("empty completion".to_string()).is_reauthorization_required());
    assert!(!AppError::BadRequest("Bad Request".to_string()).is_reauthorization_required());
    assert!(!AppError::Unauthorized.is_reauthorization_required());
}

#[test]
fn test_user_message_hides_internal_details() {
    let err = AppError::Internal(anyhow::anyhow!("disk quota exceeded on /var/secret"));
    assert!(!err.user_message().contains("/var/secret"));

    let err = AppError::Storage("permission denied: var/tokens.json".to_string());
    assert!(!err.user_message().contains("tokens.json"));

    let err = AppError::UpstreamUnavailable("HTTP 503".to_string());
    assert_eq!(err.user_message(), "Oura API unavailable: HTTP 503");
}

#[tokio::test]
async fn test_error_response_status_and_banner() {
    let cases = [
        (AppError::NotConnected, StatusCode::CONFLICT, true),
        (AppError::AuthMismatch, StatusCode::BAD_REQUEST, true),
        (AppError::OAuthNotConfigured, StatusCode::NOT_FOUND, false),
        (
            AppError::GenerationFailed("HTTP 500".to_string()),
            StatusCode::BAD_GATEWAY,
            false,
        ),
        (
            AppError::Internal(anyhow::anyhow!("boom")),
            StatusCode::INTERNAL_SERVER_ERROR,
            false,
        ),
    ];

    for (err, status, reconnect) in cases {
        let response = err.into_response();
        assert_eq!(response.status(), status);

        let body = common::body_string(response).await;
        assert!(body.contains(r#"class="banner error""#));
        assert_eq!(body.contains("/oauth/start"), reconnect, "status {status}");
    }
}

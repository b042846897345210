// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Oura OAuth connect/disconnect routes.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Extension, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::SessionUser;
use crate::services::oura_oauth::{generate_state_token, OuraOAuthService};
use crate::AppState;

/// Cookie holding the `state` issued for the pending authorization.
pub const OAUTH_STATE_COOKIE: &str = "oura_coach_oauth_state";

const OAUTH_CALLBACK_PATH: &str = "/oauth/callback";

/// How long an authorization may stay pending.
const OAUTH_STATE_TTL_MINUTES: i64 = 10;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/oauth/start", get(oauth_start))
        .route(OAUTH_CALLBACK_PATH, get(oauth_callback))
        .route("/disconnect", post(disconnect))
}

fn oauth_service(state: &AppState) -> Result<&OuraOAuthService> {
    state.oauth.as_ref().ok_or(AppError::OAuthNotConfigured)
}

/// Start OAuth flow - redirect to Oura authorization.
async fn oauth_start(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect)> {
    let oauth = oauth_service(&state)?;

    let state_token = generate_state_token()?;
    let authorize_url = oauth.build_authorize_url(&state_token)?;

    let cookie = Cookie::build((OAUTH_STATE_COOKIE, state_token))
        .path(OAUTH_CALLBACK_PATH)
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.cookies_secure())
        .max_age(time::Duration::minutes(OAUTH_STATE_TTL_MINUTES))
        .build();

    Ok((jar.add(cookie), Redirect::to(&authorize_url)))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - verify state, exchange the code, store tokens.
async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect)> {
    let oauth = oauth_service(&state)?;

    let expected_state = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .unwrap_or_default();
    let jar = jar.remove(Cookie::build(OAUTH_STATE_COOKIE).path(OAUTH_CALLBACK_PATH));

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Oura");
        return Err(AppError::AuthExchangeFailed(format!(
            "authorization was not granted ({})",
            error
        )));
    }

    let code = params
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    oauth
        .exchange_code(&code, params.state.as_deref().unwrap_or_default(), &expected_state)
        .await?;

    tracing::info!(user = %user.username, "Oura account connected");

    // Cached briefings were built for the previous connection.
    state.briefing.clear_cache();

    Ok((jar, Redirect::to("/?auth=connected")))
}

/// POST /disconnect - revoke and forget the stored tokens.
async fn disconnect(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
) -> Result<Redirect> {
    oauth_service(&state)?.disconnect().await?;
    tracing::info!(user = %user.username, "Oura account disconnected");
    state.briefing.clear_cache();
    Ok(Redirect::to("/?auth=disconnected"))
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Login and logout routes.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::Result;
use crate::middleware::auth::session_from_jar;
use crate::services::session::{SESSION_COOKIE, SESSION_TTL_SECS};
use crate::views::{render_template, LoginTemplate};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", get(login_page).post(login_submit))
        .route("/logout", post(logout))
}

/// Reduce a post-login redirect target to a same-site relative path.
///
/// Control characters are rejected outright: browsers strip tab, CR and LF
/// from URLs, so `/\t/host` would become the network path `//host`.
pub fn sanitize_next(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(target)
            if target.starts_with('/')
                && !target.starts_with("//")
                && !target.contains('\\')
                && !target.chars().any(char::is_control) =>
        {
            target.to_string()
        }
        _ => "/".to_string(),
    }
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(SESSION_TTL_SECS as i64))
        .build()
}

#[derive(Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    next: Option<String>,
}

/// GET /login - show the login form, or skip it if already logged in.
async fn login_page(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
) -> Result<Response> {
    let next = sanitize_next(query.next.as_deref());
    if session_from_jar(&state, &jar).is_some() {
        return Ok(Redirect::to(&next).into_response());
    }

    Ok(render_template(&LoginTemplate { next, error: None })?.into_response())
}

#[derive(Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
    #[serde(default)]
    next: Option<String>,
}

/// POST /login - check credentials and start a session.
async fn login_submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let next = sanitize_next(form.next.as_deref());

    let Some(token) = state.sessions.authenticate(&form.username, &form.password) else {
        let page = render_template(&LoginTemplate {
            next,
            error: Some("Invalid credentials. Please try again.".to_string()),
        })?;
        return Ok((StatusCode::BAD_REQUEST, page).into_response());
    };

    tracing::info!(next = %next, "User logged in");
    let jar = jar.add(session_cookie(token, state.config.cookies_secure()));
    Ok((jar, Redirect::to(&next)).into_response())
}

/// POST /logout - clear the session cookie.
async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to("/login"))
}

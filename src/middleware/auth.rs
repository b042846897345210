// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session authentication middleware.

use crate::services::session::{SessionClaims, SESSION_COOKIE};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Logged-in user extracted from the session cookie.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub username: String,
}

/// Verified session claims from the cookie jar, if any.
pub fn session_from_jar(state: &AppState, jar: &CookieJar) -> Option<SessionClaims> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| state.sessions.verify(cookie.value()))
}

/// Middleware that requires a valid login session.
///
/// Browsers are redirected to the login page; HTMX requests get a 401 with
/// `HX-Redirect` so the client navigates instead of swapping in a login form.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(claims) = session_from_jar(&state, &jar) {
        request.extensions_mut().insert(SessionUser {
            username: claims.sub,
        });
        return next.run(request).await;
    }

    if request.headers().contains_key("HX-Request") {
        let mut response = StatusCode::UNAUTHORIZED.into_response();
        response
            .headers_mut()
            .insert("HX-Redirect", HeaderValue::from_static("/login"));
        return response;
    }

    let next_path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let login = format!("/login?next={}", urlencoding::encode(next_path));
    Redirect::to(&login).into_response()
}

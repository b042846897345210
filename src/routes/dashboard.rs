// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard page and the HTMX refresh fragment.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Html,
    routing::{get, post},
    Extension, Router,
};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::SessionUser;
use crate::time_utils::{resolve_timezone, today_in, TimezoneSource};
use crate::views::{
    render_template, DashboardTemplate, MessagePanel, MessagePartialTemplate, OAuthStatus,
};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(dashboard))
        .route("/refresh", post(refresh))
}

/// Query parameters accepted by the dashboard and refresh endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct BriefingParams {
    /// Day to show (YYYY-MM-DD); defaults to today in the resolved zone.
    #[serde(default)]
    date: Option<String>,
    /// IANA timezone name from the browser.
    #[serde(default)]
    tz: Option<String>,
    /// Outcome of an OAuth redirect (`connected` / `disconnected`).
    #[serde(default)]
    auth: Option<String>,
}

struct BriefingRequest {
    date: NaiveDate,
    explicit_date: bool,
    timezone: Tz,
    timezone_source: TimezoneSource,
}

impl BriefingRequest {
    fn resolve(state: &AppState, params: &BriefingParams, headers: &HeaderMap) -> Result<Self> {
        let hint = params
            .tz
            .as_deref()
            .or_else(|| headers.get("X-Timezone").and_then(|v| v.to_str().ok()));
        let (timezone, timezone_source) = resolve_timezone(hint, state.config.app_timezone);

        let requested = params.date.as_deref().filter(|d| !d.is_empty());
        let date = match requested {
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                AppError::BadRequest("Invalid date format. Use YYYY-MM-DD.".to_string())
            })?,
            None => today_in(timezone),
        };

        Ok(Self {
            date,
            explicit_date: requested.is_some(),
            timezone,
            timezone_source,
        })
    }

    /// Refresh endpoint for the same day and zone as this request.
    fn refresh_url(&self) -> String {
        let mut params = Vec::new();
        if self.explicit_date {
            params.push(format!("date={}", self.date));
        }
        if self.timezone_source == TimezoneSource::Client {
            params.push(format!("tz={}", urlencoding::encode(self.timezone.name())));
        }

        if params.is_empty() {
            "/refresh".to_string()
        } else {
            format!("/refresh?{}", params.join("&"))
        }
    }
}

async fn oauth_status(state: &AppState) -> OAuthStatus {
    match &state.oauth {
        Some(oauth) => OAuthStatus {
            enabled: true,
            connected: oauth.is_connected().await,
        },
        None => OAuthStatus {
            enabled: false,
            connected: true,
        },
    }
}

/// Run the briefing pipeline and turn the outcome into a panel.
async fn build_panel(
    state: &AppState,
    request: &BriefingRequest,
    oauth: &OAuthStatus,
    force: bool,
) -> MessagePanel {
    let refresh_url = request.refresh_url();

    match state
        .briefing
        .build_daily_briefing(request.date, request.timezone, force)
        .await
    {
        Ok(briefing) => MessagePanel::from_briefing(&briefing, refresh_url),
        Err(e) => {
            tracing::warn!(error = %e, date = %request.date, force, "Failed to build daily briefing");
            let oauth_prompt =
                e.is_reauthorization_required() || (oauth.enabled && !oauth.connected);
            let previous = state
                .briefing
                .previous_briefing(request.date, request.timezone);
            MessagePanel::failed(request.date, &e, previous.as_ref(), oauth_prompt, refresh_url)
        }
    }
}

/// GET / - full dashboard page.
async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BriefingParams>,
    headers: HeaderMap,
) -> Result<Html<String>> {
    let request = BriefingRequest::resolve(&state, &params, &headers)?;
    let oauth = oauth_status(&state).await;
    let panel = build_panel(&state, &request, &oauth, false).await;

    let notice = match params.auth.as_deref() {
        Some("connected") => Some("Oura account connected.".to_string()),
        Some("disconnected") => Some("Oura account disconnected.".to_string()),
        _ => None,
    };

    render_template(&DashboardTemplate {
        panel,
        oauth,
        notice,
        timezone: request.timezone.name().to_string(),
        timezone_source: request.timezone_source.as_str(),
    })
}

/// POST /refresh - regenerate the message, bypassing the cache.
async fn refresh(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Query(params): Query<BriefingParams>,
    headers: HeaderMap,
) -> Result<Html<String>> {
    let request = BriefingRequest::resolve(&state, &params, &headers)?;
    tracing::info!(user = %user.username, date = %request.date, "Refresh requested");
    let oauth = oauth_status(&state).await;
    let panel = build_panel(&state, &request, &oauth, true).await;

    render_template(&MessagePartialTemplate { panel })
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTML views: askama templates and the display models they render.

use askama::Template;
use axum::response::Html;
use chrono::NaiveDate;

use crate::error::AppError;
use crate::models::{MetricCategory, SummaryView};
use crate::services::DailyBriefing;
use crate::time_utils::format_utc_rfc3339;

/// Render a template into an HTML response body.
pub fn render_template<T: Template>(template: &T) -> Result<Html<String>, AppError> {
    template
        .render()
        .map(Html)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Template render failed: {}", e)))
}

// -- Display models --

pub struct ScoreCard {
    pub label: &'static str,
    pub value: String,
    /// Signed change against the previous day, e.g. "+4".
    pub delta: Option<String>,
}

/// Everything inside the HTMX-swappable message panel.
pub struct MessagePanel {
    pub requested_date: String,
    pub data_date: Option<String>,
    pub fallback: bool,
    pub message_html: Option<String>,
    pub generated_at: Option<String>,
    pub cards: Vec<ScoreCard>,
    pub focus: Vec<String>,
    pub steps: Option<String>,
    pub sleep_hours: Option<String>,
    pub no_data: bool,
    pub error: Option<String>,
    /// The message shown is from an earlier, successful generation.
    pub stale: bool,
    pub oauth_prompt: bool,
    pub refresh_url: String,
}

impl MessagePanel {
    pub fn from_briefing(briefing: &DailyBriefing, refresh_url: String) -> Self {
        let summary = &briefing.summary;
        Self {
            requested_date: briefing.requested_date.to_string(),
            data_date: summary.date.map(|d| d.to_string()),
            fallback: briefing.used_fallback(),
            message_html: Some(briefing.message.body_text.clone()),
            generated_at: Some(format_utc_rfc3339(briefing.message.generated_at)),
            cards: score_cards(summary),
            focus: summary
                .focus
                .iter()
                .map(|f| {
                    format!(
                        "{}: {} ({})",
                        f.category.label(),
                        f.contributor.replace('_', " "),
                        f.value
                    )
                })
                .collect(),
            steps: summary.steps.map(|s| s.to_string()),
            sleep_hours: summary.sleep_duration_hours.map(|h| format!("{:.2}", h)),
            no_data: summary.is_empty(),
            error: None,
            stale: false,
            oauth_prompt: false,
            refresh_url,
        }
    }

    /// Panel for a failed build. A previous briefing, if any, is still shown.
    pub fn failed(
        requested_date: NaiveDate,
        error: &AppError,
        previous: Option<&DailyBriefing>,
        oauth_prompt: bool,
        refresh_url: String,
    ) -> Self {
        let mut panel = match previous {
            Some(briefing) => Self {
                stale: true,
                ..Self::from_briefing(briefing, refresh_url)
            },
            None => Self {
                requested_date: requested_date.to_string(),
                data_date: None,
                fallback: false,
                message_html: None,
                generated_at: None,
                cards: Vec::new(),
                focus: Vec::new(),
                steps: None,
                sleep_hours: None,
                no_data: false,
                error: None,
                stale: false,
                oauth_prompt: false,
                refresh_url,
            },
        };
        panel.error = Some(error.user_message());
        panel.oauth_prompt = oauth_prompt;
        panel
    }
}

fn score_cards(summary: &SummaryView) -> Vec<ScoreCard> {
    MetricCategory::ALL
        .into_iter()
        .map(|category| ScoreCard {
            label: category.label(),
            value: summary
                .score(category)
                .map(|s| s.to_string())
                .unwrap_or_else(|| "–".to_string()),
            delta: summary.delta(category).map(|d| format!("{:+}", d)),
        })
        .collect()
}

/// Connection state of the Oura OAuth integration.
pub struct OAuthStatus {
    pub enabled: bool,
    pub connected: bool,
}

// -- Templates --

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub next: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub panel: MessagePanel,
    pub oauth: OAuthStatus,
    pub notice: Option<String>,
    pub timezone: String,
    pub timezone_source: &'static str,
}

#[derive(Template)]
#[template(path = "partials/message.html")]
pub struct MessagePartialTemplate {
    pub panel: MessagePanel,
}

#[derive(Template)]
#[template(path = "partials/error.html")]
pub struct ErrorBannerTemplate {
    pub message: String,
    pub reconnect: bool,
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Oura API v2 client for the daily readiness, sleep and activity collections.
//!
//! Handles:
//! - Paginated collection reads (`next_token`)
//! - 404 as "no data" rather than an error
//! - One token refresh and retry when Oura answers 401
//! - Substituting an earlier day's data when the requested day is empty

use crate::error::AppError;
use crate::models::{DailyMetricSnapshot, DateRange, MetricCategory, SnapshotSource};
use crate::services::oura_oauth::AccessTokenSource;
use chrono::{Days, NaiveDate};
use reqwest::{header, StatusCode};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

/// One record of a daily collection. Fields not present in a given
/// collection (e.g. `steps` for sleep) default to `None`.
#[derive(Debug, Clone, Deserialize)]
pub struct DailyRecord {
    pub day: NaiveDate,
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default)]
    pub contributors: BTreeMap<String, Option<u32>>,
    #[serde(default)]
    pub steps: Option<u32>,
    #[serde(default)]
    pub total_sleep_duration: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CollectionPage {
    #[serde(default)]
    data: Vec<DailyRecord>,
    #[serde(default)]
    next_token: Option<String>,
}

/// Records of the three daily collections over one date window.
#[derive(Debug, Clone, Default)]
pub struct DailyCollections {
    pub readiness: Vec<DailyRecord>,
    pub sleep: Vec<DailyRecord>,
    pub activity: Vec<DailyRecord>,
}

impl DailyCollections {
    fn records(&self, category: MetricCategory) -> &[DailyRecord] {
        match category {
            MetricCategory::Readiness => &self.readiness,
            MetricCategory::Sleep => &self.sleep,
            MetricCategory::Activity => &self.activity,
        }
    }
}

fn collection_path(category: MetricCategory) -> &'static str {
    match category {
        MetricCategory::Readiness => "daily_readiness",
        MetricCategory::Sleep => "daily_sleep",
        MetricCategory::Activity => "daily_activity",
    }
}

/// Upper bound on pages followed for one collection read.
const MAX_PAGES: usize = 20;

/// Low-level Oura API client.
#[derive(Clone)]
pub struct OuraClient {
    http: reqwest::Client,
    base_url: String,
}

impl OuraClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Fetch all three daily collections concurrently.
    pub async fn fetch_collections(
        &self,
        access_token: &str,
        range: DateRange,
    ) -> Result<DailyCollections, AppError> {
        let (readiness, sleep, activity) = tokio::try_join!(
            self.fetch_collection(access_token, MetricCategory::Readiness, range),
            self.fetch_collection(access_token, MetricCategory::Sleep, range),
            self.fetch_collection(access_token, MetricCategory::Activity, range),
        )?;

        tracing::debug!(
            readiness_items = readiness.len(),
            sleep_items = sleep.len(),
            activity_items = activity.len(),
            "Fetched Oura collections"
        );

        Ok(DailyCollections {
            readiness,
            sleep,
            activity,
        })
    }

    /// Fetch one daily collection, following pagination.
    ///
    /// 404 yields an empty collection; 401 yields `TokenRejected`.
    pub async fn fetch_collection(
        &self,
        access_token: &str,
        category: MetricCategory,
        range: DateRange,
    ) -> Result<Vec<DailyRecord>, AppError> {
        let name = collection_path(category);
        let url = format!("{}/v2/usercollection/{}", self.base_url, name);
        let mut records = Vec::new();
        let mut next_token: Option<String> = None;

        for page_number in 1.. {
            if page_number > MAX_PAGES {
                return Err(AppError::UpstreamUnavailable(format!(
                    "{} returned more than {} pages",
                    name, MAX_PAGES
                )));
            }

            let mut request = self
                .http
                .get(&url)
                .bearer_auth(access_token)
                .header(header::ACCEPT, "application/json")
                .query(&[
                    ("start_date", range.start.to_string()),
                    ("end_date", range.end.to_string()),
                ]);
            if let Some(token) = &next_token {
                request = request.query(&[("next_token", token)]);
            }

            let response = request.send().await.map_err(|e| {
                AppError::UpstreamUnavailable(format!("{} request failed: {}", name, e))
            })?;

            let status = response.status();
            tracing::debug!(collection = name, status = %status, "Oura API response");

            if status == StatusCode::NOT_FOUND {
                break;
            }
            if status == StatusCode::UNAUTHORIZED {
                return Err(AppError::TokenRejected);
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                tracing::error!(
                    collection = name,
                    status = %status,
                    body = %body.chars().take(200).collect::<String>(),
                    "Oura API request failed"
                );
                return Err(AppError::UpstreamUnavailable(format!(
                    "{} returned HTTP {}",
                    name, status
                )));
            }

            let page: CollectionPage = response.json().await.map_err(|e| {
                AppError::UpstreamUnavailable(format!("{} JSON parse error: {}", name, e))
            })?;
            records.extend(page.data);

            match page.next_token {
                Some(token) if next_token.as_deref() == Some(token.as_str()) => {
                    return Err(AppError::UpstreamUnavailable(format!(
                        "{} repeated pagination token",
                        name
                    )));
                }
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        Ok(records)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OuraDataService - token handling and per-day snapshot assembly
// ─────────────────────────────────────────────────────────────────────────────

/// High-level data service that owns token acquisition and fallback rules.
#[derive(Clone)]
pub struct OuraDataService {
    client: OuraClient,
    tokens: AccessTokenSource,
    fallback_days: u32,
}

impl OuraDataService {
    pub fn new(client: OuraClient, tokens: AccessTokenSource, fallback_days: u32) -> Self {
        Self {
            client,
            tokens,
            fallback_days,
        }
    }

    pub fn tokens(&self) -> &AccessTokenSource {
        &self.tokens
    }

    /// Fetch one snapshot per requested day (see [`assemble_snapshots`]).
    pub async fn fetch_daily_summary(
        &self,
        range: DateRange,
    ) -> Result<Vec<DailyMetricSnapshot>, AppError> {
        let collections = self.fetch_window(range).await?;
        Ok(assemble_snapshots(range, self.fallback_days, &collections))
    }

    /// Snapshot for `day` preceded by the most recent earlier day with data
    /// inside the fetched window, so the summary can compute deltas.
    pub async fn fetch_day_with_previous(
        &self,
        day: NaiveDate,
    ) -> Result<Vec<DailyMetricSnapshot>, AppError> {
        let range = DateRange::single(day);
        let collections = self.fetch_window(range).await?;
        let mut snapshots = assemble_snapshots(range, self.fallback_days, &collections);

        if let Some(earliest) = snapshots.first().map(|s| s.date) {
            if let Some((_, previous)) = merge_by_day(&collections).range(..earliest).next_back() {
                tracing::debug!(
                    day = %day,
                    previous = %previous.date,
                    "Including previous day for deltas"
                );
                snapshots.insert(0, previous.clone());
            }
        }

        Ok(snapshots)
    }

    async fn fetch_window(&self, range: DateRange) -> Result<DailyCollections, AppError> {
        tracing::info!(start = %range.start, end = %range.end, "Requesting Oura daily metrics");
        let window = range.extended_back(self.fallback_days);

        let token = self.tokens.get_valid_token().await?;
        match self.client.fetch_collections(&token, window).await {
            Err(AppError::TokenRejected) => {
                tracing::warn!("Oura rejected access token, refreshing and retrying once");
                let token = self.tokens.force_refresh().await?;
                self.client
                    .fetch_collections(&token, window)
                    .await
                    .map_err(|e| match e {
                        AppError::TokenRejected => AppError::UpstreamUnavailable(
                            "Oura rejected the refreshed access token".to_string(),
                        ),
                        other => other,
                    })
            }
            other => other,
        }
    }
}

/// Merge the three collections into one snapshot per day present.
fn merge_by_day(collections: &DailyCollections) -> BTreeMap<NaiveDate, DailyMetricSnapshot> {
    let mut by_day: BTreeMap<NaiveDate, DailyMetricSnapshot> = BTreeMap::new();

    for category in MetricCategory::ALL {
        for record in collections.records(category) {
            let snapshot = by_day
                .entry(record.day)
                .or_insert_with(|| DailyMetricSnapshot::empty(record.day));
            snapshot.set_score(category, record.score);
            snapshot.contributors.get_mut(category).extend(
                record
                    .contributors
                    .iter()
                    .filter_map(|(name, value)| value.map(|v| (name.clone(), v))),
            );
            match category {
                MetricCategory::Activity => snapshot.steps = record.steps.or(snapshot.steps),
                MetricCategory::Sleep => {
                    snapshot.sleep_duration_seconds =
                        record.total_sleep_duration.or(snapshot.sleep_duration_seconds)
                }
                MetricCategory::Readiness => {}
            }
        }
    }

    by_day
}

/// Merge collection records into one snapshot per requested day.
///
/// A day without data is replaced by the most recent earlier day within
/// `fallback_days` (marked `Fallback`), unless that day is already in the
/// result; otherwise it is omitted. Output is sorted by date.
pub fn assemble_snapshots(
    range: DateRange,
    fallback_days: u32,
    collections: &DailyCollections,
) -> Vec<DailyMetricSnapshot> {
    let by_day = merge_by_day(collections);

    let mut included = BTreeSet::new();
    let mut result = Vec::new();

    for day in range.days() {
        if let Some(snapshot) = by_day.get(&day) {
            included.insert(day);
            result.push(snapshot.clone());
            continue;
        }

        let fallback = (1..=u64::from(fallback_days))
            .filter_map(|offset| day.checked_sub_days(Days::new(offset)))
            .find_map(|candidate| by_day.get(&candidate));

        match fallback {
            Some(snapshot) if !included.contains(&snapshot.date) => {
                tracing::info!(
                    requested = %day,
                    fallback = %snapshot.date,
                    "Using fallback date due to missing data"
                );
                included.insert(snapshot.date);
                result.push(DailyMetricSnapshot {
                    source: SnapshotSource::Fallback,
                    ..snapshot.clone()
                });
            }
            _ => tracing::debug!(day = %day, "No Oura data for day"),
        }
    }

    result.sort_by_key(|s| s.date);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, OuraCredentials};
    use crate::models::OAuthTokenRecord;
    use crate::services::oura_oauth::OuraOAuthService;
    use chrono::{Duration, Utc};
    use wiremock::matchers::{bearer_token, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
    }

    fn record(day: NaiveDate, score: u32) -> DailyRecord {
        DailyRecord {
            day,
            score: Some(score),
            contributors: BTreeMap::from([("hrv_balance".to_string(), Some(70))]),
            steps: None,
            total_sleep_duration: None,
        }
    }

    fn empty_page() -> serde_json::Value {
        serde_json::json!({ "data": [], "next_token": null })
    }

    async fn mount_collection(
        server: &MockServer,
        name: &str,
        token: &str,
        status: u16,
        body: serde_json::Value,
    ) {
        Mock::given(method("GET"))
            .and(path(format!("/v2/usercollection/{}", name)))
            .and(bearer_token(token))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }

    #[test]
    fn test_assemble_merges_collections_per_day() {
        let collections = DailyCollections {
            readiness: vec![record(day(10), 85)],
            sleep: vec![DailyRecord {
                total_sleep_duration: Some(27_000),
                ..record(day(10), 78)
            }],
            activity: vec![DailyRecord {
                steps: Some(9_500),
                ..record(day(10), 90)
            }],
        };

        let snapshots = assemble_snapshots(DateRange::single(day(10)), 1, &collections);

        assert_eq!(snapshots.len(), 1);
        let s = &snapshots[0];
        assert_eq!(s.source, SnapshotSource::Fetched);
        assert_eq!(
            (s.readiness_score, s.sleep_score, s.activity_score),
            (Some(85), Some(78), Some(90))
        );
        assert_eq!(s.steps, Some(9_500));
        assert_eq!(s.sleep_duration_seconds, Some(27_000));
        assert_eq!(s.contributors.sleep["hrv_balance"], 70);
    }

    #[test]
    fn test_assemble_uses_fallback_within_window() {
        let collections = DailyCollections {
            readiness: vec![record(day(9), 70)],
            ..Default::default()
        };

        let snapshots = assemble_snapshots(DateRange::single(day(10)), 1, &collections);
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].date, day(9));
        assert_eq!(snapshots[0].source, SnapshotSource::Fallback);

        let none = assemble_snapshots(DateRange::single(day(11)), 1, &collections);
        assert!(none.is_empty(), "day 9 is outside a 1-day window for day 11");

        let zero_window = assemble_snapshots(DateRange::single(day(10)), 0, &collections);
        assert!(zero_window.is_empty());
    }

    #[test]
    fn test_assemble_prefers_most_recent_fallback_and_skips_duplicates() {
        let collections = DailyCollections {
            readiness: vec![record(day(7), 60), record(day(8), 65)],
            ..Default::default()
        };

        let snapshots = assemble_snapshots(DateRange::new(day(8), day(10)), 3, &collections);

        // Day 8 fetched; days 9 and 10 would both fall back to day 8, already included.
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].date, day(8));
        assert_eq!(snapshots[0].source, SnapshotSource::Fetched);
    }

    #[tokio::test]
    async fn test_today_404_falls_back_to_yesterday() {
        let server = MockServer::start().await;
        let today = Utc::now().date_naive();
        let yesterday = today - Duration::days(1);

        for name in ["daily_readiness", "daily_sleep", "daily_activity"] {
            Mock::given(method("GET"))
                .and(path(format!("/v2/usercollection/{}", name)))
                .and(query_param("start_date", yesterday.to_string()))
                .and(query_param("end_date", today.to_string()))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "data": [{ "day": yesterday.to_string(), "score": 80, "contributors": {} }],
                    "next_token": null
                })))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let service = OuraDataService::new(
            OuraClient::new(reqwest::Client::new(), server.uri()),
            AccessTokenSource::PersonalToken("pat".to_string()),
            1,
        );

        let snapshots = service
            .fetch_daily_summary(DateRange::single(today))
            .await
            .unwrap();

        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].date, yesterday);
        assert_eq!(snapshots[0].source, SnapshotSource::Fallback);
    }

    #[tokio::test]
    async fn test_not_found_collections_mean_no_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let service = OuraDataService::new(
            OuraClient::new(reqwest::Client::new(), server.uri()),
            AccessTokenSource::PersonalToken("pat".to_string()),
            1,
        );

        let snapshots = service
            .fetch_daily_summary(DateRange::single(day(10)))
            .await
            .unwrap();
        assert!(snapshots.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_upstream_unavailable() {
        let server = MockServer::start().await;
        mount_collection(&server, "daily_readiness", "pat", 500, empty_page()).await;
        mount_collection(&server, "daily_sleep", "pat", 200, empty_page()).await;
        mount_collection(&server, "daily_activity", "pat", 200, empty_page()).await;

        let service = OuraDataService::new(
            OuraClient::new(reqwest::Client::new(), server.uri()),
            AccessTokenSource::PersonalToken("pat".to_string()),
            1,
        );

        let result = service.fetch_daily_summary(DateRange::single(day(10))).await;
        assert!(matches!(result, Err(AppError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_repeated_401_with_personal_token_is_upstream_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let service = OuraDataService::new(
            OuraClient::new(reqwest::Client::new(), server.uri()),
            AccessTokenSource::PersonalToken("pat".to_string()),
            1,
        );

        let result = service.fetch_daily_summary(DateRange::single(day(10))).await;
        assert!(matches!(result, Err(AppError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_pagination_follows_next_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/usercollection/daily_readiness"))
            .and(query_param("next_token", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "day": "2026-05-10", "score": 88 }],
                "next_token": null
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/usercollection/daily_readiness"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "day": "2026-05-09", "score": 81 }],
                "next_token": "page-2"
            })))
            .mount(&server)
            .await;

        let client = OuraClient::new(reqwest::Client::new(), server.uri());
        let records = client
            .fetch_collection(
                "pat",
                MetricCategory::Readiness,
                DateRange::new(day(9), day(10)),
            )
            .await
            .unwrap();

        let scores: Vec<_> = records.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![Some(81), Some(88)]);
    }

    #[tokio::test]
    async fn test_repeated_next_token_is_upstream_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/usercollection/daily_sleep"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [],
                "next_token": "same"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = OuraClient::new(reqwest::Client::new(), server.uri());
        let err = client
            .fetch_collection("pat", MetricCategory::Sleep, DateRange::single(day(10)))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_pagination_stops_at_page_limit() {
        let server = MockServer::start().await;
        for (current, next) in [("a", "b"), ("b", "a")] {
            Mock::given(method("GET"))
                .and(path("/v2/usercollection/daily_activity"))
                .and(query_param("next_token", current))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "data": [],
                    "next_token": next
                })))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/v2/usercollection/daily_activity"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [],
                "next_token": "a"
            })))
            .mount(&server)
            .await;

        let client = OuraClient::new(reqwest::Client::new(), server.uri());
        let err = client
            .fetch_collection("pat", MetricCategory::Activity, DateRange::single(day(10)))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UpstreamUnavailable(_)));
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), MAX_PAGES);
    }

    #[tokio::test]
    async fn test_rejected_token_is_refreshed_and_retried_once() {
        let oura = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        let mut config = Config::test_default();
        config.oura_credentials = OuraCredentials::OAuth {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
        };
        config.oura_token_url = format!("{}/oauth/token", oura.uri());
        config.token_store_path = dir.path().join("tokens.json");
        let oauth = OuraOAuthService::from_config(&config, reqwest::Client::new()).unwrap();

        // Stored token is still valid locally but Oura has revoked it.
        oauth
            .store()
            .save(&OAuthTokenRecord {
                access_token: "revoked-access".to_string(),
                refresh_token: Some("refresh-1".to_string()),
                expires_at: Some(Utc::now() + Duration::hours(1)),
                scope: None,
                token_type: None,
            })
            .await
            .unwrap();

        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh-access",
                "refresh_token": "refresh-2",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&oura)
            .await;

        for name in ["daily_readiness", "daily_sleep", "daily_activity"] {
            mount_collection(
                &oura,
                name,
                "fresh-access",
                200,
                serde_json::json!({
                    "data": [{ "day": "2026-05-10", "score": 75 }],
                    "next_token": null
                }),
            )
            .await;
            mount_collection(&oura, name, "revoked-access", 401, empty_page()).await;
        }

        let service = OuraDataService::new(
            OuraClient::new(reqwest::Client::new(), oura.uri()),
            AccessTokenSource::OAuth(oauth.clone()),
            1,
        );

        let snapshots = service
            .fetch_daily_summary(DateRange::single(day(10)))
            .await
            .expect("401 should be recovered transparently");

        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].readiness_score, Some(75));
        assert_eq!(
            oauth.store().load().await.unwrap().access_token,
            "fresh-access"
        );
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use oura_coach::config::{Config, OuraCredentials};
use oura_coach::routes::create_router;
use oura_coach::services::session::SESSION_COOKIE;
use oura_coach::AppState;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A router wired to mock Oura and OpenAI servers and a temporary token store.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub oura: MockServer,
    pub openai: MockServer,
    pub dir: TempDir,
}

#[allow(dead_code)]
impl TestApp {
    /// Send a request with a valid session cookie attached.
    pub async fn send_authed(&self, builder: axum::http::request::Builder) -> Response {
        let request = builder
            .header(header::COOKIE, self.session_cookie())
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        use tower::ServiceExt;
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub fn session_cookie(&self) -> String {
        let token = self
            .state
            .sessions
            .authenticate("coach", "hunter2")
            .expect("test credentials should authenticate");
        format!("{}={}", SESSION_COOKIE, token)
    }
}

fn test_config(oura: &MockServer, openai: &MockServer, dir: &TempDir) -> Config {
    Config {
        oura_api_base_url: oura.uri(),
        oura_token_url: format!("{}/oauth/token", oura.uri()),
        oura_revoke_url: format!("{}/oauth/revoke", oura.uri()),
        openai_base_url: openai.uri(),
        token_store_path: dir.path().join("tokens.json"),
        ..Config::test_default()
    }
}

async fn build(credentials: OuraCredentials) -> TestApp {
    let oura = MockServer::start().await;
    let openai = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let config = Config {
        oura_credentials: credentials,
        ..test_config(&oura, &openai, &dir)
    };
    let state = Arc::new(AppState::from_config(config).unwrap());

    TestApp {
        router: create_router(state.clone()),
        state,
        oura,
        openai,
        dir,
    }
}

/// App using a personal access token (`test_pat`).
#[allow(dead_code)]
pub async fn create_pat_app() -> TestApp {
    build(OuraCredentials::PersonalAccessToken("test_pat".to_string())).await
}

/// App using the OAuth flow with client `cid`/`secret`.
#[allow(dead_code)]
pub async fn create_oauth_app() -> TestApp {
    build(OuraCredentials::OAuth {
        client_id: "cid".to_string(),
        client_secret: "secret".to_string(),
    })
    .await
}

/// Serve `records` for one daily collection, whatever the date window.
#[allow(dead_code)]
pub async fn mount_collection(server: &MockServer, name: &str, records: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/v2/usercollection/{name}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "data": records, "next_token": null })),
        )
        .mount(server)
        .await;
}

/// Serve readiness/sleep/activity scores for a single day.
#[allow(dead_code)]
pub async fn mount_scores(server: &MockServer, day: &str, readiness: u32, sleep: u32, activity: u32) {
    mount_collection(
        server,
        "daily_readiness",
        serde_json::json!([{ "day": day, "score": readiness, "contributors": { "hrv_balance": 71 } }]),
    )
    .await;
    mount_collection(
        server,
        "daily_sleep",
        serde_json::json!([{ "day": day, "score": sleep, "total_sleep_duration": 27000 }]),
    )
    .await;
    mount_collection(
        server,
        "daily_activity",
        serde_json::json!([{ "day": day, "score": activity, "steps": 9120 }]),
    )
    .await;
}

/// Answer every chat completion with `text`, expecting exactly `times` calls.
#[allow(dead_code)]
pub async fn mount_completion(server: &MockServer, text: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": text } }]
        })))
        .expect(times)
        .mount(server)
        .await;
}

#[allow(dead_code)]
pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

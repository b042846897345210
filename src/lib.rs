// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Oura Daily Coach: a personal dashboard that turns daily Oura readiness,
//! sleep and activity scores into a short coaching message.
//!
//! This crate provides the web server, the Oura OAuth and data clients, and
//! the summarize-then-generate briefing pipeline.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;
pub mod views;

use anyhow::Context;
use config::Config;
use services::{
    AccessTokenSource, CoachService, DailyBriefingService, OpenAiClient, OuraClient,
    OuraDataService, OuraOAuthService, PersonaConfig, SessionManager,
};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub sessions: SessionManager,
    /// `None` when a personal access token is configured.
    pub oauth: Option<OuraOAuthService>,
    pub briefing: DailyBriefingService,
}

impl AppState {
    /// Wire up all services from configuration.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!("oura-coach/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        let oauth = OuraOAuthService::from_config(&config, http.clone());
        let tokens = AccessTokenSource::from_config(&config, oauth.as_ref())?;

        let data = OuraDataService::new(
            OuraClient::new(http.clone(), config.oura_api_base_url.clone()),
            tokens,
            config.data_fallback_days,
        );
        let coach = CoachService::new(OpenAiClient::new(
            http,
            config.openai_base_url.clone(),
            config.openai_api_key.clone(),
            config.openai_model.clone(),
        ));
        let briefing =
            DailyBriefingService::new(data, coach, PersonaConfig::default(), config.cache_ttl());

        let sessions = SessionManager::new(
            config.auth_username.clone(),
            config.auth_password.clone(),
            config.session_signing_key.clone(),
        );

        Ok(Self {
            config,
            sessions,
            oauth,
            briefing,
        })
    }
}

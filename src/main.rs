// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Oura Daily Coach web server.

use oura_coach::{config::Config, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };
    tracing::info!(
        port = config.port,
        oauth = config.uses_oauth(),
        timezone = %config.app_timezone.name(),
        model = %config.openai_model,
        "Starting Oura Daily Coach"
    );

    let state = Arc::new(AppState::from_config(config.clone())?);
    if let Some(oauth) = &state.oauth {
        tracing::info!(
            token_store = %oauth.store().path().display(),
            connected = oauth.is_connected().await,
            "Oura OAuth enabled"
        );
    }

    let app = oura_coach::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("oura_coach=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod briefing;
pub mod cache;
pub mod coach;
pub mod openai;
pub mod oura;
pub mod oura_oauth;
pub mod session;
pub mod summarizer;

pub use briefing::{DailyBriefing, DailyBriefingService};
pub use cache::RefreshCache;
pub use coach::{CoachService, PersonaConfig};
pub use openai::OpenAiClient;
pub use oura::{OuraClient, OuraDataService};
pub use oura_oauth::{AccessTokenSource, OuraOAuthService};
pub use session::SessionManager;

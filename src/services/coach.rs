// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Coaching message generation: prompt construction plus the completion call.

use crate::error::AppError;
use crate::models::{CoachingMessage, MetricCategory, SummaryView};
use crate::services::openai::{ChatMessage, ChatRole, OpenAiClient};
use chrono::Utc;

const DEFAULT_INSTRUCTIONS: &str = "You are a daily motivator coach. Use the Oura readiness, \
sleep and activity scores to craft a helpful, kind plan for the day. Keep a warm tone, avoid \
medical claims or PII, and focus on actionable guidance. Respond with HTML markup: provide two \
or three <p> paragraphs followed by a <ul> containing one or two specific focus items.";

/// Tone and instructions given to the model as the system message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaConfig {
    pub instructions: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
        }
    }
}

/// Build the chat prompt for `summary`. Same input, same prompt.
pub fn build_prompt(summary: &SummaryView, persona: &PersonaConfig) -> Vec<ChatMessage> {
    let scores = MetricCategory::ALL
        .into_iter()
        .map(|category| {
            let score = summary
                .score(category)
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            format!("{} score: {} out of 100.", category.label(), score)
        })
        .collect::<Vec<_>>()
        .join(" ");

    // serde_json::Value maps are ordered by key, so the payload is stable.
    let payload = serde_json::to_value(summary)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_else(|_| "{}".to_string());

    vec![
        ChatMessage {
            role: ChatRole::System,
            content: format!("{} {}", persona.instructions, scores),
        },
        ChatMessage {
            role: ChatRole::User,
            content: payload,
        },
    ]
}

/// Generates coaching messages through the chat completion API.
#[derive(Clone)]
pub struct CoachService {
    openai: OpenAiClient,
}

impl CoachService {
    pub fn new(openai: OpenAiClient) -> Self {
        Self { openai }
    }

    /// Generate a message for `summary`; the completion text is kept verbatim.
    pub async fn generate_message(
        &self,
        summary: &SummaryView,
        persona: &PersonaConfig,
    ) -> Result<CoachingMessage, AppError> {
        let messages = build_prompt(summary, persona);
        let body_text = self.openai.complete(&messages).await?;

        tracing::info!(
            model = %self.openai.model(),
            snapshot = ?summary.date,
            chars = body_text.len(),
            "Generated coaching message"
        );

        Ok(CoachingMessage {
            generated_at: Utc::now(),
            body_text,
            input_snapshot_ref: summary.date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn summary() -> SummaryView {
        SummaryView {
            date: NaiveDate::from_ymd_opt(2026, 7, 1),
            readiness_score: Some(85),
            sleep_score: Some(78),
            activity_score: Some(90),
            ..Default::default()
        }
    }

    #[test]
    fn test_prompt_contains_all_three_scores() {
        let messages = build_prompt(&summary(), &PersonaConfig::default());

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::System);
        let system = &messages[0].content;
        assert!(system.starts_with("You are a daily motivator coach."));
        assert!(system.contains("Readiness score: 85 out of 100."));
        assert!(system.contains("Sleep score: 78 out of 100."));
        assert!(system.contains("Activity score: 90 out of 100."));
        assert!(messages[1].content.contains("\"readiness_score\": 85"));
    }

    #[test]
    fn test_prompt_is_deterministic_and_handles_empty_summary() {
        let persona = PersonaConfig::default();
        assert_eq!(build_prompt(&summary(), &persona), build_prompt(&summary(), &persona));

        let empty = build_prompt(&SummaryView::default(), &persona);
        assert!(empty[0].content.contains("Readiness score: unknown out of 100."));
    }

    #[tokio::test]
    async fn test_generate_message_records_snapshot_ref() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": "<p>Steady day.</p>" } }]
            })))
            .mount(&server)
            .await;

        let coach = CoachService::new(OpenAiClient::new(
            reqwest::Client::new(),
            server.uri(),
            "sk",
            "model",
        ));

        let message = coach
            .generate_message(&summary(), &PersonaConfig::default())
            .await
            .unwrap();

        assert_eq!(message.body_text, "<p>Steady day.</p>");
        assert_eq!(message.input_snapshot_ref, NaiveDate::from_ymd_opt(2026, 7, 1));
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily briefing pipeline: fetch metrics, summarize, generate the coaching
//! message, and cache the result per day and timezone.

use crate::error::AppError;
use crate::models::{CoachingMessage, DailyMetricSnapshot, SummaryView};
use crate::services::cache::RefreshCache;
use crate::services::coach::{CoachService, PersonaConfig};
use crate::services::oura::OuraDataService;
use crate::services::summarizer::summarize;
use chrono::{Duration, NaiveDate};
use chrono_tz::Tz;

/// Cache partition: one briefing per requested day, zone and token identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub date: NaiveDate,
    pub timezone: String,
    pub identity: &'static str,
}

/// Everything the dashboard renders for one day.
#[derive(Debug, Clone)]
pub struct DailyBriefing {
    pub requested_date: NaiveDate,
    pub timezone: Tz,
    pub snapshots: Vec<DailyMetricSnapshot>,
    pub summary: SummaryView,
    pub message: CoachingMessage,
}

impl DailyBriefing {
    /// True when the summary came from an earlier day than the one requested.
    pub fn used_fallback(&self) -> bool {
        self.summary
            .date
            .is_some_and(|date| date != self.requested_date)
    }
}

#[derive(Clone)]
pub struct DailyBriefingService {
    data: OuraDataService,
    coach: CoachService,
    persona: PersonaConfig,
    cache: RefreshCache<CacheKey, DailyBriefing>,
    ttl: Duration,
}

impl DailyBriefingService {
    pub fn new(
        data: OuraDataService,
        coach: CoachService,
        persona: PersonaConfig,
        ttl: Duration,
    ) -> Self {
        Self {
            data,
            coach,
            persona,
            cache: RefreshCache::new(),
            ttl,
        }
    }

    fn cache_key(&self, date: NaiveDate, timezone: Tz) -> CacheKey {
        CacheKey {
            date,
            timezone: timezone.name().to_string(),
            identity: self.data.tokens().identity(),
        }
    }

    /// Build (or reuse) the briefing for `date`. `force` bypasses the cache.
    pub async fn build_daily_briefing(
        &self,
        date: NaiveDate,
        timezone: Tz,
        force: bool,
    ) -> Result<DailyBriefing, AppError> {
        let key = self.cache_key(date, timezone);

        self.cache
            .get_or_compute(key, self.ttl, force, || async {
                let snapshots = self.data.fetch_day_with_previous(date).await?;
                let summary = summarize(&snapshots);
                if summary.is_empty() {
                    tracing::info!(date = %date, "No Oura data in window, using neutral summary");
                }

                let message = self.coach.generate_message(&summary, &self.persona).await?;

                Ok::<_, AppError>(DailyBriefing {
                    requested_date: date,
                    timezone,
                    snapshots,
                    summary,
                    message,
                })
            })
            .await
    }

    /// Last briefing built for `date`, even if its cache entry has expired.
    pub fn previous_briefing(&self, date: NaiveDate, timezone: Tz) -> Option<DailyBriefing> {
        self.cache.stale(&self.cache_key(date, timezone))
    }

    pub fn clear_cache(&self) {
        tracing::debug!("Clearing cached briefings");
        self.cache.clear();
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Condensed view of recent metrics used to prompt the coach.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::metrics::{MetricCategory, SnapshotSource};

/// Lowest-scoring contributor of a category, used for narrative emphasis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusArea {
    pub category: MetricCategory,
    pub contributor: String,
    pub value: u32,
}

/// Summary of the most recent snapshot plus day-over-day deltas.
///
/// `SummaryView::default()` is the neutral summary produced when no data exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryView {
    pub date: Option<NaiveDate>,
    pub source: Option<SnapshotSource>,
    pub readiness_score: Option<u32>,
    pub sleep_score: Option<u32>,
    pub activity_score: Option<u32>,
    /// Change versus the previous available day
    pub readiness_delta: Option<i64>,
    pub sleep_delta: Option<i64>,
    pub activity_delta: Option<i64>,
    pub focus: Vec<FocusArea>,
    pub steps: Option<u32>,
    pub sleep_duration_hours: Option<f64>,
}

impl SummaryView {
    /// True when no snapshot contributed to this summary.
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
    }

    pub fn score(&self, category: MetricCategory) -> Option<u32> {
        match category {
            MetricCategory::Readiness => self.readiness_score,
            MetricCategory::Sleep => self.sleep_score,
            MetricCategory::Activity => self.activity_score,
        }
    }

    pub fn delta(&self, category: MetricCategory) -> Option<i64> {
        match category {
            MetricCategory::Readiness => self.readiness_delta,
            MetricCategory::Sleep => self.sleep_delta,
            MetricCategory::Activity => self.activity_delta,
        }
    }
}

/// Generated coaching text. Kept only in the in-memory refresh cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachingMessage {
    pub generated_at: DateTime<Utc>,
    /// Completion text exactly as returned by the model
    pub body_text: String,
    /// Date of the snapshot the prompt was built from
    pub input_snapshot_ref: Option<NaiveDate>,
}

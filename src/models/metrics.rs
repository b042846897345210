// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily metric snapshots assembled from the Oura daily collections.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Whether a snapshot is for the requested day or substituted from an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSource {
    Fetched,
    Fallback,
}

/// The three Oura daily score categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricCategory {
    Readiness,
    Sleep,
    Activity,
}

impl MetricCategory {
    pub const ALL: [MetricCategory; 3] = [
        MetricCategory::Readiness,
        MetricCategory::Sleep,
        MetricCategory::Activity,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MetricCategory::Readiness => "Readiness",
            MetricCategory::Sleep => "Sleep",
            MetricCategory::Activity => "Activity",
        }
    }
}

impl fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Contributor values per category (e.g. `"hrv_balance" -> 72`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributors {
    #[serde(default)]
    pub readiness: BTreeMap<String, u32>,
    #[serde(default)]
    pub sleep: BTreeMap<String, u32>,
    #[serde(default)]
    pub activity: BTreeMap<String, u32>,
}

impl Contributors {
    pub fn get(&self, category: MetricCategory) -> &BTreeMap<String, u32> {
        match category {
            MetricCategory::Readiness => &self.readiness,
            MetricCategory::Sleep => &self.sleep,
            MetricCategory::Activity => &self.activity,
        }
    }

    pub fn get_mut(&mut self, category: MetricCategory) -> &mut BTreeMap<String, u32> {
        match category {
            MetricCategory::Readiness => &mut self.readiness,
            MetricCategory::Sleep => &mut self.sleep,
            MetricCategory::Activity => &mut self.activity,
        }
    }
}

/// One day of Oura metrics. Built per request, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetricSnapshot {
    pub date: NaiveDate,
    pub readiness_score: Option<u32>,
    pub sleep_score: Option<u32>,
    pub activity_score: Option<u32>,
    pub contributors: Contributors,
    pub steps: Option<u32>,
    pub sleep_duration_seconds: Option<u32>,
    pub source: SnapshotSource,
}

impl DailyMetricSnapshot {
    /// Empty snapshot for `date`, to be filled in collection by collection.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            readiness_score: None,
            sleep_score: None,
            activity_score: None,
            contributors: Contributors::default(),
            steps: None,
            sleep_duration_seconds: None,
            source: SnapshotSource::Fetched,
        }
    }

    pub fn score(&self, category: MetricCategory) -> Option<u32> {
        match category {
            MetricCategory::Readiness => self.readiness_score,
            MetricCategory::Sleep => self.sleep_score,
            MetricCategory::Activity => self.activity_score,
        }
    }

    pub fn set_score(&mut self, category: MetricCategory, score: Option<u32>) {
        match category {
            MetricCategory::Readiness => self.readiness_score = score,
            MetricCategory::Sleep => self.sleep_score = score,
            MetricCategory::Activity => self.activity_score = score,
        }
    }
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Range from `start` to `end`, swapping them if given in reverse.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// Same range with the start moved `days` earlier.
    pub fn extended_back(&self, days: u32) -> Self {
        Self {
            start: self
                .start
                .checked_sub_days(Days::new(u64::from(days)))
                .unwrap_or(NaiveDate::MIN),
            end: self.end,
        }
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }
}

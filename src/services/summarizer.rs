// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reduce daily snapshots to the handful of fields the coach needs.

use crate::models::{DailyMetricSnapshot, FocusArea, MetricCategory, SummaryView};

/// Summarize snapshots (any order). Pure and deterministic.
///
/// The most recent snapshot supplies the scores; the one before it, if any,
/// supplies the deltas. An empty slice yields `SummaryView::default()`.
pub fn summarize(snapshots: &[DailyMetricSnapshot]) -> SummaryView {
    let mut ordered: Vec<&DailyMetricSnapshot> = snapshots.iter().collect();
    ordered.sort_by_key(|s| s.date);

    let Some(latest) = ordered.last().copied() else {
        return SummaryView::default();
    };
    let previous = ordered.len().checked_sub(2).map(|i| ordered[i]);

    let delta = |category: MetricCategory| -> Option<i64> {
        let current = latest.score(category)?;
        let before = previous?.score(category)?;
        Some(i64::from(current) - i64::from(before))
    };

    SummaryView {
        date: Some(latest.date),
        source: Some(latest.source),
        readiness_score: latest.readiness_score,
        sleep_score: latest.sleep_score,
        activity_score: latest.activity_score,
        readiness_delta: delta(MetricCategory::Readiness),
        sleep_delta: delta(MetricCategory::Sleep),
        activity_delta: delta(MetricCategory::Activity),
        focus: focus_areas(latest),
        steps: latest.steps,
        sleep_duration_hours: latest
            .sleep_duration_seconds
            .map(|secs| (f64::from(secs) / 3600.0 * 100.0).round() / 100.0),
    }
}

/// Lowest contributor per category; ties go to the alphabetically first name.
fn focus_areas(snapshot: &DailyMetricSnapshot) -> Vec<FocusArea> {
    MetricCategory::ALL
        .into_iter()
        .filter_map(|category| {
            snapshot
                .contributors
                .get(category)
                .iter()
                .min_by(|(a_name, a), (b_name, b)| a.cmp(b).then_with(|| a_name.cmp(b_name)))
                .map(|(name, value)| FocusArea {
                    category,
                    contributor: name.clone(),
                    value: *value,
                })
        })
        .collect()
}

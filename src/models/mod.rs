// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod metrics;
pub mod summary;
pub mod token;

pub use metrics::{Contributors, DailyMetricSnapshot, DateRange, MetricCategory, SnapshotSource};
pub use summary::{CoachingMessage, FocusArea, SummaryView};
pub use token::OAuthTokenRecord;

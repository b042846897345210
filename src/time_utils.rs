// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for dates, timestamps and timezones.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use chrono_tz::Tz;

/// Where the timezone used for a request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimezoneSource {
    /// `tz` query parameter or `X-Timezone` header
    Client,
    /// `APP_TIMEZONE`
    Config,
}

impl TimezoneSource {
    pub fn as_str(self) -> &'static str {
        match self {
            TimezoneSource::Client => "client",
            TimezoneSource::Config => "config",
        }
    }
}

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Pick the request timezone: a valid client hint wins, anything else falls
/// back to the configured zone.
pub fn resolve_timezone(hint: Option<&str>, default: Tz) -> (Tz, TimezoneSource) {
    let Some(name) = hint.map(str::trim).filter(|name| !name.is_empty()) else {
        return (default, TimezoneSource::Config);
    };

    match name.parse::<Tz>() {
        Ok(tz) => (tz, TimezoneSource::Client),
        Err(_) => {
            tracing::warn!(timezone = %name, fallback = %default.name(), "Unknown timezone hint");
            (default, TimezoneSource::Config)
        }
    }
}

/// Today's date in `tz`.
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

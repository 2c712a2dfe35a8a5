// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Timestamp formatting for API responses.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a snapshot timestamp as RFC3339 with millisecond precision and a
/// `Z` suffix, the shape JavaScript's `Date` produces and parses.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth token pair as held in memory and mirrored in the token store.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Current Mercado Libre access/refresh token pair.
///
/// `expires_at` is always an absolute instant, never a lifetime. The store
/// wire format carries it as epoch milliseconds.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

impl Tokens {
    /// Whether the access token can still be handed out at `now`, keeping
    /// `margin` in reserve before the hard expiry.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now < self.expires_at - margin
    }

    /// Seconds left until `expires_at`, clamped at zero.
    pub fn expires_in_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

// Token values must never end up in logs.
impl std::fmt::Debug for Tokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokens")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

//! The core data type shared across all providers.
//!
//! `Update` represents a single notification-like entry derived from a
//! provider's content. Every source converts its native payload into
//! `Update`s so the feed logic (de-duplication, capping, rendering) doesn't
//! need to know which provider produced the item.

use chrono::{DateTime, TimeDelta, Utc};

use crate::provider::Provider;

/// A single feed entry, normalised from any provider.
///
/// Updates are never mutated after the fetch step builds them; the feed only
/// filters and re-arranges them.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Update {
    /// Provider-native identifier, used for de-duplication.
    pub id: String,

    /// Identifier of the account the update was fetched for.
    ///
    /// Disconnecting an account purges updates by this key.
    pub account_id: String,

    /// Display name of that account (e.g. "Jane Doe").
    pub account: String,

    pub provider: Provider,

    /// Message text, or the provider's default when the source had none.
    pub message: String,

    /// Coarse relative-time label ("5m ago"), frozen at fetch time.
    pub time: String,

    /// Deep link to the original item.
    pub link: Option<String>,
}

/// Label used when the provider gave no usable timestamp.
pub const UNKNOWN_TIME: &str = "recently";

/// Render `created` relative to `now` as minutes, hours or days ago.
///
/// Timestamps in the future clamp to `"0m ago"`.
pub fn relative_time(created: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(created) = created else {
        return UNKNOWN_TIME.to_string();
    };

    let elapsed = now.signed_duration_since(created).max(TimeDelta::zero());
    if elapsed.num_minutes() < 60 {
        format!("{}m ago", elapsed.num_minutes())
    } else if elapsed.num_hours() < 24 {
        format!("{}h ago", elapsed.num_hours())
    } else {
        format!("{}d ago", elapsed.num_days())
    }
}

/// Parse a Graph API timestamp.
///
/// The Graph APIs emit `2024-01-01T12:00:00+0000` (no colon in the offset),
/// which RFC 3339 parsing rejects, so both forms are tried.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn minutes_below_one_hour() {
        let created = now() - TimeDelta::minutes(59);
        assert_eq!(relative_time(Some(created), now()), "59m ago");
    }

    #[test]
    fn hours_below_one_day() {
        let created = now() - TimeDelta::minutes(60);
        assert_eq!(relative_time(Some(created), now()), "1h ago");

        let created = now() - TimeDelta::hours(23) - TimeDelta::minutes(59);
        assert_eq!(relative_time(Some(created), now()), "23h ago");
    }

    #[test]
    fn days_from_one_day_on() {
        let created = now() - TimeDelta::hours(24);
        assert_eq!(relative_time(Some(created), now()), "1d ago");

        let created = now() - TimeDelta::days(40);
        assert_eq!(relative_time(Some(created), now()), "40d ago");
    }

    #[test]
    fn future_timestamps_clamp_to_zero() {
        let created = now() + TimeDelta::hours(3);
        assert_eq!(relative_time(Some(created), now()), "0m ago");
    }

    #[test]
    fn missing_timestamp_renders_placeholder() {
        assert_eq!(relative_time(None, now()), UNKNOWN_TIME);
    }

    #[test]
    fn parses_graph_offset_without_colon() {
        let parsed = parse_timestamp("2025-06-15T11:30:00+0000").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 6, 15, 11, 30, 0).unwrap());
    }

    #[test]
    fn parses_rfc3339_and_normalises_offset() {
        let parsed = parse_timestamp("2025-06-15T13:30:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 6, 15, 11, 30, 0).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("yesterday-ish").is_none());
    }
}

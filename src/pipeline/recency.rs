// src/pipeline/recency.rs
//! Second gate: freshness window over the feed's published timestamp.

use anyhow::{Context, Result};
use chrono::DateTime;

/// Parse an RFC 2822 feed timestamp (including obsolete zone names like
/// "GMT") to unix seconds. A parse failure is an error (upstream format
/// change), not a rejection.
pub fn parse_published_unix(raw: &str) -> Result<i64> {
    let dt = DateTime::parse_from_rfc2822(raw.trim())
        .with_context(|| format!("parsing published date '{raw}'"))?;
    Ok(dt.timestamp())
}

/// Two-sided freshness check: slightly-future dates pass too (clock skew),
/// it is not a one-sided "not older than".
pub fn is_recent(published_unix: i64, now_unix: i64, window_hours: i64) -> bool {
    (now_unix - published_unix).abs() <= window_hours * 3600
}

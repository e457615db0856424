// src/pipeline/link.rs
//! First gate: raw feed link -> canonical URL, or rejection.

use anyhow::Result;

use super::report::RejectReason;
use crate::resolve::{ExclusionRules, LinkResolver};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDecision {
    Canonical(String),
    Rejected(RejectReason),
}

/// Resolve the raw link and apply exclusion rules. A resolver transport
/// failure propagates as an error (`url_processing` in the run's bucket);
/// an unresolvable link is a normal `invalid_url` rejection.
pub async fn normalize_link(
    resolver: &dyn LinkResolver,
    rules: &ExclusionRules,
    raw_link: &str,
) -> Result<LinkDecision> {
    let Some(canonical) = resolver.resolve(raw_link).await? else {
        return Ok(LinkDecision::Rejected(RejectReason::InvalidUrl));
    };
    if rules.is_excluded(&canonical) {
        return Ok(LinkDecision::Rejected(RejectReason::FilteredOut));
    }
    Ok(LinkDecision::Canonical(canonical))
}

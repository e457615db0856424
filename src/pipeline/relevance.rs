// src/pipeline/relevance.rs
//! Fourth gate: keyword allow-list vs blacklist term matching.

use super::report::RejectReason;

/// Matched terms from both lists. When the blacklist matched, keyword
/// matches are discarded: blacklist always wins.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TermMatches {
    pub keywords: Vec<String>,
    pub blacklist: Vec<String>,
}

/// Substring containment over the lower-cased text, for both lists
/// independently; blacklist precedence applied to the result.
pub fn match_terms(text: &str, keywords: &[String], blacklist: &[String]) -> TermMatches {
    let haystack = text.to_lowercase();
    let blacklist_hits = contained_terms(&haystack, blacklist);
    let keyword_hits = contained_terms(&haystack, keywords);
    if !blacklist_hits.is_empty() {
        return TermMatches {
            keywords: Vec::new(),
            blacklist: blacklist_hits,
        };
    }
    TermMatches {
        keywords: keyword_hits,
        blacklist: Vec::new(),
    }
}

/// The gate's verdict: `None` passes, otherwise the rejection reason.
pub fn relevance_decision(matches: &TermMatches) -> Option<RejectReason> {
    if !matches.blacklist.is_empty() {
        return Some(RejectReason::Blacklist);
    }
    if matches.keywords.is_empty() {
        return Some(RejectReason::NoKeywords);
    }
    None
}

fn contained_terms(haystack: &str, terms: &[String]) -> Vec<String> {
    terms
        .iter()
        .filter_map(|t| {
            let needle = t.trim().to_lowercase();
            if !needle.is_empty() && haystack.contains(needle.as_str()) {
                Some(needle)
            } else {
                None
            }
        })
        .collect()
}

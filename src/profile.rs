// src/profile.rs
//! Bot profiles: per-topic keyword/blacklist/threshold configuration.
//!
//! Loaded from TOML with a `[defaults]` section merged into each `[[bots]]`
//! entry. Path resolution: $BOTS_CONFIG_PATH, then `config/bots.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BOTS_CONFIG_PATH: &str = "config/bots.toml";
pub const ENV_BOTS_CONFIG_PATH: &str = "BOTS_CONFIG_PATH";

/// A topic-bound agent's filtering configuration. Read-only to the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct BotProfile {
    pub id: String,
    pub name: String,
    pub source_url: String,
    pub keywords: Vec<String>,
    pub blacklist: Vec<String>,
    pub similarity_threshold: f32,
    pub recency_window_hours: i64,
    pub recent_window_size: usize,
}

/// Run-wide settings shared by all bots.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSettings {
    pub max_concurrency: usize,
    pub excluded_url_terms: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BotsConfig {
    pub settings: PipelineSettings,
    pub bots: Vec<BotProfile>,
}

/* ----------------------------
TOML schema
---------------------------- */

#[derive(Debug, Deserialize)]
struct BotsFile {
    #[serde(default)]
    defaults: Defaults,
    #[serde(default)]
    bots: Vec<BotEntry>,
}

#[derive(Debug, Deserialize)]
struct Defaults {
    #[serde(default = "default_recency_window_hours")]
    recency_window_hours: i64,
    #[serde(default = "default_similarity_threshold")]
    similarity_threshold: f32,
    #[serde(default = "default_recent_window_size")]
    recent_window_size: usize,
    #[serde(default = "default_max_concurrency")]
    max_concurrency: usize,
    #[serde(default)]
    excluded_url_terms: Vec<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            recency_window_hours: default_recency_window_hours(),
            similarity_threshold: default_similarity_threshold(),
            recent_window_size: default_recent_window_size(),
            max_concurrency: default_max_concurrency(),
            excluded_url_terms: Vec::new(),
        }
    }
}

fn default_recency_window_hours() -> i64 {
    24
}
fn default_similarity_threshold() -> f32 {
    0.85
}
fn default_recent_window_size() -> usize {
    10
}
fn default_max_concurrency() -> usize {
    20
}

#[derive(Debug, Deserialize)]
struct BotEntry {
    id: String,
    #[serde(default)]
    name: Option<String>,
    source_url: String,
    keywords: Vec<String>,
    #[serde(default)]
    blacklist: Vec<String>,
    #[serde(default)]
    similarity_threshold: Option<f32>,
    #[serde(default)]
    recency_window_hours: Option<i64>,
    #[serde(default)]
    recent_window_size: Option<usize>,
}

impl BotsConfig {
    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading bots config from {}", path.display()))?;
        Self::parse(&content)
    }

    /// Load using env var + fallback:
    /// 1) $BOTS_CONFIG_PATH (must exist if set)
    /// 2) config/bots.toml
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_BOTS_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("BOTS_CONFIG_PATH points to non-existent path"));
        }
        let fallback = PathBuf::from(DEFAULT_BOTS_CONFIG_PATH);
        if fallback.exists() {
            return Self::load_from(&fallback);
        }
        Ok(Self {
            settings: PipelineSettings {
                max_concurrency: default_max_concurrency(),
                excluded_url_terms: Vec::new(),
            },
            bots: Vec::new(),
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: BotsFile = toml::from_str(content).context("parsing bots config toml")?;
        let defaults = file.defaults;

        let mut bots = Vec::with_capacity(file.bots.len());
        for entry in file.bots {
            let threshold = entry
                .similarity_threshold
                .unwrap_or(defaults.similarity_threshold);
            if !(0.0..=1.0).contains(&threshold) || threshold == 0.0 {
                return Err(anyhow!(
                    "bot '{}': similarity_threshold must be in (0, 1], got {threshold}",
                    entry.id
                ));
            }
            let keywords = clean_terms(entry.keywords);
            if keywords.is_empty() {
                return Err(anyhow!("bot '{}': keywords must not be empty", entry.id));
            }

            bots.push(BotProfile {
                name: entry.name.unwrap_or_else(|| entry.id.clone()),
                id: entry.id,
                source_url: entry.source_url,
                keywords,
                blacklist: clean_terms(entry.blacklist),
                similarity_threshold: threshold,
                recency_window_hours: entry
                    .recency_window_hours
                    .unwrap_or(defaults.recency_window_hours)
                    .max(1),
                recent_window_size: entry
                    .recent_window_size
                    .unwrap_or(defaults.recent_window_size)
                    .max(1),
            });
        }

        Ok(Self {
            settings: PipelineSettings {
                max_concurrency: defaults.max_concurrency.max(1),
                excluded_url_terms: clean_terms(defaults.excluded_url_terms),
            },
            bots,
        })
    }

    pub fn bot(&self, id: &str) -> Option<&BotProfile> {
        self.bots.iter().find(|b| b.id == id)
    }
}

/// Trim, drop empties, lowercase, dedup (order-stable).
fn clean_terms(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim().to_lowercase();
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    const SAMPLE: &str = r#"
[defaults]
recency_window_hours = 24
similarity_threshold = 0.85
recent_window_size = 10
max_concurrency = 16
excluded_url_terms = ["/live/", "/video/"]

[[bots]]
id = "tech"
name = "Tech Desk"
source_url = "https://news.example/rss/tech"
keywords = ["AI", " chips ", "ai", ""]
blacklist = ["rumor"]
similarity_threshold = 0.9

[[bots]]
id = "sports"
source_url = "https://news.example/rss/sports"
keywords = ["football"]
"#;

    #[test]
    fn defaults_merge_into_profiles() {
        let cfg = BotsConfig::parse(SAMPLE).unwrap();
        assert_eq!(cfg.settings.max_concurrency, 16);
        assert_eq!(cfg.settings.excluded_url_terms, vec!["/live/", "/video/"]);

        let tech = cfg.bot("tech").unwrap();
        assert_eq!(tech.name, "Tech Desk");
        // cleaned: trimmed, lowercased, deduped, empties dropped
        assert_eq!(tech.keywords, vec!["ai", "chips"]);
        assert_eq!(tech.blacklist, vec!["rumor"]);
        assert!((tech.similarity_threshold - 0.9).abs() < f32::EPSILON);

        let sports = cfg.bot("sports").unwrap();
        assert_eq!(sports.name, "sports");
        assert!((sports.similarity_threshold - 0.85).abs() < f32::EPSILON);
        assert_eq!(sports.recency_window_hours, 24);
        assert_eq!(sports.recent_window_size, 10);
    }

    #[test]
    fn empty_keywords_and_bad_threshold_are_rejected() {
        let no_keywords = r#"
[[bots]]
id = "x"
source_url = "https://news.example/rss"
keywords = ["  "]
"#;
        assert!(BotsConfig::parse(no_keywords).is_err());

        let bad_threshold = r#"
[[bots]]
id = "x"
source_url = "https://news.example/rss"
keywords = ["a"]
similarity_threshold = 1.5
"#;
        assert!(BotsConfig::parse(bad_threshold).is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_path_uses_env_then_fallback() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        env::remove_var(ENV_BOTS_CONFIG_PATH);

        // No files in temp CWD -> empty config
        let cfg = BotsConfig::load_default().unwrap();
        assert!(cfg.bots.is_empty());

        // Env var takes precedence
        let p = tmp.path().join("bots.toml");
        fs::write(&p, SAMPLE).unwrap();
        env::set_var(ENV_BOTS_CONFIG_PATH, p.display().to_string());
        let cfg2 = BotsConfig::load_default().unwrap();
        assert_eq!(cfg2.bots.len(), 2);
        env::remove_var(ENV_BOTS_CONFIG_PATH);

        env::set_current_dir(&old).unwrap();
    }
}

// src/source/rss.rs
//! RSS source reader for Google-News-style topic feeds.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;

use super::{Candidate, SourceReader};
use crate::profile::BotProfile;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

pub struct RssSourceReader {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl RssSourceReader {
    /// Parse candidates from an in-memory feed body (tests, replays).
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    /// Fetch the bot's `source_url` over HTTP on every run.
    pub fn over_http() -> Self {
        let client = reqwest::Client::builder()
            .user_agent("newsbot-pipeline/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client");
        Self {
            mode: Mode::Http { client },
        }
    }

    fn parse_items(bot_id: &str, body: &str) -> Result<Vec<Candidate>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(body);
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            // Items without a link or date cannot pass the first two gates;
            // drop them here rather than manufacture placeholders.
            let (Some(link), Some(pub_date)) = (it.link, it.pub_date) else {
                continue;
            };
            let link = link.trim().to_string();
            if link.is_empty() {
                continue;
            }
            out.push(Candidate {
                raw_link: link,
                published_at: pub_date.trim().to_string(),
                bot_id: bot_id.to_string(),
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("pipeline_source_parse_ms").record(ms);
        counter!("pipeline_source_items_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl SourceReader for RssSourceReader {
    async fn fetch(&self, profile: &BotProfile) -> Result<Vec<Candidate>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items(&profile.id, s),
            Mode::Http { client } => {
                let body = client
                    .get(&profile.source_url)
                    .send()
                    .await
                    .context("rss http get()")?
                    .error_for_status()
                    .context("rss non-2xx")?
                    .text()
                    .await
                    .context("rss http .text()")?;
                Self::parse_items(&profile.id, &body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

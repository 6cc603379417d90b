//! Feed querying with PodcastIndex preference and generic RSS fallback.
//!
//! Lookup order per feed: PodcastIndex by feed id, then by podcast GUID,
//! then by feed URL when credentials are available; finally the feed URL
//! is fetched and parsed directly.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::FeedConfig;

use super::podcastindex::PodcastIndexClient;
use super::{FeedEntry, FeedSource};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Production feed source combining the PodcastIndex API with RSS parsing.
pub struct FeedClient {
    podcastindex: Option<PodcastIndexClient>,
    http: reqwest::Client,
}

impl Default for FeedClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedClient {
    /// Build a client; PodcastIndex lookups are enabled when API
    /// credentials are present in the environment.
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .user_agent("podscribe/1")
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            podcastindex: PodcastIndexClient::from_env(),
            http,
        }
    }

    async fn fetch_rss(&self, url: &str) -> Result<Vec<FeedEntry>> {
        let bytes = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch feed: {}", url))?
            .error_for_status()
            .with_context(|| format!("Feed request rejected: {}", url))?
            .bytes()
            .await
            .with_context(|| format!("Failed to read feed body: {}", url))?;

        let feed = feed_rs::parser::parse(&bytes[..])
            .with_context(|| format!("Failed to parse feed: {}", url))?;

        Ok(feed.entries.into_iter().map(entry_from_rss).collect())
    }
}

fn entry_from_rss(entry: feed_rs::model::Entry) -> FeedEntry {
    let enclosure_url = entry
        .media
        .iter()
        .flat_map(|media| media.content.iter())
        .find_map(|content| content.url.as_ref().map(|u| u.to_string()));

    FeedEntry {
        guid: (!entry.id.is_empty()).then(|| entry.id.clone()),
        title: entry.title.map(|t| t.content),
        link: entry.links.first().map(|l| l.href.clone()),
        enclosure_url,
    }
}

#[async_trait]
impl FeedSource for FeedClient {
    fn name(&self) -> &str {
        "feeds"
    }

    async fn fetch(&self, feed: &FeedConfig) -> Result<Vec<FeedEntry>> {
        if let Some(pi) = &self.podcastindex {
            if let Some(id) = feed.podcastindex_feedid {
                return pi.episodes_by_feed_id(id).await;
            }
            if let Some(guid) = &feed.podcast_guid {
                return pi.episodes_by_podcast_guid(guid).await;
            }
            if let Some(url) = &feed.url {
                match pi.episodes_by_feed_url(url).await {
                    Ok(entries) if !entries.is_empty() => return Ok(entries),
                    Ok(_) => debug!(url = %url, "PodcastIndex returned no items, trying RSS"),
                    Err(err) => {
                        warn!(url = %url, error = %err, "PodcastIndex lookup failed, trying RSS");
                    }
                }
            }
        }

        let Some(url) = &feed.url else {
            bail!(
                "feed '{}' has no URL and PodcastIndex credentials are not configured",
                feed.display_name()
            );
        };

        self.fetch_rss(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rss_entries_map_enclosures() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>T</title>
    <item>
      <guid>g1</guid>
      <title>Episode One</title>
      <link>https://example.com/1</link>
      <enclosure url="https://example.com/1.mp3" type="audio/mpeg" length="1"/>
    </item>
    <item>
      <title>No identifiers</title>
    </item>
  </channel>
</rss>"#;

        let feed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
        let entries: Vec<FeedEntry> = feed.entries.into_iter().map(entry_from_rss).collect();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].guid.as_deref(), Some("g1"));
        assert_eq!(entries[0].title.as_deref(), Some("Episode One"));
        assert_eq!(
            entries[0].enclosure_url.as_deref(),
            Some("https://example.com/1.mp3")
        );
        assert_eq!(entries[1].enclosure_url, None);
    }
}

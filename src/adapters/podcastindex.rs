//! PodcastIndex API client.
//!
//! Episode lookups by feed id, podcast GUID or feed URL. Requests carry
//! the X-Auth-Date/X-Auth-Key headers plus an HMAC-SHA1 signature of
//! `<key><timestamp>` computed with the API secret.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha1::Sha1;

use super::FeedEntry;

type HmacSha1 = Hmac<Sha1>;

const API_BASE: &str = "https://podcastindex.org/api/1.0";
const PAGE_SIZE: &str = "20";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Authenticated PodcastIndex client.
pub struct PodcastIndexClient {
    http: reqwest::Client,
    api_key: String,
    api_secret: String,
}

impl PodcastIndexClient {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("podscribe/1")
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Build a client from `PODCASTINDEX_API_KEY` / `PODCASTINDEX_API_SECRET`,
    /// or `None` when the credentials are not configured.
    pub fn from_env() -> Option<Self> {
        let key = std::env::var("PODCASTINDEX_API_KEY").ok()?;
        let secret = std::env::var("PODCASTINDEX_API_SECRET").ok()?;

        if key.is_empty() || secret.is_empty() {
            return None;
        }

        Some(Self::new(key, secret))
    }

    /// Episodes of a feed identified by its numeric PodcastIndex id.
    pub async fn episodes_by_feed_id(&self, feed_id: u64) -> Result<Vec<FeedEntry>> {
        self.episodes("episodes/byfeedid", &[("id", feed_id.to_string())])
            .await
    }

    /// Episodes of a podcast identified by its GUID.
    pub async fn episodes_by_podcast_guid(&self, guid: &str) -> Result<Vec<FeedEntry>> {
        self.episodes("episodes/bypodcastguid", &[("guid", guid.to_string())])
            .await
    }

    /// Episodes of a feed identified by its URL.
    pub async fn episodes_by_feed_url(&self, url: &str) -> Result<Vec<FeedEntry>> {
        self.episodes("episodes/byfeedurl", &[("url", url.to_string())])
            .await
    }

    async fn episodes(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Vec<FeedEntry>> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&timestamp)?;

        let mut query: Vec<(&str, String)> = params.to_vec();
        query.push(("max", PAGE_SIZE.to_string()));

        let response = self
            .http
            .get(format!("{}/{}", API_BASE, endpoint))
            .query(&query)
            .header("X-Auth-Date", &timestamp)
            .header("X-Auth-Key", &self.api_key)
            .header("Authorization", &signature)
            .send()
            .await
            .with_context(|| format!("PodcastIndex request failed: {}", endpoint))?
            .error_for_status()
            .with_context(|| format!("PodcastIndex rejected request: {}", endpoint))?;

        let body: EpisodesResponse = response
            .json()
            .await
            .context("Failed to parse PodcastIndex response")?;

        Ok(body.items.into_iter().map(FeedEntry::from).collect())
    }

    /// HMAC-SHA1 over `<key><timestamp>`, hex-encoded.
    fn sign(&self, timestamp: &str) -> Result<String> {
        let mut mac = HmacSha1::new_from_slice(self.api_secret.as_bytes())
            .context("Invalid PodcastIndex API secret")?;
        mac.update(self.api_key.as_bytes());
        mac.update(timestamp.as_bytes());

        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[derive(Debug, Deserialize)]
struct EpisodesResponse {
    #[serde(default)]
    items: Vec<ApiEpisode>,
}

#[derive(Debug, Deserialize)]
struct ApiEpisode {
    #[serde(default)]
    id: Option<u64>,

    #[serde(default)]
    guid: Option<String>,

    #[serde(default)]
    title: Option<String>,

    #[serde(default)]
    link: Option<String>,

    #[serde(default, rename = "enclosureUrl", alias = "enclosure_url")]
    enclosure_url: Option<String>,
}

impl From<ApiEpisode> for FeedEntry {
    fn from(ep: ApiEpisode) -> Self {
        FeedEntry {
            guid: ep.id.map(|id| id.to_string()).or(ep.guid),
            title: ep.title,
            link: ep.link,
            enclosure_url: ep.enclosure_url,
        }
    }
}

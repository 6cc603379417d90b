//! Audio source resolution: local paths pass through, URLs download to a
//! temp file owned by the returned [`LocalAudio`].

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::{AudioResolver, LocalAudio};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Resolver that downloads remote audio over HTTP.
pub struct HttpAudioResolver {
    http: reqwest::Client,
}

impl Default for HttpAudioResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpAudioResolver {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .user_agent("podscribe/1")
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self { http }
    }

    async fn download(&self, url: &str) -> Result<LocalAudio> {
        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to download audio: {}", url))?
            .error_for_status()
            .with_context(|| format!("Audio download rejected: {}", url))?;

        let extension = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(extension_for_content_type)
            .unwrap_or("audio");

        let dir = tempfile::tempdir().context("Failed to create temp dir")?;
        let path = dir.path().join(format!("episode.{}", extension));

        let mut file = tokio::fs::File::create(&path)
            .await
            .with_context(|| format!("Failed to create temp file: {}", path.display()))?;

        while let Some(chunk) = response
            .chunk()
            .await
            .with_context(|| format!("Failed while downloading audio: {}", url))?
        {
            file.write_all(&chunk)
                .await
                .context("Failed to write downloaded audio")?;
        }
        file.flush().await.context("Failed to flush downloaded audio")?;

        Ok(LocalAudio::temporary(path, dir))
    }
}

fn is_url(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn extension_for_content_type(content_type: &str) -> &'static str {
    let ct = content_type.to_ascii_lowercase();

    if ct.contains("mpeg") || ct.contains("mp3") {
        "mp3"
    } else if ct.contains("wav") {
        "wav"
    } else if ct.contains("m4a") {
        "m4a"
    } else if ct.contains("aac") {
        "aac"
    } else if ct.contains("ogg") {
        "ogg"
    } else {
        "audio"
    }
}

#[async_trait]
impl AudioResolver for HttpAudioResolver {
    async fn resolve(&self, source: &str) -> Result<LocalAudio> {
        if is_url(source) {
            return self.download(source).await;
        }

        let path = std::path::Path::new(source);
        if !path.exists() {
            bail!("Audio file not found: {}", source);
        }

        Ok(LocalAudio::persistent(path))
    }
}

//! Configuration: job config files, quality profiles, state paths.
//!
//! A job config is a YAML file describing feeds to poll and how to
//! process and deliver what they yield. The parsed snapshot is persisted
//! verbatim inside each job (unknown keys survive via a passthrough map).
//!
//! State directory resolution (highest priority first):
//! 1. `PODSCRIBE_STATE_DIR` environment variable
//! 2. The platform state directory (`~/.local/state` on Linux)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Parsed job configuration. Fields the core never interprets are kept
/// in `extra` so they round-trip through the state file untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Feeds to poll during ingestion
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,

    /// Transcription backend name
    #[serde(default = "default_service")]
    pub service: String,

    /// Quality profile controlling model size and post-processing
    #[serde(default)]
    pub quality: QualityProfile,

    /// Language hint passed to the transcription backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Directory exported documents are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Export format for processed episodes
    #[serde(default)]
    pub format: ExportFormat,

    /// Document author metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Fallback document title when an episode has none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Kindle delivery addresses
    #[serde(default)]
    pub kindle: KindleConfig,

    /// SMTP connection settings (password always comes from the environment)
    #[serde(default)]
    pub smtp: SmtpConfig,

    /// NLP post-processing toggles
    #[serde(default)]
    pub nlp: NlpConfig,

    /// Unrecognized keys, persisted verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            service: default_service(),
            quality: QualityProfile::default(),
            language: None,
            output_dir: default_output_dir(),
            format: ExportFormat::default(),
            author: None,
            title: None,
            kindle: KindleConfig::default(),
            smtp: SmtpConfig::default(),
            nlp: NlpConfig::default(),
            extra: serde_json::Map::new(),
        }
    }
}

fn default_service() -> String {
    "whisper".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./out")
}

/// One feed entry in a job config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Numeric PodcastIndex feed id, preferred over URL lookups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub podcastindex_feedid: Option<u64>,

    /// Podcast GUID for PodcastIndex lookups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub podcast_guid: Option<String>,
}

impl FeedConfig {
    /// Name used for the ledger and episode records: explicit name, else
    /// URL, else a provider identifier, else "feed".
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        if let Some(url) = &self.url {
            return url.clone();
        }
        if let Some(id) = self.podcastindex_feedid {
            return id.to_string();
        }
        if let Some(guid) = &self.podcast_guid {
            return guid.clone();
        }
        "feed".to_string()
    }
}

/// Kindle delivery addresses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KindleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_email: Option<String>,
}

/// SMTP connection settings. The password is never stored here; only the
/// name of the environment variable holding it is configurable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Environment variable to read the password from (default SMTP_PASS)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_env: Option<String>,
}

/// NLP post-processing toggles.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NlpConfig {
    /// Force semantic topic segmentation regardless of quality profile
    #[serde(default)]
    pub semantic: bool,
}

/// Named bundle of transcription and post-processing settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityProfile {
    /// Small model, no diarization, no summary
    #[serde(alias = "fast", alias = "snabb")]
    Quick,

    /// Default model, summary, 10-minute chapters
    #[default]
    Standard,

    /// Largest model, 2-speaker diarization, semantic topic segmentation
    Premium,
}

/// Concrete settings a quality profile expands to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualitySettings {
    pub whisper_model: &'static str,
    pub diarization: u8,
    pub summarize: bool,
    pub chapter_minutes: Option<u32>,
    pub topic_segmentation: bool,
}

impl QualityProfile {
    pub fn settings(self) -> QualitySettings {
        match self {
            Self::Quick => QualitySettings {
                whisper_model: "base",
                diarization: 0,
                summarize: false,
                chapter_minutes: None,
                topic_segmentation: false,
            },
            Self::Standard => QualitySettings {
                whisper_model: "small",
                diarization: 0,
                summarize: true,
                chapter_minutes: Some(10),
                topic_segmentation: false,
            },
            Self::Premium => QualitySettings {
                whisper_model: "large",
                diarization: 2,
                summarize: true,
                chapter_minutes: None,
                topic_segmentation: true,
            },
        }
    }
}

/// Target format for exported documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Txt,

    #[default]
    Md,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Md => "md",
        }
    }
}

/// Load and parse a YAML job config.
pub fn load_job_config(path: &Path) -> Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Directory holding podscribe's persistent state.
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("PODSCRIBE_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }

    let base = dirs::state_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("state")))
        .context("Failed to determine state directory")?;

    Ok(base.join("podscribe"))
}

/// Path of the persisted state document.
pub fn state_path() -> Result<PathBuf> {
    Ok(state_dir()?.join("state.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_quality_profile_table() {
        let quick = QualityProfile::Quick.settings();
        assert_eq!(quick.whisper_model, "base");
        assert!(!quick.summarize);
        assert_eq!(quick.chapter_minutes, None);

        let standard = QualityProfile::Standard.settings();
        assert_eq!(standard.whisper_model, "small");
        assert!(standard.summarize);
        assert_eq!(standard.chapter_minutes, Some(10));
        assert!(!standard.topic_segmentation);

        let premium = QualityProfile::Premium.settings();
        assert_eq!(premium.whisper_model, "large");
        assert_eq!(premium.diarization, 2);
        assert!(premium.topic_segmentation);
    }

    #[test]
    fn test_quality_aliases() {
        let profile: QualityProfile = serde_yaml::from_str("fast").unwrap();
        assert_eq!(profile, QualityProfile::Quick);

        let profile: QualityProfile = serde_yaml::from_str("premium").unwrap();
        assert_eq!(profile, QualityProfile::Premium);
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.yml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
feeds:
  - name: A
    url: https://example.com/feed.xml
quality: premium
output_dir: ./books
kindle:
  to_email: reader@kindle.com
unknown_key: kept
"#
        )
        .unwrap();

        let config = load_job_config(&config_path).unwrap();
        assert_eq!(config.feeds.len(), 1);
        assert_eq!(config.feeds[0].display_name(), "A");
        assert_eq!(config.quality, QualityProfile::Premium);
        assert_eq!(config.service, "whisper");
        assert_eq!(config.output_dir, PathBuf::from("./books"));
        assert_eq!(config.kindle.to_email.as_deref(), Some("reader@kindle.com"));
        assert!(config.extra.contains_key("unknown_key"));
    }

    #[test]
    fn test_feed_display_name_fallbacks() {
        let named = FeedConfig {
            name: Some("My Feed".into()),
            url: Some("https://x/feed".into()),
            ..Default::default()
        };
        assert_eq!(named.display_name(), "My Feed");

        let by_url = FeedConfig {
            url: Some("https://x/feed".into()),
            ..Default::default()
        };
        assert_eq!(by_url.display_name(), "https://x/feed");

        assert_eq!(FeedConfig::default().display_name(), "feed");
    }

    #[test]
    fn test_config_snapshot_round_trips_extra_keys() {
        let yaml = "feeds: []\ncustom: 42\n";
        let config: JobConfig = serde_yaml::from_str(yaml).unwrap();

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["custom"], 42);
    }
}

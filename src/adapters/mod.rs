//! Collaborator interfaces for the external subsystems the pipeline
//! drives: feed sources, audio resolution, transcription, topic
//! segmentation, document export and mail delivery.
//!
//! The coordinators only know these traits; concrete implementations
//! live in the submodules and can be swapped out in tests.

pub mod exporter;
pub mod feed;
pub mod podcastindex;
pub mod resolver;
pub mod smtp;
pub mod whisper;

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;

use crate::config::{ExportFormat, FeedConfig};
use crate::domain::{Chapter, Document};

// Re-export the production implementations
pub use exporter::DocumentExporter;
pub use feed::FeedClient;
pub use podcastindex::PodcastIndexClient;
pub use resolver::HttpAudioResolver;
pub use smtp::LettreMailer;
pub use whisper::WhisperTranscriber;

/// One raw entry returned by a feed source.
#[derive(Debug, Clone, Default)]
pub struct FeedEntry {
    /// Feed-provided stable identifier
    pub guid: Option<String>,

    pub title: Option<String>,

    /// Entry web link
    pub link: Option<String>,

    /// Media enclosure URL
    pub enclosure_url: Option<String>,
}

/// Source of feed entries (indexed API or direct feed parsing).
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Human-readable source name
    fn name(&self) -> &str;

    /// Fetch the current entries for one configured feed.
    async fn fetch(&self, feed: &FeedConfig) -> Result<Vec<FeedEntry>>;
}

/// A resolved local audio file.
///
/// Downloads own their backing temp directory, which is removed when the
/// value is dropped; local paths pass through untouched.
#[derive(Debug)]
pub struct LocalAudio {
    path: PathBuf,
    temp: Option<tempfile::TempDir>,
}

impl LocalAudio {
    /// Wrap an existing local file.
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            temp: None,
        }
    }

    /// Wrap a downloaded file living inside `dir`.
    pub fn temporary(path: impl Into<PathBuf>, dir: tempfile::TempDir) -> Self {
        Self {
            path: path.into(),
            temp: Some(dir),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temp(&self) -> bool {
        self.temp.is_some()
    }
}

/// Turns a URL or local path into a local audio file.
#[async_trait]
pub trait AudioResolver: Send + Sync {
    async fn resolve(&self, source: &str) -> Result<LocalAudio>;
}

/// Options passed to a transcription backend.
#[derive(Debug, Clone)]
pub struct TranscribeOptions {
    /// Model name or size hint
    pub model: String,

    /// Language hint, if configured
    pub language: Option<String>,

    /// Number of speakers for diarization, when supported
    pub speakers: Option<u8>,
}

/// One timestamped transcript span.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Transcription output: full text plus optional timestamped segments.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    pub text: String,
    pub segments: Vec<Segment>,
}

/// Speech-to-text backend.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Backend name (matches the `service` config key)
    fn name(&self) -> &str;

    async fn transcribe(&self, audio: &Path, options: &TranscribeOptions) -> Result<Transcript>;
}

/// Splits transcript text into topical chapters (external NLP).
#[async_trait]
pub trait TopicSegmenter: Send + Sync {
    async fn segment(&self, text: &str) -> Result<Vec<Chapter>>;
}

/// Renders a document to a file in the requested format.
#[async_trait]
pub trait Exporter: Send + Sync {
    async fn export(&self, document: &Document, format: ExportFormat, path: &Path) -> Result<()>;
}

/// SMTP credentials resolved at send time; the password never comes from
/// persisted configuration.
#[derive(Debug, Clone)]
pub struct SmtpCredentials {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

/// One outgoing message with a single file attachment.
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: PathBuf,
}

/// Delivers mail with attachments.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, credentials: &SmtpCredentials, mail: &OutgoingMail) -> Result<()>;
}

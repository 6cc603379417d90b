//! Episode value type and slug derivation.
//!
//! An episode is created once by ingestion and never mutated afterwards;
//! downstream stages only read it (or embed it inside a job).

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One discovered unit of podcast audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Owning feed name
    pub feed: String,

    /// Episode title
    pub title: String,

    /// Filesystem-safe identifier derived from the title
    pub slug: String,

    /// URL or local path of the media
    pub source: String,

    /// Stable identifier: feed-provided id/guid, else the entry link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,

    /// RFC-3339 creation timestamp
    pub created_at: String,

    /// Cached transcript text, when a prior run stored one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

impl Episode {
    /// Create an episode for a feed entry discovered now.
    pub fn new(
        feed: impl Into<String>,
        title: impl Into<String>,
        source: impl Into<String>,
        guid: Option<String>,
    ) -> Self {
        let title = title.into();

        Self {
            feed: feed.into(),
            slug: slugify(&title),
            title,
            source: source.into(),
            guid,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            transcript: None,
        }
    }
}

/// Derive a filesystem-safe slug: lowercased, whitespace and path
/// separators become hyphens, truncated to 40 characters.
pub fn slugify(title: &str) -> String {
    title
        .chars()
        .flat_map(|c| {
            if c.is_whitespace() || c == '/' || c == '\\' {
                vec!['-']
            } else {
                c.to_lowercase().collect()
            }
        })
        .take(40)
        .collect()
}

//! Jobs: one unit of work spanning ingestion through delivery.
//!
//! A job snapshots the configuration it was created with, carries the
//! episodes to process, and accumulates artifacts as processing runs.
//! Status only ever advances `new -> processed -> sent`.

use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JobConfig;

use super::episode::Episode;

/// Processing status of a job. Variant order is the lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created by ingestion, not yet processed
    New,

    /// All episodes transcribed and exported
    Processed,

    /// All artifacts delivered
    Sent,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Processed => "processed",
            Self::Sent => "sent",
        };
        f.write_str(s)
    }
}

/// One processed episode and the document it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// The episode this artifact was produced from
    pub episode: Episode,

    /// Path of the exported document
    pub output: PathBuf,
}

/// A tracked unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier (`job-<uuid>`)
    pub id: String,

    /// RFC-3339 creation timestamp
    pub created_at: String,

    /// Current lifecycle status
    pub status: JobStatus,

    /// Episodes to process, assigned at creation
    #[serde(default)]
    pub episodes: Vec<Episode>,

    /// Configuration snapshot the job was created with
    pub config: JobConfig,

    /// Outputs recorded by processing, in episode order
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

impl Job {
    /// Create a fresh job with no episodes.
    pub fn new(config: JobConfig) -> Self {
        Self {
            id: format!("job-{}", Uuid::new_v4()),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            status: JobStatus::New,
            episodes: Vec::new(),
            config,
            artifacts: Vec::new(),
        }
    }

    /// Creation time, if the stored timestamp parses.
    ///
    /// The timestamp is kept as a string so a mangled value degrades to
    /// "invisible to recency queries" instead of failing the whole store.
    pub fn created_time(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_order_matches_lifecycle() {
        assert!(JobStatus::New < JobStatus::Processed);
        assert!(JobStatus::Processed < JobStatus::Sent);
    }

    #[test]
    fn test_new_job_is_empty_and_new() {
        let job = Job::new(JobConfig::default());

        assert!(job.id.starts_with("job-"));
        assert_eq!(job.status, JobStatus::New);
        assert!(job.episodes.is_empty());
        assert!(job.artifacts.is_empty());
        assert!(job.created_time().is_some());
    }

    #[test]
    fn test_job_ids_are_collision_resistant() {
        let a = Job::new(JobConfig::default());
        let b = Job::new(JobConfig::default());

        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_created_time_rejects_garbage() {
        let mut job = Job::new(JobConfig::default());
        job.created_at = "not-a-timestamp".to_string();

        assert!(job.created_time().is_none());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&JobStatus::Processed).unwrap();
        assert_eq!(json, "\"processed\"");
    }
}

//! Whole-document JSON state store: jobs plus the per-feed seen ledger.
//!
//! The entire state lives in one JSON file. Every mutation rewrites the
//! document before returning, so a completed call is always durable. An
//! unreadable or corrupt file degrades to an empty-but-valid state; write
//! failures propagate as [`StoreError`].
//!
//! Single-writer by assumption: nothing here locks the file. One
//! orchestrator process at a time is an operational constraint, not a
//! software one.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

use crate::config::JobConfig;
use crate::domain::{Episode, Job};

/// Errors raised by state persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to persist state to {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The persisted document: all jobs plus the deduplication ledger.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(default)]
    pub jobs: Vec<Job>,

    /// Per-feed sets of already-ingested episode identifiers
    #[serde(default)]
    pub seen: BTreeMap<String, Vec<String>>,
}

/// File-backed store for jobs and the seen ledger.
pub struct StateStore {
    path: PathBuf,
    state: StateDocument,
}

impl StateStore {
    /// Open a store at the given path, loading existing state.
    ///
    /// A missing, unreadable or unparsable file yields an empty state;
    /// the next successful write replaces it with a valid document.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let state = match fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(state) => state,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "state file corrupt, starting empty");
                    StateDocument::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StateDocument::default(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "state file unreadable, starting empty");
                StateDocument::default()
            }
        };

        Self { path, state }
    }

    /// Open the store at the default per-user state path.
    pub async fn open_default() -> anyhow::Result<Self> {
        Ok(Self::open(crate::config::state_path()?).await)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn jobs(&self) -> &[Job] {
        &self.state.jobs
    }

    /// Rewrite the whole document. Called after every mutation.
    async fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Persistence {
                    path: self.path.clone(),
                    source,
                })?;
        }

        let content = serde_json::to_string_pretty(&self.state)?;
        fs::write(&self.path, content)
            .await
            .map_err(|source| StoreError::Persistence {
                path: self.path.clone(),
                source,
            })?;

        debug!(path = %self.path.display(), jobs = self.state.jobs.len(), "state persisted");
        Ok(())
    }

    /// Create, persist and return a fresh job with no episodes.
    pub async fn create_job(&mut self, config: JobConfig) -> Result<Job, StoreError> {
        self.create_job_with_episodes(config, Vec::new()).await
    }

    /// Create, persist and return a fresh job carrying the given episodes.
    pub async fn create_job_with_episodes(
        &mut self,
        config: JobConfig,
        episodes: Vec<Episode>,
    ) -> Result<Job, StoreError> {
        let mut job = Job::new(config);
        job.episodes = episodes;

        self.state.jobs.push(job.clone());
        self.save().await?;
        Ok(job)
    }

    /// Look up a job by id. Absence is not an error; callers decide.
    pub fn get_job(&self, id: &str) -> Option<&Job> {
        self.state.jobs.iter().find(|j| j.id == id)
    }

    /// Upsert a job by id (replace if present, append if not) and persist.
    pub async fn save_job(&mut self, job: Job) -> Result<(), StoreError> {
        match self.state.jobs.iter_mut().find(|j| j.id == job.id) {
            Some(existing) => *existing = job,
            None => self.state.jobs.push(job),
        }
        self.save().await
    }

    /// Episodes of all jobs created within the last `days` days, in job
    /// order then episode order, optionally filtered to one feed. Jobs
    /// with an unparsable timestamp are skipped.
    pub fn list_recent(&self, days: i64, feed_name: Option<&str>) -> Vec<&Episode> {
        let cutoff = Utc::now() - Duration::days(days);

        self.state
            .jobs
            .iter()
            .filter(|job| matches!(job.created_time(), Some(created) if created >= cutoff))
            .flat_map(|job| job.episodes.iter())
            .filter(|ep| feed_name.map_or(true, |name| ep.feed == name))
            .collect()
    }

    /// Whether `key` was previously recorded for `feed`. Empty or absent
    /// keys are never "seen".
    pub fn has_seen(&self, feed: &str, key: Option<&str>) -> bool {
        let Some(key) = key.filter(|k| !k.is_empty()) else {
            return false;
        };

        self.state
            .seen
            .get(feed)
            .is_some_and(|keys| keys.iter().any(|k| k == key))
    }

    /// Idempotently record `key` under `feed` and persist. A no-op for
    /// empty or absent keys, and for keys already recorded.
    pub async fn mark_seen(&mut self, feed: &str, key: Option<&str>) -> Result<(), StoreError> {
        let Some(key) = key.filter(|k| !k.is_empty()) else {
            return Ok(());
        };

        let keys = self.state.seen.entry(feed.to_string()).or_default();
        if keys.iter().any(|k| k == key) {
            return Ok(());
        }

        keys.push(key.to_string());
        self.save().await
    }
}

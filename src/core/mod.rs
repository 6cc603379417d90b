//! Job coordinators and the pipeline error taxonomy.
//!
//! This module contains:
//! - Ingestion: feed sweep and episode deduplication
//! - Processing: transcription, chapterization and export
//! - Delivery: mailing artifacts
//! - Digest: read-only composition across recent jobs

pub mod delivery;
pub mod digest;
pub mod ingestion;
pub mod processing;

use thiserror::Error;

use crate::store::StoreError;

// Re-export commonly used types
pub use delivery::{DeliveryCoordinator, DeliverySettings};
pub use digest::build_digest;
pub use ingestion::discover_new_episodes;
pub use processing::{bucket_chapters, ProcessingCoordinator};

/// Errors raised by the job coordinators.
#[derive(Debug, Error)]
pub enum JobError {
    /// Unknown job id; a fatal usage error for the caller
    #[error("Unknown job id: {0}")]
    NotFound(String),

    /// A lifecycle or configuration precondition was not met
    #[error("{0}")]
    Precondition(String),

    /// The state file could not be persisted
    #[error("State persistence failed: {0}")]
    Persistence(#[from] StoreError),

    /// A collaborator (feed, transcriber, exporter, mailer) failed
    #[error("{context}: {source}")]
    Collaborator {
        context: String,
        #[source]
        source: anyhow::Error,
    },
}

impl JobError {
    pub(crate) fn collaborator(context: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Collaborator {
            context: context.into(),
            source,
        }
    }
}

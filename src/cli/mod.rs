//! Command-line interface for podscribe.
//!
//! Job-oriented commands: discover episodes into a job, process a job,
//! mail its artifacts, run the whole chain, compose digests and list
//! tracked jobs.

use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use crate::adapters::{
    DocumentExporter, Exporter, FeedClient, HttpAudioResolver, LettreMailer, Transcriber,
    WhisperTranscriber,
};
use crate::config::{self, ExportFormat};
use crate::core::{
    build_digest, discover_new_episodes, DeliveryCoordinator, JobError, ProcessingCoordinator,
};
use crate::domain::{Document, Job};
use crate::store::StateStore;

/// podscribe - podcast ingestion, transcription and Kindle delivery
#[derive(Parser, Debug)]
#[command(name = "podscribe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover new episodes and create a job
    Ingest {
        /// Path to a YAML job config
        #[arg(short, long)]
        config: PathBuf,

        /// Limit ingestion to one feed name
        #[arg(short, long)]
        feed: Option<String>,
    },

    /// Transcribe a job's episodes and export documents
    Process {
        /// Job id (as printed by ingest)
        #[arg(long)]
        job_id: String,

        /// Enable semantic topic segmentation for this run
        #[arg(long)]
        semantic: bool,
    },

    /// Email a job's artifacts
    Send {
        /// Job id
        #[arg(long)]
        job_id: String,
    },

    /// Ingest, process and send in one go
    Run {
        /// Path to a YAML job config
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Build a digest document from recently processed episodes
    Digest {
        /// Limit the digest to one feed name
        #[arg(short, long)]
        feed: Option<String>,

        /// Recency window in days
        #[arg(long, default_value = "7")]
        days: i64,
    },

    /// List tracked jobs
    Jobs {
        /// Maximum number of jobs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Ingest { config, feed } => ingest(&config, feed.as_deref()).await,
            Commands::Process { job_id, semantic } => {
                let job = process(&job_id, semantic).await?;
                for artifact in &job.artifacts {
                    println!("{}", artifact.output.display());
                }
                Ok(())
            }
            Commands::Send { job_id } => {
                let job = send(&job_id).await?;
                for artifact in &job.artifacts {
                    println!("{}", artifact.output.display());
                }
                Ok(())
            }
            Commands::Run { config } => run(&config).await,
            Commands::Digest { feed, days } => digest(feed.as_deref(), days).await,
            Commands::Jobs { limit } => list_jobs(limit).await,
        }
    }
}

/// Pick a transcription backend by config name.
fn transcriber_for(service: &str) -> Result<Box<dyn Transcriber>> {
    match service.to_lowercase().as_str() {
        "whisper" => Ok(Box::new(WhisperTranscriber::new())),
        other => bail!("Unknown transcription service: {}", other),
    }
}

async fn ingest(config_path: &std::path::Path, feed_filter: Option<&str>) -> Result<()> {
    let config = config::load_job_config(config_path)?;
    let mut store = StateStore::open_default().await?;
    let source = FeedClient::new();

    let mut episodes = discover_new_episodes(&config, &mut store, &source).await?;
    if let Some(feed) = feed_filter {
        episodes.retain(|e| e.feed == feed);
    }

    if episodes.is_empty() {
        println!("No new episodes discovered.");
        return Ok(());
    }

    let job = store.create_job_with_episodes(config, episodes).await?;
    // Emit the job id for chaining into process/send
    println!("{}", job.id);
    Ok(())
}

async fn process(job_id: &str, semantic: bool) -> Result<Job> {
    let mut store = StateStore::open_default().await?;

    let service = store
        .get_job(job_id)
        .map(|job| job.config.service.clone())
        .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

    let coordinator = ProcessingCoordinator::new(
        Box::new(HttpAudioResolver::new()),
        transcriber_for(&service)?,
        Box::new(DocumentExporter::new()),
    )
    .force_semantic(semantic);

    Ok(coordinator.process_job(&mut store, job_id).await?)
}

async fn send(job_id: &str) -> Result<Job> {
    let mut store = StateStore::open_default().await?;
    let coordinator = DeliveryCoordinator::new(Box::new(LettreMailer::new()));

    Ok(coordinator.send_job(&mut store, job_id).await?)
}

async fn run(config_path: &std::path::Path) -> Result<()> {
    let config = config::load_job_config(config_path)?;
    let mut store = StateStore::open_default().await?;
    let source = FeedClient::new();

    let episodes = discover_new_episodes(&config, &mut store, &source).await?;
    if episodes.is_empty() {
        println!("No new episodes discovered.");
        return Ok(());
    }

    let job = store.create_job_with_episodes(config, episodes).await?;
    println!("{}", job.id);

    let job = process(&job.id, false).await?;
    let job = send(&job.id).await?;

    for artifact in &job.artifacts {
        println!("{}", artifact.output.display());
    }
    Ok(())
}

async fn digest(feed: Option<&str>, days: i64) -> Result<()> {
    let store = StateStore::open_default().await?;

    let chapters = build_digest(&store, days, feed);
    if chapters.is_empty() {
        println!("No recent episodes found for digest.");
        return Ok(());
    }

    let title = format!("{} Weekly Digest", feed.unwrap_or("Podcast"));
    let document = Document::new(title, chapters);

    let out_path = PathBuf::from("./out").join(format!("digest-{}.md", Utc::now().date_naive()));
    DocumentExporter::new()
        .export(&document, ExportFormat::Md, &out_path)
        .await?;

    println!("{}", out_path.display());
    Ok(())
}

async fn list_jobs(limit: usize) -> Result<()> {
    let store = StateStore::open_default().await?;

    if store.jobs().is_empty() {
        println!("No jobs tracked.");
        return Ok(());
    }

    for job in store.jobs().iter().rev().take(limit) {
        println!(
            "{}  {:<9}  {}  {} episode(s)",
            job.id,
            job.status.to_string(),
            job.created_at,
            job.episodes.len()
        );
    }
    Ok(())
}

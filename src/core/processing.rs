//! Job processing: transcribe each episode, assemble a chaptered
//! document and export it.
//!
//! Chapter policy, in order of preference:
//! 1. Semantic topic segments, when enabled and a segmenter is available
//! 2. Time/size bucketing of timestamped segments, when the profile sets
//!    a chapter length
//! 3. The whole transcript as a single chapter

use tracing::{info, instrument, warn};

use crate::adapters::{
    AudioResolver, Exporter, Segment, TopicSegmenter, TranscribeOptions, Transcriber,
};
use crate::config::{JobConfig, QualitySettings};
use crate::domain::{Artifact, Chapter, Document, Episode, Job, JobStatus};
use crate::store::StateStore;
use crate::text::{normalize_text, summarize_text};

use super::JobError;

/// Character budget per chapter when bucketing by time.
const CHAPTER_CHAR_LIMIT: usize = 4000;

/// Sentence budget for extractive summaries.
const SUMMARY_SENTENCES: usize = 6;

/// Drives resolve -> transcribe -> chapterize -> export for every
/// episode of a job, then marks the job processed.
pub struct ProcessingCoordinator {
    resolver: Box<dyn AudioResolver>,
    transcriber: Box<dyn Transcriber>,
    segmenter: Option<Box<dyn TopicSegmenter>>,
    exporter: Box<dyn Exporter>,
    force_semantic: bool,
}

impl ProcessingCoordinator {
    pub fn new(
        resolver: Box<dyn AudioResolver>,
        transcriber: Box<dyn Transcriber>,
        exporter: Box<dyn Exporter>,
    ) -> Self {
        Self {
            resolver,
            transcriber,
            segmenter: None,
            exporter,
            force_semantic: false,
        }
    }

    /// Attach a topic segmenter used for semantic chapterization.
    pub fn with_segmenter(mut self, segmenter: Box<dyn TopicSegmenter>) -> Self {
        self.segmenter = Some(segmenter);
        self
    }

    /// Enable semantic segmentation for this run regardless of the job's
    /// quality profile.
    pub fn force_semantic(mut self, force: bool) -> Self {
        self.force_semantic = force;
        self
    }

    /// Process every episode of the job, in order. A single episode
    /// failure aborts the whole call; re-running rebuilds the artifact
    /// list from scratch, overwriting prior outputs rather than
    /// appending to them.
    #[instrument(skip(self, store))]
    pub async fn process_job(&self, store: &mut StateStore, job_id: &str) -> Result<Job, JobError> {
        let mut job = store
            .get_job(job_id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

        if job.status == JobStatus::Sent {
            return Err(JobError::Precondition(format!(
                "Job {} was already sent; status cannot move backwards",
                job.id
            )));
        }

        let settings = job.config.quality.settings();
        info!(
            episodes = job.episodes.len(),
            model = settings.whisper_model,
            "processing job"
        );

        let mut artifacts = Vec::with_capacity(job.episodes.len());
        for episode in &job.episodes {
            let artifact = self.process_episode(episode, &job.config, &settings).await?;
            artifacts.push(artifact);
        }

        job.artifacts = artifacts;
        job.status = JobStatus::Processed;
        store.save_job(job.clone()).await?;

        Ok(job)
    }

    #[instrument(skip_all, fields(episode = %episode.slug))]
    async fn process_episode(
        &self,
        episode: &Episode,
        config: &JobConfig,
        settings: &QualitySettings,
    ) -> Result<Artifact, JobError> {
        let audio = self
            .resolver
            .resolve(&episode.source)
            .await
            .map_err(|e| JobError::collaborator(format!("Failed to resolve audio for '{}'", episode.title), e))?;

        let options = TranscribeOptions {
            model: settings.whisper_model.to_string(),
            language: config.language.clone(),
            speakers: (settings.diarization > 0).then_some(settings.diarization),
        };

        let transcript = self
            .transcriber
            .transcribe(audio.path(), &options)
            .await
            .map_err(|e| JobError::collaborator(format!("Transcription failed for '{}'", episode.title), e))?;

        let text = normalize_text(&transcript.text);
        let summary = if settings.summarize {
            summarize_text(&text, SUMMARY_SENTENCES)
        } else {
            None
        };

        let chapters = self
            .build_chapters(episode, &text, &transcript.segments, settings, config)
            .await;

        let title = if episode.title.is_empty() {
            config.title.clone().unwrap_or_else(|| "Podcast Transcript".to_string())
        } else {
            episode.title.clone()
        };

        let document = Document::new(title, chapters)
            .with_author(config.author.clone())
            .with_summary(summary);

        let stem = if episode.slug.is_empty() {
            "episode".to_string()
        } else {
            episode.slug.clone()
        };
        let output = config
            .output_dir
            .join(format!("{}.{}", stem, config.format.extension()));

        self.exporter
            .export(&document, config.format, &output)
            .await
            .map_err(|e| JobError::collaborator(format!("Export failed for '{}'", episode.title), e))?;

        Ok(Artifact {
            episode: episode.clone(),
            output,
        })
    }

    async fn build_chapters(
        &self,
        episode: &Episode,
        text: &str,
        segments: &[Segment],
        settings: &QualitySettings,
        config: &JobConfig,
    ) -> Vec<Chapter> {
        let want_semantic =
            settings.topic_segmentation || config.nlp.semantic || self.force_semantic;

        if want_semantic {
            match &self.segmenter {
                Some(segmenter) => match segmenter.segment(text).await {
                    Ok(chapters) if !chapters.is_empty() => return chapters,
                    Ok(_) => {}
                    Err(err) => {
                        warn!(error = %err, "topic segmentation failed, falling back");
                    }
                },
                None => warn!("semantic segmentation requested but no segmenter configured"),
            }
        }

        if let Some(minutes) = settings.chapter_minutes {
            if !segments.is_empty() {
                return bucket_chapters(segments, minutes);
            }
        }

        let title = if episode.title.is_empty() {
            "Transcript".to_string()
        } else {
            episode.title.clone()
        };
        vec![Chapter::new(title, text.to_string())]
    }
}

/// Greedily accumulate timestamped segments into chapters. A chapter
/// closes when the elapsed time since its first segment reaches the
/// minute threshold, or its text exceeds [`CHAPTER_CHAR_LIMIT`],
/// whichever comes first; the segment that crossed the limit stays in
/// the chapter it closed. A trailing partial bucket becomes the final
/// chapter.
pub fn bucket_chapters(segments: &[Segment], minutes: u32) -> Vec<Chapter> {
    let max_seconds = f64::from(minutes) * 60.0;

    let mut chapters = Vec::new();
    let mut bucket: Vec<&str> = Vec::new();
    let mut bucket_chars = 0usize;
    let mut start_time: Option<f64> = None;

    for segment in segments {
        let started = *start_time.get_or_insert(segment.start);
        bucket.push(segment.text.as_str());
        bucket_chars += segment.text.len();

        if segment.end - started >= max_seconds || bucket_chars > CHAPTER_CHAR_LIMIT {
            chapters.push(Chapter::new(
                format!("Chapter {}", chapters.len() + 1),
                bucket.join(" "),
            ));
            bucket.clear();
            bucket_chars = 0;
            start_time = None;
        }
    }

    if !bucket.is_empty() {
        chapters.push(Chapter::new(
            format!("Chapter {}", chapters.len() + 1),
            bucket.join(" "),
        ));
    }

    chapters
}

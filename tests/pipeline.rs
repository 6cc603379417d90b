//! End-to-end pipeline tests
//!
//! Drive ingest -> process -> send -> digest against a real on-disk
//! store with stubbed collaborators.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use podscribe::adapters::{
    AudioResolver, DocumentExporter, FeedEntry, FeedSource, LocalAudio, MailSender, OutgoingMail,
    SmtpCredentials, Transcriber, TranscribeOptions, Transcript,
};
use podscribe::config::{FeedConfig, JobConfig, KindleConfig, SmtpConfig};
use podscribe::core::{build_digest, discover_new_episodes, DeliveryCoordinator, ProcessingCoordinator};
use podscribe::domain::JobStatus;
use podscribe::store::StateStore;
use podscribe::JobError;

struct StubFeeds;

#[async_trait]
impl FeedSource for StubFeeds {
    fn name(&self) -> &str {
        "stub"
    }

    async fn fetch(&self, _feed: &FeedConfig) -> Result<Vec<FeedEntry>> {
        Ok(vec![
            FeedEntry {
                guid: Some("g1".to_string()),
                title: Some("First Episode".to_string()),
                link: Some("https://example.com/1".to_string()),
                enclosure_url: Some("https://example.com/1.mp3".to_string()),
            },
            FeedEntry {
                guid: Some("g2".to_string()),
                title: Some("Second Episode".to_string()),
                link: Some("https://example.com/2".to_string()),
                enclosure_url: Some("https://example.com/2.mp3".to_string()),
            },
        ])
    }
}

struct StubResolver;

#[async_trait]
impl AudioResolver for StubResolver {
    async fn resolve(&self, _source: &str) -> Result<LocalAudio> {
        Ok(LocalAudio::persistent("/tmp/episode.mp3"))
    }
}

struct StubTranscriber;

#[async_trait]
impl Transcriber for StubTranscriber {
    fn name(&self) -> &str {
        "stub"
    }

    async fn transcribe(&self, _audio: &std::path::Path, _options: &TranscribeOptions) -> Result<Transcript> {
        Ok(Transcript {
            text: "Hello world.".to_string(),
            segments: Vec::new(),
        })
    }
}

#[derive(Clone, Default)]
struct RecordingMailer {
    sent: Arc<Mutex<Vec<PathBuf>>>,
}

#[async_trait]
impl MailSender for RecordingMailer {
    async fn send(&self, _credentials: &SmtpCredentials, mail: &OutgoingMail) -> Result<()> {
        self.sent.lock().unwrap().push(mail.attachment.clone());
        Ok(())
    }
}

fn pipeline_config(out_dir: &std::path::Path, pass_env: &str) -> JobConfig {
    JobConfig {
        feeds: vec![FeedConfig {
            name: Some("A".to_string()),
            url: Some("https://example.com/feed.xml".to_string()),
            ..Default::default()
        }],
        output_dir: out_dir.to_path_buf(),
        kindle: KindleConfig {
            to_email: Some("reader@kindle.com".to_string()),
            from_email: Some("sender@example.com".to_string()),
        },
        smtp: SmtpConfig {
            host: Some("smtp.example.com".to_string()),
            port: Some(2525),
            user: Some("sender".to_string()),
            pass_env: Some(pass_env.to_string()),
        },
        ..Default::default()
    }
}

fn processing() -> ProcessingCoordinator {
    ProcessingCoordinator::new(
        Box::new(StubResolver),
        Box::new(StubTranscriber),
        Box::new(DocumentExporter::new()),
    )
}

#[tokio::test]
async fn test_ingest_process_send_digest() {
    std::env::set_var("PODSCRIBE_E2E_SMTP_PASS", "hunter2");

    let temp = TempDir::new().unwrap();
    let out_dir = temp.path().join("out");
    let mut store = StateStore::open(temp.path().join("state.json")).await;
    let config = pipeline_config(&out_dir, "PODSCRIBE_E2E_SMTP_PASS");

    // Ingest: two new episodes become a job.
    let episodes = discover_new_episodes(&config, &mut store, &StubFeeds)
        .await
        .unwrap();
    assert_eq!(episodes.len(), 2);

    let job = store
        .create_job_with_episodes(config, episodes)
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::New);

    // Sending before processing is a precondition error.
    let mailer = RecordingMailer::default();
    let delivery = DeliveryCoordinator::new(Box::new(mailer.clone()));
    let err = delivery.send_job(&mut store, &job.id).await.unwrap_err();
    assert!(matches!(err, JobError::Precondition(_)));

    // Process: one artifact per episode, in episode order.
    let job = processing().process_job(&mut store, &job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Processed);
    assert_eq!(job.artifacts.len(), 2);
    assert_eq!(job.artifacts[0].episode.slug, "first-episode");
    assert_eq!(job.artifacts[1].episode.slug, "second-episode");

    for artifact in &job.artifacts {
        let content = tokio::fs::read_to_string(&artifact.output).await.unwrap();
        assert!(content.contains("Hello world."));
    }

    // Send: all artifacts mailed, then status advances.
    let job = delivery.send_job(&mut store, &job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Sent);

    let sent = mailer.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], job.artifacts[0].output);
    assert_eq!(sent[1], job.artifacts[1].output);

    // Digest: one chapter per recent episode, titles preserved.
    let chapters = build_digest(&store, 7, None);
    assert_eq!(chapters.len(), 2);
    assert_eq!(chapters[0].title, "First Episode");
    assert_eq!(chapters[1].title, "Second Episode");

    // The whole state survives a reload.
    let reloaded = StateStore::open(store.path().to_path_buf()).await;
    assert_eq!(reloaded.get_job(&job.id).unwrap().status, JobStatus::Sent);
}

#[tokio::test]
async fn test_second_sweep_discovers_nothing() {
    let temp = TempDir::new().unwrap();
    let mut store = StateStore::open(temp.path().join("state.json")).await;
    let config = pipeline_config(&temp.path().join("out"), "PODSCRIBE_SWEEP_SMTP_PASS");

    let first = discover_new_episodes(&config, &mut store, &StubFeeds)
        .await
        .unwrap();
    assert_eq!(first.len(), 2);

    let second = discover_new_episodes(&config, &mut store, &StubFeeds)
        .await
        .unwrap();
    assert!(second.is_empty());
}

#[tokio::test]
async fn test_reprocessing_replaces_artifacts() {
    let temp = TempDir::new().unwrap();
    let mut store = StateStore::open(temp.path().join("state.json")).await;
    let config = pipeline_config(&temp.path().join("out"), "PODSCRIBE_REPROC_SMTP_PASS");

    let episodes = discover_new_episodes(&config, &mut store, &StubFeeds)
        .await
        .unwrap();
    let job = store
        .create_job_with_episodes(config, episodes)
        .await
        .unwrap();

    let coordinator = processing();
    coordinator.process_job(&mut store, &job.id).await.unwrap();
    let job = coordinator.process_job(&mut store, &job.id).await.unwrap();

    // Re-running rebuilds the list instead of appending to it.
    assert_eq!(job.artifacts.len(), 2);
}

#[tokio::test]
async fn test_unknown_job_id_is_not_found() {
    let temp = TempDir::new().unwrap();
    let mut store = StateStore::open(temp.path().join("state.json")).await;

    let err = processing()
        .process_job(&mut store, "job-missing")
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::NotFound(_)));

    let delivery = DeliveryCoordinator::new(Box::new(RecordingMailer::default()));
    let err = delivery.send_job(&mut store, "job-missing").await.unwrap_err();
    assert!(matches!(err, JobError::NotFound(_)));
}

#[tokio::test]
async fn test_status_never_moves_backwards() {
    std::env::set_var("PODSCRIBE_MONO_SMTP_PASS", "hunter2");

    let temp = TempDir::new().unwrap();
    let mut store = StateStore::open(temp.path().join("state.json")).await;
    let config = pipeline_config(&temp.path().join("out"), "PODSCRIBE_MONO_SMTP_PASS");

    let episodes = discover_new_episodes(&config, &mut store, &StubFeeds)
        .await
        .unwrap();
    let job = store
        .create_job_with_episodes(config, episodes)
        .await
        .unwrap();

    let coordinator = processing();
    coordinator.process_job(&mut store, &job.id).await.unwrap();

    let delivery = DeliveryCoordinator::new(Box::new(RecordingMailer::default()));
    delivery.send_job(&mut store, &job.id).await.unwrap();

    // A sent job cannot be processed back to `processed`.
    let err = coordinator.process_job(&mut store, &job.id).await.unwrap_err();
    assert!(matches!(err, JobError::Precondition(_)));
}

#[tokio::test]
async fn test_failed_transcription_aborts_job_without_status_change() {
    struct FailingTranscriber;

    #[async_trait]
    impl Transcriber for FailingTranscriber {
        fn name(&self) -> &str {
            "failing"
        }

        async fn transcribe(
            &self,
            _audio: &std::path::Path,
            _options: &TranscribeOptions,
        ) -> Result<Transcript> {
            anyhow::bail!("model exploded")
        }
    }

    let temp = TempDir::new().unwrap();
    let mut store = StateStore::open(temp.path().join("state.json")).await;
    let config = pipeline_config(&temp.path().join("out"), "PODSCRIBE_FAIL_SMTP_PASS");

    let episodes = discover_new_episodes(&config, &mut store, &StubFeeds)
        .await
        .unwrap();
    let job = store
        .create_job_with_episodes(config, episodes)
        .await
        .unwrap();

    let coordinator = ProcessingCoordinator::new(
        Box::new(StubResolver),
        Box::new(FailingTranscriber),
        Box::new(DocumentExporter::new()),
    );
    let err = coordinator.process_job(&mut store, &job.id).await.unwrap_err();
    assert!(matches!(err, JobError::Collaborator { .. }));

    // Nothing was committed: the job is still new with no artifacts.
    let job = store.get_job(&job.id).unwrap();
    assert_eq!(job.status, JobStatus::New);
    assert!(job.artifacts.is_empty());
}

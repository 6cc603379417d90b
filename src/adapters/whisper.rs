//! Local Whisper transcription backend.
//!
//! Shells out to a whisper binary and reads its JSON output, including
//! per-segment timestamps used for chapter bucketing.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use super::{Segment, Transcriber, TranscribeOptions, Transcript};

/// Transcriber using a local Whisper install.
pub struct WhisperTranscriber {
    /// Path to the whisper binary (default: "whisper", override with WHISPER_PATH)
    binary_path: String,
}

impl Default for WhisperTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl WhisperTranscriber {
    pub fn new() -> Self {
        let binary_path =
            std::env::var("WHISPER_PATH").unwrap_or_else(|_| "whisper".to_string());

        Self { binary_path }
    }

    pub fn with_binary_path(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }
}

/// Whisper output JSON structure
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    text: String,

    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    #[serde(default)]
    start: f64,

    #[serde(default)]
    end: f64,

    #[serde(default)]
    text: String,
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    fn name(&self) -> &str {
        "whisper"
    }

    async fn transcribe(&self, audio: &Path, options: &TranscribeOptions) -> Result<Transcript> {
        // Diarization is a cloud-backend feature; whisper has no flag for it.
        if options.speakers.is_some() {
            debug!("speaker diarization requested but unsupported by whisper, ignoring");
        }

        let temp_dir = tempfile::tempdir().context("Failed to create temp dir")?;

        let mut command = Command::new(&self.binary_path);
        command
            .arg(audio)
            .arg("--model")
            .arg(&options.model)
            .arg("--output_dir")
            .arg(temp_dir.path())
            .arg("--output_format")
            .arg("json")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(language) = &options.language {
            command.arg("--language").arg(language);
        }

        let output = command.output().await.context("Failed to run whisper")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Whisper failed: {}", stderr.trim());
        }

        // Whisper writes <audio stem>.json into the output directory
        let stem = audio.file_stem().unwrap_or_default().to_string_lossy();
        let json_path = temp_dir.path().join(format!("{}.json", stem));

        let json_content = tokio::fs::read_to_string(&json_path)
            .await
            .context("Failed to read whisper output")?;

        let whisper: WhisperOutput =
            serde_json::from_str(&json_content).context("Failed to parse whisper JSON")?;

        let segments = whisper
            .segments
            .into_iter()
            .map(|s| Segment {
                start: s.start,
                end: s.end,
                text: s.text.trim().to_string(),
            })
            .collect();

        Ok(Transcript {
            text: whisper.text.trim().to_string(),
            segments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whisper_output_parsing() {
        let json = r#"{
            "text": " Hello world. ",
            "segments": [
                {"start": 0.0, "end": 2.5, "text": " Hello"},
                {"start": 2.5, "end": 4.0, "text": " world."}
            ]
        }"#;

        let parsed: WhisperOutput = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.text.trim(), "Hello world.");
        assert_eq!(parsed.segments.len(), 2);
        assert_eq!(parsed.segments[1].end, 4.0);
    }

    #[test]
    fn test_whisper_output_without_segments() {
        let parsed: WhisperOutput = serde_json::from_str(r#"{"text": "hi"}"#).unwrap();
        assert!(parsed.segments.is_empty());
    }
}

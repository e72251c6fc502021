//! Speech recognition sources.
//!
//! A `TranscriptionSource` turns one capture session into a finite sequence
//! of final transcripts. Sessions are restartable: every `start` opens a new
//! one.

pub mod backend;
pub mod capture;
pub mod cloud;
pub mod ring_buffer;
pub mod vad;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;

use crate::api::{Backend, CommandReply};
use crate::config::VoiceConfig;

/// Capture/session errors, mapped to distinct user messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoiceError {
    #[error("no speech detected")]
    NoSpeech,
    #[error("audio capture unavailable: {0}")]
    AudioCapture(String),
    #[error("speech recognition is not supported")]
    Unsupported,
    #[error("transcription failed: {0}")]
    Transcription(String),
    #[error("{0}")]
    Other(String),
}

/// One final transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub text: String,
    /// The backend's reply when the source already ran `text` as a command.
    pub reply: Option<CommandReply>,
}

impl From<String> for Transcript {
    fn from(text: String) -> Self {
        Self { text, reply: None }
    }
}

impl From<&str> for Transcript {
    fn from(text: &str) -> Self {
        Self::from(text.to_string())
    }
}

pub type TranscriptResult = Result<Transcript, VoiceError>;

/// Common trait for speech recognition sources (dyn-compatible).
pub trait TranscriptionSource: Send + Sync {
    /// Begin a capture session.
    ///
    /// Errors returned here mean the session never started. Otherwise the
    /// receiver yields final transcripts or session errors and closes when
    /// the session ends.
    fn start(&self) -> Result<mpsc::Receiver<TranscriptResult>, VoiceError>;

    /// Display name (e.g. "Microphone + OpenAI Whisper").
    fn name(&self) -> String;
}

/// Records one phrase from the microphone and transcribes it in the cloud.
pub struct MicTranscriber {
    stt: Arc<cloud::CloudStt>,
    device: Option<String>,
    listen_timeout: Duration,
    phrase_limit: Duration,
}

impl MicTranscriber {
    pub fn new(stt: cloud::CloudStt, config: &VoiceConfig) -> Self {
        Self {
            stt: Arc::new(stt),
            device: config.input_device.clone(),
            listen_timeout: Duration::from_secs(config.listen_timeout_secs.max(1)),
            phrase_limit: Duration::from_secs(config.phrase_time_limit_secs.max(1)),
        }
    }
}

impl TranscriptionSource for MicTranscriber {
    /// Never blocks: opening the device happens on the capture thread, so
    /// a missing microphone arrives as a session error.
    fn start(&self) -> Result<mpsc::Receiver<TranscriptResult>, VoiceError> {
        let (tx, rx) = mpsc::channel(1);
        let stt = Arc::clone(&self.stt);
        let device = self.device.clone();
        let listen_timeout = self.listen_timeout;
        let phrase_limit = self.phrase_limit;

        tokio::spawn(async move {
            let recorded = tokio::task::spawn_blocking(move || {
                capture::record_phrase(device.as_deref(), listen_timeout, phrase_limit)
            })
            .await
            .unwrap_or_else(|e| Err(VoiceError::Other(format!("capture thread failed: {}", e))));

            let result = match recorded {
                Ok(audio) => stt
                    .transcribe(&audio, capture::TARGET_SAMPLE_RATE)
                    .await
                    .map(Transcript::from),
                Err(e) => Err(e),
            };
            let _ = tx.send(result).await;
        });

        Ok(rx)
    }

    fn name(&self) -> String {
        format!("Microphone + {}", self.stt.endpoint())
    }
}

/// Create a transcription source from config values.
///
/// `stt_adapter` is one of: "none", "backend", "openai-cloud",
/// "custom-cloud". "none" yields `Ok(None)`: recognition is unavailable on
/// this host. "backend" records on the assistant server's microphone.
pub fn create_transcription_source(
    config: &VoiceConfig,
    api: Arc<dyn Backend>,
) -> anyhow::Result<Option<Arc<dyn TranscriptionSource>>> {
    let stt = match config.stt_adapter.as_str() {
        "none" => return Ok(None),
        "backend" => {
            let source = backend::BackendTranscriber::new(api, config);
            info!(source = %source.name(), "Speech recognition configured");
            return Ok(Some(Arc::new(source)));
        }
        "openai-cloud" => {
            let key = config
                .stt_api_key
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("OpenAI STT requires an API key"))?;
            cloud::CloudStt::openai(key)
        }
        "custom-cloud" => {
            let url = config
                .stt_endpoint
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("Custom STT requires an endpoint URL"))?;
            cloud::CloudStt::custom(url, config.stt_api_key.clone())
        }
        other => anyhow::bail!("Unknown STT adapter: {}", other),
    };

    let source = MicTranscriber::new(stt, config);
    info!(source = %source.name(), "Speech recognition configured");
    Ok(Some(Arc::new(source)))
}

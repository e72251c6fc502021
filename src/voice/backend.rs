//! Recognition on the assistant server's own microphone via `POST /listen`.
//!
//! The backend runs the heard text as a command before answering, so every
//! transcript from this source carries its reply and must not be sent to
//! `/process` again.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use super::{Transcript, TranscriptResult, TranscriptionSource, VoiceError};
use crate::api::{Backend, CommandReply, ListenOptions, ListenReply};
use crate::config::VoiceConfig;

pub struct BackendTranscriber {
    api: Arc<dyn Backend>,
    options: ListenOptions,
}

impl BackendTranscriber {
    pub fn new(api: Arc<dyn Backend>, config: &VoiceConfig) -> Self {
        Self {
            api,
            options: ListenOptions {
                timeout: config.listen_timeout_secs.max(1),
                phrase_time_limit: config.phrase_time_limit_secs.max(1),
            },
        }
    }
}

impl TranscriptionSource for BackendTranscriber {
    fn start(&self) -> Result<mpsc::Receiver<TranscriptResult>, VoiceError> {
        let (tx, rx) = mpsc::channel(1);
        let api = Arc::clone(&self.api);
        let options = self.options;

        tokio::spawn(async move {
            let result = match api.listen(options).await {
                Ok(reply) => interpret(reply),
                Err(e) => Err(VoiceError::Transcription(e.to_string())),
            };
            let _ = tx.send(result).await;
        });

        Ok(rx)
    }

    fn name(&self) -> String {
        "Assistant server microphone".to_string()
    }
}

/// Map a `/listen` answer onto a session result. The backend reports
/// recognition failures as `"ERROR: <reason>"`.
fn interpret(reply: ListenReply) -> TranscriptResult {
    if !reply.success {
        let raw = reply.error.unwrap_or_else(|| "listening failed".to_string());
        let reason = raw.strip_prefix("ERROR:").unwrap_or(&raw).trim();
        debug!(reason, "Backend listen failed");
        let lower = reason.to_lowercase();
        if lower.contains("no speech") || lower.contains("could not understand") {
            return Err(VoiceError::NoSpeech);
        }
        if lower.contains("microphone") {
            return Err(VoiceError::AudioCapture(reason.to_string()));
        }
        return Err(VoiceError::Transcription(reason.to_string()));
    }

    let text = reply.command.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(VoiceError::NoSpeech);
    }
    Ok(Transcript {
        text,
        reply: Some(CommandReply {
            success: true,
            response: reply.response,
            error: None,
        }),
    })
}

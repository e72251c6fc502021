//! Speech output adapters.
//!
//! Provides a common `SpeechSink` trait with implementations for:
//! - The host's speech command (`say`, `espeak`, PowerShell System.Speech)
//! - The assistant server's own speech output (`POST /speak`)
//! - OpenAI TTS API with local playback
//! - A silent sink that only logs

pub mod backend;
pub mod cloud;
pub mod playback;
pub mod system;

use std::sync::Arc;

use tracing::info;

use crate::api::Backend;
use crate::config::SpeechConfig;

/// Common trait for all speech outputs (dyn-compatible).
///
/// At most one utterance is active: `speak` cancels whatever is currently
/// being spoken before starting the new text. `speak` returns once the
/// utterance has started, not when it finishes.
pub trait SpeechSink: Send + Sync {
    fn speak(&self, text: &str);

    /// Interrupt the current utterance, if any.
    fn stop(&self);

    /// Display name for this sink (e.g. "System (espeak)").
    fn name(&self) -> String;
}

/// Sink used when speech output is disabled.
#[derive(Debug, Default)]
pub struct SilentSpeech;

impl SpeechSink for SilentSpeech {
    fn speak(&self, text: &str) {
        info!(text_len = text.len(), "Speech output disabled, not speaking");
    }

    fn stop(&self) {}

    fn name(&self) -> String {
        "None".to_string()
    }
}

/// Create a speech sink from config values.
///
/// `tts_adapter` is one of: "none", "system", "backend", "openai-tts".
pub fn create_speech_sink(config: &SpeechConfig, api: Arc<dyn Backend>) -> anyhow::Result<Arc<dyn SpeechSink>> {
    match config.tts_adapter.as_str() {
        "none" => Ok(Arc::new(SilentSpeech)),
        "system" => {
            let voice = config.tts_voice.as_deref();
            Ok(Arc::new(match config.tts_command.as_deref() {
                Some(program) => system::SystemSpeech::with_program(program, voice),
                None => system::SystemSpeech::new(voice),
            }))
        }
        "backend" => Ok(Arc::new(backend::BackendSpeech::new(api))),
        "openai-tts" => {
            let key = config
                .tts_api_key
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("OpenAI TTS requires an API key"))?;
            let voice = config.tts_voice.as_deref().unwrap_or("alloy");
            let player = playback::PlaybackHandle::spawn(config.tts_volume.unwrap_or(1.0))?;
            Ok(Arc::new(cloud::CloudSpeech::new(cloud::OpenAiTts::new(key, voice), player)))
        }
        other => anyhow::bail!("Unknown TTS adapter: {}", other),
    }
}

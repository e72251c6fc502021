//! Cloud speech output: OpenAI TTS synthesis played through the local
//! output device.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::playback::PlaybackHandle;
use super::SpeechSink;

/// Text to mono f32 samples.
pub trait Synthesizer: Send + Sync {
    fn synthesize<'a>(&'a self, text: &'a str) -> BoxFuture<'a, anyhow::Result<Vec<f32>>>;

    /// Sample rate of the synthesized audio.
    fn sample_rate(&self) -> u32;

    fn voice(&self) -> &str;
}

/// Where synthesized samples are played.
pub trait AudioOutput: Send + Sync {
    /// Replace whatever is playing.
    fn play(&self, samples: Vec<f32>, sample_rate: u32);

    fn stop(&self);
}

/// Sample rate of OpenAI's raw `pcm` response format.
const OPENAI_PCM_RATE: u32 = 24_000;

/// OpenAI TTS: cloud synthesis via REST API.
///
/// POST `https://api.openai.com/v1/audio/speech`
/// Body: `{"model": "tts-1", "input": "text", "voice": "alloy"}`
pub struct OpenAiTts {
    api_key: String,
    voice: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiTts {
    pub fn new(api_key: &str, voice: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            voice: voice.to_string(),
            model: "tts-1".to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Synthesize text to 24 kHz mono f32 samples.
    async fn request(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        info!(voice = %self.voice, text_len = text.len(), "OpenAI TTS request");

        let body = serde_json::json!({
            "model": self.model,
            "input": text,
            "voice": self.voice,
            "response_format": "pcm",
        });

        let resp = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("OpenAI TTS request failed: {}", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI TTS API error {}: {}", status, body);
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read OpenAI TTS response: {}", e))?;

        Ok(pcm16_to_f32(&bytes))
    }
}

impl Synthesizer for OpenAiTts {
    fn synthesize<'a>(&'a self, text: &'a str) -> BoxFuture<'a, anyhow::Result<Vec<f32>>> {
        Box::pin(self.request(text))
    }

    fn sample_rate(&self) -> u32 {
        OPENAI_PCM_RATE
    }

    fn voice(&self) -> &str {
        &self.voice
    }
}

/// Convert little-endian 16-bit PCM to f32 samples. A trailing odd byte is
/// dropped.
fn pcm16_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]) as f32 / 32768.0)
        .collect()
}

/// Speech sink that synthesizes in the cloud and plays locally.
///
/// Each `speak` bumps a generation counter and aborts the previous
/// synthesis task; a synthesis that finishes after being superseded is
/// discarded instead of played.
pub struct CloudSpeech {
    tts: Arc<dyn Synthesizer>,
    player: Arc<dyn AudioOutput>,
    generation: Arc<AtomicU64>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CloudSpeech {
    pub fn new(tts: OpenAiTts, player: PlaybackHandle) -> Self {
        Self::with_parts(Arc::new(tts), Arc::new(player))
    }

    pub fn with_parts(tts: Arc<dyn Synthesizer>, player: Arc<dyn AudioOutput>) -> Self {
        Self {
            tts,
            player,
            generation: Arc::new(AtomicU64::new(0)),
            task: Mutex::new(None),
        }
    }
}

impl SpeechSink for CloudSpeech {
    fn speak(&self, text: &str) {
        self.stop();
        if text.trim().is_empty() {
            return;
        }

        let my_generation = self.generation.load(Ordering::SeqCst);
        let generation = Arc::clone(&self.generation);
        let tts = Arc::clone(&self.tts);
        let player = Arc::clone(&self.player);
        let text = text.to_string();

        let handle = tokio::spawn(async move {
            match tts.synthesize(&text).await {
                Ok(samples) => {
                    if generation.load(Ordering::SeqCst) == my_generation {
                        player.play(samples, tts.sample_rate());
                    } else {
                        debug!("Discarding superseded utterance");
                    }
                }
                Err(e) => warn!("Speech synthesis failed: {}", e),
            }
        });

        *self.task.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            task.abort();
        }
        self.player.stop();
    }

    fn name(&self) -> String {
        format!("OpenAI TTS ({})", self.tts.voice())
    }
}

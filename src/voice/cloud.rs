//! Cloud transcription: OpenAI Whisper API or a custom Whisper-compatible
//! endpoint.

use reqwest::multipart;
use tracing::debug;

use super::VoiceError;

const OPENAI_TRANSCRIPTIONS_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Encode f32 audio samples as 16-bit PCM mono WAV bytes.
pub(crate) fn encode_wav(audio: &[f32], sample_rate: u32) -> Vec<u8> {
    let num_samples = audio.len() as u32;
    let bytes_per_sample: u16 = 2;
    let num_channels: u16 = 1;
    let data_size = num_samples * bytes_per_sample as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt sub-chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&num_channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    let byte_rate = sample_rate * num_channels as u32 * bytes_per_sample as u32;
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    let block_align = num_channels * bytes_per_sample;
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&(bytes_per_sample * 8).to_le_bytes());

    // data sub-chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in audio {
        let pcm = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        buf.extend_from_slice(&pcm.to_le_bytes());
    }

    buf
}

/// Whisper-compatible transcription client.
pub struct CloudStt {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl CloudStt {
    pub fn openai(api_key: &str) -> Self {
        Self {
            endpoint: OPENAI_TRANSCRIPTIONS_URL.to_string(),
            api_key: Some(api_key.to_string()),
            client: reqwest::Client::new(),
        }
    }

    pub fn custom(endpoint: &str, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Transcribe 16 kHz mono f32 audio to text.
    pub async fn transcribe(&self, audio: &[f32], sample_rate: u32) -> Result<String, VoiceError> {
        let wav = encode_wav(audio, sample_rate);
        debug!(bytes = wav.len(), endpoint = %self.endpoint, "Sending audio for transcription");

        let file_part = multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoiceError::Transcription(e.to_string()))?;

        let form = multipart::Form::new()
            .text("model", "whisper-1")
            .part("file", file_part);

        let mut req = self.client.post(&self.endpoint).multipart(form);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| VoiceError::Transcription(format!("request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(VoiceError::Transcription(format!("STT API error {}: {}", status, body)));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| VoiceError::Transcription(format!("invalid response: {}", e)))?;

        Ok(json["text"].as_str().unwrap_or("").trim().to_string())
    }
}

//! Microphone capture via cpal.
//!
//! Opens the default (or named) input device, resamples to 16 kHz mono f32,
//! and records one phrase gated by `vad::PhraseGate`. Everything here is
//! blocking and must run off the async runtime; the cpal stream never
//! leaves the calling thread.

use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use tracing::{debug, error, info};

use super::ring_buffer::audio_ring_buffer;
use super::vad::{GateState, PhraseGate};
use super::VoiceError;

/// Target sample rate for transcription.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// How often the capture loop drains the ring buffer.
const DRAIN_INTERVAL: Duration = Duration::from_millis(50);

/// Find the input device by name, or the system default.
fn resolve_device(device_name: Option<&str>) -> Result<cpal::Device, VoiceError> {
    let host = cpal::default_host();
    match device_name {
        Some(name) => host
            .input_devices()
            .map_err(|e| VoiceError::AudioCapture(format!("Failed to enumerate input devices: {e}")))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| VoiceError::AudioCapture(format!("Input device not found: {name}"))),
        None => host
            .default_input_device()
            .ok_or_else(|| VoiceError::AudioCapture("No default input device available".to_string())),
    }
}

/// Simple linear resampler from `from_rate` to `to_rate` (mono).
pub(crate) fn resample_linear(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return input.to_vec();
    }
    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((input.len() as f64) / ratio).floor() as usize;
    let mut output = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src_idx = i as f64 * ratio;
        let idx0 = src_idx.floor() as usize;
        let frac = (src_idx - idx0 as f64) as f32;
        let s0 = input.get(idx0).copied().unwrap_or(0.0);
        let s1 = input.get(idx0 + 1).copied().unwrap_or(s0);
        output.push(s0 + frac * (s1 - s0));
    }
    output
}

/// Down-mix multi-channel audio to mono by averaging channels.
pub(crate) fn to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let ch = channels as usize;
    samples
        .chunks_exact(ch)
        .map(|frame| frame.iter().sum::<f32>() / ch as f32)
        .collect()
}

/// Record one spoken phrase as 16 kHz mono samples.
///
/// Returns `VoiceError::NoSpeech` when nothing loud enough arrives within
/// `listen_timeout`.
pub fn record_phrase(
    device_name: Option<&str>,
    listen_timeout: Duration,
    phrase_limit: Duration,
) -> Result<Vec<f32>, VoiceError> {
    let device = resolve_device(device_name)?;
    let dev_name = device.name().unwrap_or_else(|_| "unknown".into());

    let default_config = device
        .default_input_config()
        .map_err(|e| VoiceError::AudioCapture(format!("Failed to get default input config: {e}")))?;
    let native_rate = default_config.sample_rate().0;
    let channels = default_config.channels();
    let stream_config = StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(native_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    info!(device = %dev_name, native_rate, channels, "Opening input device");

    let (mut producer, mut consumer) = audio_ring_buffer(None);
    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                let mono = to_mono(data, channels);
                let resampled = resample_linear(&mono, native_rate, TARGET_SAMPLE_RATE);
                // Ring buffer full: newest audio is lost, the loop will catch up.
                let _ = producer.push_slice(&resampled);
            },
            move |err| {
                error!("Audio input stream error: {}", err);
            },
            None,
        )
        .map_err(|e| VoiceError::AudioCapture(format!("Failed to build input stream: {e}")))?;

    stream
        .play()
        .map_err(|e| VoiceError::AudioCapture(format!("Failed to start input stream: {e}")))?;

    let mut gate = PhraseGate::new(TARGET_SAMPLE_RATE, listen_timeout, phrase_limit);
    let mut starved = Duration::ZERO;
    loop {
        thread::sleep(DRAIN_INTERVAL);
        let chunk = consumer.drain_all();
        if chunk.is_empty() {
            starved += DRAIN_INTERVAL;
            if starved >= listen_timeout {
                return Err(VoiceError::AudioCapture("Input device delivered no audio".to_string()));
            }
            continue;
        }
        starved = Duration::ZERO;
        match gate.feed(&chunk) {
            GateState::Waiting | GateState::Speaking => {}
            GateState::Done => break,
            GateState::TimedOut => return Err(VoiceError::NoSpeech),
        }
    }
    drop(stream);

    let phrase = gate.into_phrase();
    debug!(samples = phrase.len(), "Phrase captured");
    Ok(phrase)
}

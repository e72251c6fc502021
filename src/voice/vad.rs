//! Energy-based voice activity gate.
//!
//! Uses mean absolute amplitude as a simple energy metric and decides when
//! a spoken phrase has started and ended.

use std::time::Duration;

/// Mean absolute amplitude above which a chunk counts as speech.
pub const SPEECH_THRESHOLD: f32 = 0.015;

/// Trailing silence that ends a phrase.
pub const END_SILENCE: Duration = Duration::from_millis(900);

/// Compute the energy level of an audio chunk.
pub fn energy(chunk: &[f32]) -> f32 {
    if chunk.is_empty() {
        return 0.0;
    }
    let sum: f32 = chunk.iter().map(|s| s.abs()).sum();
    sum / chunk.len() as f32
}

/// Where the gate is after a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Still waiting for the first speech chunk.
    Waiting,
    /// Inside a phrase.
    Speaking,
    /// Phrase ended (trailing silence or time limit).
    Done,
    /// No speech before the listen timeout.
    TimedOut,
}

/// Tracks one phrase. Time is measured in samples so the gate is
/// deterministic and testable without a clock.
#[derive(Debug)]
pub struct PhraseGate {
    sample_rate: u32,
    listen_timeout: Duration,
    phrase_limit: Duration,
    waited: u64,
    spoken: u64,
    silence: u64,
    state: GateState,
    phrase: Vec<f32>,
}

impl PhraseGate {
    pub fn new(sample_rate: u32, listen_timeout: Duration, phrase_limit: Duration) -> Self {
        Self {
            sample_rate,
            listen_timeout,
            phrase_limit,
            waited: 0,
            spoken: 0,
            silence: 0,
            state: GateState::Waiting,
            phrase: Vec::new(),
        }
    }

    fn samples_for(&self, d: Duration) -> u64 {
        (d.as_secs_f64() * self.sample_rate as f64) as u64
    }

    /// Feed one chunk of mono samples and return the new state.
    pub fn feed(&mut self, chunk: &[f32]) -> GateState {
        let n = chunk.len() as u64;
        let loud = energy(chunk) >= SPEECH_THRESHOLD;

        match self.state {
            GateState::Waiting => {
                if loud {
                    self.state = GateState::Speaking;
                    self.phrase.extend_from_slice(chunk);
                    self.spoken = n;
                } else {
                    self.waited += n;
                    if self.waited >= self.samples_for(self.listen_timeout) {
                        self.state = GateState::TimedOut;
                    }
                }
            }
            GateState::Speaking => {
                self.phrase.extend_from_slice(chunk);
                self.spoken += n;
                self.silence = if loud { 0 } else { self.silence + n };
                if self.silence >= self.samples_for(END_SILENCE)
                    || self.spoken >= self.samples_for(self.phrase_limit)
                {
                    self.state = GateState::Done;
                }
            }
            GateState::Done | GateState::TimedOut => {}
        }
        self.state
    }

    /// Take the captured phrase audio.
    pub fn into_phrase(self) -> Vec<f32> {
        self.phrase
    }
}

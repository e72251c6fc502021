//! Audio playback via rodio.
//!
//! rodio's output stream cannot leave the thread that opened it, so a
//! dedicated playback thread owns the device and takes commands over a
//! channel. Each utterance gets a fresh `Sink`; starting one stops the
//! previous sink.

use std::sync::mpsc;
use std::thread;

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};
use tracing::{debug, info, warn};

use super::cloud::AudioOutput;

enum PlaybackCommand {
    Play { samples: Vec<f32>, sample_rate: u32 },
    Stop,
}

/// Handle to the playback thread. Dropping every handle ends the thread.
#[derive(Clone)]
pub struct PlaybackHandle {
    tx: mpsc::Sender<PlaybackCommand>,
}

impl PlaybackHandle {
    /// Open the default audio output device on a new thread.
    pub fn spawn(volume: f32) -> anyhow::Result<Self> {
        let (tx, rx) = mpsc::channel::<PlaybackCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();
        let volume = volume.clamp(0.0, 1.0);

        thread::Builder::new()
            .name("speech-playback".into())
            .spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => {
                        let _ = ready_tx.send(Ok(()));
                        pair
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(format!("Failed to open audio output: {}", e)));
                        return;
                    }
                };

                let mut current: Option<Sink> = None;
                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        PlaybackCommand::Play { samples, sample_rate } => {
                            if let Some(previous) = current.take() {
                                previous.stop();
                            }
                            match Sink::try_new(&handle) {
                                Ok(sink) => {
                                    sink.set_volume(volume);
                                    debug!(samples = samples.len(), sample_rate, "Playing utterance");
                                    sink.append(SamplesBuffer::new(1, sample_rate, samples));
                                    current = Some(sink);
                                }
                                Err(e) => warn!("Failed to create audio sink: {}", e),
                            }
                        }
                        PlaybackCommand::Stop => {
                            if let Some(previous) = current.take() {
                                previous.stop();
                            }
                        }
                    }
                }
                debug!("Playback thread exiting");
            })
            .map_err(|e| anyhow::anyhow!("Failed to spawn playback thread: {}", e))?;

        ready_rx
            .recv()
            .map_err(|_| anyhow::anyhow!("Playback thread exited during startup"))?
            .map_err(|e| anyhow::anyhow!(e))?;

        info!(volume, "Audio playback ready");
        Ok(Self { tx })
    }
}

impl AudioOutput for PlaybackHandle {
    /// Replace whatever is playing with these mono samples.
    fn play(&self, samples: Vec<f32>, sample_rate: u32) {
        if samples.is_empty() {
            return;
        }
        if self.tx.send(PlaybackCommand::Play { samples, sample_rate }).is_err() {
            warn!("Playback thread is gone, dropping utterance");
        }
    }

    fn stop(&self) {
        let _ = self.tx.send(PlaybackCommand::Stop);
    }
}

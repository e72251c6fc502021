//! Voice capture adapter.
//!
//! Drives one `TranscriptionSource` session at a time. The `listening` flag
//! guards re-entry independently of the dispatcher's `processing` flag.

use tracing::{info, warn};

use super::notify::{render_stats, set_busy, toast};
use super::{AppEvent, Context};
use crate::state::AppState;
use crate::ui::{Severity, UiEvent};
use crate::voice::{Transcript, TranscriptResult, VoiceError};

pub struct VoiceAdapter {
    ctx: Context,
}

impl VoiceAdapter {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    pub fn start_listening(&self, state: &mut AppState) {
        let Some(source) = self.ctx.transcriber.clone() else {
            toast(
                &self.ctx,
                state,
                "Speech recognition is not available on this system",
                Severity::Error,
            );
            return;
        };
        if !state.is_connected() {
            toast(&self.ctx, state, "Not connected to the assistant", Severity::Error);
            return;
        }
        if state.listening {
            toast(&self.ctx, state, "Already listening", Severity::Error);
            return;
        }

        state.listening = true;
        self.ctx.show(UiEvent::Listening { active: true });
        set_busy(&self.ctx, state, true);

        match source.start() {
            Ok(mut results) => {
                info!(source = %source.name(), "Listening");
                let ctx = self.ctx.clone();
                tokio::spawn(async move {
                    while let Some(result) = results.recv().await {
                        ctx.post(AppEvent::Transcript(result));
                    }
                    ctx.post(AppEvent::ListeningEnded);
                });
            }
            Err(e) => {
                warn!("Could not start voice capture: {}", e);
                state.listening = false;
                self.ctx.show(UiEvent::Listening { active: false });
                let keep_busy = state.processing;
                set_busy(&self.ctx, state, keep_busy);
                toast(
                    &self.ctx,
                    state,
                    format!("Could not start voice recognition: {}", e),
                    Severity::Error,
                );
            }
        }
    }

    /// Apply one session result. Returns a non-empty transcript for the
    /// caller to dispatch; nothing is rendered or counted for it yet.
    pub fn on_transcript(&self, state: &mut AppState, result: TranscriptResult) -> Option<Transcript> {
        let keep_busy = state.processing;
        set_busy(&self.ctx, state, keep_busy);

        match result {
            Ok(transcript) => {
                let text = transcript.text.trim().to_string();
                if text.is_empty() {
                    toast(
                        &self.ctx,
                        state,
                        "I didn't catch that. Please try again.",
                        Severity::Warning,
                    );
                    return None;
                }
                Some(Transcript {
                    text,
                    reply: transcript.reply,
                })
            }
            Err(e) => {
                warn!("Voice recognition failed: {}", e);
                let (message, severity) = match &e {
                    VoiceError::NoSpeech => (
                        "No speech detected. Please try again.".to_string(),
                        Severity::Warning,
                    ),
                    VoiceError::AudioCapture(_) => (
                        "Microphone not available. Check your audio device.".to_string(),
                        Severity::Warning,
                    ),
                    other => (format!("Voice recognition error: {}", other), Severity::Error),
                };
                toast(&self.ctx, state, message, severity);
                None
            }
        }
    }

    /// Render a transcript that is going to the backend and count it.
    pub fn record_turn(&self, state: &mut AppState, text: &str) {
        self.ctx.show(UiEvent::UserTurn { text: text.to_string() });
        state.stats.message_count += 1;
        state.stats.voice_count += 1;
        render_stats(&self.ctx, state);
    }

    /// Session over, whatever the outcome.
    pub fn on_end(&self, state: &mut AppState) {
        state.listening = false;
        self.ctx.show(UiEvent::Listening { active: false });
        let keep_busy = state.processing;
        set_busy(&self.ctx, state, keep_busy);
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::state::Stats;
    use crate::ui::UiCommand;

    fn ended(e: &AppEvent) -> bool {
        matches!(e, AppEvent::ListeningEnded)
    }

    #[tokio::test]
    async fn test_voice_command_scenario() {
        let transcript = "set a reminder in 2 minutes to stretch";
        let mut h = Harness::with_transcriber(FakeTranscriber::with_session(vec![Ok(transcript.into())]))
            .connected();
        h.backend.set_reply(crate::api::CommandReply::ok("Reminder set for 5:02 PM."));

        h.app.handle_command(UiCommand::StartListening {});
        assert!(h.app.state.listening);
        assert_eq!(h.view.last_busy(), Some(true));

        h.app.pump_until(|e| matches!(e, AppEvent::CommandFinished { .. })).await;
        assert_eq!(h.backend.calls_to("process"), 1);
        assert!(h.backend.calls().contains(&format!("process:{}", transcript)));
        assert_eq!(
            h.app.state.stats,
            Stats {
                message_count: 1,
                voice_count: 1
            }
        );
        assert_eq!(h.speech.spoken(), vec!["Reminder set for 5:02 PM."]);
        assert_eq!(h.app.state.conversation.len(), 1);
        assert_eq!(h.view.count(|e| matches!(e, UiEvent::UserTurn { .. })), 1);
    }

    #[tokio::test]
    async fn test_transcript_that_cannot_be_sent_is_not_counted() {
        let mut h = Harness::with_transcriber(FakeTranscriber::default()).connected();
        h.app.state.processing = true;
        h.app.handle_event(AppEvent::Transcript(Ok("what time is it".into())));

        h.app.state.processing = false;
        h.app.state.connection.connected = false;
        h.app.handle_event(AppEvent::Transcript(Ok("what time is it".into())));

        assert_eq!(h.view.count(|e| matches!(e, UiEvent::UserTurn { .. })), 0);
        assert_eq!(h.app.state.stats, Stats::default());
        assert!(h.backend.calls().is_empty());
        assert_eq!(h.view.toasts(Severity::Error), vec!["Not connected to the assistant"]);
    }

    #[tokio::test]
    async fn test_transcript_answered_by_backend_is_not_resent() {
        let mut h = Harness::with_transcriber(FakeTranscriber::default()).connected();
        h.app.state.processing = true;
        h.app.handle_event(AppEvent::Transcript(Ok(Transcript {
            text: "what time is it".into(),
            reply: Some(crate::api::CommandReply::ok("It is 5 PM.")),
        })));

        assert!(h.backend.calls().is_empty());
        assert!(h.app.state.processing, "typed command still in flight");
        assert_eq!(
            h.app.state.stats,
            Stats {
                message_count: 1,
                voice_count: 1
            }
        );
        assert_eq!(h.app.state.conversation.len(), 1);
        assert_eq!(h.speech.spoken(), vec!["It is 5 PM."]);
    }

    #[tokio::test]
    async fn test_session_end_clears_listening_and_busy() {
        let mut h = Harness::with_transcriber(FakeTranscriber::with_session(vec![Err(VoiceError::NoSpeech)]))
            .connected();
        h.app.handle_command(UiCommand::StartListening {});
        h.app.pump_until(ended).await;

        assert!(!h.app.state.listening && !h.app.state.busy);
        assert_eq!(h.view.last_busy(), Some(false));
        assert_eq!(
            h.view.toasts(Severity::Warning),
            vec!["No speech detected. Please try again."]
        );
        assert!(h.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let mut h = Harness::with_transcriber(FakeTranscriber::default()).connected();
        h.app.voice.on_transcript(&mut h.app.state, Err(VoiceError::AudioCapture("denied".into())));
        h.app.voice.on_transcript(&mut h.app.state, Err(VoiceError::Transcription("HTTP 500".into())));
        h.app.voice.on_transcript(&mut h.app.state, Ok("   ".into()));

        assert_eq!(
            h.view.toasts(Severity::Warning),
            vec![
                "Microphone not available. Check your audio device.",
                "I didn't catch that. Please try again."
            ]
        );
        assert_eq!(
            h.view.toasts(Severity::Error),
            vec!["Voice recognition error: transcription failed: HTTP 500"]
        );
        assert_eq!(h.app.state.stats, Stats::default());
    }

    #[tokio::test]
    async fn test_start_failure_cleans_up() {
        let transcriber = FakeTranscriber::default();
        transcriber.push_session(Err(VoiceError::AudioCapture("no device".into())));
        let mut h = Harness::with_transcriber(transcriber).connected();

        h.app.handle_command(UiCommand::StartListening {});
        assert!(!h.app.state.listening && !h.app.state.busy);
        assert_eq!(h.view.last_busy(), Some(false));
        assert_eq!(h.view.toasts(Severity::Error).len(), 1);
    }

    #[tokio::test]
    async fn test_reentry_and_preconditions() {
        let mut h = Harness::new().connected();
        h.app.handle_command(UiCommand::StartListening {});
        assert_eq!(
            h.view.toasts(Severity::Error),
            vec!["Speech recognition is not available on this system"]
        );

        let mut h = Harness::with_transcriber(FakeTranscriber::with_session(vec![]));
        h.app.handle_command(UiCommand::StartListening {});
        assert_eq!(h.transcriber.starts(), 0);
        assert_eq!(h.view.toasts(Severity::Error).len(), 1);

        let mut h = Harness::with_transcriber(FakeTranscriber::with_session(vec![])).connected();
        h.app.handle_command(UiCommand::StartListening {});
        h.app.handle_command(UiCommand::StartListening {});
        assert_eq!(h.transcriber.starts(), 1);
        assert_eq!(h.view.toasts(Severity::Error), vec!["Already listening"]);
        h.app.pump_until(ended).await;
        assert!(!h.app.state.listening);
    }
}

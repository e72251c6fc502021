//! Command dispatcher: one `/process` round-trip per accepted command.
//!
//! At most one command is in flight. A submission made while the
//! `processing` flag is set is dropped, not queued.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::notify::{render_stats, set_busy, speak, toast};
use super::{AppEvent, Context};
use crate::api::{pair_history, ApiError, CommandReply, HistoryEntry};
use crate::state::{AppState, ConversationTurn};
use crate::ui::{Severity, UiEvent};

const TRANSPORT_FAILURE_REPLY: &str =
    "Sorry, I couldn't reach the assistant. Please check your connection and try again.";

/// Where a command came from. Voice commands are counted and rendered by
/// the voice adapter, and their replies are spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOrigin {
    Typed,
    Voice,
}

pub struct Dispatcher {
    ctx: Context,
}

impl Dispatcher {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Submit typed text.
    pub fn submit(&self, state: &mut AppState, text: &str) {
        if text.trim().is_empty() {
            toast(&self.ctx, state, "Please enter a command", Severity::Warning);
            return;
        }
        if !self.accepts(state) {
            return;
        }
        self.ctx.show(UiEvent::UserTurn { text: text.to_string() });
        self.begin(state, text, CommandOrigin::Typed);
    }

    /// Submit a transcript the voice adapter has already rendered and
    /// counted. Check `accepts` before rendering it.
    pub fn dispatch_voice(&self, state: &mut AppState, text: &str) {
        if self.accepts(state) {
            self.begin(state, text, CommandOrigin::Voice);
        }
    }

    /// Whether a new command may go out now. Raises the error toast when
    /// disconnected; a command already in flight drops it silently.
    pub fn accepts(&self, state: &mut AppState) -> bool {
        if !state.is_connected() {
            toast(&self.ctx, state, "Not connected to the assistant", Severity::Error);
            return false;
        }
        if state.processing {
            debug!("Command already in flight, dropping submission");
            return false;
        }
        true
    }

    fn begin(&self, state: &mut AppState, text: &str, origin: CommandOrigin) {
        state.processing = true;
        set_busy(&self.ctx, state, true);

        let api = Arc::clone(&self.ctx.api);
        let command = text.to_string();
        info!(?origin, "Sending command");
        self.ctx.spawn(async move {
            let result = api.process(&command).await;
            AppEvent::CommandFinished {
                command,
                origin,
                result,
            }
        });
    }

    pub fn on_reply(
        &self,
        state: &mut AppState,
        command: &str,
        origin: CommandOrigin,
        result: Result<CommandReply, ApiError>,
    ) {
        state.processing = false;
        let keep_busy = state.listening;
        set_busy(&self.ctx, state, keep_busy);
        self.render_reply(state, command, origin, result);
    }

    /// A voice command the backend heard and ran itself. Nothing was sent
    /// from here, so the in-flight flag is left alone.
    pub fn on_voice_answered(&self, state: &mut AppState, command: &str, reply: CommandReply) {
        let keep_busy = state.processing || state.listening;
        set_busy(&self.ctx, state, keep_busy);
        self.render_reply(state, command, CommandOrigin::Voice, Ok(reply));
    }

    fn render_reply(
        &self,
        state: &mut AppState,
        command: &str,
        origin: CommandOrigin,
        result: Result<CommandReply, ApiError>,
    ) {
        match result {
            Ok(reply) if reply.success => {
                let text = reply.response.unwrap_or_default();
                self.ctx.show(UiEvent::AssistantTurn {
                    text: text.clone(),
                    error: false,
                });
                state.conversation.push(ConversationTurn::new(command, &text));
                if origin == CommandOrigin::Typed {
                    state.stats.message_count += 1;
                }
                render_stats(&self.ctx, state);

                if origin == CommandOrigin::Voice && !text.trim().is_empty() {
                    speak(&self.ctx, &text);
                }
                if command.to_lowercase().contains("remind") {
                    self.ctx
                        .post_after(self.ctx.timings.reminder_nudge, AppEvent::RefreshReminders);
                }
            }
            Ok(reply) => {
                let text = match reply.error.as_deref() {
                    Some(reason) => format!("Sorry, I couldn't process that: {}", reason),
                    None => "Sorry, I couldn't process that request.".to_string(),
                };
                self.ctx.show(UiEvent::AssistantTurn { text, error: true });
                let reason = reply.error.unwrap_or_else(|| "Command failed".to_string());
                toast(&self.ctx, state, reason, Severity::Error);
            }
            Err(e) => {
                warn!("Command failed: {}", e);
                self.ctx.show(UiEvent::AssistantTurn {
                    text: TRANSPORT_FAILURE_REPLY.to_string(),
                    error: true,
                });
                toast(&self.ctx, state, format!("Connection error: {}", e), Severity::Error);
            }
        }
    }

    /// Fill an empty conversation log from the backend's history.
    pub fn load_history(&self, state: &AppState) {
        if !state.conversation.is_empty() {
            return;
        }
        let api = Arc::clone(&self.ctx.api);
        self.ctx
            .spawn(async move { AppEvent::HistoryLoaded(api.history().await) });
    }

    /// Restored turns are rendered but not counted. Skipped when the user
    /// has started talking in the meantime.
    pub fn on_history_loaded(&self, state: &mut AppState, result: Result<Vec<HistoryEntry>, ApiError>) {
        let entries = match result {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Could not load conversation history: {}", e);
                return;
            }
        };
        if !state.conversation.is_empty() || state.processing {
            debug!("Conversation already started, not restoring history");
            return;
        }
        let pairs = pair_history(&entries);
        for (command, reply) in &pairs {
            self.ctx.show(UiEvent::UserTurn { text: command.clone() });
            self.ctx.show(UiEvent::AssistantTurn {
                text: reply.clone(),
                error: false,
            });
            state.conversation.push(ConversationTurn::new(command, reply));
        }
        if !pairs.is_empty() {
            info!(turns = pairs.len(), "Restored conversation history");
        }
    }

    /// Clear the conversation on the backend, then locally.
    pub fn clear_history(&self, state: &mut AppState) {
        if !state.is_connected() {
            toast(&self.ctx, state, "Not connected to the assistant", Severity::Error);
            return;
        }
        let api = Arc::clone(&self.ctx.api);
        self.ctx
            .spawn(async move { AppEvent::HistoryCleared(api.clear_history().await) });
    }

    pub fn on_history_cleared(&self, state: &mut AppState, result: Result<(), ApiError>) {
        match result {
            Ok(()) => {
                state.clear_conversation();
                self.ctx.show(UiEvent::ConversationCleared {});
                render_stats(&self.ctx, state);
                toast(&self.ctx, state, "Conversation cleared", Severity::Success);
            }
            Err(e) => {
                warn!("Clearing history failed: {}", e);
                toast(
                    &self.ctx,
                    state,
                    format!("Failed to clear conversation: {}", e),
                    Severity::Error,
                );
            }
        }
    }
}

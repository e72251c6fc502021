//! Reminder list sync.
//!
//! The backend owns the list; the client keeps a wholesale copy that is
//! replaced on every successful fetch and never edited locally.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::notify::{render_stats, toast};
use super::{AppEvent, Context};
use crate::api::{ApiError, Reminder, ReminderId};
use crate::state::AppState;
use crate::ui::{ReminderRow, Severity, UiCommand, UiEvent};

pub const EMPTY_PLACEHOLDER: &str = "No reminders yet";

/// Render the cached list. Depends on nothing but `reminders`.
pub fn render_reminder_list(reminders: &[Reminder]) -> UiEvent {
    if reminders.is_empty() {
        return UiEvent::RemindersEmpty {
            placeholder: EMPTY_PLACEHOLDER.to_string(),
        };
    }
    UiEvent::Reminders {
        rows: reminders
            .iter()
            .map(|r| ReminderRow {
                id: r.id.clone(),
                time: r.time.clone(),
                text: r.text.clone(),
                delete: UiCommand::DeleteReminder { id: r.id.clone() },
            })
            .collect(),
    }
}

pub struct ReminderSync {
    ctx: Context,
}

impl ReminderSync {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Background refresh. Silently skipped while disconnected.
    pub fn fetch(&self, state: &AppState) {
        if !state.is_connected() {
            return;
        }
        let api = Arc::clone(&self.ctx.api);
        self.ctx
            .spawn(async move { AppEvent::RemindersFetched(api.list_reminders().await) });
    }

    pub fn on_fetched(&self, state: &mut AppState, result: Result<Vec<Reminder>, ApiError>) {
        match result {
            Ok(list) => {
                debug!(count = list.len(), "Reminders synced");
                state.reminders = list;
                self.ctx.show(render_reminder_list(&state.reminders));
                render_stats(&self.ctx, state);
            }
            Err(e) => warn!("Reminder sync failed: {}", e),
        }
    }

    pub fn delete(&self, state: &mut AppState, id: ReminderId) {
        if !state.is_connected() {
            toast(&self.ctx, state, "Not connected to the assistant", Severity::Error);
            return;
        }
        let api = Arc::clone(&self.ctx.api);
        self.ctx.spawn(async move {
            let result = api.delete_reminder(&id).await;
            AppEvent::ReminderDeleted { id, result }
        });
    }

    /// The row stays until the re-fetch confirms the deletion.
    pub fn on_deleted(&self, state: &mut AppState, id: &ReminderId, result: Result<(), ApiError>) {
        match result {
            Ok(()) => {
                info!(%id, "Reminder deleted");
                toast(&self.ctx, state, "Reminder deleted", Severity::Success);
                self.fetch(state);
            }
            Err(e) => {
                warn!(%id, "Deleting reminder failed: {}", e);
                toast(
                    &self.ctx,
                    state,
                    format!("Failed to delete reminder: {}", e),
                    Severity::Error,
                );
            }
        }
    }

    pub fn clear(&self, state: &mut AppState) {
        if !state.is_connected() {
            toast(&self.ctx, state, "Not connected to the assistant", Severity::Error);
            return;
        }
        let api = Arc::clone(&self.ctx.api);
        self.ctx
            .spawn(async move { AppEvent::RemindersCleared(api.clear_reminders().await) });
    }

    pub fn on_cleared(&self, state: &mut AppState, result: Result<(), ApiError>) {
        match result {
            Ok(()) => {
                toast(&self.ctx, state, "All reminders cleared", Severity::Success);
                self.fetch(state);
            }
            Err(e) => {
                warn!("Clearing reminders failed: {}", e);
                toast(
                    &self.ctx,
                    state,
                    format!("Failed to clear reminders: {}", e),
                    Severity::Error,
                );
            }
        }
    }
}

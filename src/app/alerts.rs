//! Reminder alert poller.
//!
//! The backend hands out each due reminder once; every signal received is
//! delivered as a popup, an utterance and a warning toast.

use std::sync::Arc;

use tracing::{info, warn};

use super::notify::{popup, speak, toast};
use super::{AppEvent, Context};
use crate::api::{ApiError, ReminderAlert};
use crate::state::AppState;
use crate::ui::Severity;

pub struct AlertPoller {
    ctx: Context,
}

impl AlertPoller {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    pub fn poll(&self, state: &AppState) {
        if !state.is_connected() {
            return;
        }
        let api = Arc::clone(&self.ctx.api);
        self.ctx
            .spawn(async move { AppEvent::AlertPolled(api.check_due_reminder().await) });
    }

    pub fn on_polled(&self, state: &mut AppState, result: Result<Option<ReminderAlert>, ApiError>) {
        match result {
            Ok(Some(alert)) => self.deliver(state, alert),
            Ok(None) => {}
            Err(e) => warn!("Reminder poll failed: {}", e),
        }
    }

    fn deliver(&self, state: &mut AppState, alert: ReminderAlert) {
        info!(id = ?alert.id, "Reminder due");
        let spoken = format!("Reminder: {}", alert.message);
        popup(&self.ctx, state, &alert.message, alert.time);
        speak(&self.ctx, &spoken);
        toast(&self.ctx, state, spoken, Severity::Warning);
    }
}

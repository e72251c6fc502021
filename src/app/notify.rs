//! Toasts, popups, speech and the stats line.
//!
//! There is a single toast slot. A new toast replaces the visible one, and
//! every toast schedules its own expiry, so an older toast's timer hides
//! whichever toast is showing when it fires.

use tracing::debug;

use super::{AppEvent, Context};
use crate::state::{AppState, ToastState};
use crate::ui::{Severity, UiEvent};

pub fn toast(ctx: &Context, state: &mut AppState, message: impl Into<String>, severity: Severity) {
    let message = message.into();
    debug!(%severity, %message, "Toast");
    state.toast = ToastState {
        visible: true,
        message: message.clone(),
        severity,
    };
    ctx.show(UiEvent::Toast { message, severity });
    ctx.post_after(ctx.timings.toast, AppEvent::ToastExpired);
}

pub fn on_toast_expired(ctx: &Context, state: &mut AppState) {
    if state.toast.visible {
        state.toast.visible = false;
        ctx.show(UiEvent::ToastHidden {});
    }
}

/// Show a popup with its own id; several may be visible at once.
pub fn popup(ctx: &Context, state: &mut AppState, message: &str, time: Option<String>) -> u64 {
    let id = state.next_popup_id;
    state.next_popup_id += 1;
    state.visible_popups.push(id);
    ctx.show(UiEvent::Popup {
        id,
        message: message.to_string(),
        time,
    });
    ctx.post_after(ctx.timings.popup, AppEvent::PopupExpired(id));
    id
}

pub fn on_popup_expired(ctx: &Context, state: &mut AppState, id: u64) {
    if let Some(pos) = state.visible_popups.iter().position(|p| *p == id) {
        state.visible_popups.remove(pos);
        ctx.show(UiEvent::PopupDismissed { id });
    }
}

/// Hand text to the speech sink, cutting off anything still being spoken.
pub fn speak(ctx: &Context, text: &str) {
    ctx.show(UiEvent::Speaking { text: text.to_string() });
    ctx.speech.speak(text);
}

pub fn set_busy(ctx: &Context, state: &mut AppState, active: bool) {
    if state.busy != active {
        state.busy = active;
        ctx.show(UiEvent::Busy { active });
    }
}

pub fn render_stats(ctx: &Context, state: &AppState) {
    ctx.show(UiEvent::Stats {
        messages: state.stats.message_count,
        voice: state.stats.voice_count,
        reminders: state.reminders.len(),
    });
}

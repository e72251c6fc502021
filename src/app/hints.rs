//! Rotating input hints.

use super::Context;
use crate::state::AppState;
use crate::ui::UiEvent;

pub const HINTS: &[&str] = &[
    "Try: \"what time is it\"",
    "Try: \"remind me in 5 minutes to stretch\"",
    "Try: \"what's the weather like\"",
    "Try: \"list my reminders\"",
    "Try: \"tell me a joke\"",
];

pub struct HintRotator {
    ctx: Context,
}

impl HintRotator {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    pub fn rotate(&self, state: &mut AppState) {
        let text = HINTS[state.hint_index % HINTS.len()];
        state.hint_index = (state.hint_index + 1) % HINTS.len();
        self.ctx.show(UiEvent::Hint { text: text.to_string() });
    }
}

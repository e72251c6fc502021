//! UI protocol types and the `View` abstraction.
//!
//! Events use `{"event": "<name>", "data": {...}}` format (client -> front end).
//! Commands use `{"command": "<name>", ...}` format (front end -> client).

pub mod bridge;
pub mod terminal;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::ReminderId;

pub use bridge::JsonLineView;
pub use terminal::TerminalView;

/// Anything that can present UI events. Implementations must not block for
/// long; they are called from the dispatch loop.
pub trait View: Send + Sync {
    fn show(&self, event: &UiEvent);
}

/// Toast severity class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Success => write!(f, "success"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One rendered row of the reminder list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderRow {
    pub id: ReminderId,
    pub time: String,
    pub text: String,
    /// Command the front end sends back to delete this row.
    pub delete: UiCommand,
}

// ---------------------------------------------------------------------------
// Events: client -> front end
// ---------------------------------------------------------------------------

/// All events emitted to the front end.
///
/// Serialized as `{"event": "<variant>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum UiEvent {
    Starting {},
    Ready {},
    Connection { connected: bool, label: String },
    UserTurn { text: String },
    AssistantTurn { text: String, error: bool },
    Busy { active: bool },
    Listening { active: bool },
    Toast { message: String, severity: Severity },
    ToastHidden {},
    Popup { id: u64, message: String, time: Option<String> },
    PopupDismissed { id: u64 },
    Reminders { rows: Vec<ReminderRow> },
    RemindersEmpty { placeholder: String },
    Stats { messages: u64, voice: u64, reminders: usize },
    Hint { text: String },
    ConversationCleared {},
    Speaking { text: String },
    Pong {},
    Stopping {},
}

// ---------------------------------------------------------------------------
// Commands: front end -> client
// ---------------------------------------------------------------------------

/// All commands accepted from the front end.
///
/// Deserialized from `{"command": "<variant>", ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command")]
#[serde(rename_all = "snake_case")]
pub enum UiCommand {
    Submit { text: String },
    StartListening {},
    DeleteReminder { id: ReminderId },
    ClearReminders {},
    RefreshReminders {},
    ClearHistory {},
    Ping {},
    Stop {},
}

/// One line read from the front end: a command, or the reason it could not
/// be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiInput {
    Command(UiCommand),
    Invalid(String),
}

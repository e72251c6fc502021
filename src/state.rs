//! In-memory application state shared by every component.
//!
//! Owned by the dispatch loop and handed out as `&mut AppState`; nothing
//! here is persisted.

use chrono::{DateTime, Local};

use crate::api::Reminder;
use crate::ui::Severity;

/// One completed command round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub user_text: String,
    pub assistant_text: String,
    pub occurred_at: DateTime<Local>,
}

impl ConversationTurn {
    pub fn new(user_text: &str, assistant_text: &str) -> Self {
        Self {
            user_text: user_text.to_string(),
            assistant_text: assistant_text.to_string(),
            occurred_at: Local::now(),
        }
    }
}

/// Backend reachability as last observed by the connectivity monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    pub connected: bool,
    pub label: String,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            connected: false,
            label: "Connecting...".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub message_count: u64,
    pub voice_count: u64,
}

/// The single toast slot. A new toast overwrites it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastState {
    pub visible: bool,
    pub message: String,
    pub severity: Severity,
}

impl Default for ToastState {
    fn default() -> Self {
        Self {
            visible: false,
            message: String::new(),
            severity: Severity::Info,
        }
    }
}

#[derive(Debug, Default)]
pub struct AppState {
    pub connection: ConnectionState,
    pub conversation: Vec<ConversationTurn>,
    pub stats: Stats,
    /// Wholesale copy of the backend's reminder list.
    pub reminders: Vec<Reminder>,
    /// A command is in flight.
    pub processing: bool,
    /// A voice capture session is active.
    pub listening: bool,
    /// Busy indicator as last rendered.
    pub busy: bool,
    pub toast: ToastState,
    pub visible_popups: Vec<u64>,
    pub next_popup_id: u64,
    pub hint_index: usize,
}

impl AppState {
    pub fn is_connected(&self) -> bool {
        self.connection.connected
    }

    /// Drop the conversation log and reset both counters together.
    pub fn clear_conversation(&mut self) {
        self.conversation.clear();
        self.stats = Stats::default();
    }
}

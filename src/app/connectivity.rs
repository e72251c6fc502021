//! Connectivity monitor: polls `/health` and owns `ConnectionState`.

use std::sync::Arc;

use tracing::{info, warn};

use super::notify::toast;
use super::{AppEvent, Context};
use crate::api::{ApiError, HealthStatus};
use crate::state::{AppState, ConnectionState};
use crate::ui::{Severity, UiEvent};

pub struct ConnectivityMonitor {
    ctx: Context,
}

impl ConnectivityMonitor {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Check the backend. Always runs, whatever the current state.
    pub fn check(&self) {
        let api = Arc::clone(&self.ctx.api);
        self.ctx
            .spawn(async move { AppEvent::HealthChecked(api.health().await) });
    }

    /// Apply a health result. Returns `true` on the disconnected to
    /// connected transition.
    pub fn on_health(&self, state: &mut AppState, result: Result<HealthStatus, ApiError>) -> bool {
        match result {
            Ok(status) => {
                let was_connected = state.connection.connected;
                self.set(state, true, "Connected");
                if !was_connected {
                    info!(server = ?status.server, reminders_active = ?status.reminders_active, "Backend reachable");
                }
                if !status.microphone_available {
                    toast(
                        &self.ctx,
                        state,
                        "Microphone is not available on the assistant server",
                        Severity::Warning,
                    );
                }
                !was_connected
            }
            Err(e) => {
                warn!("Health check failed: {}", e);
                self.set(state, false, "Disconnected");
                toast(
                    &self.ctx,
                    state,
                    format!("Cannot reach the assistant: {}", e),
                    Severity::Error,
                );
                false
            }
        }
    }

    fn set(&self, state: &mut AppState, connected: bool, label: &str) {
        state.connection = ConnectionState {
            connected,
            label: label.to_string(),
        };
        self.ctx.show(UiEvent::Connection {
            connected,
            label: label.to_string(),
        });
    }
}

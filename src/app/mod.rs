//! The dispatch loop.
//!
//! `App` owns the `AppState` and is the only place it is mutated. Timer
//! ticks and UI commands call into the components; the network calls they
//! start run in spawned tasks that post an `AppEvent` back onto the loop's
//! channel, where the matching completion handler runs. One message is
//! handled at a time, so handlers never interleave.

pub mod alerts;
pub mod connectivity;
pub mod dispatcher;
pub mod hints;
pub mod notify;
pub mod reminders;
pub mod voice;

#[cfg(test)]
pub(crate) mod test_support;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::api::{
    ApiError, Backend, CommandReply, HealthStatus, HistoryEntry, Reminder, ReminderAlert, ReminderId,
};
use crate::config::{
    ALERT_POLL_INTERVAL, HEALTH_INTERVAL, HINT_INTERVAL, POPUP_DURATION, REMINDER_NUDGE_DELAY,
    REMINDER_SYNC_INTERVAL, TOAST_DURATION,
};
use crate::speech::SpeechSink;
use crate::state::AppState;
use crate::ui::{Severity, UiCommand, UiEvent, UiInput, View};
use crate::voice::{TranscriptResult, TranscriptionSource};

use alerts::AlertPoller;
use connectivity::ConnectivityMonitor;
use dispatcher::{CommandOrigin, Dispatcher};
use hints::HintRotator;
use reminders::ReminderSync;
use voice::VoiceAdapter;

/// Completion messages posted back onto the dispatch loop.
#[derive(Debug)]
pub enum AppEvent {
    HealthChecked(Result<HealthStatus, ApiError>),
    CommandFinished {
        command: String,
        origin: CommandOrigin,
        result: Result<CommandReply, ApiError>,
    },
    HistoryLoaded(Result<Vec<HistoryEntry>, ApiError>),
    HistoryCleared(Result<(), ApiError>),
    RemindersFetched(Result<Vec<Reminder>, ApiError>),
    ReminderDeleted {
        id: ReminderId,
        result: Result<(), ApiError>,
    },
    RemindersCleared(Result<(), ApiError>),
    AlertPolled(Result<Option<ReminderAlert>, ApiError>),
    Transcript(TranscriptResult),
    ListeningEnded,
    /// One-shot list refresh scheduled after a reminder-related command.
    RefreshReminders,
    ToastExpired,
    PopupExpired(u64),
}

/// Auto-dismiss and nudge delays.
#[derive(Debug, Clone, Copy)]
pub struct Timings {
    pub toast: Duration,
    pub popup: Duration,
    pub reminder_nudge: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            toast: TOAST_DURATION,
            popup: POPUP_DURATION,
            reminder_nudge: REMINDER_NUDGE_DELAY,
        }
    }
}

/// Handles shared by every component. Cheap to clone.
#[derive(Clone)]
pub struct Context {
    pub api: Arc<dyn Backend>,
    pub view: Arc<dyn View>,
    pub speech: Arc<dyn SpeechSink>,
    pub transcriber: Option<Arc<dyn TranscriptionSource>>,
    pub timings: Timings,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl Context {
    pub fn show(&self, event: UiEvent) {
        self.view.show(&event);
    }

    /// Queue an event for the dispatch loop.
    pub fn post(&self, event: AppEvent) {
        if self.events.send(event).is_err() {
            debug!("Dispatch loop gone, dropping event");
        }
    }

    /// Queue an event for the dispatch loop after `delay`.
    pub fn post_after(&self, delay: Duration, event: AppEvent) {
        let tx = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(event);
        });
    }

    /// Run `task` off the loop and post its result back.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        let tx = self.events.clone();
        tokio::spawn(async move {
            let event = task.await;
            let _ = tx.send(event);
        });
    }
}

pub struct App {
    ctx: Context,
    state: AppState,
    events: mpsc::UnboundedReceiver<AppEvent>,
    monitor: ConnectivityMonitor,
    dispatcher: Dispatcher,
    voice: VoiceAdapter,
    reminders: ReminderSync,
    alerts: AlertPoller,
    hints: HintRotator,
}

impl App {
    pub fn new(
        api: Arc<dyn Backend>,
        view: Arc<dyn View>,
        speech: Arc<dyn SpeechSink>,
        transcriber: Option<Arc<dyn TranscriptionSource>>,
    ) -> Self {
        Self::with_timings(api, view, speech, transcriber, Timings::default())
    }

    pub fn with_timings(
        api: Arc<dyn Backend>,
        view: Arc<dyn View>,
        speech: Arc<dyn SpeechSink>,
        transcriber: Option<Arc<dyn TranscriptionSource>>,
        timings: Timings,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = Context {
            api,
            view,
            speech,
            transcriber,
            timings,
            events: tx,
        };
        Self {
            monitor: ConnectivityMonitor::new(ctx.clone()),
            dispatcher: Dispatcher::new(ctx.clone()),
            voice: VoiceAdapter::new(ctx.clone()),
            reminders: ReminderSync::new(ctx.clone()),
            alerts: AlertPoller::new(ctx.clone()),
            hints: HintRotator::new(ctx.clone()),
            ctx,
            state: AppState::default(),
            events: rx,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run until a stop command, end of input, or Ctrl-C.
    pub async fn run(mut self, mut input: mpsc::UnboundedReceiver<UiInput>) {
        let mut health = interval(HEALTH_INTERVAL);
        let mut reminder_sync = interval(REMINDER_SYNC_INTERVAL);
        let mut alert_poll = interval(ALERT_POLL_INTERVAL);
        let mut hint = interval(HINT_INTERVAL);
        for timer in [&mut health, &mut reminder_sync, &mut alert_poll, &mut hint] {
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        }

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        info!("Dispatch loop running");
        loop {
            tokio::select! {
                _ = health.tick() => self.monitor.check(),
                _ = reminder_sync.tick() => self.reminders.fetch(&self.state),
                _ = alert_poll.tick() => self.alerts.poll(&self.state),
                _ = hint.tick() => self.hints.rotate(&mut self.state),
                Some(event) = self.events.recv() => self.handle_event(event),
                line = input.recv() => match line {
                    Some(line) => {
                        if !self.handle_input(line) {
                            break;
                        }
                    }
                    None => {
                        info!("Input closed, shutting down");
                        break;
                    }
                },
                _ = &mut shutdown => {
                    info!("Interrupted, shutting down");
                    break;
                }
            }
        }

        self.ctx.speech.stop();
        self.ctx.show(UiEvent::Stopping {});
    }

    /// Handle one line from the front end. Returns `false` when the loop
    /// should exit.
    pub fn handle_input(&mut self, input: UiInput) -> bool {
        match input {
            UiInput::Command(command) => self.handle_command(command),
            UiInput::Invalid(message) => {
                notify::toast(&self.ctx, &mut self.state, message, Severity::Warning);
                true
            }
        }
    }

    /// Handle one command from the front end. Returns `false` when the
    /// loop should exit.
    pub fn handle_command(&mut self, command: UiCommand) -> bool {
        match command {
            UiCommand::Submit { text } => self.dispatcher.submit(&mut self.state, &text),
            UiCommand::StartListening {} => self.voice.start_listening(&mut self.state),
            UiCommand::DeleteReminder { id } => self.reminders.delete(&mut self.state, id),
            UiCommand::ClearReminders {} => self.reminders.clear(&mut self.state),
            UiCommand::RefreshReminders {} => self.reminders.fetch(&self.state),
            UiCommand::ClearHistory {} => self.dispatcher.clear_history(&mut self.state),
            UiCommand::Ping {} => self.ctx.show(UiEvent::Pong {}),
            UiCommand::Stop {} => return false,
        }
        true
    }

    fn handle_event(&mut self, event: AppEvent) {
        let state = &mut self.state;
        match event {
            AppEvent::HealthChecked(result) => {
                if self.monitor.on_health(state, result) {
                    self.reminders.fetch(state);
                    self.dispatcher.load_history(state);
                }
            }
            AppEvent::CommandFinished { command, origin, result } => {
                self.dispatcher.on_reply(state, &command, origin, result)
            }
            AppEvent::HistoryLoaded(result) => self.dispatcher.on_history_loaded(state, result),
            AppEvent::HistoryCleared(result) => self.dispatcher.on_history_cleared(state, result),
            AppEvent::RemindersFetched(result) => self.reminders.on_fetched(state, result),
            AppEvent::ReminderDeleted { id, result } => self.reminders.on_deleted(state, &id, result),
            AppEvent::RemindersCleared(result) => self.reminders.on_cleared(state, result),
            AppEvent::AlertPolled(result) => self.alerts.on_polled(state, result),
            AppEvent::Transcript(result) => {
                let Some(transcript) = self.voice.on_transcript(state, result) else {
                    return;
                };
                match transcript.reply {
                    // The source already ran the command on the backend.
                    Some(reply) => {
                        self.voice.record_turn(state, &transcript.text);
                        self.dispatcher.on_voice_answered(state, &transcript.text, reply);
                    }
                    None => {
                        if self.dispatcher.accepts(state) {
                            self.voice.record_turn(state, &transcript.text);
                            self.dispatcher.dispatch_voice(state, &transcript.text);
                        }
                    }
                }
            }
            AppEvent::ListeningEnded => self.voice.on_end(state),
            AppEvent::RefreshReminders => self.reminders.fetch(state),
            AppEvent::ToastExpired => notify::on_toast_expired(&self.ctx, state),
            AppEvent::PopupExpired(id) => notify::on_popup_expired(&self.ctx, state, id),
        }
    }

    /// Handle queued events until one matching `pred` has been handled.
    #[cfg(test)]
    pub(crate) async fn pump_until(&mut self, pred: impl Fn(&AppEvent) -> bool) {
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), self.events.recv())
                .await
                .expect("timed out waiting for app event")
                .expect("event channel closed");
            let hit = pred(&event);
            self.handle_event(event);
            if hit {
                return;
            }
        }
    }
}

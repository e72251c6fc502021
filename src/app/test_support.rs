//! In-memory fakes for driving `App` in tests.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use tokio::sync::mpsc;

use super::{App, Timings};
use crate::api::{
    ApiError, Backend, CommandReply, HealthStatus, HistoryEntry, ListenOptions, ListenReply, Reminder,
    ReminderAlert, ReminderId,
};
use crate::speech::SpeechSink;
use crate::state::ConnectionState;
use crate::ui::{Severity, UiEvent, View};
use crate::voice::{TranscriptResult, TranscriptionSource, VoiceError};

pub fn reminder(id: i64, time: &str, text: &str) -> Reminder {
    Reminder {
        id: ReminderId::Number(id),
        time: time.to_string(),
        text: text.to_string(),
    }
}

/// Scriptable backend. Every call is recorded as `"<op>"` or `"<op>:<arg>"`.
pub struct FakeBackend {
    calls: Mutex<Vec<String>>,
    /// Operations that answer with HTTP 500.
    failing: Mutex<HashSet<&'static str>>,
    /// When set, every call fails at the transport level.
    offline: Mutex<bool>,
    health: Mutex<HealthStatus>,
    reply: Mutex<CommandReply>,
    reminders: Mutex<Vec<Reminder>>,
    alerts: Mutex<VecDeque<ReminderAlert>>,
    history: Mutex<Vec<HistoryEntry>>,
    heard: Mutex<ListenReply>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            offline: Mutex::new(false),
            health: Mutex::new(HealthStatus {
                server: Some("running".into()),
                reminders_active: None,
                microphone_available: true,
            }),
            reply: Mutex::new(CommandReply::ok("It is 5 PM.")),
            reminders: Mutex::new(Vec::new()),
            alerts: Mutex::new(VecDeque::new()),
            history: Mutex::new(Vec::new()),
            heard: Mutex::new(ListenReply::default()),
        }
    }
}

impl FakeBackend {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, op: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.as_str() == op || c.starts_with(&format!("{}:", op)))
            .count()
    }

    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    pub fn set_microphone(&self, available: bool) {
        self.health.lock().unwrap().microphone_available = available;
    }

    pub fn set_reply(&self, reply: CommandReply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn set_reminders(&self, list: Vec<Reminder>) {
        *self.reminders.lock().unwrap() = list;
    }

    pub fn push_alert(&self, message: &str) {
        self.alerts.lock().unwrap().push_back(ReminderAlert {
            message: message.to_string(),
            id: Some(ReminderId::Number(1)),
            time: Some("05:00 PM 18-Oct".to_string()),
        });
    }

    pub fn set_history(&self, pairs: &[(&str, &str)]) {
        *self.history.lock().unwrap() = pairs
            .iter()
            .flat_map(|(you, assistant)| {
                [
                    HistoryEntry {
                        you: Some(you.to_string()),
                        assistant: None,
                    },
                    HistoryEntry {
                        you: None,
                        assistant: Some(assistant.to_string()),
                    },
                ]
            })
            .collect();
    }

    pub fn set_heard(&self, reply: ListenReply) {
        *self.heard.lock().unwrap() = reply;
    }

    fn record<T: Send + 'static>(
        &self,
        op: &'static str,
        arg: Option<String>,
        ok: impl FnOnce() -> T,
    ) -> BoxFuture<'_, Result<T, ApiError>> {
        let entry = match arg {
            Some(arg) => format!("{}:{}", op, arg),
            None => op.to_string(),
        };
        self.calls.lock().unwrap().push(entry);

        let result = if *self.offline.lock().unwrap() {
            Err(ApiError::Transport("connection refused".into()))
        } else if self.failing.lock().unwrap().contains(op) {
            Err(ApiError::Status(500))
        } else {
            Ok(ok())
        };
        Box::pin(async move { result })
    }
}

impl Backend for FakeBackend {
    fn health(&self) -> BoxFuture<'_, Result<HealthStatus, ApiError>> {
        let status = self.health.lock().unwrap().clone();
        self.record("health", None, move || status)
    }

    fn process(&self, command: &str) -> BoxFuture<'_, Result<CommandReply, ApiError>> {
        let reply = self.reply.lock().unwrap().clone();
        self.record("process", Some(command.to_string()), move || reply)
    }

    fn history(&self) -> BoxFuture<'_, Result<Vec<HistoryEntry>, ApiError>> {
        let entries = self.history.lock().unwrap().clone();
        self.record("history", None, move || entries)
    }

    fn clear_history(&self) -> BoxFuture<'_, Result<(), ApiError>> {
        self.record("clear_history", None, || ())
    }

    fn speak(&self, text: &str) -> BoxFuture<'_, Result<(), ApiError>> {
        self.record("speak", Some(text.to_string()), || ())
    }

    fn listen(&self, options: ListenOptions) -> BoxFuture<'_, Result<ListenReply, ApiError>> {
        let reply = self.heard.lock().unwrap().clone();
        let arg = format!("{}/{}", options.timeout, options.phrase_time_limit);
        self.record("listen", Some(arg), move || reply)
    }

    fn list_reminders(&self) -> BoxFuture<'_, Result<Vec<Reminder>, ApiError>> {
        let list = self.reminders.lock().unwrap().clone();
        self.record("list_reminders", None, move || list)
    }

    fn delete_reminder(&self, id: &ReminderId) -> BoxFuture<'_, Result<(), ApiError>> {
        self.record("delete_reminder", Some(id.to_string()), || ())
    }

    fn clear_reminders(&self) -> BoxFuture<'_, Result<(), ApiError>> {
        self.record("clear_reminders", None, || ())
    }

    fn check_due_reminder(&self) -> BoxFuture<'_, Result<Option<ReminderAlert>, ApiError>> {
        let next = self.alerts.lock().unwrap().pop_front();
        self.record("check_due_reminder", None, move || next)
    }
}

/// Records every event it is shown.
#[derive(Default)]
pub struct FakeView {
    events: Mutex<Vec<UiEvent>>,
}

impl FakeView {
    pub fn events(&self) -> Vec<UiEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&UiEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }

    pub fn toasts(&self, severity: Severity) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::Toast { message, severity: s } if s == severity => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn last_busy(&self) -> Option<bool> {
        self.events().into_iter().rev().find_map(|e| match e {
            UiEvent::Busy { active } => Some(active),
            _ => None,
        })
    }
}

impl View for FakeView {
    fn show(&self, event: &UiEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[derive(Default)]
pub struct FakeSpeech {
    spoken: Mutex<Vec<String>>,
}

impl FakeSpeech {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

impl SpeechSink for FakeSpeech {
    fn speak(&self, text: &str) {
        self.spoken.lock().unwrap().push(text.to_string());
    }

    fn stop(&self) {}

    fn name(&self) -> String {
        "Fake".to_string()
    }
}

/// Replays one scripted session per `start`.
#[derive(Default)]
pub struct FakeTranscriber {
    sessions: Mutex<VecDeque<Result<Vec<TranscriptResult>, VoiceError>>>,
    starts: Mutex<usize>,
}

impl FakeTranscriber {
    pub fn with_session(results: Vec<TranscriptResult>) -> Self {
        let fake = Self::default();
        fake.push_session(Ok(results));
        fake
    }

    pub fn push_session(&self, session: Result<Vec<TranscriptResult>, VoiceError>) {
        self.sessions.lock().unwrap().push_back(session);
    }

    pub fn starts(&self) -> usize {
        *self.starts.lock().unwrap()
    }
}

impl TranscriptionSource for FakeTranscriber {
    fn start(&self) -> Result<mpsc::Receiver<TranscriptResult>, VoiceError> {
        *self.starts.lock().unwrap() += 1;
        let results = self
            .sessions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))?;
        let (tx, rx) = mpsc::channel(results.len().max(1));
        for result in results {
            tx.try_send(result).unwrap();
        }
        Ok(rx)
    }

    fn name(&self) -> String {
        "Fake".to_string()
    }
}

pub struct Harness {
    pub app: App,
    pub backend: Arc<FakeBackend>,
    pub view: Arc<FakeView>,
    pub speech: Arc<FakeSpeech>,
    pub transcriber: Arc<FakeTranscriber>,
}

impl Harness {
    /// Disconnected app with no speech recognition.
    pub fn new() -> Self {
        Self::build(None, Timings::default())
    }

    /// Disconnected app with a scripted transcriber.
    pub fn with_transcriber(transcriber: FakeTranscriber) -> Self {
        Self::build(Some(transcriber), Timings::default())
    }

    pub fn with_timings(timings: Timings) -> Self {
        Self::build(None, timings)
    }

    fn build(transcriber: Option<FakeTranscriber>, timings: Timings) -> Self {
        let backend = Arc::new(FakeBackend::default());
        let view = Arc::new(FakeView::default());
        let speech = Arc::new(FakeSpeech::default());
        let has_transcriber = transcriber.is_some();
        let transcriber = Arc::new(transcriber.unwrap_or_default());
        let source: Option<Arc<dyn TranscriptionSource>> = if has_transcriber {
            Some(transcriber.clone())
        } else {
            None
        };
        let app = App::with_timings(backend.clone(), view.clone(), speech.clone(), source, timings);
        Self {
            app,
            backend,
            view,
            speech,
            transcriber,
        }
    }

    /// Mark the app connected without a health round-trip.
    pub fn connected(mut self) -> Self {
        self.app.state.connection = ConnectionState {
            connected: true,
            label: "Connected".to_string(),
        };
        self
    }
}

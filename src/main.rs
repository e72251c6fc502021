//! Assistant client entry point.
//!
//! Renders through the configured front end (terminal lines or JSON lines
//! on stdout), reads commands from stdin, and runs the dispatch loop until
//! told to stop.

use std::sync::Arc;

use tracing::{info, warn};

use assistant_client::api::{Backend, HttpBackend};
use assistant_client::app::App;
use assistant_client::config::{paths, read_client_config, UiMode};
use assistant_client::logger;
use assistant_client::speech::{create_speech_sink, SilentSpeech, SpeechSink};
use assistant_client::ui::{bridge::spawn_stdin_reader, JsonLineView, TerminalView, UiEvent, View};
use assistant_client::voice::create_transcription_source;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = logger::init(&paths::get_log_dir()) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let config = read_client_config();
    info!(api = %config.api_base_url, ui = ?config.ui, "Configuration loaded");

    let view: Arc<dyn View> = match config.ui {
        UiMode::Json => Arc::new(JsonLineView),
        UiMode::Terminal => Arc::new(TerminalView),
    };
    view.show(&UiEvent::Starting {});

    let api: Arc<dyn Backend> = Arc::new(HttpBackend::new(&config.api_base_url, config.request_timeout())?);

    let speech: Arc<dyn SpeechSink> = create_speech_sink(&config.speech, Arc::clone(&api)).unwrap_or_else(|e| {
        warn!("Speech output unavailable, continuing silently: {}", e);
        Arc::new(SilentSpeech)
    });
    info!(sink = %speech.name(), "Speech output ready");

    let transcriber = create_transcription_source(&config.voice, Arc::clone(&api)).unwrap_or_else(|e| {
        warn!("Speech recognition unavailable: {}", e);
        None
    });

    let input = spawn_stdin_reader(config.ui);
    let app = App::new(api, Arc::clone(&view), speech, transcriber);

    view.show(&UiEvent::Ready {});
    info!("Assistant client ready");
    app.run(input).await;

    info!("Assistant client shutting down");
    Ok(())
}

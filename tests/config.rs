use std::fs;

use assistant_client::config::{read_client_config_from, UiMode, DEFAULT_API_BASE_URL};

#[test]
fn partial_file_keeps_remaining_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("client_config.json");
    fs::write(
        &path,
        r#"{
            "apiBaseUrl": "http://192.168.1.20:5000",
            "ui": "json",
            "voice": { "sttAdapter": "custom-cloud", "sttEndpoint": "http://127.0.0.1:9000/stt" },
            "speech": { "ttsAdapter": "none" }
        }"#,
    )
    .unwrap();

    let config = read_client_config_from(&path);
    assert_eq!(config.api_base_url, "http://192.168.1.20:5000");
    assert_eq!(config.ui, UiMode::Json);
    assert_eq!(config.request_timeout_secs, 15);
    assert_eq!(config.voice.stt_adapter, "custom-cloud");
    assert_eq!(config.voice.stt_endpoint.as_deref(), Some("http://127.0.0.1:9000/stt"));
    assert_eq!(config.voice.listen_timeout_secs, 5);
    assert_eq!(config.voice.phrase_time_limit_secs, 10);
    assert_eq!(config.speech.tts_adapter, "none");
}

#[test]
fn invalid_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("client_config.json");
    fs::write(&path, "{ not json").unwrap();

    let config = read_client_config_from(&path);
    assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
}

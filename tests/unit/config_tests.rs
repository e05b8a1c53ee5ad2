// ==========================
// tests/unit/config_tests.rs
// ==========================
//! Unit tests for the configuration module
use router_lib::config::{RelaySettings, ServerSettings, Settings};
use router_lib::AppState;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_settings_custom() {
    let settings = Settings {
        bind_addr: "0.0.0.0:9000".parse().unwrap(),
        log_level: "warn".to_string(),
        api_path: "/api".to_string(),
        relay: RelaySettings { timeout_secs: 2 },
        servers: vec![ServerSettings {
            id: "bbb1".to_string(),
            url: "https://bbb1.example.com/bigbluebutton/api/".to_string(),
            secret: "s1".to_string(),
            enabled: false,
            load: 3,
        }],
    };

    assert!(settings.validate().is_ok());

    let servers = settings.pool_servers();
    assert_eq!(servers[0].id, "bbb1");
    assert!(!servers[0].enabled);
    assert_eq!(servers[0].load, 3);
}

#[test]
fn test_missing_file_uses_defaults() {
    let temp_dir = tempdir().unwrap();
    let settings = Settings::load_from(temp_dir.path().join("absent.toml")).unwrap();
    assert_eq!(settings.api_path, Settings::default().api_path);
    assert_eq!(settings.relay, RelaySettings::default());
}

#[test]
fn test_duplicate_server_ids_rejected() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("router.toml");
    fs::write(
        &config_path,
        r#"
        [[servers]]
        id = "bbb1"
        url = "https://bbb1.example.com/bigbluebutton/api/"
        secret = "s1"

        [[servers]]
        id = "bbb1"
        url = "https://bbb2.example.com/bigbluebutton/api/"
        secret = "s2"
        "#,
    )
    .unwrap();

    let err = Settings::load_from(&config_path).unwrap_err();
    assert!(err.to_string().contains("duplicate server id"));
}

#[tokio::test]
async fn test_app_state_from_settings() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("router.toml");
    fs::write(
        &config_path,
        r#"
        api_path = "/bbb/api"

        [[servers]]
        id = "bbb1"
        url = "https://bbb1.example.com/bigbluebutton/api/"
        secret = "s1"
        "#,
    )
    .unwrap();

    let settings = Settings::load_from(&config_path).unwrap();
    let state = AppState::from_settings(settings).unwrap();

    assert_eq!(state.settings.api_path, "/bbb/api");
    assert_eq!(state.engine.select_available().await.unwrap().id, "bbb1");
}

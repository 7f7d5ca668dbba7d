use crate::config::{
    ChatCoreConfig, ENV_HEARTBEAT_MS, ENV_PAGE_ORIGIN, ENV_RECONNECT_MAX_ATTEMPTS,
};
use crate::error::config::ConfigError;

use std::time::Duration;

use serial_test::serial;
use tempfile::TempDir;

/// **VALUE**: Verifies the defaults match the server's expectations.
///
/// **WHY THIS MATTERS**: Heartbeat and backoff defaults are part of the protocol
/// contract with the tutoring server.
#[test]
fn given_no_overrides_when_defaulted_then_protocol_defaults() {
    let config = ChatCoreConfig::default();

    assert_eq!(config.channel.page_origin, "http://localhost:8001");
    assert_eq!(config.channel.channel_path, "/api/ws");
    assert_eq!(config.channel.heartbeat_interval(), Duration::from_secs(30));
    assert_eq!(config.reconnect.base_delay(), Duration::from_secs(1));
    assert_eq!(config.reconnect.max_attempts, 5);
    assert_eq!(config.upload.audio_path, "/api/chat/audio");
    assert_eq!(config.audio.voice, "alloy");
    assert!(config.validate().is_ok());
}

/// **VALUE**: Verifies a missing file loads defaults instead of failing.
#[test]
fn given_missing_file_when_loading_then_defaults() {
    let dir = TempDir::new().unwrap();

    let config = ChatCoreConfig::load(dir.path()).unwrap();

    assert_eq!(config, ChatCoreConfig::default());
}

/// **VALUE**: Verifies save/load preserves edits and leaves no temp file behind.
///
/// **BUG THIS CATCHES**: Would catch a save that writes directly to config.json
/// (torn file on crash) or forgets the rename.
#[test]
fn given_modified_config_when_saved_and_loaded_then_identical() {
    // GIVEN: A config with non-default values
    let dir = TempDir::new().unwrap();
    let mut config = ChatCoreConfig::default();
    config.channel.page_origin = String::from("https://tutor.example.com");
    config.reconnect.max_attempts = 3;
    config.audio.voice = String::from("nova");
    config.audio.speed = 1.5;

    // WHEN: Saving and loading
    config.save(dir.path()).unwrap();
    let loaded = ChatCoreConfig::load(dir.path()).unwrap();

    // THEN: Identical, and only config.json remains
    assert_eq!(loaded, config);
    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["config.json"]);
}

/// **VALUE**: Verifies partial files fill the rest from defaults.
#[test]
fn given_partial_file_when_loading_then_missing_fields_defaulted() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.json"),
        r#"{ "reconnect": { "max_attempts": 2 } }"#,
    )
    .unwrap();

    let config = ChatCoreConfig::load(dir.path()).unwrap();

    assert_eq!(config.reconnect.max_attempts, 2);
    assert_eq!(config.reconnect.base_delay_ms, 1_000);
    assert_eq!(config.channel, ChatCoreConfig::default().channel);
}

/// **VALUE**: Verifies corrupt and out-of-range files are reported, not silently replaced.
#[test]
fn given_bad_files_when_loading_then_parse_or_validation_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        ChatCoreConfig::load(dir.path()),
        Err(ConfigError::Parse { .. })
    ));

    std::fs::write(&path, r#"{ "audio": { "voice": "robot" } }"#).unwrap();
    assert!(matches!(
        ChatCoreConfig::load(dir.path()),
        Err(ConfigError::Validation { .. })
    ));

    std::fs::write(&path, r#"{ "channel": { "page_origin": "ftp://x" } }"#).unwrap();
    assert!(matches!(
        ChatCoreConfig::load(dir.path()),
        Err(ConfigError::Validation { .. })
    ));
}

/// **VALUE**: Verifies each bound in `validate`.
#[test]
fn given_out_of_range_values_when_validating_then_rejected() {
    let cases: Vec<Box<dyn Fn(&mut ChatCoreConfig)>> = vec![
        Box::new(|c| c.version = 0),
        Box::new(|c| c.version = 99),
        Box::new(|c| c.channel.channel_path = String::from("api/ws")),
        Box::new(|c| c.channel.heartbeat_interval_ms = 10),
        Box::new(|c| c.channel.handshake_timeout_ms = 0),
        Box::new(|c| c.reconnect.base_delay_ms = 0),
        Box::new(|c| c.reconnect.max_attempts = 100),
        Box::new(|c| c.audio.speed = 4.5),
    ];

    for (i, mutate) in cases.iter().enumerate() {
        let mut config = ChatCoreConfig::default();
        mutate(&mut config);
        assert!(
            matches!(config.validate(), Err(ConfigError::Validation { .. })),
            "case {i} should be rejected"
        );
    }
}

/// **VALUE**: Verifies `TUTOR_CHAT_*` variables override the file.
///
/// **BUG THIS CATCHES**: Would catch a typo'd number being silently ignored.
#[test]
#[serial]
fn given_env_overrides_when_applied_then_config_updated() {
    // GIVEN: Override variables
    // SAFETY: serialized with the other env-mutating tests.
    unsafe {
        std::env::set_var(ENV_PAGE_ORIGIN, "https://staging.example.com");
        std::env::set_var(ENV_HEARTBEAT_MS, "15000");
    }

    // WHEN: Applying them
    let mut config = ChatCoreConfig::default();
    let result = config.apply_env_overrides();

    unsafe {
        std::env::remove_var(ENV_PAGE_ORIGIN);
        std::env::remove_var(ENV_HEARTBEAT_MS);
    }

    // THEN: Values taken from the environment
    result.unwrap();
    assert_eq!(config.channel.page_origin, "https://staging.example.com");
    assert_eq!(config.channel.heartbeat_interval_ms, 15_000);
}

#[test]
#[serial]
fn given_unparseable_env_value_when_applied_then_environment_error() {
    // SAFETY: serialized with the other env-mutating tests.
    unsafe {
        std::env::set_var(ENV_RECONNECT_MAX_ATTEMPTS, "lots");
    }

    let result = ChatCoreConfig::default().apply_env_overrides();

    unsafe {
        std::env::remove_var(ENV_RECONNECT_MAX_ATTEMPTS);
    }

    match result {
        Err(ConfigError::Environment { variable, .. }) => {
            assert_eq!(variable, ENV_RECONNECT_MAX_ATTEMPTS)
        }
        other => panic!("expected Environment error, got {other:?}"),
    }
}

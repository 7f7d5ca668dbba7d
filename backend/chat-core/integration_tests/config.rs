use chat_core::config::{ChatCoreConfig, default_config_dir};

use tempfile::TempDir;

/// **VALUE**: Verifies save creates a missing config directory.
///
/// **BUG THIS CATCHES**: Would catch first-run saves failing because the per-app
/// directory does not exist yet.
#[test]
fn given_missing_directory_when_saving_then_created() {
    let root = TempDir::new().unwrap();
    let dir = root.path().join("nested").join("tutor-chat");

    ChatCoreConfig::default().save(&dir).unwrap();

    assert!(dir.join("config.json").exists());
    assert_eq!(ChatCoreConfig::load(&dir).unwrap(), ChatCoreConfig::default());
}

#[test]
fn given_platform_when_resolving_default_dir_then_ends_with_app_name() {
    if let Some(dir) = default_config_dir() {
        assert!(dir.ends_with("tutor-chat"));
    }
}

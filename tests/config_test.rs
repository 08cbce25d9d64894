//! Configuration loading tests.

use std::fs;
use std::time::Duration;

use liveops::config::{load_config, load_config_or_default, StoreBackend};
use tempfile::tempdir;

#[test]
fn loads_full_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("liveops.toml");
    fs::write(
        &path,
        r#"
[server]
port = 8080
api_key = "secret"

[media]
subscription_id = "sub"
resource_group = "liveRG"
account_name = "liveams"
access_token = "token"

[store]
backend = "sqlite"

[store.sqlite]
path = "/var/lib/liveops/meta.db"

[teardown]
stop_poll_interval_ms = 500
stop_max_wait_secs = 0
"#,
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.api_key.as_deref(), Some("secret"));
    assert_eq!(config.media.account_name, "liveams");
    assert_eq!(config.store.backend, StoreBackend::Sqlite);
    assert_eq!(
        config.store.sqlite.path.to_str(),
        Some("/var/lib/liveops/meta.db")
    );
    assert_eq!(config.teardown.stop_poll_interval(), Duration::from_millis(500));
    assert_eq!(config.teardown.stop_max_wait(), None);

    let scope = config.media.scope_for(Some("euwe"));
    assert_eq!(scope.resource_group, "liveRGeuwe");
    assert_eq!(scope.account_name, "liveamseuwe");
}

#[test]
fn empty_file_uses_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.toml");
    fs::write(&path, "").unwrap();

    let config = load_config_or_default(Some(path.as_path())).unwrap();
    assert_eq!(config.server.port, 7071);
    assert_eq!(config.store.backend, StoreBackend::Disabled);
    assert_eq!(config.teardown.stop_max_wait(), Some(Duration::from_secs(600)));
}

#[test]
fn invalid_toml_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[server\nport = ").unwrap();

    let err = load_config(&path).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to parse config file"));
}

#[test]
fn unknown_backend_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[store]\nbackend = \"mongo\"\n").unwrap();

    assert!(load_config(&path).is_err());
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let err = load_config(&dir.path().join("absent.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

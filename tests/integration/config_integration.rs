//! Integration tests for layered configuration

use notegen::config::ConfigLoader;
use tempfile::TempDir;

use super::test_utils::with_xdg_env;

#[test]
fn test_explicit_file_overrides_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("notegen.toml");
    std::fs::write(
        &config_file,
        r#"
[service]
base_url = "http://generator.local:8080"
retry_concurrency = 4

[storage]
state_path = "state"

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.service.base_url, "http://generator.local:8080");
    assert_eq!(config.service.retry_concurrency, 4);
    assert_eq!(config.service.api_prefix, "/api/ai");
    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        config.storage.resolve_state_path(temp_dir.path()),
        temp_dir.path().join("state")
    );
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = ConfigLoader::load_from_file(&temp_dir.path().join("absent.toml"));
    assert!(result.is_err());
}

#[test]
fn test_invalid_values_fail_validation() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("notegen.toml");
    std::fs::write(
        &config_file,
        r#"
[service]
base_url = "ftp://generator.local"
retry_concurrency = 0
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    let errors = config.validate().unwrap_err();
    assert!(!errors.is_empty());
}

#[test]
fn test_workspace_file_overrides_global_file() {
    let test_dir = TempDir::new().unwrap();
    with_xdg_env(&test_dir, || {
        let global_dir = test_dir.path().join("notegen");
        std::fs::create_dir_all(&global_dir).unwrap();
        std::fs::write(
            global_dir.join("config.toml"),
            r#"
[service]
base_url = "http://global:1"
request_timeout_secs = 30
"#,
        )
        .unwrap();

        let workspace = test_dir.path().join("workspace");
        std::fs::create_dir_all(workspace.join("config")).unwrap();
        std::fs::write(
            workspace.join("config").join("config.toml"),
            r#"
[service]
base_url = "http://workspace:2"
"#,
        )
        .unwrap();

        let config = ConfigLoader::load(&workspace).unwrap();
        assert_eq!(config.service.base_url, "http://workspace:2");
        assert_eq!(config.service.request_timeout_secs, 30);
        assert_eq!(
            ConfigLoader::xdg_config_path(),
            Some(global_dir.join("config.toml"))
        );
    });
}

#[test]
fn test_defaults_without_any_file() {
    let test_dir = TempDir::new().unwrap();
    with_xdg_env(&test_dir, || {
        let workspace = test_dir.path().join("empty");
        std::fs::create_dir_all(&workspace).unwrap();

        let config = ConfigLoader::load(&workspace).unwrap();
        assert_eq!(config.service.base_url, "http://127.0.0.1:5409");
        assert!(config.service.use_reference);
        assert_eq!(
            config.storage.resolve_state_path(&workspace),
            test_dir.path().join("data").join("notegen").join("state")
        );
    });
}

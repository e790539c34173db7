//! Integration tests for configuration loading

use super::test_utils::{lock_env, EnvGuard};
use studyforge::config::{global_config_path, BackendKind, ConfigLoader};
use studyforge::pipelines::Pipelines;
use tempfile::TempDir;

/// Point the global config at an empty temp dir and clear key variables
fn isolated_env(temp: &TempDir) -> EnvGuard {
    let mut env = EnvGuard::new();
    env.set("XDG_CONFIG_HOME", &temp.path().join("xdg").to_string_lossy());
    env.set("HOME", &temp.path().to_string_lossy());
    for key in [
        "STUDYFORGE_BACKEND__API_KEY",
        "STUDYFORGE_BACKEND__KIND",
        "STUDYFORGE_PIPELINE__IMAGE_INTERVAL_MS",
        "GEMINI_API_KEY",
        "GOOGLE_API_KEY",
    ] {
        env.remove(key);
    }
    env
}

#[test]
fn test_file_config_drives_pipelines() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("studyforge.toml");
    std::fs::write(
        &config_file,
        r#"
[backend]
kind = "mock"

[pipeline]
max_presentation_images = 3
image_interval_ms = 250

[logging]
level = "info"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.backend.kind, BackendKind::Mock);
    assert_eq!(config.backend.model, "gemini-2.0-flash");

    let pipelines = Pipelines::from_config(&config).unwrap();
    assert_eq!(pipelines.config().max_presentation_images, 3);
    assert_eq!(pipelines.config().image_interval_ms, 250);
    assert_eq!(pipelines.runtime().client().backend_name(), "mock");
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("absent.toml");
    assert!(ConfigLoader::load_from_file(&missing).is_err());
}

#[test]
fn test_environment_overrides_files() {
    let _lock = lock_env();
    let temp_dir = TempDir::new().unwrap();
    let mut env = isolated_env(&temp_dir);

    let global = global_config_path().unwrap();
    assert!(global.starts_with(temp_dir.path()));
    std::fs::create_dir_all(global.parent().unwrap()).unwrap();
    std::fs::write(
        &global,
        "[backend]\napi_key = \"from-global\"\n\n[pipeline]\nimage_interval_ms = 10\n",
    )
    .unwrap();

    let explicit = temp_dir.path().join("explicit.toml");
    std::fs::write(&explicit, "[pipeline]\nimage_interval_ms = 20\n").unwrap();

    let config = ConfigLoader::load(Some(&explicit)).unwrap();
    assert_eq!(config.backend.api_key.as_deref(), Some("from-global"));
    assert_eq!(config.pipeline.image_interval_ms, 20);

    env.set("STUDYFORGE_BACKEND__API_KEY", "from-env");
    env.set("STUDYFORGE_PIPELINE__IMAGE_INTERVAL_MS", "30");
    let config = ConfigLoader::load(Some(&explicit)).unwrap();
    assert_eq!(config.backend.api_key.as_deref(), Some("from-env"));
    assert_eq!(config.pipeline.image_interval_ms, 30);
}

#[test]
fn test_conventional_key_variable_is_a_fallback() {
    let _lock = lock_env();
    let temp_dir = TempDir::new().unwrap();
    let mut env = isolated_env(&temp_dir);

    let config = ConfigLoader::load(None).unwrap();
    assert!(config.backend.api_key.is_none());
    assert!(config.validate().is_err(), "gemini without a key is invalid");

    env.set("GEMINI_API_KEY", "conventional");
    let config = ConfigLoader::load(None).unwrap();
    assert_eq!(config.backend.api_key.as_deref(), Some("conventional"));
    assert!(config.validate().is_ok());

    env.set("STUDYFORGE_BACKEND__API_KEY", "explicit");
    let config = ConfigLoader::load(None).unwrap();
    assert_eq!(config.backend.api_key.as_deref(), Some("explicit"));
}

#[test]
fn test_redacted_config_hides_key() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("keyed.toml");
    std::fs::write(&config_file, "[backend]\napi_key = \"sk-secret\"\n").unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    let printed = toml::to_string_pretty(&config.redacted()).unwrap();
    assert!(!printed.contains("sk-secret"));
    assert!(printed.contains("***"));
}

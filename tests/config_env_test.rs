use codesync::{Settings, Visibility};
use std::env;
use tempfile::TempDir;

// One test per process-wide env mutation; the variables below are not read
// by any other test in this binary.
#[test]
fn test_env_override_with_nested_keys() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    std::fs::write(
        &config_path,
        r#"
source = "from-file"

[watch]
debounce_ms = 900

[api]
timeout_secs = 3
"#,
    )
    .unwrap();

    unsafe {
        // Double underscore separates nested levels
        env::set_var("CODESYNC_WATCH__DEBOUNCE_MS", "250");
        env::set_var("CODESYNC_BOOTSTRAP__DAEMON_VISIBILITY", "public");
        env::set_var("CODESYNC_DEFAULT_BRANCH", "trunk");
    }

    let settings = Settings::load_from(&config_path).unwrap();

    unsafe {
        env::remove_var("CODESYNC_WATCH__DEBOUNCE_MS");
        env::remove_var("CODESYNC_BOOTSTRAP__DAEMON_VISIBILITY");
        env::remove_var("CODESYNC_DEFAULT_BRANCH");
    }

    // Env beats the file
    assert_eq!(settings.watch.debounce_ms, 250);
    // Single underscore stays part of the key
    assert_eq!(settings.default_branch, "trunk");
    assert_eq!(settings.bootstrap.daemon_visibility, Visibility::Public);
    // File beats defaults
    assert_eq!(settings.source, "from-file");
    assert_eq!(settings.api.timeout_secs, 3);
    // Untouched keys keep their defaults
    assert_eq!(settings.bootstrap.max_file_size, 2 * 1024 * 1024);
}

#[test]
fn test_missing_file_gives_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let settings = Settings::load_from(temp_dir.path().join("absent.toml")).unwrap();

    assert_eq!(settings.version, 1);
    assert_eq!(settings.api.timeout_secs, 10);
    assert_eq!(settings.logging.default, "warn");
}

#[test]
fn test_invalid_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    std::fs::write(&config_path, "[watch]\ndebounce_ms = \"soon\"\n").unwrap();

    assert!(Settings::load_from(&config_path).is_err());
}

use std::process::Command;
use tempfile::TempDir;

fn codesync(root: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_codesync"));
    cmd.env("CODESYNC_ROOT", root)
        .env("CODESYNC_CONFIG", root.join("settings.toml"))
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_config_init_command() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    let output = codesync(root)
        .args(["config", "--init"])
        .output()
        .expect("Failed to run config --init");
    assert!(output.status.success());

    let config_path = root.join("settings.toml");
    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("version = 1"));
    assert!(content.contains("[api]"));
    assert!(content.contains("[watch]"));

    // A second run refuses to overwrite
    let output = codesync(root).args(["config", "--init"]).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("already exists"));

    let output = codesync(root)
        .args(["config", "--init", "--force"])
        .output()
        .unwrap();
    assert!(output.status.success());
}

#[test]
fn test_config_command() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    let custom = root.join("custom.toml");
    std::fs::write(
        &custom,
        r#"
version = 2
[watch]
debounce_ms = 1234
"#,
    )
    .unwrap();

    let output = codesync(root)
        .args(["config", "-c"])
        .arg(&custom)
        .output()
        .expect("Failed to run config command");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Current Configuration:"));
    assert!(stdout.contains("version = 2"));
    assert!(stdout.contains("debounce_ms = 1234"));
}

#[test]
fn test_pending_on_empty_buffer() {
    let temp_dir = TempDir::new().unwrap();

    let output = codesync(temp_dir.path())
        .arg("pending")
        .output()
        .expect("Failed to run pending command");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("No pending diffs"));
}

#[test]
fn test_init_requires_token() {
    let temp_dir = TempDir::new().unwrap();

    let output = codesync(temp_dir.path())
        .env_remove("CODESYNC_TOKEN")
        .arg("init")
        .output()
        .unwrap();
    assert!(!output.status.success());
}

//! CLI smoke tests

use assert_cmd::Command;

#[test]
fn test_help_lists_subcommands() {
    let output = Command::cargo_bin("slack-thread-downloader")
        .unwrap()
        .arg("--help")
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout).to_string();
    assert!(stdout.contains("threads"));
    assert!(stdout.contains("replies"));
    assert!(stdout.contains("--concurrency"));
}

#[test]
fn test_missing_config_fails_before_any_network_activity() {
    let dir = tempfile::TempDir::new().unwrap();

    Command::cargo_bin("slack-thread-downloader")
        .unwrap()
        .args([
            "threads",
            "--config",
            dir.path().join("absent.json").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_config_missing_token_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = dir.path().join("config.json");
    std::fs::write(&config_path, r#"{"CHANNEL_ID": "C012345"}"#).unwrap();

    Command::cargo_bin("slack-thread-downloader")
        .unwrap()
        .args(["threads", "--config", config_path.to_str().unwrap()])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_concurrency_out_of_range_is_rejected() {
    Command::cargo_bin("slack-thread-downloader")
        .unwrap()
        .args(["--concurrency", "99", "threads"])
        .assert()
        .failure();
}

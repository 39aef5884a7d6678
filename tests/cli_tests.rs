use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn matchreel(data: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("matchreel").unwrap();
    cmd.env_remove("MATCHREEL_CONFIG")
        .env_remove("RUST_LOG")
        .env("MATCHREEL_DATA_DIR", data.path())
        .env("MATCHREEL_DOWNLOADS_DIR", data.path().join("downloads"));
    cmd
}

#[test]
fn test_help_lists_commands() {
    let data = TempDir::new().unwrap();
    matchreel(&data)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("add-action"))
        .stdout(predicate::str::contains("export-pdf"));
}

#[test]
fn test_init_creates_folders_and_reports_version() {
    let data = TempDir::new().unwrap();
    matchreel(&data)
        .args(["--json", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"appVersion\""))
        .stdout(predicate::str::contains("\"games\": []"));

    assert!(data.path().join("work").is_dir());
    assert!(data.path().join("logs").join("matchreel.log").exists());
}

#[test]
fn test_unknown_game_is_reported_as_not_found() {
    let data = TempDir::new().unwrap();
    matchreel(&data)
        .args(["--json", "show", "42"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"NOT_FOUND\""));
}

#[test]
fn test_invalid_offset_is_rejected_by_parser() {
    let data = TempDir::new().unwrap();
    matchreel(&data)
        .args(["add-action", "1", "--offset", "soon", "--sector", "ATTACK", "--fault", "NET_TOUCH"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("offset"));
}

#[test]
fn test_bad_config_file_fails() {
    let data = TempDir::new().unwrap();
    let config = data.path().join("broken.toml");
    std::fs::write(&config, "[storage]\nsafety_margin = -1.0\n").unwrap();

    matchreel(&data)
        .arg("--config")
        .arg(&config)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("safety_margin"));
}

//! Command-line behavior of the `servicho` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn servicho() -> Command {
    Command::new(env!("CARGO_BIN_EXE_servicho"))
}

#[test]
fn help_describes_root_argument() {
    servicho()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ROOT"))
        .stdout(predicate::str::contains("--no-color"));
}

#[test]
fn missing_root_fails() {
    let temp = TempDir::new().unwrap();
    servicho()
        .arg(temp.path().join("does-not-exist"))
        .arg("--no-color")
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist"));
}

#[test]
fn invalid_config_fails_before_binding() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("servicho.config.json"),
        r#"{ "ports": [14001] }"#,
    )
    .unwrap();

    servicho()
        .arg(temp.path())
        .arg("--no-color")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ports"));
}

#[test]
fn verbose_and_quiet_conflict() {
    servicho().args(["-v", "-q"]).assert().failure();
}

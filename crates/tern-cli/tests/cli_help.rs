use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("tern")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("exec"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_exec_help_shows_prompt_flag() {
    cargo_bin_cmd!("tern")
        .args(["exec", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--prompt"));
}

#[test]
fn test_help_shows_global_flags() {
    cargo_bin_cmd!("tern")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--root"))
        .stdout(predicate::str::contains("--model"))
        .stdout(predicate::str::contains("--system-prompt"))
        .stdout(predicate::str::contains("--max-turns"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("tern")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1"));
}

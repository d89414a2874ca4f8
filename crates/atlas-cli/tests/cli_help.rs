use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("atlas")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("fetch"))
        .stdout(predicate::str::contains("logout"));
}

#[test]
fn test_fetch_help_shows_cache_flags() {
    cargo_bin_cmd!("atlas")
        .args(["fetch", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--query"))
        .stdout(predicate::str::contains("--ttl"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("atlas")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("atlas"));
}

#[test]
fn test_fetch_rejects_malformed_query() {
    cargo_bin_cmd!("atlas")
        .args(["fetch", "/places/recommended", "--query", "not-a-pair"])
        .env("ATLAS_HOME", env!("CARGO_TARGET_TMPDIR"))
        .env("ATLAS_BASE_URL", "http://127.0.0.1:9") // never reached
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected key=value"));
}

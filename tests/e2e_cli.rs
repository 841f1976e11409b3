//! CLI end-to-end tests
//!
//! Tests for the slidecast command-line interface.

mod common;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the slidecast binary, run from an empty directory so
/// no stray `./slidecast.toml` is picked up.
#[allow(deprecated)]
fn slidecast_cmd(cwd: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("slidecast").unwrap();
    cmd.current_dir(cwd).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_no_args_shows_help() {
    let dir = tempdir().unwrap();
    slidecast_cmd(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let dir = tempdir().unwrap();
    slidecast_cmd(dir.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("slidecast "));
}

#[test]
fn test_cli_render_help() {
    let dir = tempdir().unwrap();
    slidecast_cmd(dir.path())
        .args(["render", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--image"))
        .stdout(predicate::str::contains("--preset"));
}

#[test]
fn test_cli_effects_lists_catalog() {
    let dir = tempdir().unwrap();
    slidecast_cmd(dir.path())
        .arg("effects")
        .assert()
        .success()
        .stdout(predicate::str::contains("kenburns"))
        .stdout(predicate::str::contains("circlecrop"))
        .stdout(predicate::str::contains("warm_memories"));
}

#[test]
fn test_cli_effects_json() {
    let dir = tempdir().unwrap();
    let output = slidecast_cmd(dir.path())
        .args(["effects", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["effects"]["transitions"].as_array().unwrap().len(), 12);
    assert_eq!(value["presets"].as_array().unwrap().len(), 8);
}

#[test]
fn test_cli_describe() {
    let dir = tempdir().unwrap();
    slidecast_cmd(dir.path())
        .args(["describe", "motion", "kenburns"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kenburns"));

    slidecast_cmd(dir.path())
        .args(["describe", "motion", "wobble"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"kind\":\"not_found\""));
}

#[test]
fn test_cli_preset() {
    let dir = tempdir().unwrap();
    slidecast_cmd(dir.path())
        .args(["preset", "cinematic"])
        .assert()
        .success()
        .stdout(predicate::str::contains("light_leaks"))
        .stdout(predicate::str::contains("kenburns"));

    slidecast_cmd(dir.path())
        .args(["preset", "psychedelic"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not_found"));
}

#[test]
fn test_cli_validate_default_config() {
    let dir = tempdir().unwrap();
    slidecast_cmd(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_cli_validate_rejects_bad_config() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("bad.toml");
    std::fs::write(&config, "[video]\nfps = 0\n").unwrap();

    slidecast_cmd(dir.path())
        .arg("validate")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("fps"));
}

#[test]
fn test_cli_ledger_empty() {
    let dir = tempdir().unwrap();
    slidecast_cmd(dir.path())
        .arg("ledger")
        .assert()
        .success()
        .stdout(predicate::str::contains("No renders recorded"));
}

#[test]
fn test_cli_render_rejects_unknown_effect() {
    let dir = tempdir().unwrap();
    slidecast_cmd(dir.path())
        .args(["render", "-i", "a.jpg", "-a", "voice.mp3"])
        .args(["--effects", r#"{"transition":"spiral"}"#])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"kind\":\"validation\""))
        .stderr(predicate::str::contains("spiral"));
}

#[test]
fn test_cli_render_rejects_malformed_effects() {
    let dir = tempdir().unwrap();
    slidecast_cmd(dir.path())
        .args(["render", "-i", "a.jpg", "-a", "voice.mp3"])
        .args(["--effects", r#"{"sparkle":true}"#])
        .assert()
        .failure()
        .stderr(predicate::str::contains("validation"));
}

#[cfg(unix)]
mod with_fake_tools {
    use super::*;
    use crate::common::{TestHarness, FAILING_FFMPEG};

    #[test]
    fn test_cli_render_then_ledger() {
        let h = TestHarness::new();
        let config = h.config_file();
        let image = h.input("a.jpg");
        let voice = h.input("voice.mp3");

        let output = slidecast_cmd(h.dir.path())
            .arg("--config")
            .arg(&config)
            .arg("render")
            .arg("-i")
            .arg(&image)
            .arg("-a")
            .arg(&voice)
            .args(["--preset", "minimal", "--json"])
            .output()
            .unwrap();
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

        let outcome: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let filename = outcome["output_filename"].as_str().unwrap().to_string();
        assert!(filename.starts_with("slideshow_"));
        assert_eq!(outcome["duration_source"], "probe");
        assert_eq!(outcome["effects"]["transition"], "crossfade");

        slidecast_cmd(h.dir.path())
            .arg("--config")
            .arg(&config)
            .args(["ledger", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains(filename));
    }

    #[test]
    fn test_cli_render_failure_reports_encoding_error() {
        let h = TestHarness::with_ffmpeg(FAILING_FFMPEG);
        let config = h.config_file();

        slidecast_cmd(h.dir.path())
            .arg("--config")
            .arg(&config)
            .arg("render")
            .arg("-i")
            .arg(h.input("a.jpg"))
            .arg("-a")
            .arg(h.input("voice.mp3"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("\"kind\":\"encoding\""));

        slidecast_cmd(h.dir.path())
            .arg("--config")
            .arg(&config)
            .arg("ledger")
            .assert()
            .success()
            .stdout(predicate::str::contains("No renders recorded"));
    }

    #[test]
    fn test_cli_probe_uses_ffprobe() {
        let h = TestHarness::new();
        let config = h.config_file();

        slidecast_cmd(h.dir.path())
            .arg("--config")
            .arg(&config)
            .arg("probe")
            .arg(h.input("voice.mp3"))
            .assert()
            .success()
            .stdout(predicate::str::contains("Duration: 30.000s"))
            .stdout(predicate::str::contains("Source: probe"));
    }

    #[test]
    fn test_cli_check_tools_with_configured_paths() {
        let h = TestHarness::new();
        let config = h.config_file();

        slidecast_cmd(h.dir.path())
            .arg("--config")
            .arg(&config)
            .arg("check-tools")
            .assert()
            .success()
            .stdout(predicate::str::contains("ffmpeg"))
            .stdout(predicate::str::contains("ffprobe"));
    }
}

//! Shared test harness for integration tests.
//!
//! [`TestHarness`] lays out a temp directory with executable ffmpeg and
//! ffprobe stand-ins, a config pointing every storage path into it, and a
//! [`RenderService`] wired to that config. The stand-ins log their argument
//! vectors so tests can inspect what would have been run.

#![cfg(unix)]
#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use slidecast_av::ToolRegistry;
use slidecast_core::config::Config;
use slidecast_core::events::EventBus;
use slidecast_pipeline::RenderService;
use tempfile::TempDir;

/// Narration length reported by the fake ffprobe.
pub const PROBED_SECONDS: f64 = 30.0;

/// ffmpeg stand-in: reports some progress and writes its last argument.
pub const WORKING_FFMPEG: &str = r#"for last; do :; done
echo "out_time=00:00:07.500000" >&2
echo "progress=continue" >&2
echo "out_time=00:00:30.000000" >&2
echo "progress=end" >&2
printf 'fake media' > "$last""#;

/// ffmpeg stand-in that rejects every invocation.
pub const FAILING_FFMPEG: &str = r#"echo "[AVFilterGraph @ 0x1] No such filter: 'bogus'" >&2
echo "Error initializing complex filters." >&2
exit 1"#;

pub struct TestHarness {
    pub dir: TempDir,
    pub config: Arc<Config>,
    pub events: Arc<EventBus>,
    pub service: RenderService,
}

impl TestHarness {
    /// Harness whose ffmpeg succeeds.
    pub fn new() -> Self {
        Self::with_ffmpeg(WORKING_FFMPEG)
    }

    /// Harness with a custom ffmpeg script body.
    pub fn with_ffmpeg(body: &str) -> Self {
        Self::with_config(body, |_| {})
    }

    /// Harness with a custom ffmpeg script body and config adjustments
    /// applied on top of the harness defaults.
    pub fn with_config(body: &str, adjust: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let log = dir.path().join("calls.log");

        let ffmpeg = script(
            dir.path(),
            "ffmpeg",
            &format!("echo \"$*\" >> '{}'\n{body}", log.display()),
        );
        let ffprobe = script(dir.path(), "ffprobe", &format!("echo {PROBED_SECONDS:.6}"));

        let mut config = Config::default();
        config.tools.ffmpeg_path = Some(ffmpeg);
        config.tools.ffprobe_path = Some(ffprobe);
        config.storage.output_dir = dir.path().join("output");
        config.storage.work_dir = dir.path().join("work");
        config.storage.ledger_path = dir.path().join("ledger.json");
        config.jobs.encode_timeout_secs = 30;
        config.jobs.probe_timeout_secs = 10;
        adjust(&mut config);

        let config = Arc::new(config);
        let tools = Arc::new(ToolRegistry::discover(&config.tools));
        let events = Arc::new(EventBus::default());
        let service = RenderService::new(Arc::clone(&config), tools, Arc::clone(&events));

        Self {
            dir,
            config,
            events,
            service,
        }
    }

    /// Create a small input file.
    pub fn input(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join("input").join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not really media").unwrap();
        path
    }

    /// Argument lines of every ffmpeg invocation, in order.
    pub fn ffmpeg_calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join("calls.log"))
            .map(|s| s.lines().map(String::from).collect())
            .unwrap_or_default()
    }

    /// Files left in the scratch root.
    pub fn work_dir_entries(&self) -> usize {
        std::fs::read_dir(&self.config.storage.work_dir)
            .map(|d| d.count())
            .unwrap_or(0)
    }

    /// Write the harness config as TOML for CLI tests.
    pub fn config_file(&self) -> PathBuf {
        let path = self.dir.path().join("slidecast.toml");
        let toml = format!(
            r#"[tools]
ffmpeg_path = "{ffmpeg}"
ffprobe_path = "{ffprobe}"

[storage]
output_dir = "{output}"
work_dir = "{work}"
ledger_path = "{ledger}"

[jobs]
encode_timeout_secs = 30
"#,
            ffmpeg = self.config.tools.ffmpeg_path.as_ref().unwrap().display(),
            ffprobe = self.config.tools.ffprobe_path.as_ref().unwrap().display(),
            output = self.config.storage.output_dir.display(),
            work = self.config.storage.work_dir.display(),
            ledger = self.config.storage.ledger_path.display(),
        );
        std::fs::write(&path, toml).unwrap();
        path
    }
}

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

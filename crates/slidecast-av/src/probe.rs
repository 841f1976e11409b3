//! Media duration probing.
//!
//! [`MediaProbe`] covers the two tool-backed tiers of duration estimation:
//! container metadata via ffprobe, and the `Duration:` line ffmpeg prints
//! when it opens an input. [`FfmpegProbe`] is the production backend; tests
//! substitute their own implementations.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use slidecast_core::{Error, Result};

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// Duration lookups against a media file.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Duration from container metadata.
    async fn probe_duration(&self, path: &Path) -> Result<f64>;

    /// Duration recovered from the diagnostics printed while opening the
    /// file for a (discarded) decode.
    async fn scan_duration(&self, path: &Path) -> Result<f64>;
}

/// [`MediaProbe`] backed by the ffprobe and ffmpeg CLIs.
#[derive(Debug, Clone)]
pub struct FfmpegProbe {
    tools: Arc<ToolRegistry>,
    timeout: Duration,
}

impl FfmpegProbe {
    pub fn new(tools: Arc<ToolRegistry>, timeout: Duration) -> Self {
        Self { tools, timeout }
    }
}

#[async_trait]
impl MediaProbe for FfmpegProbe {
    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let ffprobe = self.tools.require("ffprobe")?;

        let output = ToolCommand::new(ffprobe.path.clone())
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path.to_string_lossy())
            .timeout(self.timeout)
            .execute()
            .await?;

        parse_probe_output(&output.stdout).ok_or_else(|| {
            Error::Probe(format!(
                "no duration reported for {}: {:?}",
                path.display(),
                output.stdout.trim()
            ))
        })
    }

    async fn scan_duration(&self, path: &Path) -> Result<f64> {
        let ffmpeg = self.tools.require("ffmpeg")?;

        // Decode a sliver into the null muxer; the input banner on stderr
        // carries the container duration. Exit status is irrelevant.
        let output = ToolCommand::new(ffmpeg.path.clone())
            .args(["-hide_banner", "-nostdin", "-i"])
            .arg(path.to_string_lossy())
            .args(["-t", "0.01", "-f", "null", "-"])
            .timeout(self.timeout)
            .execute_unchecked()
            .await?;

        parse_diagnostic_duration(&output.stderr).ok_or_else(|| {
            Error::Probe(format!("no Duration line in ffmpeg output for {}", path.display()))
        })
    }
}

/// Parse ffprobe's bare `format=duration` output.
fn parse_probe_output(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .and_then(|l| l.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
}

/// Extract the duration from an ffmpeg input banner, e.g.
/// `  Duration: 00:01:30.45, start: 0.000000, bitrate: 128 kb/s`.
///
/// Returns `None` for a missing line, `N/A`, or a zero duration.
pub fn parse_diagnostic_duration(text: &str) -> Option<f64> {
    text.lines().find_map(|line| {
        let rest = line.trim_start().strip_prefix("Duration:")?;
        let stamp = rest.split(',').next()?.trim();
        let secs = parse_hms(stamp)?;
        (secs > 0.0).then_some(secs)
    })
}

/// Strict `HH:MM:SS(.fff)` parser.
pub(crate) fn parse_hms(stamp: &str) -> Option<f64> {
    let stamp = stamp.trim();
    if stamp.starts_with('-') {
        return None;
    }
    let mut parts = stamp.split(':');
    let h: f64 = parts.next()?.trim().parse().ok()?;
    let m: f64 = parts.next()?.trim().parse().ok()?;
    let s: f64 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let total = h * 3600.0 + m * 60.0 + s;
    (total.is_finite() && h >= 0.0 && m >= 0.0 && s >= 0.0).then_some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_output_parsing() {
        assert_eq!(parse_probe_output("30.000000\n"), Some(30.0));
        assert_eq!(parse_probe_output("\n  12.5  \n"), Some(12.5));
        assert_eq!(parse_probe_output("N/A\n"), None);
        assert_eq!(parse_probe_output(""), None);
        assert_eq!(parse_probe_output("0.000000"), None);
    }

    #[test]
    fn diagnostic_duration_from_banner() {
        let stderr = "\
Input #0, mp3, from 'voice.mp3':
  Metadata:
    encoder         : Lavf58.76.100
  Duration: 00:01:30.45, start: 0.025057, bitrate: 128 kb/s
  Stream #0:0: Audio: mp3, 44100 Hz, stereo, fltp, 128 kb/s";
        let d = parse_diagnostic_duration(stderr).unwrap();
        assert!((d - 90.45).abs() < 1e-9);
    }

    #[test]
    fn diagnostic_duration_missing_or_unknown() {
        assert_eq!(parse_diagnostic_duration("voice.mp3: Invalid data found"), None);
        assert_eq!(
            parse_diagnostic_duration("  Duration: N/A, start: 0.000000, bitrate: N/A"),
            None
        );
        assert_eq!(parse_diagnostic_duration("  Duration: 00:00:00.00, start: 0"), None);
    }

    #[test]
    fn hms_parsing() {
        assert_eq!(parse_hms("01:00:00"), Some(3600.0));
        assert_eq!(parse_hms("00:00:07.5"), Some(7.5));
        assert_eq!(parse_hms("00:07.5"), None);
        assert_eq!(parse_hms("-00:00:01"), None);
    }

    #[cfg(unix)]
    mod with_fake_tools {
        use super::super::*;
        use slidecast_core::config::ToolsConfig;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
            let path = dir.join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[tokio::test]
        async fn both_tiers_use_configured_tools() {
            let dir = tempfile::tempdir().unwrap();
            let ffprobe = script(dir.path(), "ffprobe", "echo 42.5");
            let ffmpeg = script(
                dir.path(),
                "ffmpeg",
                "echo '  Duration: 00:00:12.00, start: 0.0' >&2; exit 1",
            );
            let tools = ToolRegistry::discover(&ToolsConfig {
                ffmpeg_path: Some(ffmpeg),
                ffprobe_path: Some(ffprobe),
            });
            let probe = FfmpegProbe::new(Arc::new(tools), Duration::from_secs(10));

            let audio = dir.path().join("voice.mp3");
            std::fs::write(&audio, b"ID3").unwrap();

            assert_eq!(probe.probe_duration(&audio).await.unwrap(), 42.5);
            assert_eq!(probe.scan_duration(&audio).await.unwrap(), 12.0);
        }
    }
}

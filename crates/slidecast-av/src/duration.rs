//! Narration duration estimation and segment timing.
//!
//! [`DurationEstimator::estimate_total`] tries, in order, and stops at the
//! first tier that yields a positive duration:
//!
//! 1. container metadata ([`MediaProbe::probe_duration`])
//! 2. the ffmpeg input banner ([`MediaProbe::scan_duration`])
//! 3. file size at a reference bitrate, clamped to a safety window
//! 4. the caller's fallback
//!
//! Estimation never fails; only the segment split can.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use slidecast_core::config::DurationConfig;
use slidecast_core::{Error, Result};

use crate::probe::MediaProbe;

/// Used when neither the caller nor the config supplies a usable fallback.
const LAST_RESORT_SECONDS: f64 = 30.0;

/// Which tier produced a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationSource {
    Probe,
    Diagnostic,
    FileSize,
    Fallback,
}

impl DurationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DurationSource::Probe => "probe",
            DurationSource::Diagnostic => "diagnostic",
            DurationSource::FileSize => "file_size",
            DurationSource::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for DurationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A duration together with the tier it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationEstimate {
    pub seconds: f64,
    pub source: DurationSource,
}

/// Layered duration estimator.
#[derive(Clone)]
pub struct DurationEstimator {
    probe: Arc<dyn MediaProbe>,
    config: DurationConfig,
}

impl DurationEstimator {
    pub fn new(probe: Arc<dyn MediaProbe>, config: DurationConfig) -> Self {
        Self { probe, config }
    }

    /// Total duration of `path` in seconds. Always positive.
    pub async fn estimate_total(&self, path: &Path, fallback_seconds: f64) -> f64 {
        self.estimate_detailed(path, fallback_seconds).await.seconds
    }

    /// Like [`estimate_total`](Self::estimate_total), also reporting which
    /// tier answered.
    pub async fn estimate_detailed(&self, path: &Path, fallback_seconds: f64) -> DurationEstimate {
        match self.probe.probe_duration(path).await {
            Ok(seconds) if usable(seconds) => {
                return DurationEstimate {
                    seconds,
                    source: DurationSource::Probe,
                }
            }
            Ok(seconds) => tracing::debug!(path = %path.display(), seconds, "probe returned unusable duration"),
            Err(e) => tracing::debug!(path = %path.display(), error = %e, "probe failed"),
        }

        match self.probe.scan_duration(path).await {
            Ok(seconds) if usable(seconds) => {
                tracing::debug!(path = %path.display(), seconds, "duration from ffmpeg diagnostics");
                return DurationEstimate {
                    seconds,
                    source: DurationSource::Diagnostic,
                };
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(path = %path.display(), error = %e, "diagnostic scan failed"),
        }

        match tokio::fs::metadata(path).await {
            Ok(meta) => {
                if let Some(seconds) = size_estimate(meta.len(), &self.config) {
                    tracing::warn!(
                        path = %path.display(),
                        bytes = meta.len(),
                        seconds,
                        "duration estimated from file size"
                    );
                    return DurationEstimate {
                        seconds,
                        source: DurationSource::FileSize,
                    };
                }
            }
            Err(e) => tracing::debug!(path = %path.display(), error = %e, "cannot stat file"),
        }

        let seconds = [fallback_seconds, self.config.fallback_seconds]
            .into_iter()
            .find(|s| usable(*s))
            .unwrap_or(LAST_RESORT_SECONDS);
        tracing::warn!(path = %path.display(), seconds, "duration unknown, using fallback");
        DurationEstimate {
            seconds,
            source: DurationSource::Fallback,
        }
    }
}

fn usable(seconds: f64) -> bool {
    seconds.is_finite() && seconds > 0.0
}

/// Estimate duration from file size at the configured reference bitrate,
/// clamped to `[min_seconds, max_seconds]`. `None` for empty files, a zero
/// bitrate, or a window that is not a finite positive range.
pub fn size_estimate(size_bytes: u64, config: &DurationConfig) -> Option<f64> {
    if size_bytes == 0 || config.reference_bitrate == 0 {
        return None;
    }
    let (min, max) = (config.min_seconds, config.max_seconds);
    if !usable(min) || !usable(max) || min > max {
        tracing::debug!(min, max, "size estimate skipped, duration window is invalid");
        return None;
    }
    let raw = size_bytes as f64 * 8.0 / config.reference_bitrate as f64;
    Some(raw.clamp(min, max))
}

/// Split `total_seconds` equally across `count` segments.
///
/// # Errors
///
/// [`Error::Validation`] when `count` is zero or `total_seconds` is not a
/// positive number.
pub fn segment_durations(total_seconds: f64, count: usize) -> Result<Vec<f64>> {
    if count == 0 {
        return Err(Error::Validation("cannot split duration across zero images".into()));
    }
    if !usable(total_seconds) {
        return Err(Error::Validation(format!(
            "total duration must be positive, got {total_seconds}"
        )));
    }
    Ok(vec![total_seconds / count as f64; count])
}

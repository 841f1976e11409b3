//! Narration concatenation.
//!
//! Several narration parts, possibly in different formats, become one track:
//! each part is converted (one at a time) to a canonical PCM WAV in a scratch
//! workspace, the parts are listed in a concat-demuxer manifest, and a single
//! ffmpeg pass writes the merged output. The workspace is removed whatever
//! the outcome.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use slidecast_core::config::AudioConfig;
use slidecast_core::{Error, Result};
use tokio_util::sync::CancellationToken;

use crate::command::ToolCommand;
use crate::duration::{DurationEstimator, DurationSource};
use crate::tools::ToolRegistry;
use crate::workspace::JobWorkspace;

/// Name of the manifest file inside the concat workspace.
const MANIFEST_NAME: &str = "concat.txt";

/// Intermediate format every part is converted to before concatenation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CanonicalAudio {
    pub sample_rate: u32,
    pub channels: u32,
    pub bit_depth: u32,
}

impl CanonicalAudio {
    /// PCM codec for the configured bit depth.
    pub fn codec(&self) -> &'static str {
        match self.bit_depth {
            24 => "pcm_s24le",
            32 => "pcm_s32le",
            _ => "pcm_s16le",
        }
    }
}

impl From<&AudioConfig> for CanonicalAudio {
    fn from(cfg: &AudioConfig) -> Self {
        Self {
            sample_rate: cfg.sample_rate,
            channels: cfg.channels,
            bit_depth: cfg.bit_depth,
        }
    }
}

impl Default for CanonicalAudio {
    fn default() -> Self {
        Self::from(&AudioConfig::default())
    }
}

/// Encoder for the merged track, chosen by output extension. Unknown
/// extensions get MP3.
pub fn output_codec(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp3" => "libmp3lame",
        "m4a" | "aac" => "aac",
        "wav" => "pcm_s16le",
        "ogg" => "libvorbis",
        "flac" => "flac",
        "opus" => "libopus",
        _ => "libmp3lame",
    }
}

/// Outcome of [`AudioConcatenator::concatenate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcatResult {
    pub output_path: PathBuf,
    pub total_duration: f64,
    pub source_count: usize,
    pub duration_source: DurationSource,
}

/// The two ffmpeg passes concatenation needs. Both stop with
/// [`Error::Cancelled`] once `cancel` fires.
#[async_trait]
pub trait AudioTranscoder: Send + Sync {
    /// Convert `input` to the canonical intermediate format at `output`.
    async fn normalize(
        &self,
        input: &Path,
        output: &Path,
        format: &CanonicalAudio,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Run the concat demuxer over `manifest`, encoding with `codec`.
    async fn concat(
        &self,
        manifest: &Path,
        output: &Path,
        codec: &str,
        cancel: &CancellationToken,
    ) -> Result<()>;
}

/// [`AudioTranscoder`] backed by the ffmpeg CLI.
#[derive(Debug, Clone)]
pub struct FfmpegAudio {
    tools: Arc<ToolRegistry>,
    timeout: Duration,
}

impl FfmpegAudio {
    pub fn new(tools: Arc<ToolRegistry>, timeout: Duration) -> Self {
        Self { tools, timeout }
    }
}

#[async_trait]
impl AudioTranscoder for FfmpegAudio {
    async fn normalize(
        &self,
        input: &Path,
        output: &Path,
        format: &CanonicalAudio,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let ffmpeg = self.tools.require("ffmpeg")?;
        ToolCommand::new(ffmpeg.path.clone())
            .args(["-hide_banner", "-nostdin", "-y", "-i"])
            .arg(input.to_string_lossy())
            .args(["-vn", "-ar"])
            .arg(format.sample_rate.to_string())
            .arg("-ac")
            .arg(format.channels.to_string())
            .args(["-c:a", format.codec()])
            .arg(output.to_string_lossy())
            .timeout(self.timeout)
            .execute_with_stderr_callback(|_| {}, Some(cancel.clone()))
            .await?;
        Ok(())
    }

    async fn concat(
        &self,
        manifest: &Path,
        output: &Path,
        codec: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let ffmpeg = self.tools.require("ffmpeg")?;
        ToolCommand::new(ffmpeg.path.clone())
            .args(["-hide_banner", "-nostdin", "-y", "-f", "concat", "-safe", "0", "-i"])
            .arg(manifest.to_string_lossy())
            .args(["-vn", "-c:a", codec])
            .arg(output.to_string_lossy())
            .timeout(self.timeout)
            .execute_with_stderr_callback(|_| {}, Some(cancel.clone()))
            .await?;
        Ok(())
    }
}

/// Merges narration parts into one track.
#[derive(Clone)]
pub struct AudioConcatenator {
    transcoder: Arc<dyn AudioTranscoder>,
    estimator: DurationEstimator,
    format: CanonicalAudio,
    work_root: PathBuf,
    fallback_seconds: f64,
}

impl AudioConcatenator {
    pub fn new(
        transcoder: Arc<dyn AudioTranscoder>,
        estimator: DurationEstimator,
        format: CanonicalAudio,
        work_root: PathBuf,
        fallback_seconds: f64,
    ) -> Self {
        Self {
            transcoder,
            estimator,
            format,
            work_root,
            fallback_seconds,
        }
    }

    /// Merge `paths` (in order) into `output` and measure the result.
    ///
    /// A single input is copied byte for byte. Several inputs are normalized
    /// sequentially, then joined in one concat-demuxer pass.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for an empty list, a missing file, or an empty
    ///   file.
    /// - [`Error::Tool`] when a conversion or the concat pass fails.
    /// - [`Error::Cancelled`] when `cancel` fires; no further ffmpeg run starts.
    /// - [`Error::System`] for filesystem failures.
    pub async fn concatenate(
        &self,
        paths: &[PathBuf],
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<ConcatResult> {
        validate_inputs(paths).await?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::system(format!("create {}", parent.display()), e))?;
        }

        if let [single] = paths {
            if !same_file(single, output) {
                tokio::fs::copy(single, output).await.map_err(|e| {
                    Error::system(
                        format!("copy {} to {}", single.display(), output.display()),
                        e,
                    )
                })?;
            }
        } else {
            let workspace = JobWorkspace::new_in(&self.work_root, "concat-")?;
            let merged = self.merge(paths, output, &workspace, cancel).await;
            if let Err(e) = workspace.close() {
                tracing::warn!(error = %e, "failed to remove concat workspace");
            }
            merged?;
        }

        let estimate = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled("measuring merged narration")),
            estimate = self.estimator.estimate_detailed(output, self.fallback_seconds) => estimate,
        };

        tracing::info!(
            sources = paths.len(),
            output = %output.display(),
            seconds = estimate.seconds,
            "narration ready"
        );

        Ok(ConcatResult {
            output_path: output.to_path_buf(),
            total_duration: estimate.seconds,
            source_count: paths.len(),
            duration_source: estimate.source,
        })
    }

    async fn merge(
        &self,
        paths: &[PathBuf],
        output: &Path,
        workspace: &JobWorkspace,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut parts = Vec::with_capacity(paths.len());

        // One external process at a time.
        for (i, input) in paths.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(cancelled("converting narration parts"));
            }
            let name = format!("part{i:03}.wav");
            let part = workspace.file(&name);
            tracing::debug!(input = %input.display(), part = %name, "normalizing narration part");
            self.transcoder
                .normalize(input, &part, &self.format, cancel)
                .await?;
            parts.push(name);
        }

        let manifest = workspace.file(MANIFEST_NAME);
        tokio::fs::write(&manifest, manifest_contents(&parts))
            .await
            .map_err(|e| Error::system(format!("write manifest {}", manifest.display()), e))?;

        if cancel.is_cancelled() {
            return Err(cancelled("joining narration parts"));
        }
        self.transcoder
            .concat(&manifest, output, output_codec(output), cancel)
            .await
    }
}

fn cancelled(stage: &str) -> Error {
    Error::Cancelled(format!("narration merge cancelled while {stage}"))
}

async fn validate_inputs(paths: &[PathBuf]) -> Result<()> {
    if paths.is_empty() {
        return Err(Error::Validation("no audio files supplied".into()));
    }
    for path in paths {
        let meta = tokio::fs::metadata(path).await.map_err(|_| {
            Error::Validation(format!("audio file not found: {}", path.display()))
        })?;
        if !meta.is_file() {
            return Err(Error::Validation(format!(
                "audio path is not a file: {}",
                path.display()
            )));
        }
        if meta.len() == 0 {
            return Err(Error::Validation(format!(
                "audio file is empty: {}",
                path.display()
            )));
        }
    }
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Concat-demuxer manifest. Entries are relative to the manifest's own
/// directory.
fn manifest_contents(entries: &[String]) -> String {
    entries
        .iter()
        .map(|e| format!("file '{}'\n", e.replace('\'', r"'\''")))
        .collect()
}

//! Encoding orchestration.
//!
//! One [`EncodingOrchestrator::submit`] call starts exactly one ffmpeg
//! process for a compiled [`FilterGraph`] plus its narration track. The
//! returned [`EncodeHandle`] streams [`EncodeEvent`]s, exposes the current
//! [`EncodeState`], and resolves once with the terminal result.
//!
//! ffmpeg runs with `-progress pipe:2`, so progress arrives on stderr as
//! `key=value` blocks; `out_time` is turned into a completion fraction by
//! [`ProgressTracker`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use slidecast_core::config::VideoConfig;
use slidecast_core::{Error, Result};
use slidecast_graph::{FilterGraph, GraphInput};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::command::ToolCommand;
use crate::probe::parse_hms;
use crate::tools::ToolRegistry;

/// Parse an ffmpeg timecode (`HH:MM:SS.ff`) into seconds.
///
/// Total: anything malformed, negative, or empty yields `0.0`.
pub fn parse_timecode(text: &str) -> f64 {
    parse_hms(text).unwrap_or(0.0)
}

/// Turns reported elapsed time into a clamped, non-decreasing fraction.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total_seconds: f64,
    last: f64,
}

impl ProgressTracker {
    pub fn new(total_seconds: f64) -> Self {
        Self {
            total_seconds,
            last: 0.0,
        }
    }

    /// Record an elapsed time. Returns the new fraction if it advanced.
    pub fn observe(&mut self, elapsed_seconds: f64) -> Option<f64> {
        if !self.total_seconds.is_finite() || self.total_seconds <= 0.0 || !elapsed_seconds.is_finite() {
            return None;
        }
        let fraction = (elapsed_seconds / self.total_seconds).clamp(0.0, 1.0);
        if fraction > self.last {
            self.last = fraction;
            Some(fraction)
        } else {
            None
        }
    }

    /// Mark completion. Returns `1.0` unless already reported.
    pub fn finish(&mut self) -> Option<f64> {
        if self.last < 1.0 {
            self.last = 1.0;
            Some(1.0)
        } else {
            None
        }
    }

    /// Last reported fraction.
    pub fn fraction(&self) -> f64 {
        self.last
    }
}

/// Encoder settings, taken from the `[video]` config section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodeSettings {
    pub fps: u32,
    pub video_codec: String,
    pub crf: i32,
    pub preset: String,
    pub video_bitrate: Option<String>,
    pub pixel_format: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl From<&VideoConfig> for EncodeSettings {
    fn from(v: &VideoConfig) -> Self {
        Self {
            fps: v.fps,
            video_codec: v.video_codec.clone(),
            crf: v.crf,
            preset: v.preset.clone(),
            video_bitrate: v.video_bitrate.clone(),
            pixel_format: v.pixel_format.clone(),
            audio_codec: v.audio_codec.clone(),
            audio_bitrate: v.audio_bitrate.clone(),
        }
    }
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self::from(&VideoConfig::default())
    }
}

/// What to encode.
#[derive(Debug, Clone)]
pub struct EncodeRequest {
    pub graph: FilterGraph,
    pub audio: PathBuf,
    pub output: PathBuf,
    /// Expected output length, used for progress.
    pub total_duration: f64,
}

/// Lifecycle notifications for one encode.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeEvent {
    /// The process was started with this command line.
    Started { command: String },
    /// Completion fraction in `[0, 1]`, never decreasing.
    Progress { fraction: f64 },
    Succeeded { output: PathBuf },
    Failed { message: String },
}

/// Encode state machine: `Pending -> Running -> Succeeded | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodeState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl EncodeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EncodeState::Succeeded | EncodeState::Failed)
    }
}

/// Terminal result of a successful encode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodeSummary {
    pub output: PathBuf,
    pub command: String,
    pub elapsed_ms: u64,
    pub output_bytes: u64,
}

/// Handle to an in-flight encode.
pub struct EncodeHandle {
    events: mpsc::UnboundedReceiver<EncodeEvent>,
    state: watch::Receiver<EncodeState>,
    task: JoinHandle<Result<EncodeSummary>>,
}

impl EncodeHandle {
    /// Event stream. Closes after the terminal event.
    pub fn events(&mut self) -> &mut mpsc::UnboundedReceiver<EncodeEvent> {
        &mut self.events
    }

    /// Watch the state machine.
    pub fn state(&self) -> watch::Receiver<EncodeState> {
        self.state.clone()
    }

    /// Wait for the terminal result.
    pub async fn wait(self) -> Result<EncodeSummary> {
        self.task
            .await
            .map_err(|e| Error::Internal(format!("encode task panicked: {e}")))?
    }
}

/// Build the full ffmpeg argument vector for a request.
///
/// Each image is looped for its rendered length; the narration is the last
/// input. `-shortest` trims whichever stream runs long.
pub fn build_encode_args(request: &EncodeRequest, settings: &EncodeSettings) -> Vec<String> {
    let mut args: Vec<String> = ["-hide_banner", "-nostdin", "-y"]
        .into_iter()
        .map(String::from)
        .collect();

    for GraphInput { path, seconds } in &request.graph.inputs {
        args.extend([
            "-loop".to_string(),
            "1".to_string(),
            "-framerate".to_string(),
            settings.fps.to_string(),
            "-t".to_string(),
            format!("{seconds:.3}"),
            "-i".to_string(),
            path.to_string_lossy().to_string(),
        ]);
    }
    args.extend(["-i".to_string(), request.audio.to_string_lossy().to_string()]);

    args.extend([
        "-filter_complex".to_string(),
        request.graph.to_filter_complex(),
        "-map".to_string(),
        format!("[{}]", request.graph.output_label()),
        "-map".to_string(),
        format!("{}:a", request.graph.audio_input_index()),
        "-c:v".to_string(),
        settings.video_codec.clone(),
        "-preset".to_string(),
        settings.preset.clone(),
        "-crf".to_string(),
        settings.crf.to_string(),
    ]);
    if let Some(bitrate) = &settings.video_bitrate {
        args.extend(["-b:v".to_string(), bitrate.clone()]);
    }
    let fps = settings.fps.to_string();
    args.extend(
        [
            "-pix_fmt",
            settings.pixel_format.as_str(),
            "-r",
            fps.as_str(),
            "-c:a",
            settings.audio_codec.as_str(),
            "-b:a",
            settings.audio_bitrate.as_str(),
            "-shortest",
            "-movflags",
            "+faststart",
            "-progress",
            "pipe:2",
            "-nostats",
        ]
        .into_iter()
        .map(String::from),
    );
    args.push(request.output.to_string_lossy().to_string());
    args
}

/// Drives ffmpeg for compiled graphs.
#[derive(Debug, Clone)]
pub struct EncodingOrchestrator {
    tools: Arc<ToolRegistry>,
    settings: EncodeSettings,
    timeout: Duration,
}

impl EncodingOrchestrator {
    pub fn new(tools: Arc<ToolRegistry>, settings: EncodeSettings, timeout: Duration) -> Self {
        Self {
            tools,
            settings,
            timeout,
        }
    }

    /// Start one encode. Must be called inside a tokio runtime.
    ///
    /// Firing `cancel` kills the ffmpeg process and fails the encode with
    /// [`Error::Cancelled`].
    pub fn submit(&self, request: EncodeRequest, cancel: CancellationToken) -> EncodeHandle {
        let (event_tx, events) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(EncodeState::Pending);

        let tools = Arc::clone(&self.tools);
        let settings = self.settings.clone();
        let timeout = self.timeout;

        let task = tokio::spawn(async move {
            let result = run_encode(
                &tools, &settings, timeout, &request, cancel, &event_tx, &state_tx,
            )
            .await;
            match &result {
                Ok(summary) => {
                    let _ = event_tx.send(EncodeEvent::Succeeded {
                        output: summary.output.clone(),
                    });
                    let _ = state_tx.send(EncodeState::Succeeded);
                }
                Err(e) => {
                    let _ = event_tx.send(EncodeEvent::Failed {
                        message: e.to_string(),
                    });
                    let _ = state_tx.send(EncodeState::Failed);
                }
            }
            result
        });

        EncodeHandle {
            events,
            state,
            task,
        }
    }
}

async fn run_encode(
    tools: &ToolRegistry,
    settings: &EncodeSettings,
    timeout: Duration,
    request: &EncodeRequest,
    cancel: CancellationToken,
    events: &mpsc::UnboundedSender<EncodeEvent>,
    state: &watch::Sender<EncodeState>,
) -> Result<EncodeSummary> {
    let ffmpeg = tools.require("ffmpeg")?;
    let started = Instant::now();

    let mut cmd = ToolCommand::new(ffmpeg.path.clone());
    cmd.args(build_encode_args(request, settings)).timeout(timeout);
    let command = cmd.describe();

    tracing::info!(
        output = %request.output.display(),
        images = request.graph.inputs.len(),
        seconds = request.total_duration,
        "starting encode"
    );
    tracing::debug!(%command, "ffmpeg command");

    let _ = events.send(EncodeEvent::Started {
        command: command.clone(),
    });
    let _ = state.send(EncodeState::Running);

    let mut tracker = ProgressTracker::new(request.total_duration);
    let outcome = cmd
        .execute_with_stderr_callback(
            |line| {
                if let Some(value) = line.strip_prefix("out_time=") {
                    if let Some(fraction) = tracker.observe(parse_timecode(value)) {
                        let _ = events.send(EncodeEvent::Progress { fraction });
                    }
                }
            },
            Some(cancel),
        )
        .await;

    match outcome {
        Ok(_) => {}
        Err(Error::Tool { message, .. }) => return Err(Error::encoding(message)),
        Err(e) => return Err(e),
    }

    let output_bytes = output_size(&request.output).await?;
    if let Some(fraction) = tracker.finish() {
        let _ = events.send(EncodeEvent::Progress { fraction });
    }

    let elapsed_ms = started.elapsed().as_millis() as u64;
    tracing::info!(
        output = %request.output.display(),
        bytes = output_bytes,
        elapsed_ms,
        "encode finished"
    );

    Ok(EncodeSummary {
        output: request.output.clone(),
        command,
        elapsed_ms,
        output_bytes,
    })
}

/// The encode only counts if it left a non-empty file behind.
async fn output_size(path: &Path) -> Result<u64> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.len() > 0 => Ok(meta.len()),
        Ok(_) => Err(Error::encoding(format!(
            "encoder produced an empty file: {}",
            path.display()
        ))),
        Err(_) => Err(Error::encoding(format!(
            "encoder produced no output: {}",
            path.display()
        ))),
    }
}

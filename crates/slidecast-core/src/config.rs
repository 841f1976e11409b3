//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from TOML and carries every
//! knob the render pipeline reads. It is built once at startup and handed to
//! each component by reference; nothing downstream reads the environment.
//! Every section defaults sensibly so an empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

/// Locations searched by [`Config::load_or_default`] when no path is given.
const DEFAULT_PATHS: &[&str] = &[
    "./slidecast.toml",
    "~/.config/slidecast/config.toml",
    "/etc/slidecast/config.toml",
];

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub video: VideoConfig,
    pub effects: EffectsConfig,
    pub duration: DurationConfig,
    pub audio: AudioConfig,
    pub storage: StorageConfig,
    pub tools: ToolsConfig,
    pub jobs: JobsConfig,
    pub input: InputConfig,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load and check configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::system(format!("read config {}", path.display()), e))?;
        let config = Self::from_toml(&contents)?;
        config.check()?;
        Ok(config)
    }

    /// Load configuration from `path`, or from the first default location
    /// that exists, falling back to built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        for candidate in DEFAULT_PATHS {
            let expanded = shellexpand::tilde(candidate);
            let candidate = Path::new(expanded.as_ref());
            if candidate.exists() {
                tracing::info!("Loading config from {}", candidate.display());
                return Self::load(candidate);
            }
        }

        tracing::debug!("No config file found; using defaults");
        Ok(Self::default())
    }

    /// Reject values the pipeline cannot work with.
    pub fn check(&self) -> Result<()> {
        if self.video.width == 0 || self.video.height == 0 {
            return Err(Error::Validation("video.width and video.height must be non-zero".into()));
        }
        if self.video.width % 2 != 0 || self.video.height % 2 != 0 {
            return Err(Error::Validation(
                "video.width and video.height must be even for yuv420p output".into(),
            ));
        }
        if self.video.fps == 0 {
            return Err(Error::Validation("video.fps must be non-zero".into()));
        }
        let (min, max) = (self.duration.min_seconds, self.duration.max_seconds);
        if !positive(min) || !positive(max) || min > max {
            return Err(Error::Validation(format!(
                "duration window [{min}, {max}] is empty, non-positive, or not finite"
            )));
        }
        if !positive(self.duration.fallback_seconds) {
            return Err(Error::Validation(
                "duration.fallback_seconds must be a positive number".into(),
            ));
        }
        let td = self.effects.default_transition_duration;
        if !positive(td) || td > MAX_TRANSITION_SECONDS {
            return Err(Error::Validation(format!(
                "effects.default_transition_duration {td} must be in (0, {MAX_TRANSITION_SECONDS}]"
            )));
        }
        if self.duration.reference_bitrate == 0 {
            return Err(Error::Validation("duration.reference_bitrate must be non-zero".into()));
        }
        if self.effects.max_zoom < 1.0 || self.effects.pan_zoom < 1.0 {
            return Err(Error::Validation("effects zoom factors must be >= 1.0".into()));
        }
        if self.jobs.max_concurrent == 0 {
            return Err(Error::Validation("jobs.max_concurrent must be at least 1".into()));
        }
        Ok(())
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.video.fps > 60 {
            warnings.push(format!(
                "video.fps {} is unusually high for still-image video",
                self.video.fps
            ));
        }

        if !(0..=51).contains(&self.video.crf) {
            warnings.push(format!("video.crf {} is outside the x264 range 0-51", self.video.crf));
        }

        if self.effects.default_transition_duration > 3.0 {
            warnings.push(format!(
                "effects.default_transition_duration {}s will dominate short segments",
                self.effects.default_transition_duration
            ));
        }

        if self.input.image_extensions.is_empty() {
            warnings.push("input.image_extensions is empty; every image will be rejected".into());
        }

        if self.input.audio_extensions.is_empty() {
            warnings.push("input.audio_extensions is empty; every audio file will be rejected".into());
        }

        if self.jobs.encode_timeout_secs == 0 {
            warnings.push("jobs.encode_timeout_secs is 0; encodes will time out immediately".into());
        }

        warnings
    }
}

/// Longest transition a request or the config may ask for, in seconds.
pub const MAX_TRANSITION_SECONDS: f64 = 5.0;

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Output video settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_codec: String,
    pub crf: i32,
    pub preset: String,
    /// Optional target bitrate (e.g. "4M"); CRF is used when unset.
    pub video_bitrate: Option<String>,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub pixel_format: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30,
            video_codec: "libx264".into(),
            crf: 23,
            preset: "medium".into(),
            video_bitrate: None,
            audio_codec: "aac".into(),
            audio_bitrate: "192k".into(),
            pixel_format: "yuv420p".into(),
        }
    }
}

/// Tuning for motion and transition effects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    /// Transition length used when the request does not set one.
    pub default_transition_duration: f64,
    /// Per-frame zoom increment of the Ken Burns motion.
    pub kenburns_rate: f64,
    /// Upper bound for zoom-based motions.
    pub max_zoom: f64,
    /// Fixed zoom applied while panning so the window has room to travel.
    pub pan_zoom: f64,
    /// Shake displacement in output pixels.
    pub shake_amplitude: f64,
    /// Frames per full shake oscillation.
    pub shake_period_frames: u32,
    /// Longest transition allowed, as a fraction of one segment.
    pub max_transition_fraction: f64,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            default_transition_duration: 0.8,
            kenburns_rate: 0.0015,
            max_zoom: 1.5,
            pan_zoom: 1.2,
            shake_amplitude: 12.0,
            shake_period_frames: 9,
            max_transition_fraction: 0.5,
        }
    }
}

/// Narration duration estimation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DurationConfig {
    /// Bitrate assumed when estimating duration from file size (bits/s).
    pub reference_bitrate: u64,
    pub min_seconds: f64,
    pub max_seconds: f64,
    /// Used when every estimation tier fails.
    pub fallback_seconds: f64,
}

impl Default for DurationConfig {
    fn default() -> Self {
        Self {
            reference_bitrate: 128_000,
            min_seconds: 5.0,
            max_seconds: 60.0,
            fallback_seconds: 30.0,
        }
    }
}

/// Canonical intermediate format for audio concatenation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u32,
    pub bit_depth: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            bit_depth: 16,
        }
    }
}

/// Where artifacts, the ledger, and scratch files live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub output_dir: PathBuf,
    pub ledger_path: PathBuf,
    pub work_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./data/output"),
            ledger_path: PathBuf::from("./data/ledger.json"),
            work_dir: PathBuf::from("./data/work"),
        }
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// Job admission and time limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    pub max_concurrent: usize,
    pub encode_timeout_secs: u64,
    pub probe_timeout_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            encode_timeout_secs: 3600,
            probe_timeout_secs: 30,
        }
    }
}

/// Accepted input file types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub image_extensions: Vec<String>,
    pub audio_extensions: Vec<String>,
    pub max_images: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            image_extensions: ["jpg", "jpeg", "png", "webp", "bmp"]
                .into_iter()
                .map(String::from)
                .collect(),
            audio_extensions: ["mp3", "wav", "m4a", "aac", "ogg", "flac"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_images: 50,
        }
    }
}

//! # slidecast-av
//!
//! Everything that talks to ffmpeg and ffprobe.
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- locate ffmpeg and ffprobe,
//!   honoring config overrides.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout,
//!   cancellation, and line-by-line stderr streaming.
//! - **Probing** ([`MediaProbe`], [`FfmpegProbe`]) -- container duration and
//!   the diagnostic-text fallback.
//! - **Duration estimation** ([`DurationEstimator`]) -- the layered
//!   probe / diagnostic / file-size / fallback strategy and segment split.
//! - **Audio concatenation** ([`AudioConcatenator`]) -- normalize several
//!   narration parts and merge them with the concat demuxer.
//! - **Encoding** ([`EncodingOrchestrator`]) -- run one ffmpeg encode for a
//!   compiled filter graph and report its lifecycle.
//! - **Workspaces** ([`JobWorkspace`]) -- self-cleaning scratch directories.

pub mod command;
pub mod concat;
pub mod duration;
pub mod encode;
pub mod probe;
pub mod tools;
pub mod workspace;

pub use command::{ToolCommand, ToolOutput};
pub use concat::{
    output_codec, AudioConcatenator, AudioTranscoder, CanonicalAudio, ConcatResult, FfmpegAudio,
};
pub use duration::{segment_durations, DurationEstimate, DurationEstimator, DurationSource};
pub use encode::{
    build_encode_args, parse_timecode, EncodeEvent, EncodeHandle, EncodeRequest, EncodeSettings,
    EncodeState, EncodeSummary, EncodingOrchestrator, ProgressTracker,
};
pub use probe::{parse_diagnostic_duration, FfmpegProbe, MediaProbe};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
pub use workspace::JobWorkspace;

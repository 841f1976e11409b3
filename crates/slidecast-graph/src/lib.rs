//! # slidecast-graph
//!
//! Compiles a set of images, their segment durations, and an
//! [`EffectSpec`](slidecast_effects::EffectSpec) into a [`FilterGraph`]: an
//! ordered list of stream operations that renders to an ffmpeg
//! `-filter_complex` string with a single `[vout]` output.
//!
//! The motion math lives in [`motion`] as a pure per-frame function; the
//! emitted `zoompan` expressions evaluate the same formulas inside ffmpeg.

pub mod color;
pub mod compiler;
pub mod graph;
pub mod motion;
pub mod overlay;
pub mod transition;

pub use compiler::{compile, RenderSettings};
pub use graph::{FilterGraph, GraphInput, OpKind, Operation, OUTPUT_LABEL};
pub use motion::{frame_count, motion_at, MotionConfig, MotionFrame};
pub use transition::{plan_timeline, xfade_name, Timeline};

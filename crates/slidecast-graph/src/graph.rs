//! Filter graph model.

use std::path::PathBuf;

use serde::Serialize;
use slidecast_effects::{ColorGrade, Motion, Overlay, Transition};

/// Label of the single video stream every compiled graph terminates in.
pub const OUTPUT_LABEL: &str = "vout";

/// Operation kind with its kind-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OpKind {
    /// Cover-scale then center-crop to the target frame.
    ScaleCrop { width: u32, height: u32 },
    /// Per-frame camera motion over one segment.
    Motion { motion: Motion, frames: u32 },
    /// Overlapping blend between two segment streams.
    TransitionBlend {
        transition: Transition,
        duration: f64,
        offset: f64,
    },
    /// Hard-cut concatenation of segment streams.
    Concat { segments: usize },
    /// Whole-stream color grade.
    ColorGrade { grade: ColorGrade },
    /// Synthesized overlay layer (a source, no inputs).
    OverlaySource { overlay: Overlay },
    /// Blend of the overlay layer onto the main stream.
    OverlayComposite {
        overlay: Overlay,
        mode: &'static str,
        opacity: f64,
    },
}

impl OpKind {
    /// Short kind name, used for counting and logging.
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::ScaleCrop { .. } => "scale_crop",
            OpKind::Motion { .. } => "motion",
            OpKind::TransitionBlend { .. } => "transition_blend",
            OpKind::Concat { .. } => "concat",
            OpKind::ColorGrade { .. } => "color_grade",
            OpKind::OverlaySource { .. } => "overlay_source",
            OpKind::OverlayComposite { .. } => "overlay_composite",
        }
    }
}

/// One node of the graph: input labels, one output label, and the ffmpeg
/// filter chain that implements it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub kind: OpKind,
    pub inputs: Vec<String>,
    pub output: String,
    pub filter: String,
}

impl Operation {
    pub fn new(
        kind: OpKind,
        inputs: Vec<String>,
        output: impl Into<String>,
        filter: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            inputs,
            output: output.into(),
            filter: filter.into(),
        }
    }

    /// Render as one `filter_complex` chain: `[a][b]filter[out]`.
    pub fn render(&self) -> String {
        let mut s = String::new();
        for input in &self.inputs {
            s.push('[');
            s.push_str(input);
            s.push(']');
        }
        s.push_str(&self.filter);
        s.push('[');
        s.push_str(&self.output);
        s.push(']');
        s
    }
}

/// An image input to the encoder, looped for `seconds`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphInput {
    pub path: PathBuf,
    pub seconds: f64,
}

/// The compiled graph for one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterGraph {
    pub inputs: Vec<GraphInput>,
    pub operations: Vec<Operation>,
    /// Length of the composed video in seconds.
    pub timeline_seconds: f64,
    /// Effective transition length after clamping, if transitions are used.
    pub transition_seconds: Option<f64>,
}

impl FilterGraph {
    /// Label of the terminal video stream.
    pub fn output_label(&self) -> &str {
        self.operations
            .last()
            .map(|op| op.output.as_str())
            .unwrap_or(OUTPUT_LABEL)
    }

    /// Index the audio input takes when appended after the image inputs.
    pub fn audio_input_index(&self) -> usize {
        self.inputs.len()
    }

    /// Number of operations whose kind has the given name.
    pub fn count(&self, kind: &str) -> usize {
        self.operations
            .iter()
            .filter(|op| op.kind.name() == kind)
            .count()
    }

    /// Render the `-filter_complex` argument.
    pub fn to_filter_complex(&self) -> String {
        self.operations
            .iter()
            .map(Operation::render)
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Format a number for a filter argument: at most 4 decimals, no trailing
/// zeros.
pub(crate) fn num(value: f64) -> String {
    let s = format!("{value:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

//! Filter graph compiler.

use std::path::PathBuf;

use slidecast_core::config::Config;
use slidecast_core::{Error, Result};
use slidecast_effects::EffectSpec;

use crate::color::grade_filter;
use crate::graph::{FilterGraph, GraphInput, OpKind, Operation, OUTPUT_LABEL};
use crate::motion::{frame_count, motion_filter, MotionConfig};
use crate::overlay::{composite_filter, overlay_layer};
use crate::transition::{blend_filter, plan_timeline};

/// Output geometry and motion tunables for one compile.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub pixel_format: String,
    pub motion: MotionConfig,
    /// Largest share of a segment a transition may take.
    pub max_transition_fraction: f64,
}

impl RenderSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            width: config.video.width,
            height: config.video.height,
            fps: config.video.fps,
            pixel_format: config.video.pixel_format.clone(),
            motion: MotionConfig::from(&config.effects),
            max_transition_fraction: config.effects.max_transition_fraction,
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Compile images, their segment durations, and an effect selection into a
/// filter graph terminating in `[vout]`.
///
/// Per image: cover-scale and crop, then motion. Segments are joined by
/// concat (no transition) or a chain of overlapping blends. The color grade
/// and overlay, when set, are applied once to the composed stream.
///
/// The effect selection must already be validated.
///
/// # Errors
///
/// [`Error::Validation`] for zero images, a duration list that does not
/// match the images, or a non-positive duration.
pub fn compile(
    images: &[PathBuf],
    segment_durations: &[f64],
    settings: &RenderSettings,
    spec: &EffectSpec,
) -> Result<FilterGraph> {
    if images.is_empty() {
        return Err(Error::Validation(
            "cannot compile a filter graph for zero images".into(),
        ));
    }
    if images.len() != segment_durations.len() {
        return Err(Error::Validation(format!(
            "{} images but {} segment durations",
            images.len(),
            segment_durations.len()
        )));
    }
    if let Some(bad) = segment_durations
        .iter()
        .find(|d| !d.is_finite() || **d <= 0.0)
    {
        return Err(Error::Validation(format!(
            "segment duration must be positive, got {bad}"
        )));
    }

    let (w, h, fps) = (settings.width, settings.height, settings.fps);
    let timeline = plan_timeline(
        segment_durations,
        spec.transition.map(|_| spec.transition_duration),
        settings.max_transition_fraction,
    );
    let motion = spec.motion_or_default();
    let mut ops = Vec::new();

    for (i, seconds) in timeline.rendered.iter().enumerate() {
        ops.push(Operation::new(
            OpKind::ScaleCrop {
                width: w,
                height: h,
            },
            vec![format!("{i}:v")],
            format!("s{i}"),
            format!(
                "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},setsar=1,format={}",
                settings.pixel_format
            ),
        ));

        let frames = frame_count(*seconds, fps);
        ops.push(Operation::new(
            OpKind::Motion { motion, frames },
            vec![format!("s{i}")],
            format!("m{i}"),
            motion_filter(motion, frames, w, h, fps, &settings.motion),
        ));
    }

    let n = images.len();
    let mut current = match (spec.transition, timeline.transition) {
        (Some(transition), Some(td)) => {
            let mut current = "m0".to_string();
            for (k, offset) in timeline.offsets.iter().enumerate() {
                let output = format!("x{k}");
                ops.push(Operation::new(
                    OpKind::TransitionBlend {
                        transition,
                        duration: td,
                        offset: *offset,
                    },
                    vec![current, format!("m{}", k + 1)],
                    output.clone(),
                    blend_filter(transition, td, *offset),
                ));
                current = output;
            }
            current
        }
        _ => {
            ops.push(Operation::new(
                OpKind::Concat { segments: n },
                (0..n).map(|i| format!("m{i}")).collect(),
                "cat",
                format!("concat=n={n}:v=1:a=0"),
            ));
            "cat".to_string()
        }
    };

    if let Some(grade) = spec.color {
        ops.push(Operation::new(
            OpKind::ColorGrade { grade },
            vec![current],
            "graded",
            grade_filter(grade),
        ));
        current = "graded".to_string();
    }

    if let Some(overlay) = spec.overlay {
        let layer = overlay_layer(overlay, w, h, fps, timeline.total, &settings.pixel_format);
        ops.push(Operation::new(
            OpKind::OverlaySource { overlay },
            vec![],
            "ovl",
            layer.source.clone(),
        ));
        ops.push(Operation::new(
            OpKind::OverlayComposite {
                overlay,
                mode: layer.mode,
                opacity: layer.opacity,
            },
            vec![current, "ovl".to_string()],
            "composited",
            composite_filter(&layer),
        ));
    }

    if let Some(last) = ops.last_mut() {
        last.output = OUTPUT_LABEL.to_string();
    }

    let inputs = images
        .iter()
        .zip(&timeline.rendered)
        .map(|(path, seconds)| GraphInput {
            path: path.clone(),
            seconds: *seconds,
        })
        .collect();

    tracing::debug!(
        images = n,
        operations = ops.len(),
        timeline = timeline.total,
        transition = ?timeline.transition,
        "compiled filter graph"
    );

    Ok(FilterGraph {
        inputs,
        operations: ops,
        timeline_seconds: timeline.total,
        transition_seconds: timeline.transition,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidecast_effects::{apply_preset, ColorGrade, Motion, Overlay, Transition};

    fn images(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("/in/img{i}.jpg"))).collect()
    }

    #[test]
    fn plain_three_images() {
        let graph = compile(
            &images(3),
            &[10.0, 10.0, 10.0],
            &RenderSettings::default(),
            &EffectSpec::default(),
        )
        .unwrap();

        assert_eq!(graph.count("scale_crop"), 3);
        assert_eq!(graph.count("motion"), 3);
        assert_eq!(graph.count("concat"), 1);
        assert_eq!(graph.count("transition_blend"), 0);
        assert_eq!(graph.count("color_grade"), 0);
        assert_eq!(graph.count("overlay_composite"), 0);
        assert_eq!(graph.operations.len(), 7);

        for op in &graph.operations {
            if let OpKind::Motion { motion, frames } = op.kind {
                assert_eq!(motion, Motion::Static);
                assert_eq!(frames, 300);
            }
        }

        assert_eq!(graph.output_label(), OUTPUT_LABEL);
        assert_eq!(graph.audio_input_index(), 3);
        assert!(graph.inputs.iter().all(|i| i.seconds == 10.0));
        assert_eq!(graph.timeline_seconds, 30.0);

        let fc = graph.to_filter_complex();
        assert!(fc.starts_with(
            "[0:v]scale=1920:1080:force_original_aspect_ratio=increase,crop=1920:1080,setsar=1,format=yuv420p[s0];[s0]fps=30[m0]"
        ));
        assert!(fc.ends_with("[m0][m1][m2]concat=n=3:v=1:a=0[vout]"));
    }

    #[test]
    fn cinematic_preset_compiles_every_stage() {
        let spec = apply_preset("cinematic").unwrap();
        let graph =
            compile(&images(3), &[10.0, 10.0, 10.0], &RenderSettings::default(), &spec).unwrap();

        assert_eq!(graph.count("transition_blend"), 2);
        assert_eq!(graph.count("concat"), 0);
        assert_eq!(graph.count("color_grade"), 1);
        assert_eq!(graph.count("overlay_source"), 1);
        assert_eq!(graph.count("overlay_composite"), 1);
        assert_eq!(graph.transition_seconds, Some(0.8));
        assert_eq!(graph.timeline_seconds, 30.0);

        let blends: Vec<_> = graph
            .operations
            .iter()
            .filter_map(|op| match op.kind {
                OpKind::TransitionBlend {
                    transition, offset, ..
                } => Some((transition, offset)),
                _ => None,
            })
            .collect();
        assert_eq!(blends, vec![(Transition::Fade, 10.0), (Transition::Fade, 20.0)]);

        let last = graph.operations.last().unwrap();
        assert!(matches!(
            last.kind,
            OpKind::OverlayComposite {
                overlay: Overlay::LightLeaks,
                ..
            }
        ));
        assert_eq!(last.inputs, vec!["graded".to_string(), "ovl".to_string()]);
        assert_eq!(last.output, OUTPUT_LABEL);

        let fc = graph.to_filter_complex();
        assert!(fc.contains("[x0][m2]xfade=transition=fadeblack:duration=0.8:offset=20[x1]"));
        assert!(fc.contains("[x1]curves=preset=vintage[graded]"));
    }

    #[test]
    fn color_only_terminates_in_grade() {
        let spec = EffectSpec {
            color: Some(ColorGrade::Sepia),
            ..EffectSpec::default()
        };
        let graph = compile(&images(2), &[5.0, 5.0], &RenderSettings::default(), &spec).unwrap();
        let last = graph.operations.last().unwrap();
        assert!(matches!(last.kind, OpKind::ColorGrade { .. }));
        assert_eq!(last.inputs, vec!["cat".to_string()]);
        assert_eq!(graph.output_label(), "vout");
    }

    #[test]
    fn transitions_pad_all_but_last_input() {
        let spec = EffectSpec {
            transition: Some(Transition::WipeLeft),
            transition_duration: 1.0,
            ..EffectSpec::default()
        };
        let graph = compile(&images(3), &[4.0, 4.0, 4.0], &RenderSettings::default(), &spec).unwrap();
        let lengths: Vec<_> = graph.inputs.iter().map(|i| i.seconds).collect();
        assert_eq!(lengths, vec![5.0, 5.0, 4.0]);
    }

    #[test]
    fn single_image_with_transition_uses_concat() {
        let spec = EffectSpec {
            transition: Some(Transition::Dissolve),
            ..EffectSpec::default()
        };
        let graph = compile(&images(1), &[30.0], &RenderSettings::default(), &spec).unwrap();
        assert_eq!(graph.count("transition_blend"), 0);
        assert_eq!(graph.count("concat"), 1);
    }

    #[test]
    fn zero_images_is_validation_error() {
        let err = compile(&[], &[], &RenderSettings::default(), &EffectSpec::default()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn mismatched_or_bad_durations_rejected() {
        let settings = RenderSettings::default();
        let spec = EffectSpec::default();
        assert!(matches!(
            compile(&images(2), &[10.0], &settings, &spec),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            compile(&images(2), &[10.0, 0.0], &settings, &spec),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            compile(&images(1), &[f64::NAN], &settings, &spec),
            Err(Error::Validation(_))
        ));
    }
}

//! Segment transitions and timeline planning.
//!
//! Transitions overlap adjacent segments without shrinking the timeline:
//! every segment but the last is rendered `td` seconds longer than its
//! nominal duration, and blend `k` starts where segment `k` nominally ends.
//! After `n - 1` blends the composed stream is exactly the sum of the
//! nominal durations, which matches the narration.

use slidecast_effects::Transition;

use crate::graph::num;

/// ffmpeg `xfade` transition implementing a catalog transition.
pub fn xfade_name(transition: Transition) -> &'static str {
    match transition {
        Transition::Fade => "fadeblack",
        Transition::Crossfade => "fade",
        Transition::WipeLeft => "wipeleft",
        Transition::WipeRight => "wiperight",
        Transition::WipeUp => "wipeup",
        Transition::WipeDown => "wipedown",
        Transition::SlideLeft => "slideleft",
        Transition::SlideRight => "slideright",
        Transition::SlideUp => "slideup",
        Transition::SlideDown => "slidedown",
        Transition::Circlecrop => "circlecrop",
        Transition::Dissolve => "dissolve",
    }
}

/// The `xfade` filter for one blend.
pub fn blend_filter(transition: Transition, duration: f64, offset: f64) -> String {
    format!(
        "xfade=transition={}:duration={}:offset={}",
        xfade_name(transition),
        num(duration),
        num(offset)
    )
}

/// Rendered stream lengths and blend offsets for a sequence of segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    /// Effective blend duration; `None` when segments are hard-cut.
    pub transition: Option<f64>,
    /// Length each segment stream is rendered at.
    pub rendered: Vec<f64>,
    /// Start of blend `k` on the composed timeline.
    pub offsets: Vec<f64>,
    /// Length of the composed stream.
    pub total: f64,
}

/// Plan segment lengths for the given nominal durations.
///
/// `requested` is the caller's transition length, or `None` for hard cuts.
/// It is clamped to `max_fraction` of the shortest segment; if nothing is
/// left after clamping, or there is only one segment, the plan falls back to
/// hard cuts.
pub fn plan_timeline(durations: &[f64], requested: Option<f64>, max_fraction: f64) -> Timeline {
    let total: f64 = durations.iter().sum();
    let hard_cut = Timeline {
        transition: None,
        rendered: durations.to_vec(),
        offsets: Vec::new(),
        total,
    };

    let Some(requested) = requested else {
        return hard_cut;
    };
    if durations.len() < 2 {
        return hard_cut;
    }

    let shortest = durations.iter().copied().fold(f64::INFINITY, f64::min);
    let td = requested.min(shortest * max_fraction.clamp(0.0, 1.0));
    if td.is_nan() || td <= 0.0 {
        tracing::debug!(requested, shortest, "transition clamped away, using hard cuts");
        return hard_cut;
    }
    if td < requested {
        tracing::debug!(requested, effective = td, "transition duration clamped");
    }

    let last = durations.len() - 1;
    let rendered = durations
        .iter()
        .enumerate()
        .map(|(i, d)| if i < last { d + td } else { *d })
        .collect();

    let mut offsets = Vec::with_capacity(last);
    let mut elapsed = 0.0;
    for d in &durations[..last] {
        elapsed += d;
        offsets.push(elapsed);
    }

    Timeline {
        transition: Some(td),
        rendered,
        offsets,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn hard_cut_without_transition() {
        let t = plan_timeline(&[10.0, 10.0, 10.0], None, 0.5);
        assert_eq!(t.transition, None);
        assert_eq!(t.rendered, vec![10.0, 10.0, 10.0]);
        assert!(t.offsets.is_empty());
        assert!(close(t.total, 30.0));
    }

    #[test]
    fn overlapping_blends_preserve_total_length() {
        let t = plan_timeline(&[10.0, 10.0, 10.0], Some(0.8), 0.5);
        assert_eq!(t.transition, Some(0.8));
        assert!(close(t.rendered[0], 10.8));
        assert!(close(t.rendered[1], 10.8));
        assert!(close(t.rendered[2], 10.0));
        assert_eq!(t.offsets, vec![10.0, 20.0]);

        // each xfade yields len(a) + len(b) - td
        let td = t.transition.unwrap();
        let composed = t.rendered.iter().skip(1).fold(t.rendered[0], |acc, len| acc + len - td);
        assert!(close(composed, t.total));
        assert!(close(composed, 30.0));
    }

    #[test]
    fn transition_is_clamped_to_fraction_of_segment() {
        let t = plan_timeline(&[1.0, 1.0], Some(2.0), 0.5);
        assert_eq!(t.transition, Some(0.5));
        assert_eq!(t.rendered, vec![1.5, 1.0]);
    }

    #[test]
    fn single_segment_never_blends() {
        let t = plan_timeline(&[30.0], Some(0.8), 0.5);
        assert_eq!(t.transition, None);
        assert_eq!(t.rendered, vec![30.0]);
    }

    #[test]
    fn zero_fraction_falls_back_to_hard_cut() {
        let t = plan_timeline(&[5.0, 5.0], Some(0.8), 0.0);
        assert_eq!(t.transition, None);
    }

    #[test]
    fn xfade_mapping() {
        assert_eq!(xfade_name(Transition::Fade), "fadeblack");
        assert_eq!(xfade_name(Transition::Crossfade), "fade");
        assert_eq!(xfade_name(Transition::WipeUp), "wipeup");
        assert_eq!(xfade_name(Transition::SlideDown), "slidedown");
        assert_eq!(
            blend_filter(Transition::Dissolve, 0.8, 20.0),
            "xfade=transition=dissolve:duration=0.8:offset=20"
        );
    }
}

//! Named effect presets.

use serde::Serialize;
use slidecast_core::{Error, Result};

use crate::catalog::{ColorGrade, Motion, Overlay, Transition};
use crate::options::EffectSpec;

/// Transition length used when neither the caller nor a preset sets one.
pub const DEFAULT_TRANSITION_DURATION: f64 = 0.8;

/// An immutable bundle of effect choices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub transition: Transition,
    pub motion: Motion,
    pub color: Option<ColorGrade>,
    pub overlay: Option<Overlay>,
}

static PRESETS: &[Preset] = &[
    Preset {
        name: "cinematic",
        description: "Film look with slow zooms, soft fades and warm light leaks",
        transition: Transition::Fade,
        motion: Motion::Kenburns,
        color: Some(ColorGrade::Vintage),
        overlay: Some(Overlay::LightLeaks),
    },
    Preset {
        name: "documentary",
        description: "Neutral grade with gentle pans and direct crossfades",
        transition: Transition::Crossfade,
        motion: Motion::PanRight,
        color: Some(ColorGrade::LowContrast),
        overlay: None,
    },
    Preset {
        name: "dreamy",
        description: "Soft dissolves over drifting bokeh",
        transition: Transition::Dissolve,
        motion: Motion::ZoomIn,
        color: Some(ColorGrade::Desaturated),
        overlay: Some(Overlay::Bokeh),
    },
    Preset {
        name: "energetic",
        description: "Punchy colors, slides and a hand-held feel",
        transition: Transition::SlideLeft,
        motion: Motion::Shake,
        color: Some(ColorGrade::Vibrant),
        overlay: Some(Overlay::Particles),
    },
    Preset {
        name: "nostalgic",
        description: "Sepia film with dust and scratches",
        transition: Transition::Fade,
        motion: Motion::Kenburns,
        color: Some(ColorGrade::Sepia),
        overlay: Some(Overlay::Scratches),
    },
    Preset {
        name: "minimal",
        description: "Clean crossfades with no grading or overlay",
        transition: Transition::Crossfade,
        motion: Motion::Static,
        color: None,
        overlay: None,
    },
    Preset {
        name: "noir",
        description: "High-contrast black and white with grain",
        transition: Transition::Circlecrop,
        motion: Motion::ZoomOut,
        color: Some(ColorGrade::BlackWhite),
        overlay: Some(Overlay::Dust),
    },
    Preset {
        name: "warm_memories",
        description: "Warm tones, slow zooms and a lens flare",
        transition: Transition::Dissolve,
        motion: Motion::Kenburns,
        color: Some(ColorGrade::Warm),
        overlay: Some(Overlay::LensFlare),
    },
];

impl Preset {
    /// The fully populated effect selection this preset stands for.
    pub fn to_spec(&self) -> EffectSpec {
        EffectSpec {
            transition: Some(self.transition),
            motion: Some(self.motion),
            color: self.color,
            overlay: self.overlay,
            transition_duration: DEFAULT_TRANSITION_DURATION,
        }
    }
}

/// Every registered preset, in registry order.
pub fn list_presets() -> &'static [Preset] {
    PRESETS
}

/// Look up a preset by name.
pub fn preset(name: &str) -> Result<&'static Preset> {
    PRESETS
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| Error::not_found("preset", name))
}

/// Resolve a preset name to an effect selection.
///
/// # Errors
///
/// [`Error::NotFound`] if `name` is not in the registry.
pub fn apply_preset(name: &str) -> Result<EffectSpec> {
    preset(name).map(Preset::to_spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cinematic_resolves_to_film_look() {
        let spec = apply_preset("cinematic").unwrap();
        assert_eq!(spec.transition, Some(Transition::Fade));
        assert_eq!(spec.motion, Some(Motion::Kenburns));
        assert_eq!(spec.color, Some(ColorGrade::Vintage));
        assert_eq!(spec.overlay, Some(Overlay::LightLeaks));
        assert_eq!(spec.transition_duration, 0.8);
    }

    #[test]
    fn unknown_preset_is_not_found() {
        let err = apply_preset("vaporwave").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert_eq!(err.to_string(), "preset not found: vaporwave");
    }

    #[test]
    fn preset_names_are_unique() {
        let mut names: Vec<_> = list_presets().iter().map(|p| p.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), list_presets().len());
    }

    #[test]
    fn minimal_leaves_grade_and_overlay_unset() {
        let spec = apply_preset("minimal").unwrap();
        assert_eq!(spec.color, None);
        assert_eq!(spec.overlay, None);
    }
}

//! Caller-supplied effect options and their resolution into an [`EffectSpec`].
//!
//! [`EffectOptions`] is the raw object handed over by the upload layer. Its
//! effect fields stay as strings so that [`validate`] can report every bad
//! field at once instead of stopping at the first deserialization error.

use serde::{Deserialize, Serialize};
use slidecast_core::config::MAX_TRANSITION_SECONDS;
use slidecast_core::{Error, Result};

use crate::catalog::{ColorGrade, Motion, Overlay, Transition};
use crate::preset::{self, DEFAULT_TRANSITION_DURATION};

/// Longest transition a caller may request, in seconds.
pub const MAX_TRANSITION_DURATION: f64 = MAX_TRANSITION_SECONDS;

/// Raw effect options as received from the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EffectOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
}

impl EffectOptions {
    /// Parse options from a JSON object. Unknown keys are rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Validation(format!("invalid effect options: {e}")))
    }

    /// Options that only select a preset.
    pub fn with_preset(name: impl Into<String>) -> Self {
        Self {
            preset: Some(name.into()),
            ..Self::default()
        }
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A validated, typed effect selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<Transition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion: Option<Motion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorGrade>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay: Option<Overlay>,
    #[serde(default = "default_transition_duration")]
    pub transition_duration: f64,
}

fn default_transition_duration() -> f64 {
    DEFAULT_TRANSITION_DURATION
}

impl Default for EffectSpec {
    fn default() -> Self {
        Self {
            transition: None,
            motion: None,
            color: None,
            overlay: None,
            transition_duration: DEFAULT_TRANSITION_DURATION,
        }
    }
}

impl EffectSpec {
    /// Motion to apply, `static` when unset.
    pub fn motion_or_default(&self) -> Motion {
        self.motion.unwrap_or_default()
    }

    /// True when nothing beyond hard cuts and static frames is requested.
    pub fn is_plain(&self) -> bool {
        self.transition.is_none()
            && matches!(self.motion, None | Some(Motion::Static))
            && self.color.is_none()
            && self.overlay.is_none()
    }
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

fn check_field<T>(errors: &mut Vec<String>, value: Option<&str>)
where
    T: std::str::FromStr<Err = Error>,
{
    if let Some(value) = value {
        if let Err(e) = value.parse::<T>() {
            match e {
                Error::Validation(msg) => errors.push(msg),
                other => errors.push(other.to_string()),
            }
        }
    }
}

/// Check every present field against its catalog enumeration.
pub fn validate(options: &EffectOptions) -> ValidationReport {
    let mut errors = Vec::new();

    check_field::<Transition>(&mut errors, options.transition.as_deref());
    check_field::<Motion>(&mut errors, options.motion.as_deref());
    check_field::<ColorGrade>(&mut errors, options.color.as_deref());
    check_field::<Overlay>(&mut errors, options.overlay.as_deref());

    if let Some(d) = options.transition_duration {
        if !d.is_finite() || d <= 0.0 || d > MAX_TRANSITION_DURATION {
            errors.push(format!(
                "transitionDuration must be in (0, {MAX_TRANSITION_DURATION}] seconds, got {d}"
            ));
        }
    }

    if let Some(name) = options.preset.as_deref() {
        if preset::preset(name).is_err() {
            errors.push(format!("unknown preset '{name}'"));
        }
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// Turn caller options into a typed [`EffectSpec`].
///
/// The preset (if any) is applied first; every field the caller set
/// explicitly then replaces the preset's value.
///
/// # Errors
///
/// [`Error::Validation`] listing every failed field when [`validate`] does
/// not pass.
pub fn resolve(options: &EffectOptions) -> Result<EffectSpec> {
    resolve_with_default(options, DEFAULT_TRANSITION_DURATION)
}

/// [`resolve`] with a deployment-specific transition length used whenever
/// the caller leaves `transitionDuration` unset, preset or not.
///
/// # Errors
///
/// As [`resolve`].
pub fn resolve_with_default(
    options: &EffectOptions,
    default_transition_duration: f64,
) -> Result<EffectSpec> {
    let report = validate(options);
    if !report.is_valid {
        return Err(Error::Validation(report.errors.join("; ")));
    }

    let mut spec = match options.preset.as_deref() {
        Some(name) => preset::apply_preset(name)?,
        None => EffectSpec::default(),
    };
    spec.transition_duration = default_transition_duration;

    if let Some(t) = options.transition.as_deref() {
        spec.transition = Some(t.parse()?);
    }
    if let Some(m) = options.motion.as_deref() {
        spec.motion = Some(m.parse()?);
    }
    if let Some(c) = options.color.as_deref() {
        spec.color = Some(c.parse()?);
    }
    if let Some(o) = options.overlay.as_deref() {
        spec.overlay = Some(o.parse()?);
    }
    if let Some(d) = options.transition_duration {
        spec.transition_duration = d;
    }

    Ok(spec)
}

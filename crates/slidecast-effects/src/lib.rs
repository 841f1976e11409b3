//! # slidecast-effects
//!
//! The closed set of effects a render can apply, and the rules for choosing
//! among them.
//!
//! - **Catalog** ([`catalog`]) -- [`Transition`], [`Motion`], [`ColorGrade`]
//!   and [`Overlay`] enums with stable string keys and descriptions.
//! - **Presets** ([`preset`]) -- named, immutable effect bundles.
//! - **Options** ([`options`]) -- the raw caller-supplied JSON object,
//!   its validation report, and resolution into an [`EffectSpec`].

pub mod catalog;
pub mod options;
pub mod preset;

pub use catalog::{
    describe, list_effects, ColorGrade, EffectCatalog, EffectCategory, EffectInfo, Motion,
    Overlay, Transition,
};
pub use options::{
    resolve, resolve_with_default, validate, EffectOptions, EffectSpec, ValidationReport,
    MAX_TRANSITION_DURATION,
};
pub use preset::{apply_preset, list_presets, preset, Preset, DEFAULT_TRANSITION_DURATION};

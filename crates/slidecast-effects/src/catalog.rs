//! Effect catalog: the closed enumerations of transitions, motions, color
//! grades, and overlays.
//!
//! Each category is an enum with a stable snake_case key used on the wire and
//! in the ledger. Adding an effect means adding a variant, after which every
//! exhaustive `match` in the graph compiler fails to build until it is
//! handled.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use slidecast_core::{Error, Result};

/// Generate a catalog enum.
///
/// The macro produces an enum with:
/// - `ALL` listing every variant in catalog order
/// - `as_str()` / `FromStr` / `Display` using the wire key
/// - `description()` with the human-readable summary
/// - serde (de)serialization through the wire key
macro_rules! catalog_enum {
    (
        $(#[doc = $doc:expr])*
        $name:ident, $category:literal {
            $($variant:ident => $key:literal, $desc:literal;)+
        }
    ) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $key)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in catalog order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Category label used in error messages and lookups.
            pub const CATEGORY: &'static str = $category;

            /// Stable wire key.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $key,)+
                }
            }

            /// Human-readable description.
            pub fn description(&self) -> &'static str {
                match self {
                    $($name::$variant => $desc,)+
                }
            }

            /// All wire keys, in catalog order.
            pub fn names() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.as_str()).collect()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($key => Ok($name::$variant),)+
                    other => Err(Error::Validation(format!(
                        "unknown {} '{}' (valid: {})",
                        $category,
                        other,
                        Self::names().join(", ")
                    ))),
                }
            }
        }
    };
}

catalog_enum! {
    /// Blend between two adjacent segments.
    Transition, "transition" {
        Fade => "fade", "Fade out to black, then in to the next image";
        Crossfade => "crossfade", "Direct blend from one image into the next";
        WipeLeft => "wipe_left", "Next image wipes in from the right edge";
        WipeRight => "wipe_right", "Next image wipes in from the left edge";
        WipeUp => "wipe_up", "Next image wipes in from the bottom edge";
        WipeDown => "wipe_down", "Next image wipes in from the top edge";
        SlideLeft => "slide_left", "Both images slide left";
        SlideRight => "slide_right", "Both images slide right";
        SlideUp => "slide_up", "Both images slide up";
        SlideDown => "slide_down", "Both images slide down";
        Circlecrop => "circlecrop", "Circular iris closes and reopens on the next image";
        Dissolve => "dissolve", "Pixel dissolve into the next image";
    }
}

catalog_enum! {
    /// Per-segment camera motion over a still image.
    Motion, "motion" {
        Static => "static", "No movement";
        Kenburns => "kenburns", "Slow continuous zoom toward the center";
        ZoomIn => "zoom_in", "Linear zoom in over the segment";
        ZoomOut => "zoom_out", "Linear zoom out over the segment";
        PanLeft => "pan_left", "Camera pans from right to left";
        PanRight => "pan_right", "Camera pans from left to right";
        PanUp => "pan_up", "Camera pans from bottom to top";
        PanDown => "pan_down", "Camera pans from top to bottom";
        RotateClockwise => "rotate_clockwise", "One full clockwise turn over the segment";
        RotateCounter => "rotate_counter", "One full counter-clockwise turn over the segment";
        Shake => "shake", "Hand-held jitter without drift";
    }
}

catalog_enum! {
    /// Color grade applied to the whole composed video.
    ColorGrade, "color" {
        Vintage => "vintage", "Faded film tone curve";
        Sepia => "sepia", "Brown monochrome channel mix";
        BlackWhite => "black_white", "Fully desaturated";
        HighContrast => "high_contrast", "Boosted contrast";
        LowContrast => "low_contrast", "Flattened contrast";
        Warm => "warm", "Shifted toward red/yellow";
        Cool => "cool", "Shifted toward blue";
        Vibrant => "vibrant", "Boosted saturation";
        Desaturated => "desaturated", "Muted saturation";
        FilmGrain => "film_grain", "Temporal luma noise";
        Vignette => "vignette", "Darkened frame edges";
    }
}

catalog_enum! {
    /// Synthesized layer composited over the whole composed video.
    Overlay, "overlay" {
        Particles => "particles", "Sparse floating bright specks";
        LightLeaks => "light_leaks", "Drifting warm color gradients";
        Dust => "dust", "Fine flickering dust";
        Scratches => "scratches", "Vertical film scratches";
        Bokeh => "bokeh", "Soft out-of-focus light blobs";
        LensFlare => "lens_flare", "Radial flare from the upper right";
        Rain => "rain", "Falling rain streaks";
        Snow => "snow", "Soft falling snow";
    }
}

impl Default for Transition {
    fn default() -> Self {
        Transition::Fade
    }
}

impl Default for Motion {
    fn default() -> Self {
        Motion::Static
    }
}

// ---------------------------------------------------------------------------
// Catalog listing and lookups
// ---------------------------------------------------------------------------

/// One catalog entry as exposed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectInfo {
    pub category: EffectCategory,
    pub name: &'static str,
    pub description: &'static str,
}

/// The four effect categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectCategory {
    Transition,
    Motion,
    Color,
    Overlay,
}

impl FromStr for EffectCategory {
    type Err = Error;

    /// Accepts singular or plural category names.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "transition" | "transitions" => Ok(EffectCategory::Transition),
            "motion" | "motions" => Ok(EffectCategory::Motion),
            "color" | "colors" => Ok(EffectCategory::Color),
            "overlay" | "overlays" => Ok(EffectCategory::Overlay),
            other => Err(Error::not_found("effect category", other)),
        }
    }
}

/// Full listing of the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct EffectCatalog {
    pub transitions: Vec<EffectInfo>,
    pub motions: Vec<EffectInfo>,
    pub colors: Vec<EffectInfo>,
    pub overlays: Vec<EffectInfo>,
}

fn infos<T: Copy>(
    category: EffectCategory,
    all: &[T],
    name: impl Fn(&T) -> &'static str,
    description: impl Fn(&T) -> &'static str,
) -> Vec<EffectInfo> {
    all.iter()
        .map(|v| EffectInfo {
            category,
            name: name(v),
            description: description(v),
        })
        .collect()
}

/// List every effect in every category.
pub fn list_effects() -> EffectCatalog {
    EffectCatalog {
        transitions: infos(
            EffectCategory::Transition,
            Transition::ALL,
            Transition::as_str,
            Transition::description,
        ),
        motions: infos(EffectCategory::Motion, Motion::ALL, Motion::as_str, Motion::description),
        colors: infos(
            EffectCategory::Color,
            ColorGrade::ALL,
            ColorGrade::as_str,
            ColorGrade::description,
        ),
        overlays: infos(EffectCategory::Overlay, Overlay::ALL, Overlay::as_str, Overlay::description),
    }
}

/// Look up a single effect's description.
///
/// # Errors
///
/// [`Error::NotFound`] when either the category or the name is unknown.
pub fn describe(category: &str, name: &str) -> Result<EffectInfo> {
    let category: EffectCategory = category.parse()?;
    let not_found = || Error::not_found(format!("{category:?} effect").to_lowercase(), name);

    let description = match category {
        EffectCategory::Transition => name.parse::<Transition>().map(|v| (v.as_str(), v.description())),
        EffectCategory::Motion => name.parse::<Motion>().map(|v| (v.as_str(), v.description())),
        EffectCategory::Color => name.parse::<ColorGrade>().map(|v| (v.as_str(), v.description())),
        EffectCategory::Overlay => name.parse::<Overlay>().map(|v| (v.as_str(), v.description())),
    };

    let (name, description) = description.map_err(|_| not_found())?;
    Ok(EffectInfo {
        category,
        name,
        description,
    })
}

//! Render requests and their validation.
//!
//! Validation happens before a job exists: a request that fails here never
//! reaches the compiler or the encoder.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use slidecast_core::config::{EffectsConfig, InputConfig};
use slidecast_core::{Error, Result};
use slidecast_effects::{resolve_with_default, EffectOptions, EffectSpec};

/// One still image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAsset {
    pub path: PathBuf,
}

/// One narration part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioAsset {
    pub path: PathBuf,
}

/// Images, narration, and optional effect options for one render.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderRequest {
    pub images: Vec<ImageAsset>,
    /// Narration parts, concatenated in order when there is more than one.
    pub audio: Vec<AudioAsset>,
    #[serde(default)]
    pub effects: Option<EffectOptions>,
}

/// A request that passed validation, with file sizes and resolved effects.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub images: Vec<PathBuf>,
    pub image_sizes: Vec<u64>,
    pub audio: Vec<PathBuf>,
    pub audio_bytes: u64,
    pub effects: EffectSpec,
}

impl RenderRequest {
    pub fn new(
        images: impl IntoIterator<Item = PathBuf>,
        audio: impl IntoIterator<Item = PathBuf>,
    ) -> Self {
        Self {
            images: images.into_iter().map(|path| ImageAsset { path }).collect(),
            audio: audio.into_iter().map(|path| AudioAsset { path }).collect(),
            effects: None,
        }
    }

    pub fn with_effects(mut self, effects: EffectOptions) -> Self {
        self.effects = Some(effects);
        self
    }

    /// Check counts, extensions, and files, and resolve the effect options.
    /// An unset `transitionDuration` takes `effects.default_transition_duration`.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] describing the first problem found.
    pub async fn validate(
        &self,
        input: &InputConfig,
        effects_config: &EffectsConfig,
    ) -> Result<ValidatedRequest> {
        if self.images.is_empty() {
            return Err(Error::Validation("at least one image is required".into()));
        }
        if self.images.len() > input.max_images {
            return Err(Error::Validation(format!(
                "too many images: {} (max {})",
                self.images.len(),
                input.max_images
            )));
        }
        if self.audio.is_empty() {
            return Err(Error::Validation("a narration audio file is required".into()));
        }

        // Effects first: an unknown name should not wait on file checks.
        let default_duration = effects_config.default_transition_duration;
        let effects = match &self.effects {
            Some(options) => resolve_with_default(options, default_duration)?,
            None => EffectSpec {
                transition_duration: default_duration,
                ..EffectSpec::default()
            },
        };

        let mut image_sizes = Vec::with_capacity(self.images.len());
        for image in &self.images {
            check_extension(&image.path, &input.image_extensions, "image")?;
            image_sizes.push(file_size(&image.path, "image").await?);
        }

        let mut audio_bytes = 0;
        for part in &self.audio {
            check_extension(&part.path, &input.audio_extensions, "audio")?;
            audio_bytes += file_size(&part.path, "audio").await?;
        }

        Ok(ValidatedRequest {
            images: self.images.iter().map(|i| i.path.clone()).collect(),
            image_sizes,
            audio: self.audio.iter().map(|a| a.path.clone()).collect(),
            audio_bytes,
            effects,
        })
    }
}

fn check_extension(path: &Path, allowed: &[String], kind: &str) -> Result<()> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext)) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "unsupported {kind} type '{}' for {} (allowed: {})",
            ext,
            path.display(),
            allowed.join(", ")
        )))
    }
}

async fn file_size(path: &Path, kind: &str) -> Result<u64> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|_| Error::Validation(format!("{kind} file not found: {}", path.display())))?;
    if !meta.is_file() {
        return Err(Error::Validation(format!(
            "{kind} path is not a file: {}",
            path.display()
        )));
    }
    if meta.len() == 0 {
        return Err(Error::Validation(format!(
            "{kind} file is empty: {}",
            path.display()
        )));
    }
    Ok(meta.len())
}

//! Ledger record types.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slidecast_core::JobId;
use slidecast_effects::EffectSpec;

/// One input image as recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSummary {
    pub filename: String,
    pub size_bytes: u64,
}

impl ImageSummary {
    pub fn new(path: &Path, size_bytes: u64) -> Self {
        Self {
            filename: file_name(path),
            size_bytes,
        }
    }
}

/// The narration as recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSummary {
    /// Original part names, in concatenation order.
    pub files: Vec<String>,
    pub total_size_bytes: u64,
    pub duration_seconds: f64,
}

impl AudioSummary {
    pub fn new(paths: &[PathBuf], total_size_bytes: u64, duration_seconds: f64) -> Self {
        Self {
            files: paths.iter().map(|p| file_name(p)).collect(),
            total_size_bytes,
            duration_seconds,
        }
    }
}

/// Encoder and timing settings a render was produced with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_codec: String,
    pub crf: i32,
    pub preset: String,
    pub segment_durations: Vec<f64>,
    /// Which estimation tier produced the narration length
    /// (`probe`, `diagnostic`, `file_size`, `fallback`).
    pub duration_source: String,
}

/// Persisted projection of a succeeded render job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: JobId,
    pub timestamp: DateTime<Utc>,
    pub images: Vec<ImageSummary>,
    pub audio: AudioSummary,
    pub effects: EffectSpec,
    pub output_filename: String,
    pub output_path: PathBuf,
    pub processing_ms: u64,
    pub settings: LedgerSettings,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summaries_keep_file_names_only() {
        let img = ImageSummary::new(Path::new("/uploads/tmp/photo.jpg"), 10);
        assert_eq!(img.filename, "photo.jpg");

        let audio = AudioSummary::new(
            &[PathBuf::from("/a/intro.mp3"), PathBuf::from("/b/outro.wav")],
            20,
            12.5,
        );
        assert_eq!(audio.files, vec!["intro.mp3", "outro.wav"]);
    }

    #[test]
    fn entry_json_is_camel_case() {
        let entry = fixtures::entry("slideshow_20260101120000_abcd1234.mp4");
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("outputFilename").is_some());
        assert!(json.get("processingMs").is_some());
        assert_eq!(json["settings"]["durationSource"], "probe");
        assert_eq!(json["images"][1]["sizeBytes"], 2048);

        let back: LedgerEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}

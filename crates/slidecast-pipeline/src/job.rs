//! The render job record and its status transitions.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use slidecast_core::{Error, JobId, Result};
use slidecast_effects::EffectSpec;

/// Render job status.
///
/// `Queued -> Running -> Succeeded | Failed`. A job may also fail straight
/// from `Queued` (cancelled while waiting for a slot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// Where the artifact goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputDescriptor {
    pub filename: String,
    pub path: PathBuf,
}

/// One render job.
#[derive(Debug, Clone, Serialize)]
pub struct RenderJob {
    pub id: JobId,
    pub created_at: DateTime<Utc>,
    pub images: Vec<PathBuf>,
    /// The narration actually encoded (merged when several parts were given).
    pub audio: Option<PathBuf>,
    pub effects: EffectSpec,
    pub output: OutputDescriptor,
    pub segment_durations: Vec<f64>,
    pub status: JobStatus,
    /// Encode progress, 0.0..=1.0.
    pub progress: f64,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RenderJob {
    pub fn new(id: JobId, images: Vec<PathBuf>, effects: EffectSpec, output: OutputDescriptor) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            images,
            audio: None,
            effects,
            output,
            segment_durations: Vec::new(),
            status: JobStatus::Queued,
            progress: 0.0,
            error: None,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn start(&mut self) -> Result<()> {
        self.transition(JobStatus::Queued, JobStatus::Running)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Record timing once the narration has been measured.
    pub fn set_timing(&mut self, audio: PathBuf, segment_durations: Vec<f64>) {
        self.audio = Some(audio);
        self.segment_durations = segment_durations;
    }

    /// Progress never moves backwards and is ignored outside `Running`.
    pub fn update_progress(&mut self, fraction: f64) {
        if self.status == JobStatus::Running && fraction > self.progress {
            self.progress = fraction.min(1.0);
        }
    }

    pub fn succeed(&mut self) -> Result<()> {
        self.transition(JobStatus::Running, JobStatus::Succeeded)?;
        self.progress = 1.0;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn fail(&mut self, error: &str) -> Result<()> {
        if self.status.is_terminal() {
            return Err(Error::Internal(format!(
                "job {} already {:?}, cannot fail",
                self.id, self.status
            )));
        }
        self.status = JobStatus::Failed;
        self.error = Some(error.to_string());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    fn transition(&mut self, from: JobStatus, to: JobStatus) -> Result<()> {
        if self.status != from {
            return Err(Error::Internal(format!(
                "job {}: invalid transition {:?} -> {:?}",
                self.id, self.status, to
            )));
        }
        self.status = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> RenderJob {
        RenderJob::new(
            JobId::new(),
            vec![PathBuf::from("a.jpg")],
            EffectSpec::default(),
            OutputDescriptor {
                filename: "out.mp4".into(),
                path: PathBuf::from("/out/out.mp4"),
            },
        )
    }

    #[test]
    fn happy_path() {
        let mut j = job();
        assert_eq!(j.status, JobStatus::Queued);
        j.start().unwrap();
        assert!(j.started_at.is_some());
        j.update_progress(0.4);
        j.update_progress(0.2);
        assert_eq!(j.progress, 0.4);
        j.succeed().unwrap();
        assert_eq!(j.status, JobStatus::Succeeded);
        assert_eq!(j.progress, 1.0);
        assert!(j.completed_at.is_some());
    }

    #[test]
    fn terminal_states_are_final() {
        let mut j = job();
        j.start().unwrap();
        j.fail("Encoding error: boom").unwrap();
        assert_eq!(j.status, JobStatus::Failed);
        assert!(j.succeed().is_err());
        assert!(j.fail("again").is_err());
        assert_eq!(j.error.as_deref(), Some("Encoding error: boom"));
    }

    #[test]
    fn cannot_succeed_without_running() {
        let mut j = job();
        assert!(matches!(j.succeed(), Err(Error::Internal(_))));
        assert!(j.start().is_ok());
        assert!(j.start().is_err());
    }

    #[test]
    fn queued_job_can_fail() {
        let mut j = job();
        j.fail("Cancelled: waiting for slot").unwrap();
        assert!(j.status.is_terminal());
        j.update_progress(0.5);
        assert_eq!(j.progress, 0.0);
    }
}

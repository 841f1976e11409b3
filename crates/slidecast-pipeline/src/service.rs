//! The render service: one request in, one video and one ledger entry out.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use slidecast_av::{
    segment_durations, AudioConcatenator, AudioTranscoder, CanonicalAudio, DurationEstimate,
    DurationEstimator, DurationSource, EncodeEvent, EncodeRequest, EncodeSettings,
    EncodingOrchestrator, FfmpegAudio, FfmpegProbe, JobWorkspace, MediaProbe, ToolRegistry,
};
use slidecast_core::config::Config;
use slidecast_core::events::{EventBus, EventPayload};
use slidecast_core::{Error, JobId, Result};
use slidecast_effects::EffectSpec;
use slidecast_graph::{compile, RenderSettings};
use slidecast_ledger::{AudioSummary, ImageSummary, JobLedger, LedgerEntry, LedgerSettings};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::job::{OutputDescriptor, RenderJob};
use crate::request::{RenderRequest, ValidatedRequest};

/// `slideshow_<YYYYmmddHHMMSS>_<job-id-prefix>.mp4`
pub fn output_filename(id: JobId, at: DateTime<Utc>) -> String {
    format!("slideshow_{}_{}.mp4", at.format("%Y%m%d%H%M%S"), id.short())
}

/// What a successful render hands back.
#[derive(Debug, Clone, Serialize)]
pub struct RenderOutcome {
    pub job_id: JobId,
    pub output_filename: String,
    pub output_path: PathBuf,
    pub effects: EffectSpec,
    pub segment_durations: Vec<f64>,
    pub total_duration: f64,
    pub duration_source: DurationSource,
    pub processing_ms: u64,
}

/// Runs render jobs end to end.
///
/// At most `jobs.max_concurrent` jobs hold an encode slot at once; the rest
/// wait in [`render`](Self::render) until a slot frees up or they are
/// cancelled.
pub struct RenderService {
    config: Arc<Config>,
    estimator: DurationEstimator,
    concatenator: AudioConcatenator,
    orchestrator: EncodingOrchestrator,
    render_settings: RenderSettings,
    ledger: Arc<JobLedger>,
    events: Arc<EventBus>,
    slots: Semaphore,
    jobs: RwLock<HashMap<JobId, RenderJob>>,
}

impl RenderService {
    /// Service backed by the ffmpeg/ffprobe CLIs in `tools`.
    pub fn new(config: Arc<Config>, tools: Arc<ToolRegistry>, events: Arc<EventBus>) -> Self {
        let probe_timeout = Duration::from_secs(config.jobs.probe_timeout_secs);
        let encode_timeout = Duration::from_secs(config.jobs.encode_timeout_secs);
        let probe = Arc::new(FfmpegProbe::new(Arc::clone(&tools), probe_timeout));
        let transcoder = Arc::new(FfmpegAudio::new(Arc::clone(&tools), encode_timeout));
        Self::with_backends(config, tools, events, probe, transcoder)
    }

    /// Service with explicit probe and transcoder backends.
    pub fn with_backends(
        config: Arc<Config>,
        tools: Arc<ToolRegistry>,
        events: Arc<EventBus>,
        probe: Arc<dyn MediaProbe>,
        transcoder: Arc<dyn AudioTranscoder>,
    ) -> Self {
        let estimator = DurationEstimator::new(probe, config.duration.clone());
        let concatenator = AudioConcatenator::new(
            transcoder,
            estimator.clone(),
            CanonicalAudio::from(&config.audio),
            config.storage.work_dir.clone(),
            config.duration.fallback_seconds,
        );
        let orchestrator = EncodingOrchestrator::new(
            tools,
            EncodeSettings::from(&config.video),
            Duration::from_secs(config.jobs.encode_timeout_secs),
        );

        Self {
            estimator,
            concatenator,
            orchestrator,
            render_settings: RenderSettings::from_config(&config),
            ledger: Arc::new(JobLedger::new(config.storage.ledger_path.clone())),
            events,
            slots: Semaphore::new(config.jobs.max_concurrent.max(1)),
            jobs: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn ledger(&self) -> &Arc<JobLedger> {
        &self.ledger
    }

    /// Snapshot of one job.
    pub fn job(&self, id: JobId) -> Option<RenderJob> {
        self.jobs.read().get(&id).cloned()
    }

    /// Snapshot of every job this service has seen, oldest first.
    pub fn jobs(&self) -> Vec<RenderJob> {
        let mut jobs: Vec<_> = self.jobs.read().values().cloned().collect();
        jobs.sort_by_key(|j| j.created_at);
        jobs
    }

    /// Render one request.
    ///
    /// Validation failures return before a job exists. Every later failure
    /// marks the job failed, is broadcast as `JobFailed`, and leaves the
    /// ledger untouched. Firing `cancel` stops a queued job or kills its
    /// encode.
    pub async fn render(&self, request: RenderRequest, cancel: CancellationToken) -> Result<RenderOutcome> {
        let started = Instant::now();
        let validated = request.validate(&self.config.input, &self.config.effects).await?;

        let job_id = JobId::new();
        let filename = output_filename(job_id, Utc::now());
        let output = OutputDescriptor {
            path: self.config.storage.output_dir.join(&filename),
            filename,
        };
        self.jobs.write().insert(
            job_id,
            RenderJob::new(job_id, validated.images.clone(), validated.effects, output.clone()),
        );

        tracing::info!(job_id = %job_id, images = validated.images.len(), audio_parts = validated.audio.len(), "job queued");
        self.events.broadcast(EventPayload::JobQueued {
            job_id,
            images: validated.images.len(),
        });

        match self.run(job_id, &validated, &output, &cancel, started).await {
            Ok(outcome) => {
                self.with_job(job_id, RenderJob::succeed);
                tracing::info!(
                    job_id = %job_id,
                    output = %outcome.output_filename,
                    processing_ms = outcome.processing_ms,
                    "job completed"
                );
                self.events.broadcast(EventPayload::JobCompleted {
                    job_id,
                    output_filename: outcome.output_filename.clone(),
                });
                Ok(outcome)
            }
            Err(e) => {
                let message = e.to_string();
                self.with_job(job_id, |j| j.fail(&message));
                tracing::error!(job_id = %job_id, kind = %e.kind(), error = %message, "job failed");
                self.events.broadcast(EventPayload::JobFailed {
                    job_id,
                    kind: e.kind(),
                    error: message,
                });
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        job_id: JobId,
        request: &ValidatedRequest,
        output: &OutputDescriptor,
        cancel: &CancellationToken,
        started: Instant,
    ) -> Result<RenderOutcome> {
        let _slot = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(Error::Cancelled(format!("job {job_id} cancelled while queued")));
            }
            slot = self.slots.acquire() => {
                slot.map_err(|_| Error::Internal("render slots closed".into()))?
            }
        };
        self.with_job(job_id, RenderJob::start);
        tracing::info!(job_id = %job_id, "job started");

        let workspace =
            JobWorkspace::new_in(&self.config.storage.work_dir, &format!("job-{}-", job_id.short()))?;
        let result = self
            .produce(job_id, request, output, cancel, started, &workspace)
            .await;
        if let Err(e) = workspace.close() {
            tracing::warn!(job_id = %job_id, error = %e, "failed to remove job workspace");
        }
        result
    }

    async fn produce(
        &self,
        job_id: JobId,
        request: &ValidatedRequest,
        output: &OutputDescriptor,
        cancel: &CancellationToken,
        started: Instant,
        workspace: &JobWorkspace,
    ) -> Result<RenderOutcome> {
        let fallback = self.config.duration.fallback_seconds;
        let (narration, estimate) = match request.audio.as_slice() {
            [single] => {
                let estimate = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return Err(Error::Cancelled(format!(
                            "job {job_id} cancelled while measuring narration"
                        )));
                    }
                    estimate = self.estimator.estimate_detailed(single, fallback) => estimate,
                };
                (single.clone(), estimate)
            }
            parts => {
                let merged = self
                    .concatenator
                    .concatenate(parts, &workspace.file("narration.wav"), cancel)
                    .await?;
                let estimate = DurationEstimate {
                    seconds: merged.total_duration,
                    source: merged.duration_source,
                };
                (merged.output_path, estimate)
            }
        };
        tracing::info!(job_id = %job_id, seconds = estimate.seconds, source = %estimate.source, "narration measured");

        let durations = segment_durations(estimate.seconds, request.images.len())?;
        self.with_job(job_id, |j| {
            j.set_timing(narration.clone(), durations.clone());
            Ok(())
        });

        let graph = compile(&request.images, &durations, &self.render_settings, &request.effects)?;
        tracing::debug!(
            job_id = %job_id,
            operations = graph.operations.len(),
            timeline = graph.timeline_seconds,
            "filter graph compiled"
        );

        if let Some(dir) = output.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| Error::system(format!("create output dir {}", dir.display()), e))?;
        }

        let mut handle = self.orchestrator.submit(
            EncodeRequest {
                graph,
                audio: narration,
                output: output.path.clone(),
                total_duration: estimate.seconds,
            },
            cancel.child_token(),
        );
        while let Some(event) = handle.events().recv().await {
            match event {
                EncodeEvent::Started { command } => {
                    self.events.broadcast(EventPayload::JobStarted { job_id, command });
                }
                EncodeEvent::Progress { fraction } => {
                    self.with_job(job_id, |j| {
                        j.update_progress(fraction);
                        Ok(())
                    });
                    self.events.broadcast(EventPayload::JobProgress { job_id, fraction });
                }
                EncodeEvent::Succeeded { .. } | EncodeEvent::Failed { .. } => {}
            }
        }

        if let Err(e) = handle.wait().await {
            if tokio::fs::remove_file(&output.path).await.is_ok() {
                tracing::debug!(job_id = %job_id, "removed partial output");
            }
            return Err(e);
        }

        let processing_ms = started.elapsed().as_millis() as u64;
        let video = &self.config.video;
        let entry = LedgerEntry {
            id: job_id,
            timestamp: Utc::now(),
            images: request
                .images
                .iter()
                .zip(&request.image_sizes)
                .map(|(path, size)| ImageSummary::new(path, *size))
                .collect(),
            audio: AudioSummary::new(&request.audio, request.audio_bytes, estimate.seconds),
            effects: request.effects,
            output_filename: output.filename.clone(),
            output_path: output.path.clone(),
            processing_ms,
            settings: LedgerSettings {
                width: video.width,
                height: video.height,
                fps: video.fps,
                video_codec: video.video_codec.clone(),
                crf: video.crf,
                preset: video.preset.clone(),
                segment_durations: durations.clone(),
                duration_source: estimate.source.as_str().to_string(),
            },
        };
        self.ledger.append(entry).await?;

        Ok(RenderOutcome {
            job_id,
            output_filename: output.filename.clone(),
            output_path: output.path.clone(),
            effects: request.effects,
            segment_durations: durations,
            total_duration: estimate.seconds,
            duration_source: estimate.source,
            processing_ms,
        })
    }

    fn with_job(&self, id: JobId, f: impl FnOnce(&mut RenderJob) -> Result<()>) {
        if let Some(job) = self.jobs.write().get_mut(&id) {
            if let Err(e) = f(job) {
                tracing::warn!(job_id = %id, error = %e, "job state not updated");
            }
        }
    }
}

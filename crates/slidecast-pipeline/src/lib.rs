//! # slidecast-pipeline
//!
//! Turns a [`RenderRequest`] into a finished video and a ledger entry.
//!
//! [`RenderService`] validates the request, measures (and if needed merges)
//! the narration, splits it across the images, compiles the filter graph,
//! runs one encode, and appends to the ledger only when the encode
//! succeeded. Jobs are admitted through a semaphore and report their
//! lifecycle on the shared event bus.

pub mod job;
pub mod request;
pub mod service;

pub use job::{JobStatus, OutputDescriptor, RenderJob};
pub use request::{AudioAsset, ImageAsset, RenderRequest, ValidatedRequest};
pub use service::{output_filename, RenderOutcome, RenderService};

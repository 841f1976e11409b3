//! slidecast-core: shared error taxonomy, configuration, IDs, and events.
//!
//! Every other slidecast crate depends on this one. It provides the unified
//! [`Error`] type, the single [`config::Config`] struct constructed at
//! startup, typed job identifiers, and the broadcast [`events::EventBus`]
//! used to report render progress.

pub mod config;
pub mod error;
pub mod events;
pub mod ids;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, ErrorKind, ErrorReport, Result};
pub use ids::*;

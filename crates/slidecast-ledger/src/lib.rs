//! slidecast-ledger: the durable record of completed renders.
//!
//! One [`LedgerEntry`] is appended per successful job. The store is a
//! pretty-printed JSON array on disk; [`JobLedger`] serializes writers and
//! replaces the file atomically.

pub mod entry;
pub mod ledger;

pub use entry::{AudioSummary, ImageSummary, LedgerEntry, LedgerSettings};
pub use ledger::JobLedger;

//! Pipeline orchestration for RosterSync.

pub mod pipeline;

pub use pipeline::{ProgressReporter, RunMode, SilentProgress, SyncConfig, SyncResult, run};

// Publish outcomes surface in [`SyncResult`]; re-export them for consumers.
pub use rostersync_publish::{PrStatus, PublishOutcome};

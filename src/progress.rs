use std::path::PathBuf;
use std::sync::Arc;

use crate::error::FailureKind;

/// Events emitted during a fetch batch for progress reporting
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Input URLs have been matched against the sources
    UrlsClassified {
        total: usize,
        valid: usize,
        invalid: usize,
    },

    /// A task is about to run
    FetchStarting {
        url: String,
        /// Index of this task among the valid tasks
        task_index: usize,
        total_tasks: usize,
    },

    /// A card was verified and written
    FetchSucceeded { url: String, path: PathBuf },

    /// A task failed; the batch continues
    FetchFailed {
        url: String,
        kind: FailureKind,
        error: String,
    },

    /// All tasks have run
    BatchCompleted {
        succeeded: usize,
        failed: usize,
        invalid: usize,
    },
}

/// Trait for reporting progress events during a fetch batch.
///
/// Implementations can use this to display progress bars, log messages,
/// or collect statistics.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {}
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}

use std::path::PathBuf;
use thiserror::Error;

pub use swm_lock::LockError;

/// Library-level error type shared across the swm crates.
///
/// Each variant maps to a category from the error handling design: transient
/// errors that should be retried on the next crank, and permanent errors that
/// should surface a reason string on the tracking bug and move on.
#[derive(Error, Debug)]
pub enum SwmError {
    #[error("tracker communication error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    #[error("malformed tracker state: {0}")]
    MalformedState(String),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("messaging error: {0}")]
    Messaging(#[from] MessagingError),

    #[error("{0}")]
    Crank(#[from] CrankError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SwmError {
    /// Whether this error should be treated as transient (retry next crank)
    /// or as a permanent condition that should be reported and skipped.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            SwmError::Tracker(e) => e.is_transient(),
            SwmError::Messaging(e) => e.is_transient(),
            SwmError::Lock(_) => true,
            SwmError::Io { .. } => true,
            SwmError::Crank(_)
            | SwmError::MalformedState(_)
            | SwmError::Catalog(_)
            | SwmError::Other(_) => false,
        }
    }
}

/// A task handler refused to advance a task because a precondition it
/// depends on does not hold yet (spec.md §7): surfaced on the tracker as a
/// `"Stalled -- <kind>: <message>"` reason rather than retried blindly.
#[derive(Error, Debug)]
#[error("Stalled -- {kind}: {message}")]
pub struct CrankError {
    pub kind: String,
    pub message: String,
}

impl CrankError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// The reason string to attach to the stalled task, without the
    /// `"Stalled -- "` prefix (callers that already build their own
    /// `ReasonKind::Stalled` reason via `swm-tracker` use this instead of
    /// `Display`, which includes the prefix).
    #[must_use]
    pub fn detail(&self) -> String {
        format!("{}: {}", self.kind, self.message)
    }
}

/// Errors arising from communication with the external bug tracker.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("tracker request failed: {0}")]
    Request(String),

    #[error("tracker returned not found for bug {0}")]
    NotFound(String),

    #[error("tracker authentication/authorization failure: {0}")]
    Unauthorized(String),

    #[error("tracker rate limited; retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("tracker response could not be parsed: {0}")]
    Parse(String),

    #[error("tracker task {0} does not exist on this bug")]
    NoSuchTask(String),
}

impl TrackerError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TrackerError::Request(_) | TrackerError::RateLimited { .. }
        )
    }
}

/// Errors arising from the kernel series catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog file not found at {0}")]
    NotFound(PathBuf),

    #[error("catalog parse error: {0}")]
    Parse(String),

    #[error("unknown series {0}")]
    UnknownSeries(String),

    #[error("unknown source package {series}/{source}")]
    UnknownSource { series: String, source: String },
}

/// Errors arising from the message queue publisher.
#[derive(Error, Debug)]
pub enum MessagingError {
    #[error("could not connect to message broker at {0}")]
    Connect(String),

    #[error("failed to publish message: {0}")]
    Publish(String),
}

impl MessagingError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, MessagingError::Connect(_) | MessagingError::Publish(_))
    }
}

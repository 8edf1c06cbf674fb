use miette::Diagnostic;
use thiserror::Error;

/// Exit code used when a stage is aborted by its wall-clock timeout.
///
/// Matches coreutils `timeout(1)` so CI logs read the same either way.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Exit code used when a stage is stopped by SIGINT.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Unified error type for all dlindex operations.
#[derive(Debug, Error, Diagnostic)]
pub enum DlIndexError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed manifest (`Index.toml`).
    #[error("Manifest error: {message}")]
    #[diagnostic(help("Check your Index.toml for syntax errors"))]
    Manifest { message: String },

    /// Listing, reading or writing the object store failed.
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// HTTP request against the public site failed.
    #[error("Network error: {message}")]
    Network { message: String },

    /// The index could not be rendered.
    #[error("Render error: {message}")]
    Render { message: String },

    /// A credential could not be resolved. Messages carry credential ids only.
    #[error("Credential error: {message}")]
    #[diagnostic(help("Add the credential id to .dlindex.env or export it"))]
    Credential { message: String },

    /// A stage step exited with a non-zero status.
    #[error("Stage '{stage}' failed: step '{step}' exited with status {exit_code}")]
    StageFailed {
        stage: String,
        step: String,
        exit_code: i32,
    },

    /// A stage ran past its wall-clock limit and was aborted.
    #[error("Stage '{stage}' timed out after {limit}")]
    Timeout { stage: String, limit: String },

    /// A stage was stopped by Ctrl-C.
    #[error("Stage '{stage}' interrupted")]
    Interrupted { stage: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

impl DlIndexError {
    /// Process exit code that reports this error to the pipeline runner.
    ///
    /// A failed step propagates its own status so the runner sees what the
    /// step saw; statuses outside `1..=255` collapse to `1`.
    pub fn exit_code(&self) -> i32 {
        match self {
            DlIndexError::StageFailed { exit_code, .. } if (1..=255).contains(exit_code) => {
                *exit_code
            }
            DlIndexError::Timeout { .. } => TIMEOUT_EXIT_CODE,
            DlIndexError::Interrupted { .. } => INTERRUPTED_EXIT_CODE,
            _ => 1,
        }
    }
}

/// Convenience alias for `miette::Result<T>`.
pub type DlIndexResult<T> = miette::Result<T>;

use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while building or driving the pipeline.
///
/// Stages never produce these: a stage only forwards values or stops.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The head of the pipeline is already being fed
    #[error("Pipeline input has already been taken")]
    AlreadyStarted,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Thread spawn or join error
    #[error("Thread error: {0}")]
    ThreadError(String),

    /// Console or sink I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

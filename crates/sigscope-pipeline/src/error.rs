use thiserror::Error;

use crate::context::PipelineContext;

/// Stage name used when a failure cannot be attributed to a stage.
pub const UNKNOWN_STAGE: &str = "unknown";

/// A failed pipeline run.
///
/// Carries the context as it stood after every error hook ran, so partial
/// results and recorded errors can be inspected without re-running.
#[derive(Debug, Error)]
#[error("pipeline failed at stage `{stage}`: {message}")]
pub struct PipelineError {
    pub stage: String,
    pub message: String,
    pub context: Box<PipelineContext>,
    #[source]
    pub cause: anyhow::Error,
}

impl PipelineError {
    #[must_use]
    pub fn new(
        stage: impl Into<String>,
        message: impl Into<String>,
        context: PipelineContext,
        cause: anyhow::Error,
    ) -> Self {
        Self {
            stage: stage.into(),
            message: message.into(),
            context: Box::new(context),
            cause,
        }
    }
}

/// Failures raised by the orchestrator itself rather than by a stage body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StageError {
    #[error("stage `{0}` produced output that failed validation")]
    InvalidOutput(String),

    #[error("stage name `{0}` is used more than once")]
    DuplicateName(String),

    #[error("stage `{0}` received a value of an unexpected type")]
    TypeMismatch(String),
}

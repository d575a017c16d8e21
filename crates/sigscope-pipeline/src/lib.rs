//! Sequential multi-stage pipeline engine for sigscope.
//!
//! A [`PipelineOrchestrator`] runs named [`PipelineStage`]s in order, threading
//! each stage's output into the next and sharing one [`PipelineContext`] per
//! run. [`PipelineHooks`] observe the run's lifecycle without being able to
//! change its outcome.

pub mod context;
pub mod error;
pub mod hooks;
pub mod orchestrator;
pub mod stage;

pub use context::{PipelineContext, RecordedError};
pub use error::{PipelineError, StageError, UNKNOWN_STAGE};
pub use hooks::{
    combine, hook_future, logging_hooks, timing_hooks, HookFuture, PipelineHooks, RunSummary,
    STAGE_TIMINGS_KEY, TOTAL_DURATION_KEY,
};
pub use orchestrator::{PipelineOrchestrator, PipelineResult};
pub use stage::PipelineStage;

//! Lifecycle hooks for pipeline runs.
//!
//! Every hook point is optional. A hook returning `Err` or panicking is
//! logged and otherwise ignored; it never changes the outcome of a run.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use futures::future::BoxFuture;
use futures::FutureExt;
use uuid::Uuid;

use crate::context::PipelineContext;

/// Metadata key holding per-stage durations in milliseconds.
pub const STAGE_TIMINGS_KEY: &str = "stage_timings";
/// Metadata key holding the whole run's duration in milliseconds.
pub const TOTAL_DURATION_KEY: &str = "total_duration_ms";

pub type HookFuture<'a> = BoxFuture<'a, anyhow::Result<()>>;

pub type StartHook =
    Arc<dyn for<'a> Fn(&'a mut PipelineContext) -> HookFuture<'a> + Send + Sync>;
pub type StageStartHook =
    Arc<dyn for<'a> Fn(&'a str, &'a mut PipelineContext) -> HookFuture<'a> + Send + Sync>;
pub type StageCompleteHook = Arc<
    dyn for<'a> Fn(&'a str, &'a (dyn Any + Send + Sync), &'a mut PipelineContext) -> HookFuture<'a>
        + Send
        + Sync,
>;
/// Shared by `on_stage_error` and `on_error`: stage name, cause, context.
pub type FailureHook = Arc<
    dyn for<'a> Fn(&'a str, &'a anyhow::Error, &'a mut PipelineContext) -> HookFuture<'a>
        + Send
        + Sync,
>;
pub type CompleteHook =
    Arc<dyn for<'a> Fn(&'a RunSummary, &'a mut PipelineContext) -> HookFuture<'a> + Send + Sync>;

/// Outcome passed to `on_complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub duration: Duration,
    pub success: bool,
}

/// Box an async block as a hook future.
pub fn hook_future<'a, F>(future: F) -> HookFuture<'a>
where
    F: Future<Output = anyhow::Result<()>> + Send + 'a,
{
    Box::pin(future)
}

/// Optional observers for each lifecycle point of a run.
///
/// An absent field means the point is not observed at all.
#[derive(Clone, Default)]
pub struct PipelineHooks {
    pub on_start: Option<StartHook>,
    pub on_stage_start: Option<StageStartHook>,
    pub on_stage_complete: Option<StageCompleteHook>,
    pub on_stage_error: Option<FailureHook>,
    pub on_complete: Option<CompleteHook>,
    pub on_error: Option<FailureHook>,
}

impl std::fmt::Debug for PipelineHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineHooks")
            .field("on_start", &self.on_start.is_some())
            .field("on_stage_start", &self.on_stage_start.is_some())
            .field("on_stage_complete", &self.on_stage_complete.is_some())
            .field("on_stage_error", &self.on_stage_error.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl PipelineHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when no lifecycle point is observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.on_start.is_none()
            && self.on_stage_start.is_none()
            && self.on_stage_complete.is_none()
            && self.on_stage_error.is_none()
            && self.on_complete.is_none()
            && self.on_error.is_none()
    }

    #[must_use]
    pub fn on_start<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a mut PipelineContext) -> HookFuture<'a> + Send + Sync + 'static,
    {
        self.on_start = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn on_stage_start<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a str, &'a mut PipelineContext) -> HookFuture<'a> + Send + Sync + 'static,
    {
        self.on_stage_start = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn on_stage_complete<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a str, &'a (dyn Any + Send + Sync), &'a mut PipelineContext) -> HookFuture<'a>
            + Send
            + Sync
            + 'static,
    {
        self.on_stage_complete = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn on_stage_error<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a str, &'a anyhow::Error, &'a mut PipelineContext) -> HookFuture<'a>
            + Send
            + Sync
            + 'static,
    {
        self.on_stage_error = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn on_complete<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a RunSummary, &'a mut PipelineContext) -> HookFuture<'a>
            + Send
            + Sync
            + 'static,
    {
        self.on_complete = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a str, &'a anyhow::Error, &'a mut PipelineContext) -> HookFuture<'a>
            + Send
            + Sync
            + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    pub(crate) async fn fire_start(&self, ctx: &mut PipelineContext) {
        if let Some(hook) = &self.on_start {
            guarded("on_start", async { hook(ctx).await }).await;
        }
    }

    pub(crate) async fn fire_stage_start(&self, stage: &str, ctx: &mut PipelineContext) {
        if let Some(hook) = &self.on_stage_start {
            guarded("on_stage_start", async { hook(stage, ctx).await }).await;
        }
    }

    pub(crate) async fn fire_stage_complete(
        &self,
        stage: &str,
        output: &(dyn Any + Send + Sync),
        ctx: &mut PipelineContext,
    ) {
        if let Some(hook) = &self.on_stage_complete {
            guarded("on_stage_complete", async {
                hook(stage, output, ctx).await
            })
            .await;
        }
    }

    pub(crate) async fn fire_stage_error(
        &self,
        stage: &str,
        error: &anyhow::Error,
        ctx: &mut PipelineContext,
    ) {
        if let Some(hook) = &self.on_stage_error {
            guarded("on_stage_error", async { hook(stage, error, ctx).await }).await;
        }
    }

    pub(crate) async fn fire_complete(&self, summary: &RunSummary, ctx: &mut PipelineContext) {
        if let Some(hook) = &self.on_complete {
            guarded("on_complete", async { hook(summary, ctx).await }).await;
        }
    }

    pub(crate) async fn fire_error(
        &self,
        stage: &str,
        error: &anyhow::Error,
        ctx: &mut PipelineContext,
    ) {
        if let Some(hook) = &self.on_error {
            guarded("on_error", async { hook(stage, error, ctx).await }).await;
        }
    }
}

/// Await one hook call, turning a panic into a logged failure.
async fn guarded<F>(point: &'static str, call: F)
where
    F: Future<Output = anyhow::Result<()>>,
{
    let result = match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(anyhow!("hook panicked: {}", panic_message(panic.as_ref()))),
    };
    log_failure(point, result);
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload")
}

fn log_failure(point: &'static str, result: anyhow::Result<()>) {
    if let Err(e) = result {
        tracing::warn!(hook = point, error = %e, "pipeline hook failed");
    }
}

/// Merge several hook sets into one.
///
/// For every lifecycle point defined by at least one input, the merged hook
/// calls each definition in the given order, logging any failure and moving
/// on to the next. Points no input defines stay absent.
pub fn combine(hooks: impl IntoIterator<Item = PipelineHooks>) -> PipelineHooks {
    let all: Vec<PipelineHooks> = hooks.into_iter().collect();
    let mut combined = PipelineHooks::new();

    let starts: Vec<StartHook> = all.iter().filter_map(|h| h.on_start.clone()).collect();
    if !starts.is_empty() {
        let starts: Arc<[StartHook]> = starts.into();
        combined = combined.on_start(move |ctx| {
            let starts = Arc::clone(&starts);
            hook_future(async move {
                for hook in starts.iter() {
                    guarded("on_start", async { hook(&mut *ctx).await }).await;
                }
                Ok(())
            })
        });
    }

    let stage_starts: Vec<StageStartHook> =
        all.iter().filter_map(|h| h.on_stage_start.clone()).collect();
    if !stage_starts.is_empty() {
        let stage_starts: Arc<[StageStartHook]> = stage_starts.into();
        combined = combined.on_stage_start(move |stage, ctx| {
            let stage_starts = Arc::clone(&stage_starts);
            hook_future(async move {
                for hook in stage_starts.iter() {
                    guarded("on_stage_start", async { hook(stage, &mut *ctx).await }).await;
                }
                Ok(())
            })
        });
    }

    let stage_completes: Vec<StageCompleteHook> = all
        .iter()
        .filter_map(|h| h.on_stage_complete.clone())
        .collect();
    if !stage_completes.is_empty() {
        let stage_completes: Arc<[StageCompleteHook]> = stage_completes.into();
        combined = combined.on_stage_complete(move |stage, output, ctx| {
            let stage_completes = Arc::clone(&stage_completes);
            hook_future(async move {
                for hook in stage_completes.iter() {
                    guarded("on_stage_complete", async {
                        hook(stage, output, &mut *ctx).await
                    })
                    .await;
                }
                Ok(())
            })
        });
    }

    let stage_errors: Vec<FailureHook> =
        all.iter().filter_map(|h| h.on_stage_error.clone()).collect();
    if !stage_errors.is_empty() {
        let stage_errors: Arc<[FailureHook]> = stage_errors.into();
        combined = combined.on_stage_error(move |stage, error, ctx| {
            let stage_errors = Arc::clone(&stage_errors);
            hook_future(async move {
                for hook in stage_errors.iter() {
                    guarded("on_stage_error", async { hook(stage, error, &mut *ctx).await }).await;
                }
                Ok(())
            })
        });
    }

    let completes: Vec<CompleteHook> = all.iter().filter_map(|h| h.on_complete.clone()).collect();
    if !completes.is_empty() {
        let completes: Arc<[CompleteHook]> = completes.into();
        combined = combined.on_complete(move |summary, ctx| {
            let completes = Arc::clone(&completes);
            hook_future(async move {
                for hook in completes.iter() {
                    guarded("on_complete", async { hook(summary, &mut *ctx).await }).await;
                }
                Ok(())
            })
        });
    }

    let errors: Vec<FailureHook> = all.iter().filter_map(|h| h.on_error.clone()).collect();
    if !errors.is_empty() {
        let errors: Arc<[FailureHook]> = errors.into();
        combined = combined.on_error(move |stage, error, ctx| {
            let errors = Arc::clone(&errors);
            hook_future(async move {
                for hook in errors.iter() {
                    guarded("on_error", async { hook(stage, error, &mut *ctx).await }).await;
                }
                Ok(())
            })
        });
    }

    combined
}

/// One `tracing` event per lifecycle point, tagged with the run id.
#[must_use]
pub fn logging_hooks() -> PipelineHooks {
    PipelineHooks::new()
        .on_start(|ctx| {
            hook_future(async move {
                tracing::info!(run_id = %ctx.run_id, "pipeline started");
                Ok(())
            })
        })
        .on_stage_start(|stage, ctx| {
            hook_future(async move {
                tracing::info!(run_id = %ctx.run_id, stage, "stage started");
                Ok(())
            })
        })
        .on_stage_complete(|stage, _output, ctx| {
            hook_future(async move {
                tracing::info!(run_id = %ctx.run_id, stage, "stage complete");
                Ok(())
            })
        })
        .on_stage_error(|stage, error, ctx| {
            hook_future(async move {
                tracing::warn!(run_id = %ctx.run_id, stage, error = %error, "stage failed");
                Ok(())
            })
        })
        .on_complete(|summary, ctx| {
            hook_future(async move {
                tracing::info!(
                    run_id = %ctx.run_id,
                    success = summary.success,
                    duration_ms = millis(summary.duration),
                    errors = ctx.errors().len(),
                    "pipeline finished"
                );
                Ok(())
            })
        })
        .on_error(|stage, error, ctx| {
            hook_future(async move {
                tracing::error!(run_id = %ctx.run_id, stage, error = %error, "pipeline failed");
                Ok(())
            })
        })
}

type StageClock = Arc<Mutex<HashMap<(Uuid, String), Instant>>>;

/// Record stage and run durations into the context metadata.
///
/// Per-stage milliseconds land in an object under [`STAGE_TIMINGS_KEY`] and
/// the run total under [`TOTAL_DURATION_KEY`]. Failed stages are timed too.
#[must_use]
pub fn timing_hooks() -> PipelineHooks {
    timing_hooks_with(Arc::default())
}

fn timing_hooks_with(clock: StageClock) -> PipelineHooks {
    let start_clock = Arc::clone(&clock);
    let complete_clock = Arc::clone(&clock);
    let error_clock = Arc::clone(&clock);
    let finish_clock = clock;

    PipelineHooks::new()
        .on_stage_start(move |stage, ctx| {
            let clock = Arc::clone(&start_clock);
            hook_future(async move {
                lock(&clock)?.insert((ctx.run_id, stage.to_string()), Instant::now());
                Ok(())
            })
        })
        .on_stage_complete(move |stage, _output, ctx| {
            let clock = Arc::clone(&complete_clock);
            hook_future(async move { record_stage_timing(&clock, stage, ctx) })
        })
        .on_stage_error(move |stage, _error, ctx| {
            let clock = Arc::clone(&error_clock);
            hook_future(async move { record_stage_timing(&clock, stage, ctx) })
        })
        .on_complete(move |summary, ctx| {
            let clock = Arc::clone(&finish_clock);
            hook_future(async move {
                ctx.metadata.insert(
                    TOTAL_DURATION_KEY.to_string(),
                    serde_json::json!(millis(summary.duration)),
                );
                // Stages that never reported back leave their start behind.
                lock(&clock)?.retain(|(run_id, _), _| *run_id != ctx.run_id);
                Ok(())
            })
        })
}

fn record_stage_timing(
    clock: &StageClock,
    stage: &str,
    ctx: &mut PipelineContext,
) -> anyhow::Result<()> {
    let started = lock(clock)?.remove(&(ctx.run_id, stage.to_string()));
    let Some(started) = started else {
        return Ok(());
    };
    let timings = ctx
        .metadata
        .entry(STAGE_TIMINGS_KEY.to_string())
        .or_insert_with(|| serde_json::json!({}));
    let timings = timings
        .as_object_mut()
        .ok_or_else(|| anyhow!("`{STAGE_TIMINGS_KEY}` metadata is not an object"))?;
    timings.insert(stage.to_string(), serde_json::json!(millis(started.elapsed())));
    Ok(())
}

fn lock<T>(mutex: &Mutex<T>) -> anyhow::Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| anyhow!("stage timing state is poisoned"))
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

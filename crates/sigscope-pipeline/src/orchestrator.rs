use std::collections::HashSet;
use std::marker::PhantomData;
use std::time::{Duration, Instant};

use crate::context::PipelineContext;
use crate::error::{PipelineError, StageError, UNKNOWN_STAGE};
use crate::hooks::{combine, PipelineHooks, RunSummary};
use crate::stage::{AnyValue, Erased, ErasedStage, PipelineStage};

/// Result of a successful run.
#[derive(Debug)]
pub struct PipelineResult<T> {
    pub output: T,
    pub context: PipelineContext,
    pub duration: Duration,
    pub success: bool,
}

/// Sequential stage runner.
///
/// `In` is the type accepted by [`run`](Self::run) and `Out` the output of
/// the last stage added; adding a stage requires its input to match the
/// current `Out`, so the chain is checked at compile time.
pub struct PipelineOrchestrator<In, Out = In> {
    stages: Vec<Box<dyn ErasedStage>>,
    hooks: PipelineHooks,
    _chain: PhantomData<fn(In) -> Out>,
}

impl<In> PipelineOrchestrator<In, In>
where
    In: Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            hooks: PipelineHooks::new(),
            _chain: PhantomData,
        }
    }
}

impl<In> Default for PipelineOrchestrator<In, In>
where
    In: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<In, Out> std::fmt::Debug for PipelineOrchestrator<In, Out> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("stages", &self.stage_names())
            .field("hooks", &self.hooks)
            .finish()
    }
}

struct StageFailure {
    stage: String,
    cause: anyhow::Error,
}

impl<In, Out> PipelineOrchestrator<In, Out> {
    /// Stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    #[must_use]
    pub fn hooks(&self) -> &PipelineHooks {
        &self.hooks
    }
}

impl<In, Out> PipelineOrchestrator<In, Out>
where
    In: Send + Sync + 'static,
    Out: Send + Sync + 'static,
{
    /// Append a stage consuming the current output type.
    #[must_use]
    pub fn add_stage<S>(mut self, stage: S) -> PipelineOrchestrator<In, S::Output>
    where
        S: PipelineStage<Input = Out> + 'static,
    {
        self.stages.push(Box::new(Erased(stage)));
        PipelineOrchestrator {
            stages: self.stages,
            hooks: self.hooks,
            _chain: PhantomData,
        }
    }

    /// Add hooks after any already registered.
    #[must_use]
    pub fn add_hooks(mut self, hooks: PipelineHooks) -> Self {
        let existing = std::mem::take(&mut self.hooks);
        self.hooks = combine([existing, hooks]);
        self
    }

    #[must_use]
    pub fn clear_stages(self) -> PipelineOrchestrator<In, In> {
        PipelineOrchestrator {
            stages: Vec::new(),
            hooks: self.hooks,
            _chain: PhantomData,
        }
    }

    #[must_use]
    pub fn clear_hooks(mut self) -> Self {
        self.hooks = PipelineHooks::new();
        self
    }

    /// Run every stage in order against a fresh context.
    ///
    /// `on_complete` fires exactly once per call, on success and on failure.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when a stage fails, produces output its
    /// `validate` rejects, or shares its name with another stage. The error
    /// carries the context as it stood after the error hooks ran.
    pub async fn run(&self, input: In) -> Result<PipelineResult<Out>, PipelineError> {
        let started = Instant::now();
        let mut ctx = PipelineContext::new();
        tracing::debug!(run_id = %ctx.run_id, stages = self.stages.len(), "pipeline run starting");

        self.hooks.fire_start(&mut ctx).await;
        let outcome = self.drive(Box::new(input), &mut ctx).await;
        let duration = started.elapsed();

        match outcome {
            Ok(output) => {
                self.hooks
                    .fire_complete(&RunSummary { duration, success: true }, &mut ctx)
                    .await;
                Ok(PipelineResult {
                    output,
                    context: ctx,
                    duration,
                    success: true,
                })
            }
            Err(failure) => {
                self.hooks
                    .fire_error(&failure.stage, &failure.cause, &mut ctx)
                    .await;
                self.hooks
                    .fire_complete(&RunSummary { duration, success: false }, &mut ctx)
                    .await;
                let message = format!("{:#}", failure.cause);
                Err(PipelineError::new(failure.stage, message, ctx, failure.cause))
            }
        }
    }

    async fn drive(&self, input: AnyValue, ctx: &mut PipelineContext) -> Result<Out, StageFailure> {
        if let Some(duplicate) = self.duplicate_name() {
            let cause = anyhow::Error::new(StageError::DuplicateName(duplicate.to_string()));
            ctx.record_error(duplicate, &cause);
            return Err(StageFailure {
                stage: duplicate.to_string(),
                cause,
            });
        }

        let mut current = input;
        for stage in &self.stages {
            let name = stage.name();
            self.hooks.fire_stage_start(name, ctx).await;

            let result = match stage.execute(current, ctx).await {
                Ok(output) if stage.validate(&output) => Ok(output),
                Ok(_) => Err(anyhow::Error::new(StageError::InvalidOutput(name.to_string()))),
                Err(e) => Err(e),
            };

            match result {
                Ok(output) => {
                    tracing::debug!(run_id = %ctx.run_id, stage = name, "stage complete");
                    self.hooks.fire_stage_complete(name, &*output, ctx).await;
                    current = output;
                }
                Err(cause) => {
                    tracing::warn!(run_id = %ctx.run_id, stage = name, error = %cause, "stage failed");
                    ctx.record_error(name, &cause);
                    stage.on_error(&cause, ctx).await;
                    self.hooks.fire_stage_error(name, &cause, ctx).await;
                    return Err(StageFailure {
                        stage: name.to_string(),
                        cause,
                    });
                }
            }
        }

        current.downcast::<Out>().map(|output| *output).map_err(|_| {
            let cause = anyhow::Error::new(StageError::TypeMismatch(UNKNOWN_STAGE.to_string()));
            ctx.record_error(UNKNOWN_STAGE, &cause);
            StageFailure {
                stage: UNKNOWN_STAGE.to_string(),
                cause,
            }
        })
    }

    fn duplicate_name(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.stages
            .iter()
            .map(|s| s.name())
            .find(|name| !seen.insert(*name))
    }
}

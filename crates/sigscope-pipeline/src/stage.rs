use std::any::Any;

use async_trait::async_trait;

use crate::context::PipelineContext;
use crate::error::StageError;

/// One named unit of pipeline work.
///
/// A stage receives the previous stage's output by value and may read or
/// mutate the shared [`PipelineContext`]. Names must be unique within one
/// orchestrator.
#[async_trait]
pub trait PipelineStage: Send + Sync {
    type Input: Send + Sync + 'static;
    type Output: Send + Sync + 'static;

    fn name(&self) -> &str;

    async fn execute(
        &self,
        input: Self::Input,
        ctx: &mut PipelineContext,
    ) -> anyhow::Result<Self::Output>;

    /// Output check run after a successful `execute`; `false` fails the run.
    fn validate(&self, _output: &Self::Output) -> bool {
        true
    }

    /// Stage-local cleanup, called before the orchestrator reports the failure.
    async fn on_error(&self, _error: &anyhow::Error, _ctx: &mut PipelineContext) {}
}

pub(crate) type AnyValue = Box<dyn Any + Send + Sync>;

/// Object-safe view of a [`PipelineStage`] with its input and output erased.
#[async_trait]
pub(crate) trait ErasedStage: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, input: AnyValue, ctx: &mut PipelineContext)
        -> anyhow::Result<AnyValue>;

    fn validate(&self, output: &AnyValue) -> bool;

    async fn on_error(&self, error: &anyhow::Error, ctx: &mut PipelineContext);
}

pub(crate) struct Erased<S>(pub(crate) S);

#[async_trait]
impl<S: PipelineStage + 'static> ErasedStage for Erased<S> {
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn execute(
        &self,
        input: AnyValue,
        ctx: &mut PipelineContext,
    ) -> anyhow::Result<AnyValue> {
        let input = input
            .downcast::<S::Input>()
            .map_err(|_| StageError::TypeMismatch(self.0.name().to_string()))?;
        let output = self.0.execute(*input, ctx).await?;
        Ok(Box::new(output))
    }

    fn validate(&self, output: &AnyValue) -> bool {
        output
            .downcast_ref::<S::Output>()
            .is_some_and(|output| self.0.validate(output))
    }

    async fn on_error(&self, error: &anyhow::Error, ctx: &mut PipelineContext) {
        self.0.on_error(error, ctx).await;
    }
}

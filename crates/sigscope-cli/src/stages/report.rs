use async_trait::async_trait;
use sigscope_core::{ReportInput, Signal, SignalSource};
use sigscope_pipeline::{PipelineContext, PipelineStage};

/// Assembles the report hand-off from the signals and the context results.
pub(crate) struct ReportStage {
    sources: Vec<SignalSource>,
}

impl ReportStage {
    pub(crate) fn new(sources: Vec<SignalSource>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl PipelineStage for ReportStage {
    type Input = Vec<Signal>;
    type Output = ReportInput;

    fn name(&self) -> &str {
        "report"
    }

    async fn execute(
        &self,
        signals: Vec<Signal>,
        ctx: &mut PipelineContext,
    ) -> anyhow::Result<ReportInput> {
        let sentiments = ctx.sentiments.as_deref().unwrap_or_default();
        let themes = ctx.themes.as_deref().unwrap_or_default();
        let report = ReportInput::build(
            signals,
            sentiments,
            themes,
            self.sources.clone(),
            ctx.start_time(),
        )?;
        tracing::info!(
            signals = report.metadata.total_signals,
            themes = report.themes.len(),
            overall = report.sentiment.overall,
            "report assembled"
        );
        Ok(report)
    }

    fn validate(&self, output: &ReportInput) -> bool {
        output.validate().is_ok()
    }
}

use async_trait::async_trait;
use sigscope_analysis::{pattern_stats, PatternDetector};
use sigscope_core::Signal;
use sigscope_pipeline::{PipelineContext, PipelineStage};

/// Context metadata key for the detected patterns of a run.
pub(crate) const PATTERNS_KEY: &str = "patterns";
/// Context metadata key for aggregate pattern counts.
pub(crate) const PATTERN_STATS_KEY: &str = "pattern_stats";

pub(crate) struct PatternStage {
    detector: PatternDetector,
}

impl PatternStage {
    pub(crate) fn new(detector: PatternDetector) -> Self {
        Self { detector }
    }
}

#[async_trait]
impl PipelineStage for PatternStage {
    type Input = Vec<Signal>;
    type Output = Vec<Signal>;

    fn name(&self) -> &str {
        "patterns"
    }

    async fn execute(
        &self,
        signals: Vec<Signal>,
        ctx: &mut PipelineContext,
    ) -> anyhow::Result<Vec<Signal>> {
        let patterns = self.detector.detect(&signals);
        let stats = pattern_stats(&patterns);
        tracing::info!(
            patterns = stats.total_patterns,
            occurrences = stats.total_occurrences,
            "patterns detected"
        );

        ctx.metadata
            .insert(PATTERNS_KEY.to_string(), serde_json::to_value(&patterns)?);
        ctx.metadata
            .insert(PATTERN_STATS_KEY.to_string(), serde_json::to_value(&stats)?);
        Ok(signals)
    }
}

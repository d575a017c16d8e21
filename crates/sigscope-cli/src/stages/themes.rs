use async_trait::async_trait;
use sigscope_analysis::{KeywordClusterer, ThemeExtractor};
use sigscope_core::Signal;
use sigscope_pipeline::{PipelineContext, PipelineStage};

/// Context metadata key for the capped keyword clusters of a run.
pub(crate) const KEYWORD_CLUSTERS_KEY: &str = "keyword_clusters";
/// Context metadata key for theme extraction batch counters.
pub(crate) const THEME_STATS_KEY: &str = "theme_extraction";

const MAX_REPORTED_CLUSTERS: usize = 20;

/// Runs LLM theme extraction when an extractor is configured.
///
/// Without one (no API key, or themes skipped) the stage records an empty
/// theme list so the report still builds.
pub(crate) struct ThemeStage {
    extractor: Option<ThemeExtractor>,
}

impl ThemeStage {
    pub(crate) fn new(extractor: Option<ThemeExtractor>) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl PipelineStage for ThemeStage {
    type Input = Vec<Signal>;
    type Output = Vec<Signal>;

    fn name(&self) -> &str {
        "themes"
    }

    async fn execute(
        &self,
        signals: Vec<Signal>,
        ctx: &mut PipelineContext,
    ) -> anyhow::Result<Vec<Signal>> {
        let Some(extractor) = &self.extractor else {
            tracing::info!("theme extraction disabled; skipping");
            ctx.themes = Some(Vec::new());
            return Ok(signals);
        };

        let extraction = extractor.extract_detailed(&signals).await;
        if extraction.stats.batches > 0 && extraction.stats.failed_batches == extraction.stats.batches
        {
            tracing::warn!(
                batches = extraction.stats.batches,
                "every theme batch failed; report will have no themes"
            );
        }

        let clusters =
            KeywordClusterer::merge_clusters(extraction.keyword_clusters, MAX_REPORTED_CLUSTERS);
        ctx.metadata.insert(
            KEYWORD_CLUSTERS_KEY.to_string(),
            serde_json::to_value(&clusters)?,
        );
        ctx.metadata.insert(
            THEME_STATS_KEY.to_string(),
            serde_json::to_value(extraction.stats)?,
        );
        ctx.themes = Some(extraction.themes);
        Ok(signals)
    }
}

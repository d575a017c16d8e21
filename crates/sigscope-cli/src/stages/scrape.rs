use std::collections::HashSet;

use async_trait::async_trait;
use sigscope_core::{ScrapeConfig, Signal, SignalScraper};
use sigscope_pipeline::{PipelineContext, PipelineStage};

/// Collects signals through a [`SignalScraper`] and stores them on the context.
///
/// Signals the scraper's own `validate` rejects, and repeats of an id already
/// seen, are dropped with a warning. The first signal with a given id wins.
pub(crate) struct ScrapeStage<S> {
    scraper: S,
}

impl<S: SignalScraper> ScrapeStage<S> {
    pub(crate) fn new(scraper: S) -> Self {
        Self { scraper }
    }
}

#[async_trait]
impl<S: SignalScraper> PipelineStage for ScrapeStage<S> {
    type Input = ScrapeConfig;
    type Output = Vec<Signal>;

    fn name(&self) -> &str {
        "scrape"
    }

    async fn execute(
        &self,
        config: ScrapeConfig,
        ctx: &mut PipelineContext,
    ) -> anyhow::Result<Vec<Signal>> {
        let scraped = self.scraper.scrape(&config).await?;
        let total = scraped.len();

        let mut seen_ids: HashSet<String> = HashSet::new();
        let signals: Vec<Signal> = scraped
            .into_iter()
            .filter(|signal| {
                if !self.scraper.validate(signal) {
                    tracing::warn!(
                        signal_id = %signal.id,
                        source = %signal.source,
                        "dropping invalid signal"
                    );
                    return false;
                }
                if !seen_ids.insert(signal.id.clone()) {
                    tracing::warn!(
                        signal_id = %signal.id,
                        source = %signal.source,
                        "dropping signal with duplicate id"
                    );
                    return false;
                }
                true
            })
            .collect();

        tracing::info!(
            scraped = total,
            kept = signals.len(),
            sources = config.sources.len(),
            "scrape complete"
        );
        ctx.signals = Some(signals.clone());
        Ok(signals)
    }
}

use async_trait::async_trait;
use sigscope_core::{SentimentLabel, Signal, SignalSentiment};
use sigscope_pipeline::{PipelineContext, PipelineStage};

/// Scores every signal and stores the results on the context.
///
/// A sentiment already attached by the scraper is trusted with full
/// confidence; everything else goes through the lexicon scorer.
pub(crate) struct SentimentStage;

#[async_trait]
impl PipelineStage for SentimentStage {
    type Input = Vec<Signal>;
    type Output = Vec<Signal>;

    fn name(&self) -> &str {
        "sentiment"
    }

    async fn execute(
        &self,
        signals: Vec<Signal>,
        ctx: &mut PipelineContext,
    ) -> anyhow::Result<Vec<Signal>> {
        let sentiments: Vec<SignalSentiment> = signals
            .iter()
            .map(|signal| match signal.sentiment {
                Some(score) => SignalSentiment::new(signal.id.clone(), score, 1.0),
                None => sigscope_analysis::score_signal(signal),
            })
            .collect();

        let count = |label| sentiments.iter().filter(|s| s.label == label).count();
        tracing::info!(
            signals = sentiments.len(),
            positive = count(SentimentLabel::Positive),
            negative = count(SentimentLabel::Negative),
            neutral = count(SentimentLabel::Neutral),
            "sentiment scored"
        );

        ctx.sentiments = Some(sentiments);
        Ok(signals)
    }

    fn validate(&self, output: &Vec<Signal>) -> bool {
        output.iter().all(Signal::is_valid)
    }
}

#[cfg(test)]
mod tests {
    use sigscope_core::SignalSource;

    use super::*;
    use crate::stages::test_support::signal;

    #[tokio::test]
    async fn scores_each_signal_and_passes_signals_through() {
        let mut presorted = signal("h-2", SignalSource::Hackernews, "whatever");
        presorted.sentiment = Some(-0.5);
        let input = vec![
            signal("h-1", SignalSource::Hackernews, "love this, great and fast"),
            presorted,
        ];

        let mut ctx = PipelineContext::new();
        let output = SentimentStage.execute(input.clone(), &mut ctx).await.unwrap();
        assert_eq!(output, input);

        let sentiments = ctx.sentiments.unwrap();
        assert_eq!(sentiments.len(), 2);
        assert_eq!(sentiments[0].label, SentimentLabel::Positive);
        assert_eq!(sentiments[1].signal_id, "h-2");
        assert!((sentiments[1].score - -0.5).abs() < f32::EPSILON);
        assert!((sentiments[1].confidence - 1.0).abs() < f32::EPSILON);
    }
}

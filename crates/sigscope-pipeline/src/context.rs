use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sigscope_core::{ExtractedTheme, Signal, SignalSentiment};
use uuid::Uuid;

/// A stage failure captured in the run context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedError {
    pub stage: String,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

/// Per-run scratch state shared by every stage and hook of one run.
///
/// A context is created by [`crate::PipelineOrchestrator::run`] and owned by
/// that run alone. Recorded errors only ever grow.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineContext {
    pub run_id: Uuid,
    start_time: DateTime<Utc>,
    pub signals: Option<Vec<Signal>>,
    pub sentiments: Option<Vec<SignalSentiment>>,
    pub themes: Option<Vec<ExtractedTheme>>,
    errors: Vec<RecordedError>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl PipelineContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            start_time: Utc::now(),
            signals: None,
            sentiments: None,
            themes: None,
            errors: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    #[must_use]
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    #[must_use]
    pub fn errors(&self) -> &[RecordedError] {
        &self.errors
    }

    /// Append a failure for `stage`. The full error chain is kept as the message.
    pub fn record_error(&mut self, stage: &str, error: &anyhow::Error) {
        self.errors.push(RecordedError {
            stage: stage.to_string(),
            message: format!("{error:#}"),
            occurred_at: Utc::now(),
        });
    }
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_is_empty() {
        let ctx = PipelineContext::new();
        assert!(ctx.signals.is_none());
        assert!(ctx.sentiments.is_none());
        assert!(ctx.themes.is_none());
        assert!(ctx.errors().is_empty());
        assert!(ctx.metadata.is_empty());
        assert!(ctx.start_time() <= Utc::now());
    }

    #[test]
    fn each_context_gets_its_own_run_id() {
        assert_ne!(PipelineContext::new().run_id, PipelineContext::new().run_id);
    }

    #[test]
    fn record_error_keeps_the_cause_chain() {
        let mut ctx = PipelineContext::new();
        let err = anyhow::anyhow!("connection reset").context("fetching page 2");
        ctx.record_error("scrape", &err);

        assert_eq!(ctx.errors().len(), 1);
        assert_eq!(ctx.errors()[0].stage, "scrape");
        assert_eq!(ctx.errors()[0].message, "fetching page 2: connection reset");
    }

    #[test]
    fn clone_is_independent() {
        let mut original = PipelineContext::new();
        original.signals = Some(Vec::new());
        original
            .metadata
            .insert("source".to_string(), serde_json::json!("reddit"));

        let mut copy = original.clone();
        copy.metadata.insert("extra".to_string(), serde_json::json!(1));
        copy.record_error("themes", &anyhow::anyhow!("boom"));

        assert_eq!(copy.run_id, original.run_id);
        assert_eq!(copy.start_time(), original.start_time());
        assert_eq!(original.metadata.len(), 1);
        assert!(original.errors().is_empty());
    }

    #[test]
    fn serializes_errors_and_metadata() {
        let mut ctx = PipelineContext::new();
        ctx.record_error("report", &anyhow::anyhow!("bad distribution"));
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["errors"][0]["stage"], "report");
        assert!(json["start_time"].is_string());
    }
}

//! Report hand-off model.
//!
//! [`ReportInput`] is what downstream report generation consumes. It is built
//! from the pipeline's signals, per-signal sentiment and extracted themes, and
//! validated before it leaves the pipeline.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sentiment::{SentimentLabel, SignalSentiment};
use crate::signal::{Signal, SignalSource};
use crate::themes::{ExtractedTheme, ThemeCategory};
use crate::CoreError;

/// Version stamped into every report's metadata.
pub const REPORT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum number of signals listed under each of positive / negative.
const TOP_SIGNALS: usize = 5;

/// Allowed drift of the distribution sum away from 1.0.
const DISTRIBUTION_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

impl SentimentDistribution {
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.positive + self.neutral + self.negative
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSummary {
    /// Mean signal score in [-1.0, 1.0]; 0.0 when nothing was scored.
    pub overall: f32,
    pub distribution: SentimentDistribution,
    pub positive_signals: Vec<Signal>,
    pub negative_signals: Vec<Signal>,
}

/// Coarse category used by reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportThemeCategory {
    Pain,
    Desire,
    Neutral,
}

impl std::fmt::Display for ReportThemeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportThemeCategory::Pain => write!(f, "pain"),
            ReportThemeCategory::Desire => write!(f, "desire"),
            ReportThemeCategory::Neutral => write!(f, "neutral"),
        }
    }
}

impl From<ThemeCategory> for ReportThemeCategory {
    fn from(category: ThemeCategory) -> Self {
        match category {
            ThemeCategory::Pain => ReportThemeCategory::Pain,
            ThemeCategory::Desire | ThemeCategory::Feature => ReportThemeCategory::Desire,
            ThemeCategory::Workflow | ThemeCategory::Comparison => ReportThemeCategory::Neutral,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTheme {
    pub id: String,
    pub name: String,
    pub keywords: Vec<String>,
    pub category: ReportThemeCategory,
    pub frequency: usize,
    pub sentiment: f32,
    pub confidence: f32,
    pub examples: Vec<String>,
}

impl From<&ExtractedTheme> for ReportTheme {
    fn from(theme: &ExtractedTheme) -> Self {
        Self {
            id: theme.id.clone(),
            name: theme.name.clone(),
            keywords: theme.keywords.clone(),
            category: theme.category.into(),
            frequency: theme.frequency,
            sentiment: theme.sentiment,
            confidence: theme.confidence,
            examples: theme.examples.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub scraped_at: DateTime<Utc>,
    pub sources: Vec<SignalSource>,
    pub total_signals: usize,
    pub generated_at: DateTime<Utc>,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportInput {
    pub signals: Vec<Signal>,
    pub sentiment: SentimentSummary,
    pub themes: Vec<ReportTheme>,
    pub metadata: ReportMetadata,
}

impl ReportInput {
    /// Assemble and validate a report from pipeline results.
    ///
    /// Signals without a sentiment record are left out of the overall score
    /// and the distribution. An empty run reports a fully neutral distribution.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidReport`] if two signals share an id, or if
    /// the assembled report breaks a range or distribution invariant.
    pub fn build(
        signals: Vec<Signal>,
        sentiments: &[SignalSentiment],
        themes: &[ExtractedTheme],
        sources: Vec<SignalSource>,
        scraped_at: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        let mut ids = HashSet::new();
        if let Some(dup) = signals.iter().find(|s| !ids.insert(s.id.as_str())) {
            return Err(CoreError::InvalidReport(format!(
                "signal id '{}' appears more than once",
                dup.id
            )));
        }

        let by_id: HashMap<&str, &SignalSentiment> = sentiments
            .iter()
            .map(|s| (s.signal_id.as_str(), s))
            .collect();

        let scored: Vec<(&Signal, &SignalSentiment)> = signals
            .iter()
            .filter_map(|signal| by_id.get(signal.id.as_str()).map(|s| (signal, *s)))
            .collect();

        let sentiment = summarize(&scored);
        let report = Self {
            metadata: ReportMetadata {
                scraped_at,
                sources,
                total_signals: signals.len(),
                generated_at: Utc::now(),
                version: REPORT_VERSION.to_string(),
            },
            sentiment,
            themes: themes.iter().map(ReportTheme::from).collect(),
            signals,
        };

        report.validate()?;
        Ok(report)
    }

    /// Check range and distribution invariants.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidReport`] describing the first violation found.
    pub fn validate(&self) -> Result<(), CoreError> {
        let overall = self.sentiment.overall;
        if !(-1.0..=1.0).contains(&overall) {
            return Err(CoreError::InvalidReport(format!(
                "overall sentiment {overall} is outside [-1, 1]"
            )));
        }

        let sum = self.sentiment.distribution.sum();
        if (sum - 1.0).abs() > DISTRIBUTION_TOLERANCE {
            return Err(CoreError::InvalidReport(format!(
                "sentiment distribution sums to {sum:.4}, expected 1.0"
            )));
        }

        for theme in &self.themes {
            if !(0.0..=1.0).contains(&theme.confidence) {
                return Err(CoreError::InvalidReport(format!(
                    "theme '{}' has confidence {} outside [0, 1]",
                    theme.name, theme.confidence
                )));
            }
            if !(-1.0..=1.0).contains(&theme.sentiment) {
                return Err(CoreError::InvalidReport(format!(
                    "theme '{}' has sentiment {} outside [-1, 1]",
                    theme.name, theme.sentiment
                )));
            }
        }

        Ok(())
    }
}

fn summarize(scored: &[(&Signal, &SignalSentiment)]) -> SentimentSummary {
    if scored.is_empty() {
        return SentimentSummary {
            overall: 0.0,
            distribution: SentimentDistribution {
                positive: 0.0,
                neutral: 1.0,
                negative: 0.0,
            },
            positive_signals: Vec::new(),
            negative_signals: Vec::new(),
        };
    }

    #[allow(clippy::cast_precision_loss)]
    let total = scored.len() as f64;
    let count = |label: SentimentLabel| scored.iter().filter(|(_, s)| s.label == label).count();

    #[allow(clippy::cast_precision_loss)]
    let distribution = SentimentDistribution {
        positive: count(SentimentLabel::Positive) as f64 / total,
        neutral: count(SentimentLabel::Neutral) as f64 / total,
        negative: count(SentimentLabel::Negative) as f64 / total,
    };

    #[allow(clippy::cast_possible_truncation)]
    let overall = (scored.iter().map(|(_, s)| f64::from(s.score)).sum::<f64>() / total) as f32;

    let mut positive: Vec<&(&Signal, &SignalSentiment)> = scored
        .iter()
        .filter(|(_, s)| s.label == SentimentLabel::Positive)
        .collect();
    positive.sort_by(|a, b| b.1.score.total_cmp(&a.1.score));

    let mut negative: Vec<&(&Signal, &SignalSentiment)> = scored
        .iter()
        .filter(|(_, s)| s.label == SentimentLabel::Negative)
        .collect();
    negative.sort_by(|a, b| a.1.score.total_cmp(&b.1.score));

    SentimentSummary {
        overall: overall.clamp(-1.0, 1.0),
        distribution,
        positive_signals: positive.into_iter().take(TOP_SIGNALS).map(scored_copy).collect(),
        negative_signals: negative.into_iter().take(TOP_SIGNALS).map(scored_copy).collect(),
    }
}

/// Copy of a listed signal carrying its computed score.
fn scored_copy(&(signal, sentiment): &(&Signal, &SignalSentiment)) -> Signal {
    let mut copy = signal.clone();
    copy.sentiment = Some(sentiment.score);
    copy
}

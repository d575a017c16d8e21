use serde::{Deserialize, Serialize};

/// Scores at or above this are labelled positive; at or below its negation, negative.
pub const LABEL_THRESHOLD: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// Label a score in [-1.0, 1.0].
    #[must_use]
    pub fn from_score(score: f32) -> Self {
        if score >= LABEL_THRESHOLD {
            SentimentLabel::Positive
        } else if score <= -LABEL_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SentimentLabel::Positive => write!(f, "positive"),
            SentimentLabel::Negative => write!(f, "negative"),
            SentimentLabel::Neutral => write!(f, "neutral"),
        }
    }
}

/// Sentiment computed for one signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSentiment {
    pub signal_id: String,
    /// In [-1.0, 1.0].
    pub score: f32,
    /// In [0.0, 1.0].
    pub confidence: f32,
    pub label: SentimentLabel,
}

impl SignalSentiment {
    /// Build a sentiment record, clamping score and confidence into range.
    #[must_use]
    pub fn new(signal_id: impl Into<String>, score: f32, confidence: f32) -> Self {
        let score = score.clamp(-1.0, 1.0);
        Self {
            signal_id: signal_id.into(),
            score,
            confidence: confidence.clamp(0.0, 1.0),
            label: SentimentLabel::from_score(score),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_thresholds() {
        assert_eq!(SentimentLabel::from_score(0.5), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_score(-0.5), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::from_score(0.05), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(0.0), SentimentLabel::Neutral);
    }

    #[test]
    fn new_clamps_out_of_range_values() {
        let s = SignalSentiment::new("a", 3.0, -1.0);
        assert_eq!(s.score, 1.0);
        assert_eq!(s.confidence, 0.0);
        assert_eq!(s.label, SentimentLabel::Positive);
    }
}

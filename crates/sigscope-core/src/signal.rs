use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Platform a signal was scraped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalSource {
    Reddit,
    Twitter,
    Github,
    Hackernews,
}

impl SignalSource {
    pub const ALL: [SignalSource; 4] = [
        SignalSource::Reddit,
        SignalSource::Twitter,
        SignalSource::Github,
        SignalSource::Hackernews,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SignalSource::Reddit => "reddit",
            SignalSource::Twitter => "twitter",
            SignalSource::Github => "github",
            SignalSource::Hackernews => "hackernews",
        }
    }
}

impl std::fmt::Display for SignalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SignalSource {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reddit" => Ok(SignalSource::Reddit),
            "twitter" | "x" => Ok(SignalSource::Twitter),
            "github" => Ok(SignalSource::Github),
            "hackernews" | "hn" => Ok(SignalSource::Hackernews),
            other => Err(CoreError::InvalidSource(other.to_string())),
        }
    }
}

/// A single scraped unit of text.
///
/// Signals are produced by a [`crate::SignalScraper`] and treated as
/// immutable by every later stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub source: SignalSource,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub url: String,
    /// Score in [-1.0, 1.0] when the scraper already knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub themes: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Signal {
    /// Build a signal with only the required fields set.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        source: SignalSource,
        content: impl Into<String>,
        url: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            source,
            content: content.into(),
            author: None,
            timestamp,
            url: url.into(),
            sentiment: None,
            themes: None,
            metadata: HashMap::new(),
        }
    }

    /// Whether the signal satisfies the data-model invariants.
    ///
    /// Requires a non-empty id, content and url, and a sentiment (if any)
    /// inside [-1.0, 1.0].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.id.trim().is_empty()
            && !self.content.trim().is_empty()
            && !self.url.trim().is_empty()
            && self
                .sentiment
                .is_none_or(|s| s.is_finite() && (-1.0..=1.0).contains(&s))
    }
}

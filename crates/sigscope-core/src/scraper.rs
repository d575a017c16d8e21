//! Scraper contract and the two local implementations.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::signal::{Signal, SignalSource};
use crate::sources::ScrapeConfig;
use crate::CoreError;

/// Anything that can produce signals for the pipeline.
#[async_trait]
pub trait SignalScraper: Send + Sync {
    /// Collect signals for the enabled sources in `config`.
    async fn scrape(&self, config: &ScrapeConfig) -> Result<Vec<Signal>, CoreError>;

    /// Whether a scraped signal is usable downstream.
    fn validate(&self, signal: &Signal) -> bool {
        signal.is_valid()
    }

    /// Cheap reachability check for the backing source.
    async fn test_connection(&self) -> bool;
}

/// Scraper that returns nothing. Placeholder until a network scraper is plugged in.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubScraper;

#[async_trait]
impl SignalScraper for StubScraper {
    async fn scrape(&self, config: &ScrapeConfig) -> Result<Vec<Signal>, CoreError> {
        tracing::warn!(
            sources = config.sources.len(),
            "stub scraper in use; no signals collected"
        );
        Ok(Vec::new())
    }

    async fn test_connection(&self) -> bool {
        true
    }
}

/// Scraper backed by a JSON file holding an array of signals.
///
/// Keeps only signals whose source is enabled in the config, at most
/// `max_signals_per_source` per source, in file order.
#[derive(Debug, Clone)]
pub struct JsonFileScraper {
    path: PathBuf,
}

impl JsonFileScraper {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_all(&self) -> Result<Vec<Signal>, CoreError> {
        let path = self.path.display().to_string();
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| CoreError::SignalsIo {
                path: path.clone(),
                source: e,
            })?;
        serde_json::from_str(&raw).map_err(|e| CoreError::SignalsParse { path, source: e })
    }
}

#[async_trait]
impl SignalScraper for JsonFileScraper {
    async fn scrape(&self, config: &ScrapeConfig) -> Result<Vec<Signal>, CoreError> {
        let all = self.read_all().await?;
        let total = all.len();

        let mut per_source: HashMap<SignalSource, usize> = HashMap::new();
        let signals: Vec<Signal> = all
            .into_iter()
            .filter(|signal| config.sources.contains(&signal.source))
            .filter(|signal| {
                let count = per_source.entry(signal.source).or_insert(0);
                *count += 1;
                *count <= config.max_signals_per_source
            })
            .collect();

        tracing::debug!(
            path = %self.path.display(),
            total,
            kept = signals.len(),
            "loaded signals from file"
        );

        Ok(signals)
    }

    async fn test_connection(&self) -> bool {
        tokio::fs::metadata(&self.path)
            .await
            .is_ok_and(|m| m.is_file())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn fixture(signals: &serde_json::Value) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        file.write_all(signals.to_string().as_bytes())
            .expect("write fixture");
        file
    }

    fn raw_signal(id: &str, source: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "source": source,
            "content": format!("content for {id}"),
            "timestamp": "2026-03-01T12:00:00Z",
            "url": format!("https://example.com/{id}")
        })
    }

    #[tokio::test]
    async fn stub_scraper_returns_nothing() {
        let signals = StubScraper.scrape(&ScrapeConfig::default()).await.unwrap();
        assert!(signals.is_empty());
        assert!(StubScraper.test_connection().await);
    }

    #[tokio::test]
    async fn file_scraper_filters_disabled_sources() {
        let file = fixture(&serde_json::json!([
            raw_signal("a", "reddit"),
            raw_signal("b", "github"),
            raw_signal("c", "reddit"),
        ]));
        let scraper = JsonFileScraper::new(file.path());
        let config = ScrapeConfig {
            sources: vec![SignalSource::Reddit],
            ..ScrapeConfig::default()
        };
        let signals = scraper.scrape(&config).await.unwrap();
        let ids: Vec<&str> = signals.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn file_scraper_caps_per_source() {
        let file = fixture(&serde_json::json!([
            raw_signal("a", "reddit"),
            raw_signal("b", "reddit"),
            raw_signal("c", "twitter"),
            raw_signal("d", "reddit"),
        ]));
        let scraper = JsonFileScraper::new(file.path());
        let config = ScrapeConfig {
            max_signals_per_source: 2,
            ..ScrapeConfig::default()
        };
        let signals = scraper.scrape(&config).await.unwrap();
        let ids: Vec<&str> = signals.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn file_scraper_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{not json").unwrap();
        let scraper = JsonFileScraper::new(file.path());
        let result = scraper.scrape(&ScrapeConfig::default()).await;
        assert!(matches!(result, Err(CoreError::SignalsParse { .. })));
    }

    #[tokio::test]
    async fn missing_file_fails_connection_test() {
        let scraper = JsonFileScraper::new("/nonexistent/signals.json");
        assert!(!scraper.test_connection().await);
        assert!(matches!(
            scraper.scrape(&ScrapeConfig::default()).await,
            Err(CoreError::SignalsIo { .. })
        ));
    }
}

//! Shared data model and configuration for sigscope.
//!
//! Holds the types every other crate exchanges: scraped [`Signal`]s, per-signal
//! sentiment, extracted themes, the report hand-off model, the scraper
//! contract, and environment/YAML configuration loading.

pub mod app_config;
pub mod config;
pub mod report;
pub mod scraper;
pub mod sentiment;
pub mod signal;
pub mod sources;
pub mod themes;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use report::{
    ReportInput, ReportMetadata, ReportTheme, ReportThemeCategory, SentimentDistribution,
    SentimentSummary,
};
pub use scraper::{JsonFileScraper, SignalScraper, StubScraper};
pub use sentiment::{SentimentLabel, SignalSentiment};
pub use signal::{Signal, SignalSource};
pub use sources::{load_scrape_config, ScrapeConfig};
pub use themes::{slugify, ExtractedTheme, ThemeCategory};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signal source: {0}")]
    InvalidSource(String),

    #[error("failed to read signals from {path}: {source}")]
    SignalsIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse signals from {path}: {source}")]
    SignalsParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("report validation failed: {0}")]
    InvalidReport(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sources file {path}: {source}")]
    SourcesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sources file: {0}")]
    SourcesFileParse(#[from] serde_yaml::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

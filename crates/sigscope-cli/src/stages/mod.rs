//! Concrete stages wired into the `run` pipeline.
//!
//! Order: scrape, sentiment, themes, patterns, report. Every stage between
//! scrape and report passes the signal list through unchanged and records its
//! results on the context.

mod patterns;
mod report;
mod scrape;
mod sentiment;
mod themes;

pub(crate) use patterns::{PatternStage, PATTERNS_KEY, PATTERN_STATS_KEY};
pub(crate) use report::ReportStage;
pub(crate) use scrape::ScrapeStage;
pub(crate) use sentiment::SentimentStage;
pub(crate) use themes::{ThemeStage, KEYWORD_CLUSTERS_KEY, THEME_STATS_KEY};

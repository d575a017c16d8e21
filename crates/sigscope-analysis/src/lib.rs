//! Signal analysis for sigscope.
//!
//! Keyword clustering, regex pattern detection, lexicon sentiment scoring and
//! LLM-driven theme extraction over collected [`sigscope_core::Signal`]s.

pub mod clusterer;
pub mod error;
pub mod llm;
pub mod patterns;
pub mod scorer;
pub mod themes;

mod retry;

pub use clusterer::{ClustererConfig, KeywordCluster, KeywordClusterer};
pub use error::AnalysisError;
pub use llm::{AnthropicClient, AnthropicConfig, LlmClient};
pub use patterns::{
    filter_by_type, pattern_stats, top_patterns, DetectedPattern, PatternDetector,
    PatternDetectorConfig, PatternStats, PatternType,
};
pub use scorer::{lexicon_score, score_signal};
pub use themes::{
    ExtractionStats, RawThemeExtraction, ThemeExtraction, ThemeExtractor, ThemeExtractorConfig,
};

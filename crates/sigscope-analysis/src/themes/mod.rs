//! LLM-driven theme extraction.
//!
//! Signals are sent to the LLM in fixed-size batches, one request at a time.
//! A failed batch (request or parse) is logged and contributes no themes; it
//! never aborts the extraction. Raw extractions that share a case- and
//! whitespace-insensitive name are merged into one [`ExtractedTheme`].

mod parse;
mod prompt;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use sigscope_core::{slugify, ExtractedTheme, Signal, ThemeCategory};

use crate::clusterer::{KeywordCluster, KeywordClusterer};
use crate::llm::LlmClient;

pub use parse::RawThemeExtraction;

use parse::parse_theme_response;
use prompt::build_theme_prompt;

#[derive(Debug, Clone)]
pub struct ThemeExtractorConfig {
    pub batch_size: usize,
    pub min_frequency: usize,
    pub min_confidence: f32,
    pub include_low_confidence: bool,
    pub max_examples: usize,
}

impl Default for ThemeExtractorConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            min_frequency: 1,
            min_confidence: 0.2,
            include_low_confidence: false,
            max_examples: 5,
        }
    }
}

/// Counters for one extraction call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ExtractionStats {
    pub batches: usize,
    pub failed_batches: usize,
    pub raw_extractions: usize,
}

/// Full result of [`ThemeExtractor::extract_detailed`].
#[derive(Debug, Clone)]
pub struct ThemeExtraction {
    pub themes: Vec<ExtractedTheme>,
    /// Clusters over every raw keyword the LLM returned.
    pub keyword_clusters: Vec<KeywordCluster>,
    pub stats: ExtractionStats,
}

pub struct ThemeExtractor {
    client: Arc<dyn LlmClient>,
    clusterer: KeywordClusterer,
    config: ThemeExtractorConfig,
}

impl ThemeExtractor {
    #[must_use]
    pub fn new(
        client: Arc<dyn LlmClient>,
        clusterer: KeywordClusterer,
        config: ThemeExtractorConfig,
    ) -> Self {
        Self {
            client,
            clusterer,
            config,
        }
    }

    /// Extract ranked themes from `signals`.
    pub async fn extract(&self, signals: &[Signal]) -> Vec<ExtractedTheme> {
        self.extract_detailed(signals).await.themes
    }

    /// Extract ranked themes along with keyword clusters and batch counters.
    ///
    /// Empty input returns immediately without calling the LLM.
    pub async fn extract_detailed(&self, signals: &[Signal]) -> ThemeExtraction {
        if signals.is_empty() {
            return ThemeExtraction {
                themes: Vec::new(),
                keyword_clusters: Vec::new(),
                stats: ExtractionStats::default(),
            };
        }

        let mut stats = ExtractionStats::default();
        let mut raw: Vec<RawThemeExtraction> = Vec::new();

        for (batch_index, batch) in signals.chunks(self.config.batch_size.max(1)).enumerate() {
            stats.batches += 1;
            match self.extract_batch(batch).await {
                Ok(extractions) => {
                    tracing::debug!(
                        batch = batch_index,
                        signals = batch.len(),
                        themes = extractions.len(),
                        "theme batch extracted"
                    );
                    raw.extend(extractions);
                }
                Err(e) => {
                    stats.failed_batches += 1;
                    tracing::warn!(
                        batch = batch_index,
                        signals = batch.len(),
                        error = %e,
                        "theme batch failed; skipping"
                    );
                }
            }
        }
        stats.raw_extractions = raw.len();

        let all_keywords: Vec<&str> = raw
            .iter()
            .flat_map(|r| r.keywords.iter().map(String::as_str))
            .collect();
        let keyword_clusters = self.clusterer.cluster(&all_keywords);
        tracing::debug!(
            keywords = all_keywords.len(),
            clusters = keyword_clusters.len(),
            "clustered theme keywords"
        );

        let themes = self.rank(merge_extractions(&raw, self.config.max_examples));

        tracing::info!(
            signals = signals.len(),
            batches = stats.batches,
            failed_batches = stats.failed_batches,
            themes = themes.len(),
            "theme extraction complete"
        );

        ThemeExtraction {
            themes,
            keyword_clusters,
            stats,
        }
    }

    async fn extract_batch(
        &self,
        batch: &[Signal],
    ) -> Result<Vec<RawThemeExtraction>, Box<dyn std::error::Error + Send + Sync>> {
        let prompt = build_theme_prompt(batch);
        let response = self.client.complete(&prompt).await?;
        Ok(parse_theme_response(&response)?)
    }

    fn rank(&self, themes: Vec<ExtractedTheme>) -> Vec<ExtractedTheme> {
        let mut kept: Vec<ExtractedTheme> = themes
            .into_iter()
            .filter(|t| t.frequency >= self.config.min_frequency)
            .filter(|t| {
                self.config.include_low_confidence || t.confidence >= self.config.min_confidence
            })
            .collect();
        kept.sort_by(|a, b| {
            b.frequency
                .cmp(&a.frequency)
                .then_with(|| b.confidence.total_cmp(&a.confidence))
        });
        kept
    }
}

struct ThemeGroup<'a> {
    name: &'a str,
    members: Vec<&'a RawThemeExtraction>,
}

/// Merge raw extractions sharing a trimmed, lowercased name.
///
/// Groups keep first-seen order; the name of the first member is used.
fn merge_extractions(raw: &[RawThemeExtraction], max_examples: usize) -> Vec<ExtractedTheme> {
    let mut groups: Vec<ThemeGroup<'_>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for extraction in raw {
        let name = extraction.theme.trim();
        let key = name.to_lowercase();
        if let Some(&i) = index.get(&key) {
            groups[i].members.push(extraction);
        } else {
            index.insert(key, groups.len());
            groups.push(ThemeGroup {
                name,
                members: vec![extraction],
            });
        }
    }

    let stamp = to_base36(u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default());
    let mut used_ids: HashSet<String> = HashSet::new();

    groups
        .into_iter()
        .map(|group| {
            let keywords = unique_strings(group.members.iter().flat_map(|m| &m.keywords), usize::MAX);
            let examples =
                unique_strings(group.members.iter().flat_map(|m| &m.examples), max_examples);

            let category = dominant_category(&group.members);
            let frequency = group.members.len();

            ExtractedTheme {
                id: unique_id(group.name, &stamp, &mut used_ids),
                name: group.name.to_string(),
                confidence: theme_confidence(frequency, keywords.len()),
                keywords,
                category,
                frequency,
                sentiment: category.sentiment(),
                examples,
            }
        })
        .collect()
}

/// Trimmed, non-empty, first-seen-order distinct strings, at most `cap`.
fn unique_strings<'a>(values: impl Iterator<Item = &'a String>, cap: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && seen.insert(v.to_string()))
        .take(cap)
        .map(str::to_string)
        .collect()
}

/// Most common category; ties go to the one seen first.
fn dominant_category(members: &[&RawThemeExtraction]) -> ThemeCategory {
    let mut counts: Vec<(ThemeCategory, usize)> = Vec::new();
    for member in members {
        match counts.iter_mut().find(|(c, _)| *c == member.category) {
            Some((_, n)) => *n += 1,
            None => counts.push((member.category, 1)),
        }
    }
    let mut best = counts[0];
    for &(category, n) in &counts[1..] {
        if n > best.1 {
            best = (category, n);
        }
    }
    best.0
}

/// `0.7 · min(frequency / 10, 1) + 0.3 · min(keywords / 5, 1)`.
#[allow(clippy::cast_precision_loss)]
fn theme_confidence(frequency: usize, unique_keywords: usize) -> f32 {
    let freq_part = (frequency as f32 / 10.0).min(1.0);
    let keyword_part = (unique_keywords as f32 / 5.0).min(1.0);
    (0.7 * freq_part + 0.3 * keyword_part).clamp(0.0, 1.0)
}

fn unique_id(name: &str, stamp: &str, used: &mut HashSet<String>) -> String {
    let slug = match slugify(name) {
        s if s.is_empty() => "theme".to_string(),
        s => s,
    };
    let base = format!("{slug}-{stamp}");
    let mut candidate = base.clone();
    let mut n = 1;
    while !used.insert(candidate.clone()) {
        n += 1;
        candidate = format!("{base}-{n}");
    }
    candidate
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        #[allow(clippy::cast_possible_truncation)]
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

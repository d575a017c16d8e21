//! Stand-alone analysis commands: `patterns` and `cluster`.

use std::path::Path;

use sigscope_analysis::{pattern_stats, DetectedPattern, KeywordCluster, KeywordClusterer};
use sigscope_core::{AppConfig, JsonFileScraper, ScrapeConfig, SignalScraper};

use crate::run::{clusterer_from_config, detector_from_config};

/// Detect patterns in a signals file and print them as a table.
///
/// # Errors
///
/// Returns an error if the signals file cannot be read or parsed.
pub(crate) async fn run_patterns(
    config: &AppConfig,
    signals_path: &Path,
    min_frequency: Option<usize>,
) -> anyhow::Result<()> {
    let signals = JsonFileScraper::new(signals_path)
        .scrape(&ScrapeConfig {
            max_signals_per_source: usize::MAX,
            ..ScrapeConfig::default()
        })
        .await?;

    let mut config = config.clone();
    if let Some(min_frequency) = min_frequency {
        config.pattern_min_frequency = min_frequency;
    }
    let patterns = detector_from_config(&config).detect(&signals);

    if patterns.is_empty() {
        println!(
            "no patterns with frequency >= {} in {} signals",
            config.pattern_min_frequency,
            signals.len()
        );
        return Ok(());
    }

    for line in pattern_table(&patterns) {
        println!("{line}");
    }
    let stats = pattern_stats(&patterns);
    println!();
    println!(
        "{} patterns, {} occurrences across {} signals",
        stats.total_patterns,
        stats.total_occurrences,
        signals.len()
    );
    Ok(())
}

/// Cluster the given keywords and print one line per cluster.
pub(crate) fn run_cluster(
    config: &AppConfig,
    keywords: &[String],
    threshold: Option<f64>,
    max_clusters: Option<usize>,
) {
    let mut config = config.clone();
    if let Some(threshold) = threshold {
        config.similarity_threshold = threshold;
    }
    let mut clusters = clusterer_from_config(&config).cluster(keywords);
    if let Some(max) = max_clusters {
        clusters = KeywordClusterer::merge_clusters(clusters, max);
    }

    if clusters.is_empty() {
        println!("no clusters");
        return;
    }
    for line in cluster_lines(&clusters) {
        println!("{line}");
    }
}

fn pattern_table(patterns: &[DetectedPattern]) -> Vec<String> {
    let mut lines = vec![format!(
        "{:<13}{:<22}{:<6}EXAMPLE",
        "TYPE", "PATTERN", "FREQ"
    )];
    for pattern in patterns {
        let example = pattern.examples.first().map_or("", String::as_str);
        lines.push(format!(
            "{:<13}{:<22}{:<6}{}",
            pattern.pattern_type.to_string(),
            pattern.pattern,
            pattern.frequency,
            example
        ));
    }
    lines
}

fn cluster_lines(clusters: &[KeywordCluster]) -> Vec<String> {
    clusters
        .iter()
        .map(|c| {
            format!(
                "{} ({} keywords, similarity {:.2}): {}",
                c.representative,
                c.keywords.len(),
                c.similarity,
                c.keywords.join(", ")
            )
        })
        .collect()
}

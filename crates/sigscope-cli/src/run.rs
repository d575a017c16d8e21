//! The `run` command: scrape, analyze and report in one pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use sigscope_analysis::{
    AnthropicClient, AnthropicConfig, ClustererConfig, DetectedPattern, KeywordClusterer,
    PatternDetector, PatternDetectorConfig, ThemeExtractor, ThemeExtractorConfig,
};
use sigscope_core::{AppConfig, JsonFileScraper, ReportInput, ScrapeConfig, SignalScraper, SignalSource};
use sigscope_pipeline::{logging_hooks, timing_hooks, PipelineOrchestrator};

use crate::render::{render, ReportFormat};
use crate::stages::{
    PatternStage, ReportStage, ScrapeStage, SentimentStage, ThemeStage, PATTERNS_KEY,
};

/// Options for one `run` invocation.
#[derive(Debug, Clone)]
pub(crate) struct RunOptions {
    pub signals: PathBuf,
    pub format: ReportFormat,
    pub output: Option<PathBuf>,
    pub stdout: bool,
    pub skip_themes: bool,
}

/// Build the full analysis pipeline.
pub(crate) fn build_pipeline<S>(
    scraper: S,
    extractor: Option<ThemeExtractor>,
    detector: PatternDetector,
    sources: Vec<SignalSource>,
) -> PipelineOrchestrator<ScrapeConfig, ReportInput>
where
    S: SignalScraper + 'static,
{
    PipelineOrchestrator::new()
        .add_stage(ScrapeStage::new(scraper))
        .add_stage(SentimentStage)
        .add_stage(ThemeStage::new(extractor))
        .add_stage(PatternStage::new(detector))
        .add_stage(ReportStage::new(sources))
        .add_hooks(logging_hooks())
        .add_hooks(timing_hooks())
}

pub(crate) fn clusterer_from_config(config: &AppConfig) -> KeywordClusterer {
    KeywordClusterer::new(ClustererConfig {
        similarity_threshold: config.similarity_threshold,
        ..ClustererConfig::default()
    })
}

pub(crate) fn detector_from_config(config: &AppConfig) -> PatternDetector {
    PatternDetector::new(PatternDetectorConfig {
        min_frequency: config.pattern_min_frequency,
        ..PatternDetectorConfig::default()
    })
}

/// Theme extractor for the configured LLM, or `None` when no API key is set.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be constructed.
pub(crate) fn extractor_from_config(config: &AppConfig) -> anyhow::Result<Option<ThemeExtractor>> {
    let Some(llm_config) = AnthropicConfig::from_app_config(config) else {
        tracing::warn!("ANTHROPIC_API_KEY not set; theme extraction disabled");
        return Ok(None);
    };
    let client = AnthropicClient::new(llm_config)?;
    Ok(Some(ThemeExtractor::new(
        Arc::new(client),
        clusterer_from_config(config),
        ThemeExtractorConfig {
            batch_size: config.theme_batch_size,
            ..ThemeExtractorConfig::default()
        },
    )))
}

/// Load the scrape config, falling back to every source when the file is absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, parsed or validated.
pub(crate) fn scrape_config_or_default(path: &Path) -> anyhow::Result<ScrapeConfig> {
    if path.exists() {
        return sigscope_core::load_scrape_config(path)
            .with_context(|| format!("loading sources from {}", path.display()));
    }
    tracing::info!(
        path = %path.display(),
        "sources file not found; using all sources"
    );
    Ok(ScrapeConfig::default())
}

/// Run the pipeline over a signals file and write the rendered report.
///
/// # Errors
///
/// Returns an error if configuration is invalid, any stage fails, or the
/// report cannot be written.
pub(crate) async fn run_pipeline(config: &AppConfig, options: RunOptions) -> anyhow::Result<()> {
    let scrape_config = scrape_config_or_default(&config.sources_path)?;
    let extractor = if options.skip_themes {
        tracing::info!("--skip-themes set; theme extraction disabled");
        None
    } else {
        extractor_from_config(config)?
    };

    let pipeline = build_pipeline(
        JsonFileScraper::new(&options.signals),
        extractor,
        detector_from_config(config),
        scrape_config.sources.clone(),
    );

    let result = match pipeline.run(scrape_config).await {
        Ok(result) => result,
        Err(e) => {
            for recorded in e.context.errors() {
                eprintln!("error in stage '{}': {}", recorded.stage, recorded.message);
            }
            return Err(e.into());
        }
    };

    let patterns: Vec<DetectedPattern> = result
        .context
        .metadata
        .get(PATTERNS_KEY)
        .cloned()
        .map(serde_json::from_value)
        .transpose()?
        .unwrap_or_default();

    let rendered = render(&result.output, &patterns, options.format)?;

    if options.stdout {
        println!("{rendered}");
        return Ok(());
    }

    let path = options.output.unwrap_or_else(|| {
        config.output_dir.join(format!(
            "sigscope-report-{}.{}",
            result.context.start_time().format("%Y%m%dT%H%M%SZ"),
            options.format.extension()
        ))
    });
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    tokio::fs::write(&path, rendered)
        .await
        .with_context(|| format!("writing report to {}", path.display()))?;

    println!(
        "report written to {} ({} signals, {} themes, {} ms)",
        path.display(),
        result.output.metadata.total_signals,
        result.output.themes.len(),
        result.duration.as_millis()
    );
    Ok(())
}

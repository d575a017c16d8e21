//! The `check-config` command.

use std::path::Path;

use sigscope_core::{AppConfig, JsonFileScraper, SignalScraper};

use crate::run::scrape_config_or_default;

/// Print the effective configuration and verify the sources file (and,
/// when given, the signals file).
///
/// # Errors
///
/// Returns an error if the sources file is present but invalid, or the
/// signals file is unreadable.
pub(crate) async fn run_check_config(
    config: &AppConfig,
    signals: Option<&Path>,
) -> anyhow::Result<()> {
    println!("environment:          {}", config.env);
    println!("log level:            {}", config.log_level);
    println!("output dir:           {}", config.output_dir.display());
    println!(
        "llm:                  {} via {} ({})",
        config.llm_model,
        config.llm_base_url,
        if config.anthropic_api_key.is_some() {
            "api key set"
        } else {
            "no api key; themes disabled"
        }
    );
    println!("theme batch size:     {}", config.theme_batch_size);
    println!("similarity threshold: {}", config.similarity_threshold);
    println!("pattern min freq:     {}", config.pattern_min_frequency);

    let scrape = scrape_config_or_default(&config.sources_path)?;
    let sources: Vec<String> = scrape.sources.iter().map(ToString::to_string).collect();
    println!(
        "sources:              {} ({}; {} queries, max {} per source)",
        sources.join(", "),
        config.sources_path.display(),
        scrape.queries.len(),
        scrape.max_signals_per_source
    );

    if let Some(path) = signals {
        let scraper = JsonFileScraper::new(path);
        if !scraper.test_connection().await {
            anyhow::bail!("signals file {} is not readable", path.display());
        }
        let scraped = scraper.scrape(&scrape).await?;
        let usable = scraped.iter().filter(|s| scraper.validate(s)).count();
        println!(
            "signals file:         {} ({usable} of {} signals usable)",
            path.display(),
            scraped.len()
        );
    }

    println!("config ok");
    Ok(())
}

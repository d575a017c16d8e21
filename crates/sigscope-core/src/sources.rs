use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::signal::SignalSource;
use crate::ConfigError;

fn default_max_signals_per_source() -> usize {
    100
}

/// What a scraper should collect: which platforms, which search queries,
/// and how many signals to keep per platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeConfig {
    pub sources: Vec<SignalSource>,
    #[serde(default)]
    pub queries: Vec<String>,
    #[serde(default = "default_max_signals_per_source")]
    pub max_signals_per_source: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            sources: SignalSource::ALL.to_vec(),
            queries: Vec::new(),
            max_signals_per_source: default_max_signals_per_source(),
        }
    }
}

/// Load and validate the scrape configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_scrape_config(path: &Path) -> Result<ScrapeConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let config: ScrapeConfig = serde_yaml::from_str(&content)?;
    validate_scrape_config(&config)?;

    Ok(config)
}

fn validate_scrape_config(config: &ScrapeConfig) -> Result<(), ConfigError> {
    if config.sources.is_empty() {
        return Err(ConfigError::Validation(
            "at least one source must be enabled".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for source in &config.sources {
        if !seen.insert(*source) {
            return Err(ConfigError::Validation(format!(
                "duplicate source: '{source}'"
            )));
        }
    }

    if config.queries.iter().any(|q| q.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "search queries must be non-empty".to_string(),
        ));
    }

    if config.max_signals_per_source == 0 {
        return Err(ConfigError::Validation(
            "max_signals_per_source must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_yaml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write yaml");
        file
    }

    #[test]
    fn loads_valid_file() {
        let file = write_yaml(
            "sources: [reddit, hackernews]\nqueries: [\"invoice software\"]\nmax_signals_per_source: 25\n",
        );
        let config = load_scrape_config(file.path()).unwrap();
        assert_eq!(
            config.sources,
            vec![SignalSource::Reddit, SignalSource::Hackernews]
        );
        assert_eq!(config.queries, vec!["invoice software".to_string()]);
        assert_eq!(config.max_signals_per_source, 25);
    }

    #[test]
    fn cap_defaults_when_omitted() {
        let file = write_yaml("sources: [github]\n");
        let config = load_scrape_config(file.path()).unwrap();
        assert_eq!(config.max_signals_per_source, 100);
        assert!(config.queries.is_empty());
    }

    #[test]
    fn rejects_empty_sources() {
        let file = write_yaml("sources: []\n");
        let err = load_scrape_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("at least one source"));
    }

    #[test]
    fn rejects_duplicate_source() {
        let file = write_yaml("sources: [reddit, reddit]\n");
        let err = load_scrape_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("duplicate source"));
    }

    #[test]
    fn rejects_blank_query() {
        let file = write_yaml("sources: [twitter]\nqueries: [\" \"]\n");
        assert!(matches!(
            load_scrape_config(file.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn rejects_unknown_source() {
        let file = write_yaml("sources: [myspace]\n");
        assert!(matches!(
            load_scrape_config(file.path()),
            Err(ConfigError::SourcesFileParse(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = load_scrape_config(Path::new("/nonexistent/sources.yaml"));
        assert!(matches!(result, Err(ConfigError::SourcesFileIo { .. })));
    }
}

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("SIGSCOPE_ENV", "development"));
    let log_level = or_default("SIGSCOPE_LOG_LEVEL", "info");
    let sources_path = PathBuf::from(or_default("SIGSCOPE_SOURCES_PATH", "./config/sources.yaml"));
    let output_dir = PathBuf::from(or_default("SIGSCOPE_OUTPUT_DIR", "./reports"));

    let anthropic_api_key = lookup("ANTHROPIC_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty());
    let llm_base_url = or_default("SIGSCOPE_LLM_BASE_URL", "https://api.anthropic.com");
    let llm_model = or_default("SIGSCOPE_LLM_MODEL", "claude-3-5-haiku-latest");
    let llm_max_tokens = parse_u32("SIGSCOPE_LLM_MAX_TOKENS", "4096")?;
    let llm_timeout_secs = parse_u64("SIGSCOPE_LLM_TIMEOUT_SECS", "60")?;
    let llm_max_retries = parse_u32("SIGSCOPE_LLM_MAX_RETRIES", "2")?;

    let theme_batch_size = parse_usize("SIGSCOPE_THEME_BATCH_SIZE", "50")?;
    if theme_batch_size == 0 {
        return Err(invalid(
            "SIGSCOPE_THEME_BATCH_SIZE",
            "must be greater than zero".to_string(),
        ));
    }

    let similarity_threshold = or_default("SIGSCOPE_SIMILARITY_THRESHOLD", "0.7")
        .parse::<f64>()
        .map_err(|e| invalid("SIGSCOPE_SIMILARITY_THRESHOLD", e.to_string()))?;
    if !(0.0..=1.0).contains(&similarity_threshold) {
        return Err(invalid(
            "SIGSCOPE_SIMILARITY_THRESHOLD",
            format!("{similarity_threshold} is outside [0, 1]"),
        ));
    }

    let pattern_min_frequency = parse_usize("SIGSCOPE_PATTERN_MIN_FREQUENCY", "2")?;

    Ok(AppConfig {
        env,
        log_level,
        sources_path,
        output_dir,
        anthropic_api_key,
        llm_base_url,
        llm_model,
        llm_max_tokens,
        llm_timeout_secs,
        llm_max_retries,
        theme_batch_size,
        similarity_threshold,
        pattern_min_frequency,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

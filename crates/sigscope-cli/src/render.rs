//! Report rendering for the `run` command.

use clap::ValueEnum;
use sigscope_analysis::DetectedPattern;
use sigscope_core::{ReportInput, Signal};

const SNIPPET_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ReportFormat {
    Json,
    Markdown,
}

impl ReportFormat {
    pub(crate) fn extension(self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Markdown => "md",
        }
    }
}

/// Render the report in `format`. Patterns only appear in Markdown output.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub(crate) fn render(
    report: &ReportInput,
    patterns: &[DetectedPattern],
    format: ReportFormat,
) -> anyhow::Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        ReportFormat::Markdown => Ok(render_markdown(report, patterns)),
    }
}

pub(crate) fn render_markdown(report: &ReportInput, patterns: &[DetectedPattern]) -> String {
    let meta = &report.metadata;
    let sentiment = &report.sentiment;
    let sources: Vec<String> = meta.sources.iter().map(ToString::to_string).collect();
    let sources = if sources.is_empty() {
        "none".to_string()
    } else {
        sources.join(", ")
    };

    let mut lines: Vec<String> = vec![
        "# Signal Report".to_string(),
        String::new(),
        format!("**Generated**: {}", meta.generated_at.format("%Y-%m-%d %H:%M UTC")),
        format!("**Scraped**: {}", meta.scraped_at.format("%Y-%m-%d %H:%M UTC")),
        format!("**Sources**: {sources}"),
        format!("**Signals**: {}", meta.total_signals),
        format!("**Version**: {}", meta.version),
        String::new(),
        "---".to_string(),
        String::new(),
        "## Sentiment".to_string(),
        String::new(),
        format!("**Overall**: {:+.2}", sentiment.overall),
        String::new(),
        "| Positive | Neutral | Negative |".to_string(),
        "|----------|---------|----------|".to_string(),
        format!(
            "| {} | {} | {} |",
            percent(sentiment.distribution.positive),
            percent(sentiment.distribution.neutral),
            percent(sentiment.distribution.negative)
        ),
    ];

    push_signal_list(&mut lines, "Most positive", &sentiment.positive_signals);
    push_signal_list(&mut lines, "Most negative", &sentiment.negative_signals);

    lines.push(String::new());
    lines.push("## Themes".to_string());
    lines.push(String::new());
    if report.themes.is_empty() {
        lines.push("No themes extracted.".to_string());
    } else {
        lines.push("| Theme | Category | Frequency | Confidence | Keywords |".to_string());
        lines.push("|-------|----------|-----------|------------|----------|".to_string());
        for theme in &report.themes {
            lines.push(format!(
                "| {} | {} | {} | {:.2} | {} |",
                escape_cell(&theme.name),
                theme.category,
                theme.frequency,
                theme.confidence,
                escape_cell(&theme.keywords.join(", "))
            ));
        }
        for theme in report.themes.iter().filter(|t| !t.examples.is_empty()) {
            lines.push(String::new());
            lines.push(format!("### {}", theme.name));
            lines.push(String::new());
            for example in &theme.examples {
                lines.push(format!("> {}", snippet(example)));
            }
        }
    }

    if !patterns.is_empty() {
        lines.push(String::new());
        lines.push("## Patterns".to_string());
        lines.push(String::new());
        lines.push("| Type | Pattern | Frequency | Example |".to_string());
        lines.push("|------|---------|-----------|---------|".to_string());
        for pattern in patterns {
            let example = pattern.examples.first().map_or("", String::as_str);
            lines.push(format!(
                "| {} | {} | {} | {} |",
                pattern.pattern_type,
                pattern.pattern,
                pattern.frequency,
                escape_cell(example)
            ));
        }
    }

    lines.push(String::new());
    lines.join("\n")
}

fn push_signal_list(lines: &mut Vec<String>, heading: &str, signals: &[Signal]) {
    if signals.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push(format!("### {heading}"));
    lines.push(String::new());
    for signal in signals {
        let score = signal
            .sentiment
            .map(|s| format!(" ({s:+.2})"))
            .unwrap_or_default();
        lines.push(format!(
            "- [{}]({}){score}: {}",
            signal.source,
            signal.url,
            snippet(&signal.content)
        ));
    }
}

fn percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Single-line excerpt of at most `SNIPPET_CHARS` characters.
fn snippet(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= SNIPPET_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(SNIPPET_CHARS - 1).collect();
    format!("{}…", cut.trim_end())
}

fn escape_cell(text: &str) -> String {
    snippet(text).replace('|', "\\|")
}

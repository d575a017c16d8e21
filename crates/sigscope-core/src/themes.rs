use serde::{Deserialize, Serialize};

/// Category an LLM assigns to an extracted theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeCategory {
    Pain,
    Desire,
    Feature,
    Workflow,
    Comparison,
}

impl ThemeCategory {
    /// Parse the exact lowercase wire name. Anything else is rejected.
    #[must_use]
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "pain" => Some(ThemeCategory::Pain),
            "desire" => Some(ThemeCategory::Desire),
            "feature" => Some(ThemeCategory::Feature),
            "workflow" => Some(ThemeCategory::Workflow),
            "comparison" => Some(ThemeCategory::Comparison),
            _ => None,
        }
    }

    /// Fixed sentiment attributed to a theme of this category.
    #[must_use]
    pub fn sentiment(self) -> f32 {
        match self {
            ThemeCategory::Pain => -0.6,
            ThemeCategory::Desire => 0.3,
            ThemeCategory::Feature => 0.5,
            ThemeCategory::Workflow => 0.1,
            ThemeCategory::Comparison => 0.0,
        }
    }
}

impl std::fmt::Display for ThemeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ThemeCategory::Pain => "pain",
            ThemeCategory::Desire => "desire",
            ThemeCategory::Feature => "feature",
            ThemeCategory::Workflow => "workflow",
            ThemeCategory::Comparison => "comparison",
        };
        f.write_str(s)
    }
}

/// A theme merged from every raw LLM extraction sharing a normalized name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTheme {
    /// Unique within one extraction call.
    pub id: String,
    pub name: String,
    pub keywords: Vec<String>,
    pub category: ThemeCategory,
    pub frequency: usize,
    /// In [-1.0, 1.0].
    pub sentiment: f32,
    /// In [0.0, 1.0].
    pub confidence: f32,
    pub examples: Vec<String>,
}

/// Generate a URL-safe slug: lowercase ASCII alphanumerics joined by single dashes.
#[must_use]
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else if c.is_whitespace() || c == '_' || c == '/' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_simple_name() {
        assert_eq!(slugify("Slow Build Times"), "slow-build-times");
    }

    #[test]
    fn slug_strips_punctuation() {
        assert_eq!(slugify("Can't export (CSV)!"), "cant-export-csv");
    }

    #[test]
    fn slug_collapses_separators() {
        assert_eq!(slugify("  pricing / plans__tiers "), "pricing-plans-tiers");
    }

    #[test]
    fn category_wire_names_are_exact() {
        assert_eq!(ThemeCategory::from_wire("pain"), Some(ThemeCategory::Pain));
        assert_eq!(ThemeCategory::from_wire("Pain"), None);
        assert_eq!(ThemeCategory::from_wire("neutral"), None);
    }

    #[test]
    fn category_sentiments_stay_in_range() {
        for category in [
            ThemeCategory::Pain,
            ThemeCategory::Desire,
            ThemeCategory::Feature,
            ThemeCategory::Workflow,
            ThemeCategory::Comparison,
        ] {
            assert!((-1.0..=1.0).contains(&category.sentiment()));
        }
    }
}

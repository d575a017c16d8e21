//! Regex-based detection of recurring phrases in signal text.
//!
//! Each rule belongs to one [`PatternType`]. Every non-empty match across all
//! signals counts toward its rule's frequency; rules that reach
//! `min_frequency` are reported with their longest distinct matches as
//! examples.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use sigscope_core::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    Workflow,
    Comparison,
    Frustration,
    Request,
}

impl std::fmt::Display for PatternType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternType::Workflow => write!(f, "workflow"),
            PatternType::Comparison => write!(f, "comparison"),
            PatternType::Frustration => write!(f, "frustration"),
            PatternType::Request => write!(f, "request"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedPattern {
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    /// Name of the rule that matched.
    pub pattern: String,
    pub frequency: usize,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternStats {
    pub total_patterns: usize,
    pub total_occurrences: usize,
    /// Number of reported patterns per type; every type is present.
    pub by_type: BTreeMap<PatternType, usize>,
}

#[derive(Debug, Clone)]
pub struct PatternDetectorConfig {
    pub min_frequency: usize,
    pub max_examples: usize,
    /// Upper bound on each example's length in characters, ellipsis included.
    pub max_example_length: usize,
}

impl Default for PatternDetectorConfig {
    fn default() -> Self {
        Self {
            min_frequency: 2,
            max_examples: 3,
            max_example_length: 100,
        }
    }
}

struct PatternRule {
    name: &'static str,
    pattern_type: PatternType,
    regex: Regex,
}

const RULE_SOURCES: &[(&str, PatternType, &str)] = &[
    // Workflow
    (
        "tool-usage",
        PatternType::Workflow,
        r"\bi (?:use|used|am using|'m using) [\w.+#-]+(?: [\w.+#-]+){0,3} (?:for|to) [\w ]{1,40}",
    ),
    (
        "daily-routine",
        PatternType::Workflow,
        r"\b(?:every (?:day|morning|week)|daily|each morning)\b[^.!?\n]{0,60}",
    ),
    (
        "my-workflow",
        PatternType::Workflow,
        r"\bmy (?:workflow|process|setup|stack)\b[^.!?\n]{0,60}",
    ),
    (
        "step-sequence",
        PatternType::Workflow,
        r"\b(?:first|then|after that|finally),? i [^.!?\n]{1,60}",
    ),
    (
        "integration",
        PatternType::Workflow,
        r"\b(?:integrat(?:e|es|ed|ing) with|connect(?:s|ed)? to|sync(?:s|ed)? with) [^.!?\n]{1,40}",
    ),
    (
        "automation",
        PatternType::Workflow,
        r"\b(?:automate|automated|automating|scripted) [^.!?\n]{1,50}",
    ),
    (
        "manual-work",
        PatternType::Workflow,
        r"\b(?:manually|by hand|copy(?:ing)? and past(?:e|ing))\b[^.!?\n]{0,50}",
    ),
    // Comparison
    (
        "better-than",
        PatternType::Comparison,
        r"\b[\w.+#-]+ is (?:much |way |so )?better than [\w.+#-]+(?: [\w.+#-]+){0,2}",
    ),
    (
        "worse-than",
        PatternType::Comparison,
        r"\b[\w.+#-]+ is (?:much |way |so )?worse than [\w.+#-]+(?: [\w.+#-]+){0,2}",
    ),
    (
        "versus",
        PatternType::Comparison,
        r"\b[\w.+#-]+ (?:vs\.?|versus) [\w.+#-]+",
    ),
    (
        "switched",
        PatternType::Comparison,
        r"\b(?:switched|moved|migrated) (?:from [\w.+#-]+ )?to [\w.+#-]+(?: [\w.+#-]+){0,2}",
    ),
    (
        "compared-to",
        PatternType::Comparison,
        r"\b(?:compared to|in comparison to|unlike) [\w.+#-]+(?: [\w.+#-]+){0,3}",
    ),
    (
        "alternative",
        PatternType::Comparison,
        r"\b(?:alternative to|instead of|replacement for) [\w.+#-]+(?: [\w.+#-]+){0,2}",
    ),
    // Frustration
    (
        "frustrated",
        PatternType::Frustration,
        r"\b(?:frustrat(?:ed|ing|ion)|annoy(?:ed|ing)|infuriating)\b[^.!?\n]{0,60}",
    ),
    (
        "hate",
        PatternType::Frustration,
        r"\bi (?:hate|can't stand|cannot stand|am tired of|'m tired of) [^.!?\n]{1,60}",
    ),
    (
        "broken",
        PatternType::Frustration,
        r"\b(?:doesn't|does not|don't|won't|never) work(?:s|ing)?\b[^.!?\n]{0,40}",
    ),
    (
        "too-expensive",
        PatternType::Frustration,
        r"\b(?:too expensive|overpriced|way too much|costs? too much|price hike)[^.!?\n]{0,40}",
    ),
    (
        "slow",
        PatternType::Frustration,
        r"\b(?:so|too|painfully|really) slow\b[^.!?\n]{0,40}",
    ),
    (
        "crash",
        PatternType::Frustration,
        r"\b(?:keeps? crashing|crash(?:es|ed)? (?:constantly|all the time|again)|buggy)[^.!?\n]{0,40}",
    ),
    (
        "waste-of-time",
        PatternType::Frustration,
        r"\b(?:waste of (?:time|money)|wasted (?:hours|days|time))[^.!?\n]{0,40}",
    ),
    // Request
    ("wish", PatternType::Request, r"\bi wish [^.!?\n]{1,80}"),
    (
        "would-be-nice",
        PatternType::Request,
        r"\bwould be (?:nice|great|awesome|helpful) (?:if|to) [^.!?\n]{1,80}",
    ),
    (
        "feature-request",
        PatternType::Request,
        r"\bfeature request\b[^.!?\n]{0,80}",
    ),
    (
        "please-add",
        PatternType::Request,
        r"\bplease (?:add|support|make|let) [^.!?\n]{1,80}",
    ),
    (
        "looking-for",
        PatternType::Request,
        r"\b(?:looking for|searching for|need) (?:a|an|some) [^.!?\n]{1,60}",
    ),
    (
        "is-there-a-way",
        PatternType::Request,
        r"\b(?:is there (?:a|any) way to|how (?:do|can) i) [^.!?\n]{1,60}",
    ),
];

static RULES: LazyLock<Vec<PatternRule>> = LazyLock::new(|| {
    RULE_SOURCES
        .iter()
        .map(|&(name, pattern_type, source)| PatternRule {
            name,
            pattern_type,
            regex: RegexBuilder::new(source)
                .case_insensitive(true)
                .build()
                .expect("valid pattern rule regex"),
        })
        .collect()
});

#[derive(Debug, Clone, Default)]
pub struct PatternDetector {
    config: PatternDetectorConfig,
}

impl PatternDetector {
    #[must_use]
    pub fn new(config: PatternDetectorConfig) -> Self {
        Self { config }
    }

    /// Run every rule over every signal and report rules that matched at
    /// least `min_frequency` times, most frequent first.
    #[must_use]
    pub fn detect(&self, signals: &[Signal]) -> Vec<DetectedPattern> {
        let rules = &*RULES;
        let mut matches: Vec<Vec<String>> = vec![Vec::new(); rules.len()];

        for signal in signals {
            for (index, rule) in rules.iter().enumerate() {
                matches[index].extend(
                    rule.regex
                        .find_iter(&signal.content)
                        .map(|m| m.as_str().trim().to_string())
                        .filter(|m| !m.is_empty()),
                );
            }
        }

        let mut patterns: Vec<DetectedPattern> = rules
            .iter()
            .zip(matches)
            .filter(|(_, found)| !found.is_empty() && found.len() >= self.config.min_frequency)
            .map(|(rule, found)| DetectedPattern {
                pattern_type: rule.pattern_type,
                pattern: rule.name.to_string(),
                frequency: found.len(),
                examples: self.pick_examples(found),
            })
            .collect();

        patterns.sort_by(|a, b| b.frequency.cmp(&a.frequency));

        tracing::debug!(
            signals = signals.len(),
            patterns = patterns.len(),
            "pattern detection complete"
        );

        patterns
    }

    fn pick_examples(&self, found: Vec<String>) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut unique: Vec<String> = found
            .into_iter()
            .filter(|m| seen.insert(m.clone()))
            .collect();
        unique.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
        unique
            .into_iter()
            .take(self.config.max_examples)
            .map(|example| truncate_example(&example, self.config.max_example_length))
            .collect()
    }
}

/// Cut `example` to at most `max_len` characters, ending in `…` when cut.
fn truncate_example(example: &str, max_len: usize) -> String {
    if example.chars().count() <= max_len {
        return example.to_string();
    }
    if max_len == 0 {
        return String::new();
    }
    let kept: String = example.chars().take(max_len - 1).collect();
    format!("{}…", kept.trim_end())
}

/// Patterns of one type, in their existing order.
#[must_use]
pub fn filter_by_type(patterns: &[DetectedPattern], pattern_type: PatternType) -> Vec<&DetectedPattern> {
    patterns
        .iter()
        .filter(|p| p.pattern_type == pattern_type)
        .collect()
}

/// The `n` most frequent patterns.
#[must_use]
pub fn top_patterns(patterns: &[DetectedPattern], n: usize) -> Vec<&DetectedPattern> {
    let mut sorted: Vec<&DetectedPattern> = patterns.iter().collect();
    sorted.sort_by(|a, b| b.frequency.cmp(&a.frequency));
    sorted.truncate(n);
    sorted
}

#[must_use]
pub fn pattern_stats(patterns: &[DetectedPattern]) -> PatternStats {
    let mut by_type: BTreeMap<PatternType, usize> = [
        PatternType::Workflow,
        PatternType::Comparison,
        PatternType::Frustration,
        PatternType::Request,
    ]
    .into_iter()
    .map(|t| (t, 0))
    .collect();

    for pattern in patterns {
        *by_type.entry(pattern.pattern_type).or_insert(0) += 1;
    }

    PatternStats {
        total_patterns: patterns.len(),
        total_occurrences: patterns.iter().map(|p| p.frequency).sum(),
        by_type,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sigscope_core::SignalSource;

    use super::*;

    fn signal(content: &str) -> Signal {
        Signal::new(
            "s",
            SignalSource::Reddit,
            content,
            "https://reddit.com/x",
            Utc::now(),
        )
    }

    fn detector(min_frequency: usize) -> PatternDetector {
        PatternDetector::new(PatternDetectorConfig {
            min_frequency,
            ..PatternDetectorConfig::default()
        })
    }

    #[test]
    fn rule_set_compiles_and_covers_every_type() {
        assert_eq!(RULES.len(), 26);
        for t in [
            PatternType::Workflow,
            PatternType::Comparison,
            PatternType::Frustration,
            PatternType::Request,
        ] {
            assert!(RULES.iter().any(|r| r.pattern_type == t));
        }
    }

    #[test]
    fn detects_tool_usage_workflow() {
        let patterns = detector(1).detect(&[signal("I use VSCode for development")]);
        let workflow = patterns
            .iter()
            .find(|p| p.pattern_type == PatternType::Workflow)
            .expect("workflow pattern");
        assert!(workflow.frequency >= 1);
        assert_eq!(workflow.pattern, "tool-usage");
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(detector(1).detect(&[]).is_empty());
    }

    #[test]
    fn below_min_frequency_is_dropped() {
        let signals = [signal("I wish it had offline mode")];
        assert!(detector(2).detect(&signals).is_empty());
        assert_eq!(detector(1).detect(&signals).len(), 1);
    }

    #[test]
    fn raising_min_frequency_never_grows_results() {
        let signals = [
            signal("I wish exports were faster. This is so slow to load."),
            signal("I wish there was a dark mode"),
            signal("Honestly Linear is way better than Jira for us"),
            signal("It keeps crashing and it is so slow on startup"),
            signal("Please add SSO support"),
        ];
        let mut previous = usize::MAX;
        for min in 0..5 {
            let found = detector(min).detect(&signals);
            assert!(found.len() <= previous);
            assert!(found.iter().all(|p| p.frequency >= min));
            previous = found.len();
        }
    }

    #[test]
    fn results_sorted_by_frequency() {
        let signals = [
            signal("I wish it synced. I wish it was cheaper."),
            signal("I wish for tabs"),
            signal("Please add tags"),
            signal("please support webhooks"),
        ];
        let patterns = detector(1).detect(&signals);
        assert_eq!(patterns[0].pattern, "wish");
        assert_eq!(patterns[0].frequency, 3);
        assert!(patterns
            .windows(2)
            .all(|w| w[0].frequency >= w[1].frequency));
    }

    #[test]
    fn examples_are_unique_longest_first_and_capped() {
        let signals = [
            signal("I wish it worked"),
            signal("I wish it worked"),
            signal("I wish it worked offline on my phone"),
            signal("I wish for more"),
            signal("I wish it had tags"),
        ];
        let patterns = detector(1).detect(&signals);
        let wish = patterns.iter().find(|p| p.pattern == "wish").unwrap();
        assert_eq!(wish.frequency, 5);
        assert_eq!(wish.examples.len(), 3);
        assert_eq!(wish.examples[0], "I wish it worked offline on my phone");
        let unique: HashSet<&String> = wish.examples.iter().collect();
        assert_eq!(unique.len(), wish.examples.len());
    }

    #[test]
    fn long_examples_are_truncated_with_ellipsis() {
        let detector = PatternDetector::new(PatternDetectorConfig {
            min_frequency: 1,
            max_examples: 3,
            max_example_length: 20,
        });
        let patterns = detector.detect(&[signal(
            "I wish the calendar integration supported recurring events properly",
        )]);
        let wish = patterns.iter().find(|p| p.pattern == "wish").unwrap();
        assert!(wish.examples[0].chars().count() <= 20);
        assert!(wish.examples[0].ends_with('…'));
    }

    #[test]
    fn truncate_leaves_short_text_alone() {
        assert_eq!(truncate_example("short", 10), "short");
        assert_eq!(truncate_example("exactly10!", 10), "exactly10!");
    }

    #[test]
    fn helpers_filter_rank_and_count() {
        let patterns = vec![
            DetectedPattern {
                pattern_type: PatternType::Request,
                pattern: "wish".to_string(),
                frequency: 2,
                examples: vec![],
            },
            DetectedPattern {
                pattern_type: PatternType::Frustration,
                pattern: "slow".to_string(),
                frequency: 5,
                examples: vec![],
            },
            DetectedPattern {
                pattern_type: PatternType::Request,
                pattern: "please-add".to_string(),
                frequency: 3,
                examples: vec![],
            },
        ];

        let requests = filter_by_type(&patterns, PatternType::Request);
        assert_eq!(requests.len(), 2);

        let top = top_patterns(&patterns, 2);
        assert_eq!(top[0].pattern, "slow");
        assert_eq!(top[1].pattern, "please-add");

        let stats = pattern_stats(&patterns);
        assert_eq!(stats.total_patterns, 3);
        assert_eq!(stats.total_occurrences, 10);
        assert_eq!(stats.by_type[&PatternType::Request], 2);
        assert_eq!(stats.by_type[&PatternType::Workflow], 0);
    }
}

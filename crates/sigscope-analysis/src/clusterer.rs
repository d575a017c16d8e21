//! Greedy keyword clustering by normalized edit-distance similarity.

use serde::{Deserialize, Serialize};

/// Suffixes tried, in order, when stemming is enabled. The first one whose
/// removal leaves at least [`MIN_STEM_LEN`] characters is stripped.
const STEM_SUFFIXES: &[&str] = &["ing", "ed", "ly", "s", "es", "ies"];
const MIN_STEM_LEN: usize = 3;

/// Name and similarity of the synthetic cluster produced by
/// [`KeywordClusterer::merge_clusters`]. The similarity is a fixed
/// approximation; member-level similarity is not recomputed after folding.
pub const OTHER_CLUSTER: &str = "other";
pub const OTHER_CLUSTER_SIMILARITY: f64 = 0.5;

/// A group of near-duplicate keywords.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordCluster {
    /// The first keyword (as given) that opened the cluster.
    pub representative: String,
    /// Members as given, sorted. Repeated inputs stay repeated.
    pub keywords: Vec<String>,
    /// Mean pairwise similarity of the members, in [0.0, 1.0].
    pub similarity: f64,
}

#[derive(Debug, Clone)]
pub struct ClustererConfig {
    pub similarity_threshold: f64,
    pub min_cluster_size: usize,
    pub enable_stemming: bool,
}

impl Default for ClustererConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            min_cluster_size: 1,
            enable_stemming: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct KeywordClusterer {
    config: ClustererConfig,
}

struct Forming {
    representative: String,
    members: Vec<String>,
    normalized: Vec<String>,
}

impl KeywordClusterer {
    #[must_use]
    pub fn new(config: ClustererConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ClustererConfig {
        &self.config
    }

    /// Cluster keywords in a single greedy pass.
    ///
    /// Each keyword joins the existing cluster with the highest mean
    /// similarity to its members when that score reaches the threshold;
    /// otherwise it opens a new cluster. Ties go to the earliest cluster.
    /// Blank keywords are skipped. Output is sorted by member count, largest
    /// first, after dropping clusters smaller than `min_cluster_size`.
    #[must_use]
    pub fn cluster<S: AsRef<str>>(&self, keywords: &[S]) -> Vec<KeywordCluster> {
        let mut forming: Vec<Forming> = Vec::new();

        for keyword in keywords {
            let original = keyword.as_ref();
            let normalized = self.normalize(original);
            if normalized.is_empty() {
                continue;
            }

            let mut best: Option<(usize, f64)> = None;
            for (index, cluster) in forming.iter().enumerate() {
                let score = mean_similarity(&normalized, &cluster.normalized);
                if best.is_none_or(|(_, top)| score > top) {
                    best = Some((index, score));
                }
            }

            match best {
                Some((index, score)) if score >= self.config.similarity_threshold => {
                    let cluster = &mut forming[index];
                    cluster.members.push(original.to_string());
                    cluster.normalized.push(normalized);
                }
                _ => forming.push(Forming {
                    representative: original.to_string(),
                    members: vec![original.to_string()],
                    normalized: vec![normalized],
                }),
            }
        }

        let mut clusters: Vec<KeywordCluster> = forming
            .into_iter()
            .filter(|c| c.members.len() >= self.config.min_cluster_size)
            .map(|c| {
                let similarity = pairwise_similarity(&c.normalized);
                let mut keywords = c.members;
                keywords.sort();
                KeywordCluster {
                    representative: c.representative,
                    keywords,
                    similarity,
                }
            })
            .collect();

        clusters.sort_by(|a, b| b.keywords.len().cmp(&a.keywords.len()));
        clusters
    }

    /// Cap the number of clusters at `max_clusters`.
    ///
    /// Keeps the `max_clusters - 1` largest clusters and folds the rest into
    /// one synthetic [`OTHER_CLUSTER`] holding the union of their keywords.
    #[must_use]
    pub fn merge_clusters(
        mut clusters: Vec<KeywordCluster>,
        max_clusters: usize,
    ) -> Vec<KeywordCluster> {
        if clusters.len() <= max_clusters {
            return clusters;
        }
        if max_clusters == 0 {
            return Vec::new();
        }

        clusters.sort_by(|a, b| b.keywords.len().cmp(&a.keywords.len()));
        let folded = clusters.split_off(max_clusters - 1);

        let mut keywords: Vec<String> = folded.into_iter().flat_map(|c| c.keywords).collect();
        keywords.sort();
        keywords.dedup();

        clusters.push(KeywordCluster {
            representative: OTHER_CLUSTER.to_string(),
            keywords,
            similarity: OTHER_CLUSTER_SIMILARITY,
        });
        clusters
    }

    /// Lowercase, trim, and optionally strip one known suffix.
    #[must_use]
    pub fn normalize(&self, keyword: &str) -> String {
        let lowered = keyword.trim().to_lowercase();
        if !self.config.enable_stemming {
            return lowered;
        }
        for suffix in STEM_SUFFIXES {
            if let Some(stem) = lowered.strip_suffix(suffix) {
                if stem.chars().count() >= MIN_STEM_LEN {
                    return stem.to_string();
                }
            }
        }
        lowered
    }
}

/// Similarity of two normalized strings in [0.0, 1.0].
///
/// 1.0 for equal strings, 0.8 when one contains the other, otherwise one
/// minus the edit distance over the longer length.
#[must_use]
pub fn string_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.contains(b) || b.contains(a) {
        return 0.8;
    }
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = levenshtein(a, b) as f64 / longest as f64;
    1.0 - ratio
}

/// Character-level edit distance.
#[must_use]
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn mean_similarity(candidate: &str, members: &[String]) -> f64 {
    if members.is_empty() {
        return 0.0;
    }
    let total: f64 = members
        .iter()
        .map(|m| string_similarity(candidate, m))
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let mean = total / members.len() as f64;
    mean
}

fn pairwise_similarity(members: &[String]) -> f64 {
    if members.len() < 2 {
        return 1.0;
    }
    let mut total = 0.0;
    let mut pairs = 0usize;
    for (i, a) in members.iter().enumerate() {
        for b in &members[i + 1..] {
            total += string_similarity(a, b);
            pairs += 1;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = total / pairs as f64;
    mean
}

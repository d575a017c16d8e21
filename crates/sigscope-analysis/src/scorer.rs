//! Lexicon scorer for product-feedback sentiment.

use sigscope_core::{Signal, SignalSentiment};

/// Word weights for software/product feedback.
///
/// Keys are lowercase single words. Values in `(0.0, 1.0]` are positive,
/// in `[-1.0, 0.0)` are negative. The final score is clamped to `[-1.0, 1.0]`.
pub(crate) const LEXICON: &[(&str, f32)] = &[
    // Positive signals
    ("love", 0.5),
    ("loved", 0.5),
    ("great", 0.4),
    ("good", 0.3),
    ("excellent", 0.5),
    ("amazing", 0.5),
    ("awesome", 0.5),
    ("best", 0.5),
    ("fast", 0.3),
    ("easy", 0.3),
    ("intuitive", 0.4),
    ("reliable", 0.4),
    ("recommend", 0.4),
    ("helpful", 0.3),
    ("smooth", 0.3),
    ("useful", 0.3),
    ("works", 0.2),
    ("solid", 0.3),
    ("polished", 0.4),
    ("worth", 0.3),
    // Negative signals
    ("hate", -0.6),
    ("terrible", -0.6),
    ("awful", -0.6),
    ("worst", -0.6),
    ("bad", -0.4),
    ("broken", -0.5),
    ("buggy", -0.5),
    ("crash", -0.5),
    ("crashes", -0.5),
    ("slow", -0.4),
    ("expensive", -0.4),
    ("overpriced", -0.5),
    ("confusing", -0.4),
    ("frustrating", -0.5),
    ("annoying", -0.4),
    ("clunky", -0.4),
    ("useless", -0.6),
    ("missing", -0.3),
    ("bloated", -0.4),
    ("unreliable", -0.5),
];

/// Number of lexicon hits at which confidence saturates.
const CONFIDENCE_SATURATION: f32 = 3.0;

/// Score a text string using the lexicon.
///
/// Splits text into lowercase words, sums matching weights, and clamps
/// the result to `[-1.0, 1.0]`. Returns `0.0` for empty or unknown text.
#[must_use]
pub fn lexicon_score(text: &str) -> f32 {
    score_with_hits(text).0
}

/// Score a signal's content and attach a confidence that grows with the
/// number of lexicon words found.
#[must_use]
pub fn score_signal(signal: &Signal) -> SignalSentiment {
    let (score, hits) = score_with_hits(&signal.content);
    #[allow(clippy::cast_precision_loss)]
    let confidence = (hits as f32 / CONFIDENCE_SATURATION).min(1.0);
    SignalSentiment::new(signal.id.clone(), score, confidence)
}

fn score_with_hits(text: &str) -> (f32, usize) {
    let mut score = 0.0_f32;
    let mut hits = 0usize;
    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphabetic())
            .to_lowercase();
        if let Some(&(_, weight)) = LEXICON.iter().find(|(lex_word, _)| *lex_word == w) {
            score += weight;
            hits += 1;
        }
    }
    (score.clamp(-1.0, 1.0), hits)
}

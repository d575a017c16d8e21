use sigscope_core::Signal;

const TEXTS_PLACEHOLDER: &str = "{texts}";

const THEME_PROMPT_TEMPLATE: &str = r#"You are analyzing user feedback collected from online communities.
Identify the recurring themes across the numbered texts below.

For each theme return an object with:
- "theme": a short name (2-5 words)
- "keywords": 3-6 keywords or short phrases that signal the theme
- "category": exactly one of "pain", "desire", "feature", "workflow", "comparison"
- "examples": 1-3 short verbatim quotes from the texts

Respond with a JSON array of these objects and nothing else.

Texts:
{texts}"#;

/// Build the extraction prompt for one batch, numbering texts from 1.
///
/// Line breaks inside a signal are flattened so every text stays on its
/// own numbered line.
pub(crate) fn build_theme_prompt(batch: &[Signal]) -> String {
    let texts = batch
        .iter()
        .enumerate()
        .map(|(i, signal)| {
            let flat = signal.content.split_whitespace().collect::<Vec<_>>().join(" ");
            format!("[{}] {flat}", i + 1)
        })
        .collect::<Vec<_>>()
        .join("\n");
    THEME_PROMPT_TEMPLATE.replace(TEXTS_PLACEHOLDER, &texts)
}

//! Validation of raw LLM theme output.
//!
//! The response is untrusted. It must be a JSON array (optionally wrapped in
//! a Markdown code fence); each element is checked field by field and dropped
//! with a warning if it does not have the expected shape.

use serde_json::Value;
use sigscope_core::ThemeCategory;
use thiserror::Error;

/// One theme as reported by the LLM, after shape validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawThemeExtraction {
    pub theme: String,
    pub keywords: Vec<String>,
    pub category: ThemeCategory,
    pub examples: Vec<String>,
}

#[derive(Debug, Error)]
pub(crate) enum ResponseError {
    #[error("response is not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("response JSON is not an array")]
    NotArray,
}

/// Remove a surrounding ```` ``` ```` / ```` ```json ```` fence, if present.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parse and validate an LLM response into raw extractions.
///
/// # Errors
///
/// Fails only when the payload is not a JSON array; malformed elements are
/// dropped individually.
pub(crate) fn parse_theme_response(text: &str) -> Result<Vec<RawThemeExtraction>, ResponseError> {
    let value: Value = serde_json::from_str(strip_code_fence(text))?;
    let Value::Array(items) = value else {
        return Err(ResponseError::NotArray);
    };

    let total = items.len();
    let extractions: Vec<RawThemeExtraction> = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let parsed = validate_item(item);
            if let Err(reason) = &parsed {
                tracing::warn!(index, reason = %reason, "dropping malformed theme extraction");
            }
            parsed.ok()
        })
        .collect();

    if extractions.len() < total {
        tracing::debug!(
            total,
            kept = extractions.len(),
            "some theme extractions failed validation"
        );
    }

    Ok(extractions)
}

fn validate_item(item: &Value) -> Result<RawThemeExtraction, String> {
    let object = item.as_object().ok_or("element is not an object")?;

    let theme = object
        .get("theme")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or("missing or empty `theme`")?;

    let keywords = string_array(object.get("keywords")).ok_or("`keywords` is not an array of strings")?;

    let category = object
        .get("category")
        .and_then(Value::as_str)
        .and_then(ThemeCategory::from_wire)
        .ok_or("missing or unknown `category`")?;

    let examples = string_array(object.get("examples")).ok_or("`examples` is not an array of strings")?;

    Ok(RawThemeExtraction {
        theme: theme.to_string(),
        keywords,
        category,
        examples,
    })
}

fn string_array(value: Option<&Value>) -> Option<Vec<String>> {
    value?
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

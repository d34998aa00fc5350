//! Best-effort JSON extraction from model output.
//!
//! Model replies wrap their JSON in prose or Markdown fences. [`extract_json`]
//! tries three strategies in a fixed order and reports which one matched, or
//! fails with a typed error. It never guesses a value; the typed helpers below
//! decide their own fallbacks.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::model::{Attachment, DisplayMode, Exhibit};

pub const DEFAULT_FINDING_TITLE: &str = "Observation";
pub const DEFAULT_FINDING_DESCRIPTION: &str =
    "Please describe how this specific photo demonstrates a reduction in property value.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// First balanced `[...]` span, when the reply opens with an array.
    Array,
    /// First balanced `{...}` span.
    Object,
    /// The whole reply with Markdown code fences removed.
    StrippedFences,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub strategy: Strategy,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("response is empty")]
    Empty,
    #[error("no JSON found in response: {0}")]
    Unparseable(String),
}

pub fn extract_json(text: &str) -> Result<Extracted, ExtractionError> {
    if text.trim().is_empty() {
        return Err(ExtractionError::Empty);
    }
    let attempts: [(Strategy, fn(&str) -> Option<Result<Value, serde_json::Error>>); 3] = [
        (Strategy::Array, try_parse_array),
        (Strategy::Object, try_parse_object),
        (Strategy::StrippedFences, try_strip_fences_and_parse),
    ];
    let mut last_error = String::from("no JSON value");
    for (strategy, attempt) in attempts {
        match attempt(text) {
            Some(Ok(value)) => return Ok(Extracted { strategy, value }),
            Some(Err(err)) => {
                log::debug!("{:?} extraction failed: {}", strategy, err);
                last_error = err.to_string();
            }
            None => {}
        }
    }
    log::warn!("could not extract JSON from response: {}", preview(text, 80));
    Err(ExtractionError::Unparseable(last_error))
}

fn try_parse_array(text: &str) -> Option<Result<Value, serde_json::Error>> {
    // An array nested inside a leading object belongs to that object.
    let start = text.find(['[', '{'])?;
    if !text[start..].starts_with('[') {
        return None;
    }
    let span = balanced_span(text, start)?;
    Some(serde_json::from_str(span))
}

fn try_parse_object(text: &str) -> Option<Result<Value, serde_json::Error>> {
    let start = text.find('{')?;
    let span = balanced_span(text, start)?;
    Some(serde_json::from_str(span))
}

fn try_strip_fences_and_parse(text: &str) -> Option<Result<Value, serde_json::Error>> {
    let stripped = text.replace("```json", "").replace("```", "");
    Some(serde_json::from_str(stripped.trim()))
}

/// The bracketed span opening at byte `start`, with brackets inside string
/// literals ignored. `None` when the brackets never balance.
fn balanced_span(text: &str, start: usize) -> Option<&str> {
    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'[' => stack.push(b']'),
            b'{' => stack.push(b'}'),
            b']' | b'}' => {
                if stack.pop() != Some(*byte) {
                    return None;
                }
                if stack.is_empty() {
                    return text.get(start..start + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// What a vision model saw in one evidence photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionFinding {
    pub doc_type: String,
    pub description: String,
}

impl VisionFinding {
    /// Missing or blank fields fall back to a neutral title and a prompt
    /// asking the owner to write the description.
    pub fn from_response(text: &str) -> Self {
        let value = extract_json(text).map(|e| e.value).ok();
        let field = |key: &str| value.as_ref().and_then(|v| string_field(v, key));
        Self {
            doc_type: field("docType").unwrap_or_else(|| DEFAULT_FINDING_TITLE.to_string()),
            description: field("description")
                .unwrap_or_else(|| DEFAULT_FINDING_DESCRIPTION.to_string()),
        }
    }

    pub fn into_exhibit(self, mode: DisplayMode, attachments: Vec<Attachment>) -> Exhibit {
        Exhibit {
            title: self.doc_type,
            description: self.description,
            display_mode: mode,
            attachments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trend {
    pub title: String,
    pub reason: String,
}

impl Trend {
    pub fn defaults() -> Vec<Trend> {
        [
            (
                "Unequal Appraisal",
                "Similar homes in this specific subdivision are assessed lower.",
            ),
            (
                "Market Trends",
                "Recent sales in the immediate vicinity indicate a market correction.",
            ),
            (
                "Deferred Maintenance",
                "Local infrastructure issues are impacting resale values.",
            ),
        ]
        .into_iter()
        .map(|(title, reason)| Trend {
            title: title.to_string(),
            reason: reason.to_string(),
        })
        .collect()
    }

    /// A non-empty array of trends, or [`Trend::defaults`].
    pub fn list_from_response(text: &str) -> Vec<Trend> {
        match typed_list::<Trend>(text) {
            Some(trends) if !trends.is_empty() => trends,
            _ => Trend::defaults(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyItem {
    pub category: String,
    pub rationale: String,
}

impl StrategyItem {
    /// Anything but an array of items yields an empty list.
    pub fn list_from_response(text: &str) -> Vec<StrategyItem> {
        typed_list(text).unwrap_or_default()
    }
}

fn typed_list<T: serde::de::DeserializeOwned>(text: &str) -> Option<Vec<T>> {
    let extracted = extract_json(text).ok()?;
    if !extracted.value.is_array() {
        return None;
    }
    serde_json::from_value(extracted.value)
        .map_err(|err| log::warn!("response array has unexpected shape: {}", err))
        .ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseScore {
    pub score: u8,
    pub summary: String,
}

impl Default for CaseScore {
    fn default() -> Self {
        Self {
            score: 50,
            summary: "Add more evidence.".to_string(),
        }
    }
}

impl CaseScore {
    /// Needs a numeric `score`; it is rounded and clamped to 0..=100.
    pub fn from_response(text: &str) -> Self {
        let Ok(extracted) = extract_json(text) else {
            return Self::default();
        };
        let Some(score) = extracted.value.get("score").and_then(Value::as_f64) else {
            return Self::default();
        };
        Self {
            score: score.round().clamp(0.0, 100.0) as u8,
            summary: string_field(&extracted.value, "summary").unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterSuggestions {
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub improved_snippet: String,
}

impl LetterSuggestions {
    pub fn from_response(text: &str) -> Self {
        extract_json(text)
            .ok()
            .filter(|extracted| extracted.value.is_object())
            .and_then(|extracted| serde_json::from_value(extracted.value).ok())
            .unwrap_or_default()
    }
}

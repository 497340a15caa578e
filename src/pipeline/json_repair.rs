//! JSON repair: turn a model's "JSON" answer into a parsed value.
//!
//! Prompts ask for a bare JSON object, yet small models routinely:
//!
//! - wrap the object in a ` ```json ... ``` ` fence
//! - add a sentence of commentary before or after it
//! - leave a trailing comma before `]` or `}`
//! - emit stray characters after the closing brace
//!
//! [`parse_model_json`] applies four deterministic rules, in order, and then
//! hands the result to `serde_json`. Rules never touch content inside the
//! object except the trailing-comma fix.
//!
//! ## Rule Order
//!
//! Fences are stripped before the object is located so a fence's language
//! tag can never be mistaken for content; trailing commas are removed
//! before the final cut so the cut always lands on the real closing brace.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Why a response could not be repaired into JSON.
#[derive(Debug, Error)]
pub enum RepairError {
    #[error("no JSON object found in response")]
    NoJsonObject,

    #[error("response is not valid JSON after repair: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Repair `response` and parse it as a JSON value.
///
/// Rules (applied in order):
/// 1. Strip surrounding code-fence markers (with or without a language tag)
/// 2. Keep the first `{` through the last `}` (greedy, across lines)
/// 3. Remove trailing commas before a closing `]` or `}`
/// 4. Drop anything after the last `}`
pub fn parse_model_json(response: &str) -> Result<Value, RepairError> {
    let text = repair(response)?;
    Ok(serde_json::from_str(&text)?)
}

/// Repair `response` and deserialize it straight into `T`.
pub fn parse_model_json_as<T: DeserializeOwned>(response: &str) -> Result<T, RepairError> {
    let text = repair(response)?;
    Ok(serde_json::from_str(&text)?)
}

/// Apply the repair rules, returning the candidate JSON text.
pub fn repair(response: &str) -> Result<String, RepairError> {
    let s = strip_code_fences(response);
    let s = extract_object(&s).ok_or(RepairError::NoJsonObject)?;
    let s = remove_trailing_commas(s);
    Ok(truncate_after_last_brace(&s).to_string())
}

// ── Rule 1: Strip code fences ────────────────────────────────────────────────

static RE_OPENING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[A-Za-z0-9_+-]*[ \t]*\r?\n?").unwrap());
static RE_CLOSING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    let trimmed = input.trim();
    let s = RE_OPENING_FENCE.replace(trimmed, "");
    let s = RE_CLOSING_FENCE.replace(&s, "");
    s.trim().to_string()
}

// ── Rule 2: Locate the object ────────────────────────────────────────────────

static RE_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

fn extract_object(input: &str) -> Option<&str> {
    RE_OBJECT.find(input).map(|m| m.as_str())
}

// ── Rule 3: Trailing commas ──────────────────────────────────────────────────

static RE_TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*([}\]])").unwrap());

fn remove_trailing_commas(input: &str) -> String {
    RE_TRAILING_COMMA.replace_all(input, "$1").to_string()
}

// ── Rule 4: Trailing garbage ─────────────────────────────────────────────────

fn truncate_after_last_brace(input: &str) -> &str {
    match input.rfind('}') {
        Some(idx) => &input[..=idx],
        None => input,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

//! Answer extractor: classifies raw model text.
//!
//! Two structured forms are recognized:
//!
//! ```text
//! Thought: ...
//! Action: search
//! Action Input: 2018 World Cup winner
//! ```
//!
//! and
//!
//! ```text
//! Thought: ...
//! Final Answer: Paris
//! ```
//!
//! Markers match regardless of case and spacing, but the keywords
//! themselves must be present and open a line, so prose such as "the
//! final answer: ..." inside a thought is not a marker. When both forms
//! appear, whichever starts first wins. Anything after a line starting
//! with `Observation:` is discarded since observations are never the
//! model's to write.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Compiles a literal pattern.
fn marker(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|_| unreachable!("invalid marker pattern: {pattern}"))
}

static OBSERVATION_RE: LazyLock<Regex> = LazyLock::new(|| marker(r"(?im)^[ \t]*observation[ \t]*:"));
static FINAL_ANSWER_RE: LazyLock<Regex> =
    LazyLock::new(|| marker(r"(?im)^[ \t]*final[ \t]+answer[ \t]*:"));
static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| marker(r"(?im)^[ \t]*action[ \t]*:"));
static ACTION_INPUT_RE: LazyLock<Regex> =
    LazyLock::new(|| marker(r"(?im)^[ \t]*action[ \t]+input[ \t]*:"));
static THOUGHT_RE: LazyLock<Regex> = LazyLock::new(|| marker(r"(?i)^\s*thought[ \t]*:\s*"));
static REPHRASED_RE: LazyLock<Regex> =
    LazyLock::new(|| marker(r"(?i)rephrased[ \t]+question[ \t]*:"));

/// Parsed model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelResponse {
    /// The model wants to call a tool.
    ToolCall {
        /// Tool name as written by the model.
        tool: String,
        /// Tool input, unquoted.
        input: String,
        /// Reasoning that preceded the action.
        thought: Option<String>,
    },
    /// The model gave its final answer.
    Answer {
        /// Answer text.
        text: String,
        /// Reasoning that preceded the answer.
        thought: Option<String>,
    },
    /// Neither form could be recognized.
    Malformed(String),
}

/// Classifies raw model output.
#[must_use]
pub fn parse_model_output(raw: &str) -> ModelResponse {
    let text = strip_hallucinated_observation(raw);

    let final_at = FINAL_ANSWER_RE.find(text);
    let action_at = ACTION_RE.find(text);

    let parsed = match (final_at, action_at) {
        (Some(f), Some(a)) if a.start() < f.start() => parse_action(text, a.start(), a.end()),
        (Some(f), _) => parse_answer(text, f.start(), f.end()),
        (None, Some(a)) => parse_action(text, a.start(), a.end()),
        (None, None) => None,
    };

    parsed.unwrap_or_else(|| ModelResponse::Malformed(raw.to_string()))
}

fn strip_hallucinated_observation(raw: &str) -> &str {
    OBSERVATION_RE
        .find(raw)
        .map_or(raw, |m| &raw[..m.start()])
}

fn parse_answer(text: &str, start: usize, end: usize) -> Option<ModelResponse> {
    let answer = text[end..].trim();
    if answer.is_empty() {
        return None;
    }
    Some(ModelResponse::Answer {
        text: answer.to_string(),
        thought: leading_thought(&text[..start]),
    })
}

fn parse_action(text: &str, start: usize, end: usize) -> Option<ModelResponse> {
    let input_marker = ACTION_INPUT_RE.find_at(text, end)?;

    let tool = text[end..input_marker.start()]
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|t| t.trim_matches(|c| matches!(c, '`' | '"' | '\'' | '[' | ']')).trim())?;
    if tool.is_empty() {
        return None;
    }

    let rest = text[input_marker.end()..].trim();
    // Bounded by a later Final Answer marker, if the model wrote one.
    let rest = FINAL_ANSWER_RE
        .find(rest)
        .map_or(rest, |m| rest[..m.start()].trim());
    let raw_input = if rest.starts_with('{') {
        rest
    } else {
        rest.lines().next().unwrap_or_default()
    };
    let input = clean_input(raw_input);
    if input.is_empty() {
        return None;
    }

    Some(ModelResponse::ToolCall {
        tool: tool.to_string(),
        input,
        thought: leading_thought(&text[..start]),
    })
}

fn leading_thought(prefix: &str) -> Option<String> {
    let thought = THOUGHT_RE.replace(prefix, "");
    let thought = thought.trim();
    (!thought.is_empty()).then(|| thought.to_string())
}

/// Unquotes a tool input, accepting `{"query": "..."}` JSON as well.
fn clean_input(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        match value {
            serde_json::Value::String(s) => return s.trim().to_string(),
            serde_json::Value::Object(map) => {
                if let Some(serde_json::Value::String(q)) = map.get("query") {
                    return q.trim().to_string();
                }
            }
            _ => {}
        }
    }
    strip_quotes(trimmed).to_string()
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('`', '`')] {
        if s.len() >= 2 && s.starts_with(open) && s.ends_with(close) {
            return s[1..s.len() - 1].trim();
        }
    }
    s
}

/// Extracts a rewritten search query from rewrite-model output.
///
/// Takes the first non-empty line after a `Rephrased Question:` marker;
/// without a marker, a reply consisting of exactly one line is accepted as
/// is. Returns `None` when nothing usable remains.
#[must_use]
pub fn parse_rewrite(raw: &str) -> Option<String> {
    let text = raw.trim();
    let candidate = if let Some(m) = REPHRASED_RE.find(text) {
        text[m.end()..]
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())?
    } else {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
        let first = lines.next()?;
        if lines.next().is_some() {
            return None;
        }
        first
    };

    let cleaned = strip_quotes(candidate);
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

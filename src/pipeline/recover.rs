//! Structured-output recovery: turn a noisy completion into a JSON object.
//!
//! The model is asked for strict JSON but routinely wraps it in prose or
//! markdown fences, or answers with single-quoted literal syntax. Recovery
//! runs in three steps:
//!
//! 1. Narrow the text to the greedy span from the first `{` to the last `}`
//!    (the whole text when there is no such span).
//! 2. Try each [`ParseStrategy`] in order on that candidate; the first one
//!    that yields an object wins.
//! 3. Insert `""` for every expected key the object lacks. Extra keys are
//!    passed through untouched.
//!
//! When every strategy fails the result is a [`RecoveryError`] listing each
//! attempt. There is no third fallback.

use crate::error::{RecoveryError, StrategyFailure};
use crate::pipeline::literal::parse_literal;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

/// Recovered key/value mapping.
pub type RecoveredFields = Map<String, Value>;

/// Parsers tried on the candidate text, in [`ParseStrategy::ORDER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// `serde_json`, no extensions.
    StrictJson,
    /// [`crate::pipeline::literal`]: single quotes, `True`/`None`, trailing commas.
    PermissiveLiteral,
}

impl ParseStrategy {
    pub const ORDER: [ParseStrategy; 2] = [ParseStrategy::StrictJson, ParseStrategy::PermissiveLiteral];

    fn parse(self, candidate: &str) -> Result<Value, String> {
        match self {
            ParseStrategy::StrictJson => serde_json::from_str(candidate).map_err(|e| e.to_string()),
            ParseStrategy::PermissiveLiteral => parse_literal(candidate).map_err(|e| e.to_string()),
        }
    }
}

impl fmt::Display for ParseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParseStrategy::StrictJson => "strict-json",
            ParseStrategy::PermissiveLiteral => "permissive-literal",
        })
    }
}

static RE_BRACE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Greedy first-`{`-to-last-`}` span, or the whole input.
pub fn candidate_span(raw: &str) -> &str {
    RE_BRACE_SPAN.find(raw).map_or(raw, |m| m.as_str())
}

/// Recover a mapping from `raw`, guaranteeing every key in `expected_keys`.
pub fn recover(raw: &str, expected_keys: &[&str]) -> Result<RecoveredFields, RecoveryError> {
    let mut fields = parse_object(candidate_span(raw.trim()))?;
    fill_missing(&mut fields, expected_keys);
    Ok(fields)
}

/// Run the strategies in order over an already-narrowed candidate.
pub fn parse_object(candidate: &str) -> Result<RecoveredFields, RecoveryError> {
    let mut attempts = Vec::with_capacity(ParseStrategy::ORDER.len());

    for strategy in ParseStrategy::ORDER {
        let detail = match strategy.parse(candidate) {
            Ok(Value::Object(map)) => {
                debug!("Recovered {} keys with {}", map.len(), strategy);
                return Ok(map);
            }
            Ok(other) => format!("expected an object, got {}", kind(&other)),
            Err(e) => e,
        };
        debug!("{} failed: {}", strategy, detail);
        attempts.push(StrategyFailure { strategy, detail });
    }

    Err(RecoveryError { attempts })
}

/// Insert `""` for each expected key the mapping lacks.
pub fn fill_missing(fields: &mut RecoveredFields, expected_keys: &[&str]) {
    for key in expected_keys {
        if !fields.contains_key(*key) {
            fields.insert((*key).to_string(), Value::String(String::new()));
        }
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

//! Request-boundary validation. Preferences, ids and quiz submissions are
//! checked here so core logic only sees validated data.

use serde::Deserialize;
use serde_json::Value;

use crate::constants::{MAX_FAVORITE_TOPICS, MAX_TERM_CHARS};
use crate::progression::engine::QuizCompletion;
use crate::progression::types::UserPreferences;

/// Untyped preference payload as sent by clients. Any JSON shape is
/// accepted; [`sanitize_preferences`] decides what survives.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPreferences {
    #[serde(default)]
    pub favorite_topics: Value,
    #[serde(default)]
    pub sources: Value,
}

/// Trim, drop blanks and over-long entries, dedupe ignoring case, keep order.
pub fn normalize_terms<I, S>(terms: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for term in terms {
        let trimmed = term.as_ref().trim();
        if trimmed.is_empty() || trimmed.chars().count() > MAX_TERM_CHARS {
            continue;
        }
        let lowered = trimmed.to_lowercase();
        if seen.contains(&lowered) {
            continue;
        }
        seen.push(lowered);
        out.push(trimmed.to_string());
        if out.len() >= MAX_FAVORITE_TOPICS {
            break;
        }
    }
    out
}

/// A bare string counts as a one-entry list; null and other scalars as empty.
fn string_entries(value: &Value) -> Vec<&str> {
    match value {
        Value::Array(values) => values
            .iter()
            .filter_map(|v| match v.as_str() {
                Some(s) => Some(s),
                None => {
                    tracing::debug!(entry = %v, "Skipping non-string preference entry");
                    None
                }
            })
            .collect(),
        Value::String(s) => vec![s.as_str()],
        Value::Null => Vec::new(),
        other => {
            tracing::debug!(value = %other, "Ignoring malformed preference field");
            Vec::new()
        }
    }
}

/// Malformed fields and entries are skipped, never reported to the caller.
pub fn sanitize_preferences(raw: &RawPreferences) -> UserPreferences {
    let favorite_topics = normalize_terms(string_entries(&raw.favorite_topics));
    let sources = Some(normalize_terms(string_entries(&raw.sources))).filter(|list| !list.is_empty());

    UserPreferences {
        favorite_topics,
        sources,
    }
}

/// Ids are 1-128 ASCII letters, digits, `-`, `_`, `.` or `:`.
pub fn validate_id(id: &str) -> Result<(), &'static str> {
    if id.is_empty() || id.len() > 128 {
        return Err("id must be between 1 and 128 characters");
    }
    if !id
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b':'))
    {
        return Err("id may only contain letters, digits, '-', '_', '.' and ':'");
    }
    Ok(())
}

pub fn validate_quiz_completion(quiz: &QuizCompletion) -> Result<(), &'static str> {
    validate_id(&quiz.quiz_id)?;
    if quiz.total_questions == 0 {
        return Err("totalQuestions must be at least 1");
    }
    if quiz.total_questions > 1000 {
        return Err("totalQuestions must not exceed 1000");
    }
    if quiz.correct_answers > quiz.total_questions {
        return Err("correctAnswers cannot exceed totalQuestions");
    }
    Ok(())
}

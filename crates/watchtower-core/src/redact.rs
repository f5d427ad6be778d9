//! Secret redaction for anything headed to storage
//!
//! Text is scanned by an ordered list of secret patterns; every match is
//! masked so only a short prefix and suffix survive. Paths that look like
//! credential files are never read into storage at all.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

/// Stored in place of content from an excluded path
pub const EXCLUDED_PATH_SENTINEL: &str = "[REDACTED:EXCLUDED_PATH]";

const MASK: &str = "[REDACTED]";

/// Result of redacting one piece of text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redaction {
    pub value: String,
    pub redacted: bool,
    pub indicators: Vec<String>,
}

struct SecretPattern {
    name: &'static str,
    regex: Regex,
}

fn secret_patterns() -> &'static [SecretPattern] {
    static PATTERNS: OnceLock<Vec<SecretPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            ("api_key", r"\bsk-[A-Za-z0-9_\-]{16,}"),
            ("github_token", r"\bgh[pousr]_[A-Za-z0-9]{20,}\b"),
            ("aws_access_key", r"\bAKIA[0-9A-Z]{16}\b"),
            (
                "credential_assignment",
                r"(?i)\b(?:token|secret|password|passwd|api[_\-]?key)\s*[:=]\s*[^\s]+",
            ),
            ("bearer_token", r"\bBearer\s+[A-Za-z0-9._\-]{10,}"),
        ]
        .into_iter()
        .filter_map(|(name, pattern)| {
            Regex::new(pattern)
                .ok()
                .map(|regex| SecretPattern { name, regex })
        })
        .collect()
    })
}

fn excluded_path_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [r"(?i)\.env", r"(?i)secrets?", r"(?i)id_rsa", r"(?i)\.pem$"]
            .into_iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

/// Whether a path names a credential-bearing file
pub fn is_excluded_path(path: &str) -> bool {
    excluded_path_patterns().iter().any(|re| re.is_match(path))
}

/// Mask a secret, keeping four leading and two trailing characters
pub fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return MASK.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}…{MASK}…{tail}")
}

/// Redact `text`. When `path` is an excluded path the whole value is
/// replaced by the sentinel.
pub fn redact_text(text: &str, path: Option<&str>) -> Redaction {
    if path.is_some_and(is_excluded_path) {
        return Redaction {
            value: EXCLUDED_PATH_SENTINEL.to_string(),
            redacted: true,
            indicators: vec!["path_excluded".to_string()],
        };
    }

    let mut value = text.to_string();
    let mut indicators = Vec::new();
    for pattern in secret_patterns() {
        if !pattern.regex.is_match(&value) {
            continue;
        }
        value = pattern
            .regex
            .replace_all(&value, |caps: &regex::Captures<'_>| mask(&caps[0]))
            .into_owned();
        indicators.push(format!("pattern:{}", pattern.name));
    }

    Redaction {
        redacted: !indicators.is_empty(),
        value,
        indicators,
    }
}

/// Redact every string leaf of a JSON value. Returns the new value and the
/// de-duplicated indicators that fired.
pub fn redact_json(value: &Value) -> (Value, Vec<String>) {
    let mut indicators = Vec::new();
    let redacted = redact_value(value, &mut indicators);
    (redacted, indicators)
}

fn redact_value(value: &Value, indicators: &mut Vec<String>) -> Value {
    match value {
        Value::String(text) => {
            let result = redact_text(text, None);
            for indicator in result.indicators {
                if !indicators.contains(&indicator) {
                    indicators.push(indicator);
                }
            }
            Value::String(result.value)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| redact_value(item, indicators))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_value(v, indicators)))
                .collect(),
        ),
        other => other.clone(),
    }
}

//! Adapter trait and helpers for normalizing untrusted probe JSON

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use watchtower_core::time::parse_ts;
use watchtower_core::{CollectedSnapshot, SourceType};

/// A read-only source of snapshots.
///
/// `collect` never fails: expected problems come back as `warnings` next to
/// an empty or default `data`.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    type Data: Send;

    fn source_type(&self) -> SourceType;

    async fn collect(&self) -> CollectedSnapshot<Self::Data>;
}

pub type JsonObject = Map<String, Value>;

/// Command template as a display string
pub fn command_ref(template: &[String]) -> String {
    template.join(" ")
}

/// Object rows from a bare array, or from `container[key]` when an object
pub fn object_rows<'a>(value: &'a Value, key: &str) -> Vec<&'a JsonObject> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get(key) {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    items.iter().filter_map(Value::as_object).collect()
}

/// First present, non-empty string (or number rendered as string) among `keys`
pub fn first_str(row: &JsonObject, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match row.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// First timestamp among `keys`, ISO string or epoch millis
pub fn first_ts(row: &JsonObject, keys: &[&str]) -> Option<DateTime<Utc>> {
    keys.iter().find_map(|key| row.get(*key).and_then(parse_ts))
}

pub fn first_i64(row: &JsonObject, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|key| match row.get(*key) {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    })
}

/// Loose truthiness: booleans, non-zero numbers and `"true"`/`"1"`/`"yes"`
pub fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_rows_shapes() {
        let bare = json!([{"a": 1}, 3, {"b": 2}]);
        assert_eq!(object_rows(&bare, "sessions").len(), 2);

        let wrapped = json!({"sessions": [{"a": 1}]});
        assert_eq!(object_rows(&wrapped, "sessions").len(), 1);

        assert!(object_rows(&json!({"other": []}), "sessions").is_empty());
        assert!(object_rows(&json!("text"), "sessions").is_empty());
    }

    #[test]
    fn test_first_str_prefers_order_and_skips_blank() {
        let row = json!({"key": "", "session_key": "s-1", "id": 7});
        let row = row.as_object().unwrap();
        assert_eq!(first_str(row, &["sessionKey", "key", "session_key"]).as_deref(), Some("s-1"));
        assert_eq!(first_str(row, &["id"]).as_deref(), Some("7"));
        assert_eq!(first_str(row, &["missing"]), None);
    }

    #[test]
    fn test_truthy() {
        assert!(truthy(Some(&json!(true))));
        assert!(truthy(Some(&json!(1))));
        assert!(truthy(Some(&json!("TRUE"))));
        assert!(!truthy(Some(&json!(0))));
        assert!(!truthy(Some(&json!("false"))));
        assert!(!truthy(None));
    }
}

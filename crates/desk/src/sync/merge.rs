//! Field-level merge of change payloads into typed rows.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Overlay the fields present in `changes` onto `current`.
///
/// Fields missing from `changes` keep their current values; a non-object
/// payload leaves the row untouched.
pub fn merge_fields<T>(current: &T, changes: &Value) -> Result<T, serde_json::Error>
where
    T: Serialize + DeserializeOwned,
{
    let mut base = serde_json::to_value(current)?;
    if let (Value::Object(base), Value::Object(changes)) = (&mut base, changes) {
        for (key, value) in changes {
            base.insert(key.clone(), value.clone());
        }
    }
    serde_json::from_value(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: i64,
        status: String,
        name: String,
    }

    #[test]
    fn test_merge_overwrites_only_given_fields() {
        let row = Row {
            id: 1,
            status: "fresh".into(),
            name: "Login issue".into(),
        };
        let merged = merge_fields(&row, &json!({"status": "closed"})).unwrap();
        assert_eq!(merged.status, "closed");
        assert_eq!(merged.name, "Login issue");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let row = Row {
            id: 1,
            status: "fresh".into(),
            name: String::new(),
        };
        let changes = json!({"status": "in_progress"});
        let once = merge_fields(&row, &changes).unwrap();
        let twice = merge_fields(&once, &changes).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_rejects_mistyped_fields() {
        let row = Row {
            id: 1,
            status: "fresh".into(),
            name: String::new(),
        };
        assert!(merge_fields(&row, &json!({"id": "one"})).is_err());
    }
}

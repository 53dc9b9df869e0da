//! Shared utility functions for source rows and common operations.
//!
//! ## Row Extraction Helpers
//!
//! Source rows arrive as flat key-value records (`serde_json::Map`).
//! Spreadsheet exports are loose about types, so a prospect id may be
//! a number in one row and a string in the next:
//! - `row_string`, `row_opt_string` - Extract text, stringifying scalars
//! - `row_i64` - Extract integers from numbers or numeric strings

/// One flat key-value record from the source workbook.
pub type Row = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// Row Value Extraction Helpers
// =============================================================================

/// Extract a field as text. Numbers and booleans are stringified;
/// missing or null fields become an empty string.
pub fn row_string(row: &Row, key: &str) -> String {
    row_opt_string(row, key).unwrap_or_default()
}

/// Extract a field as non-empty trimmed text.
pub fn row_opt_string(row: &Row, key: &str) -> Option<String> {
    let text = match row.get(key)? {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Extract an integer from a number or a numeric string.
pub fn row_i64(row: &Row, key: &str) -> Option<i64> {
    match row.get(key)? {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// First non-empty string value of a row, in key order.
pub fn first_value(row: &Row) -> Option<String> {
    row.values().find_map(|v| match v {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_row_string_stringifies_scalars() {
        let r = row(json!({"id": 7, "name": "  Ada ", "active": true, "gone": null}));
        assert_eq!(row_string(&r, "id"), "7");
        assert_eq!(row_string(&r, "name"), "Ada");
        assert_eq!(row_string(&r, "active"), "true");
        assert_eq!(row_string(&r, "gone"), "");
        assert_eq!(row_string(&r, "missing"), "");
    }

    #[test]
    fn test_row_opt_string_empty_is_none() {
        let r = row(json!({"blank": "   "}));
        assert_eq!(row_opt_string(&r, "blank"), None);
    }

    #[test]
    fn test_row_i64() {
        let r = row(json!({"a": 42, "b": " 17 ", "c": "x", "d": 3.0}));
        assert_eq!(row_i64(&r, "a"), Some(42));
        assert_eq!(row_i64(&r, "b"), Some(17));
        assert_eq!(row_i64(&r, "c"), None);
        assert_eq!(row_i64(&r, "d"), Some(3));
    }

    #[test]
    fn test_first_value() {
        let r = row(json!({"n": 1, "persona": "CFO"}));
        assert_eq!(first_value(&r).as_deref(), Some("CFO"));
    }
}

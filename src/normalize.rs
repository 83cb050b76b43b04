//! Canonical re-serialization of JSON text attributes.

/// Re-serialize a JSON document with sorted object keys and no insignificant
/// whitespace, so equivalent documents compare equal as strings.
///
/// On failure the original text is returned alongside the error; callers
/// store the raw text and carry on.
///
/// ```
/// use select_provider::normalize::normalize_json;
///
/// let a = normalize_json(r#"{"b": 1, "a": 2}"#).unwrap();
/// let b = normalize_json(r#"{"a":2,"b":1}"#).unwrap();
/// assert_eq!(a, b);
/// ```
pub fn normalize_json(text: &str) -> Result<String, (String, serde_json::Error)> {
    let document: serde_json::Value =
        serde_json::from_str(text).map_err(|e| (text.to_string(), e))?;
    serde_json::to_string(&document).map_err(|e| (text.to_string(), e))
}

/// Normalize `text`, falling back to the raw text when it is not valid JSON.
pub fn normalize_json_lossy(text: &str) -> String {
    match normalize_json(text) {
        Ok(normalized) => normalized,
        Err((raw, err)) => {
            tracing::debug!(error = %err, "Keeping JSON text unnormalized");
            raw
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_order_is_canonical() {
        let a = normalize_json(r#"{"b":1,"a":2}"#).unwrap();
        let b = normalize_json(r#"{"a":2,"b":1}"#).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn test_whitespace_is_removed() {
        let normalized = normalize_json("{\n  \"op\": \"and\",\n  \"filters\": [ 1, 2 ]\n}").unwrap();
        assert_eq!(normalized, r#"{"filters":[1,2],"op":"and"}"#);
    }

    #[test]
    fn test_nested_objects_are_sorted() {
        let normalized = normalize_json(r#"{"z":{"y":1,"x":2},"a":[{"d":0,"c":1}]}"#).unwrap();
        assert_eq!(normalized, r#"{"a":[{"c":1,"d":0}],"z":{"x":2,"y":1}}"#);
    }

    #[test]
    fn test_invalid_json_returns_original() {
        let (raw, err) = normalize_json("{not json").unwrap_err();
        assert_eq!(raw, "{not json");
        assert!(err.is_syntax() || err.is_eof());
    }

    #[test]
    fn test_lossy_fallback() {
        assert_eq!(normalize_json_lossy("plain text"), "plain text");
        assert_eq!(normalize_json_lossy(r#"{ "a" : 1 }"#), r#"{"a":1}"#);
    }
}

#![forbid(unsafe_code)]

use serde_json::{Map, Value};

/// Set a nested value using dot-notation, creating intermediate objects.
///
/// `set(data, "a.b.c", v)` results in `{"a": {"b": {"c": v}}}`. A path
/// segment that exists but is not an object is replaced by one.
pub fn set(data: &mut Map<String, Value>, path: &str, value: Value) {
    let mut parts = path.split('.').peekable();
    let mut current = data;

    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            current.insert(part.to_string(), value);
            return;
        }

        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = entry.as_object_mut().expect("entry was just made an object");
    }
}

/// Parse a literal flag value into a typed JSON value.
///
/// `true`/`false` become booleans, signed decimal integers become numbers,
/// anything else stays a string.
pub fn parse_value(s: &str) -> Value {
    match s {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => match s.parse::<i64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::String(s.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_creates_intermediate_objects() {
        let mut data = Map::new();
        set(&mut data, "a.b.c", json!(1));
        assert_eq!(Value::Object(data), json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn set_merges_into_existing_objects() {
        let mut data = Map::new();
        set(&mut data, "a.b", json!("x"));
        set(&mut data, "a.c", json!("y"));
        assert_eq!(Value::Object(data), json!({"a": {"b": "x", "c": "y"}}));
    }

    #[test]
    fn set_replaces_non_object_intermediates() {
        let mut data = Map::new();
        set(&mut data, "a", json!(5));
        set(&mut data, "a.b", json!("x"));
        assert_eq!(Value::Object(data), json!({"a": {"b": "x"}}));
    }

    #[test]
    fn set_top_level_key() {
        let mut data = Map::new();
        set(&mut data, "serial", json!(99));
        assert_eq!(Value::Object(data), json!({"serial": 99}));
    }

    #[test]
    fn parse_value_handles_bools_ints_and_strings() {
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("false"), json!(false));
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value("-7"), json!(-7));
        assert_eq!(parse_value("4.2"), json!("4.2"));
        assert_eq!(parse_value("hello"), json!("hello"));
    }
}

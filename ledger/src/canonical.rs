//! Deterministic JSON used as the block hash preimage.
//!
//! Object keys are sorted, separators are `", "` and `": "`, floats use the
//! shortest round-trip form with `.0` on integral values, and `null` is
//! written for absent optionals. Two nodes serialising the same logical
//! block always produce the same bytes.

use qnode_types::canonical_float;
use serde::Serialize;
use serde_json::Value;

/// Canonical JSON encoding of any serializable value.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    let mut out = String::new();
    write_value(&mut out, &value);
    Ok(out)
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                out.push_str(&i.to_string());
            } else if let Some(u) = n.as_u64() {
                out.push_str(&u.to_string());
            } else if let Some(f) = n.as_f64() {
                out.push_str(&canonical_float(f));
            }
        }
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_string(out, key);
                out.push_str(": ");
                write_value(out, &map[key]);
            }
            out.push('}');
        }
    }
}

/// JSON string literal with non-ASCII escaped as `\uXXXX`.
fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            c => {
                let mut buf = [0u16; 2];
                for unit in c.encode_utf16(&mut buf) {
                    out.push_str(&format!("\\u{unit:04x}"));
                }
            }
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_sorted_with_spaced_separators() {
        let v = json!({"b": 1, "a": [1.0, 2.5], "c": null});
        assert_eq!(
            to_canonical_json(&v).unwrap(),
            r#"{"a": [1.0, 2.5], "b": 1, "c": null}"#
        );
    }

    #[test]
    fn nested_objects_are_sorted() {
        let v = json!({"z": {"y": true, "x": "s"}});
        assert_eq!(
            to_canonical_json(&v).unwrap(),
            r#"{"z": {"x": "s", "y": true}}"#
        );
    }

    #[test]
    fn non_ascii_is_escaped() {
        let v = json!("é\"");
        assert_eq!(to_canonical_json(&v).unwrap(), r#""\u00e9\"""#);
    }
}

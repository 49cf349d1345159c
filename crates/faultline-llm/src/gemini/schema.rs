//! Response schema cleanup for Gemini

/// JSON Schema keywords outside Gemini's OpenAPI subset.
/// Sending any of them fails the request with INVALID_ARGUMENT.
const UNSUPPORTED_KEYWORDS: &[&str] = &["default", "additionalProperties", "$schema"];

/// Remove unsupported keywords from every schema node.
///
/// Keys of a `properties` map are field names, not keywords, so a field
/// called `default` survives; only the schemas under it are cleaned.
pub(crate) fn strip_unsupported_schema_fields(value: &mut serde_json::Value) {
    let node = match value {
        serde_json::Value::Object(node) => node,
        serde_json::Value::Array(list) => {
            list.iter_mut().for_each(strip_unsupported_schema_fields);
            return;
        }
        _ => return,
    };

    for keyword in UNSUPPORTED_KEYWORDS {
        node.remove(*keyword);
    }

    for (key, child) in node.iter_mut() {
        match key.as_str() {
            "properties" => {
                if let Some(fields) = child.as_object_mut() {
                    fields.values_mut().for_each(strip_unsupported_schema_fields);
                }
            }
            // enum values and required names are data, not schemas
            "enum" | "required" | "description" => {}
            _ => strip_unsupported_schema_fields(child),
        }
    }
}

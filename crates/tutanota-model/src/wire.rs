//! Translation between the numeric-id wire shape and named fields.
//!
//! Instances stay numeric-keyed throughout the client core; the named form
//! only exists at the edges (service responses, display output). Values are
//! duck-typed `serde_json::Value`s: any attribute may arrive as its value,
//! as `null`, or wrapped in a one-element array, at any nesting depth.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::{Map, Value};

use crate::{ModelError, TypeModel};

/// A wire or decrypted instance: numeric-id (as text) to untyped value.
pub type Instance = Map<String, Value>;

/// Unwrap the single-element-array tolerance: `[x]` yields `x`, anything
/// else (including `null` and longer arrays) is returned as-is.
pub fn unwrap_single_element_array(value: &Value) -> &Value {
    match value {
        Value::Array(items) if items.len() == 1 => &items[0],
        other => other,
    }
}

/// Build a request body keyed by numeric attribute id from named fields.
///
/// Every name must exist on the type model; the wire rejects bodies with
/// unknown ids, so failing early beats a server-side 400.
pub fn encode_request(
    model: &'static TypeModel,
    fields: &[(&str, Value)],
) -> Result<Instance, ModelError> {
    let mut body = Map::with_capacity(fields.len());
    for (name, value) in fields {
        let id = model
            .attribute_id(name)
            .ok_or_else(|| ModelError::UnknownAttribute {
                type_name: model.name,
                attribute: (*name).to_owned(),
            })?;
        body.insert(id.to_string(), value.clone());
    }
    Ok(body)
}

/// Map a numeric-keyed response to named fields.
///
/// Ids the type model does not declare are dropped; those are
/// service-private attributes the client has no business exposing.
pub fn decode_response(model: &'static TypeModel, instance: &Instance) -> Instance {
    let mut named = Map::with_capacity(instance.len());
    for (key, value) in instance {
        let Ok(id) = key.parse::<u32>() else {
            continue;
        };
        if let Some(name) = model.attribute_name(id) {
            named.insert(name.to_owned(), value.clone());
        }
    }
    named
}

/// Fetch an attribute by numeric id.
pub fn attr<'a>(instance: &'a Instance, id: u32) -> Option<&'a Value> {
    instance.get(&id.to_string())
}

/// Fetch a string attribute by numeric id, tolerating the one-element
/// wrapper.
pub fn attr_str<'a>(instance: &'a Instance, id: u32) -> Option<&'a str> {
    attr(instance, id).map(unwrap_single_element_array)?.as_str()
}

/// Normalize a wire value to raw bytes: base64 text or array-of-numbers.
pub fn value_to_bytes(value: &Value) -> Option<Vec<u8>> {
    match unwrap_single_element_array(value) {
        Value::String(s) => STANDARD.decode(s).ok(),
        Value::Array(numbers) => numbers
            .iter()
            .map(|n| n.as_u64().and_then(|n| u8::try_from(n).ok()))
            .collect(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::registry::{MAILBOX_GROUP_ROOT, SALT_DATA};

    #[test]
    fn unwrap_only_touches_single_element_arrays() {
        let single = json!(["x"]);
        assert_eq!(unwrap_single_element_array(&single), &json!("x"));

        let pair = json!(["x", "y"]);
        assert_eq!(unwrap_single_element_array(&pair), &pair);

        let null = Value::Null;
        assert_eq!(unwrap_single_element_array(&null), &Value::Null);

        let scalar = json!(7);
        assert_eq!(unwrap_single_element_array(&scalar), &scalar);
    }

    #[test]
    fn encodes_requests_by_numeric_id() {
        let body = encode_request(
            &SALT_DATA,
            &[
                ("_format", json!("0")),
                ("mailAddress", json!("alice@example.com")),
            ],
        )
        .unwrap();
        assert_eq!(body.get("418"), Some(&json!("0")));
        assert_eq!(body.get("419"), Some(&json!("alice@example.com")));
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn rejects_unknown_request_fields() {
        let err = encode_request(&SALT_DATA, &[("nonsense", json!(1))]).unwrap_err();
        assert!(matches!(err, ModelError::UnknownAttribute { .. }));
    }

    #[test]
    fn decodes_responses_and_strips_private_ids() {
        let mut instance = Instance::new();
        instance.insert("699".into(), json!("mailbox-id"));
        instance.insert("696".into(), json!("0"));
        instance.insert("999999".into(), json!("server private"));
        instance.insert("oddkey".into(), json!("not numeric"));

        let named = decode_response(&MAILBOX_GROUP_ROOT, &instance);
        assert_eq!(named.get("mailbox"), Some(&json!("mailbox-id")));
        assert_eq!(named.get("_format"), Some(&json!("0")));
        assert_eq!(named.len(), 2);
    }

    #[test]
    fn bytes_normalize_from_either_shape() {
        assert_eq!(value_to_bytes(&json!("AQID")).unwrap(), vec![1, 2, 3]);
        assert_eq!(value_to_bytes(&json!([1, 2, 3])).unwrap(), vec![1, 2, 3]);
        assert_eq!(value_to_bytes(&json!(["AQID"])).unwrap(), vec![1, 2, 3]);
        assert!(value_to_bytes(&json!(true)).is_none());
    }
}

use serde_json::Value;

use crate::ModelError;

/// Address of a list-typed entity: the containing list plus the element
/// within it. Crosses the wire as a two-element string array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdTuple {
    /// The containing list.
    pub list_id: String,
    /// The element within the list.
    pub element_id: String,
}

impl IdTuple {
    /// Parse the wire form `[listId, elementId]`.
    pub fn from_wire(value: &Value) -> Result<Self, ModelError> {
        let parts = value
            .as_array()
            .ok_or(ModelError::MalformedId("expected a two-element array"))?;
        match parts.as_slice() {
            [Value::String(list_id), Value::String(element_id)] => Ok(Self {
                list_id: list_id.clone(),
                element_id: element_id.clone(),
            }),
            _ => Err(ModelError::MalformedId("expected two string ids")),
        }
    }
}

impl std::fmt::Display for IdTuple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.list_id, self.element_id)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_wire_tuple() {
        let id = IdTuple::from_wire(&json!(["list", "element"])).unwrap();
        assert_eq!(id.list_id, "list");
        assert_eq!(id.element_id, "element");
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(IdTuple::from_wire(&json!("flat")).is_err());
        assert!(IdTuple::from_wire(&json!(["one"])).is_err());
        assert!(IdTuple::from_wire(&json!([1, 2])).is_err());
    }
}

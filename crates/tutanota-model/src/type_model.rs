use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::Value;

use crate::ModelError;

/// Scalar type a value attribute declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// UTF-8 text.
    String,
    /// Integer, textual on the wire.
    Number,
    /// Milliseconds since the epoch, textual on the wire.
    Date,
    /// `"0"` is false, everything else true.
    Boolean,
    /// Raw bytes, base64 on the wire.
    Bytes,
    /// UTF-8 text stored compressed server-side. The attributes this client
    /// reads arrive uncompressed, so no inflate step is involved.
    CompressedString,
}

impl ValueType {
    /// The value an encrypted attribute materializes as when decryption is
    /// impossible or fails.
    pub fn zero_value(&self) -> Value {
        match self {
            ValueType::String | ValueType::CompressedString => Value::String(String::new()),
            ValueType::Number | ValueType::Date => Value::from(0i64),
            ValueType::Boolean => Value::Bool(false),
            ValueType::Bytes => Value::String(String::new()),
        }
    }

    /// Coerce decrypted plaintext bytes back to this scalar type.
    pub fn coerce(&self, bytes: &[u8]) -> Result<Value, ModelError> {
        if let ValueType::Bytes = self {
            return Ok(Value::String(STANDARD.encode(bytes)));
        }

        let text = std::str::from_utf8(bytes).map_err(|e| ModelError::Coercion {
            value_type: self.name(),
            reason: e.to_string(),
        })?;

        match self {
            ValueType::String | ValueType::CompressedString => Ok(Value::String(text.to_owned())),
            ValueType::Number | ValueType::Date => {
                if text.is_empty() {
                    return Ok(Value::from(0i64));
                }
                text.parse::<i64>()
                    .map(Value::from)
                    .map_err(|e| ModelError::Coercion {
                        value_type: self.name(),
                        reason: e.to_string(),
                    })
            }
            ValueType::Boolean => Ok(Value::Bool(text != "0")),
            ValueType::Bytes => unreachable!("handled above"),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ValueType::String => "String",
            ValueType::Number => "Number",
            ValueType::Date => "Date",
            ValueType::Boolean => "Boolean",
            ValueType::Bytes => "Bytes",
            ValueType::CompressedString => "CompressedString",
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One value attribute of an entity type.
#[derive(Debug, Clone, Copy)]
pub struct ModelValue {
    /// Numeric wire id.
    pub id: u32,
    /// Field name used on the named side of the codec.
    pub name: &'static str,
    /// Declared scalar type.
    pub value_type: ValueType,
    /// Whether the value is wrapped under the instance session key.
    pub encrypted: bool,
}

/// How an association addresses its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    /// A single element id.
    Element,
    /// A list id.
    List,
    /// A `[listId, elementId]` tuple.
    ListElement,
    /// A nested instance (or single-element array of one).
    Aggregation,
}

/// One association attribute of an entity type.
#[derive(Debug, Clone, Copy)]
pub struct ModelAssociation {
    /// Numeric wire id.
    pub id: u32,
    /// Field name used on the named side of the codec.
    pub name: &'static str,
    /// Addressing shape of the target.
    pub kind: AssociationKind,
}

/// Static descriptor of one entity type.
///
/// These are process-lifetime constants; nothing about a type model ever
/// changes at runtime.
#[derive(Debug, Clone, Copy)]
pub struct TypeModel {
    /// Application routing prefix, `sys` or `tutanota`.
    pub app: &'static str,
    /// Type name as it appears in REST paths (lower-cased there).
    pub name: &'static str,
    /// Model version sent as the `v` request header.
    pub version: u32,
    /// Whether instances carry encrypted attributes.
    pub encrypted: bool,
    /// Value attributes by wire id.
    pub values: &'static [ModelValue],
    /// Association attributes by wire id.
    pub associations: &'static [ModelAssociation],
    /// Wire id of `_ownerGroup`, for encrypted types.
    pub owner_group_id: Option<u32>,
    /// Wire id of `_ownerEncSessionKey`, for encrypted types.
    pub owner_enc_session_key_id: Option<u32>,
    /// Wire id of `_ownerKeyVersion`, for encrypted types.
    pub owner_key_version_id: Option<u32>,
}

impl TypeModel {
    /// Look up a value attribute by wire id.
    pub fn value(&self, id: u32) -> Option<&'static ModelValue> {
        self.values.iter().find(|v| v.id == id)
    }

    /// Look up an association attribute by wire id.
    pub fn association(&self, id: u32) -> Option<&'static ModelAssociation> {
        self.associations.iter().find(|a| a.id == id)
    }

    /// Resolve a named attribute (value or association) to its wire id.
    pub fn attribute_id(&self, name: &str) -> Option<u32> {
        self.values
            .iter()
            .map(|v| (v.name, v.id))
            .chain(self.associations.iter().map(|a| (a.name, a.id)))
            .find(|(n, _)| *n == name)
            .map(|(_, id)| id)
    }

    /// Resolve a wire id to its attribute name.
    pub fn attribute_name(&self, id: u32) -> Option<&'static str> {
        self.value(id)
            .map(|v| v.name)
            .or_else(|| self.association(id).map(|a| a.name))
    }
}

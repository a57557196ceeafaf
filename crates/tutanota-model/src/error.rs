use thiserror::Error;

/// Errors from the type-model layer.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A request named an attribute the type model does not declare.
    #[error("Type {type_name} has no attribute named {attribute}")]
    UnknownAttribute {
        /// Entity type being encoded.
        type_name: &'static str,
        /// The offending attribute name.
        attribute: String,
    },

    /// Decrypted bytes could not be coerced to the declared scalar type.
    #[error("Cannot coerce decrypted value to {value_type}: {reason}")]
    Coercion {
        /// Target scalar type name.
        value_type: &'static str,
        /// What went wrong.
        reason: String,
    },

    /// An id value did not have the expected shape.
    #[error("Malformed id: {0}")]
    MalformedId(&'static str),
}

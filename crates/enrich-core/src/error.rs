//! Error types for entity declarations and instances.

use thiserror::Error;

/// Errors raised while declaring entities or manipulating entity instances.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    /// The entity has no description.
    #[error("entity '{entity}' must have a description")]
    MissingEntityDescription { entity: String },

    /// A plain field has no description.
    #[error("field '{field}' in entity '{entity}' must have a description")]
    MissingFieldDescription { entity: String, field: String },

    /// A relationship has no description.
    #[error("relationship '{field}' in entity '{entity}' must have a description")]
    MissingRelationshipDescription { entity: String, field: String },

    /// Two fields (or a field and a relationship) share a name.
    #[error("entity '{entity}' declares '{field}' more than once")]
    DuplicateField { entity: String, field: String },

    /// The field is not declared on the entity.
    #[error("entity '{entity}' has no field '{field}'")]
    UnknownField { entity: String, field: String },

    /// The field is declared but not mutable.
    #[error("field '{field}' in entity '{entity}' is not mutable")]
    ImmutableField { entity: String, field: String },

    /// The value does not match the declared field type.
    #[error("invalid value for '{entity}.{field}': expected {expected}")]
    InvalidFieldValue {
        entity: String,
        field: String,
        expected: String,
    },

    /// An entity instance was built from something other than a JSON object.
    #[error("entity '{entity}' must be built from a JSON object")]
    NotAnObject { entity: String },

    /// A field type name in a model file is not recognized.
    #[error("unknown field type '{0}'")]
    UnknownFieldType(String),
}

//! Error types shared by builders, the relation resolver and the breakdown layer.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FixtureError>;

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("no builder registered for type '{type_name}' in namespace '{namespace}'")]
    NotRegistered {
        namespace: String,
        type_name: String,
    },

    #[error("entity model does not describe type '{0}'")]
    UnknownType(String),

    #[error("{type_name} has no attribute '{field}' yet")]
    MissingAttribute { type_name: String, field: String },

    #[error("{type_name}.{relation} is not set")]
    RelationUnset { type_name: String, relation: String },

    #[error("{type_name}.{relation}[{index}] is out of range (len {len})")]
    IndexOutOfRange {
        type_name: String,
        relation: String,
        index: usize,
        len: usize,
    },

    #[error("{type_name}.{field} is not a relation but was given an entity value")]
    NotARelation { type_name: String, field: String },

    #[error("{type_name}.{relation} is a relation but was given the scalar value {value}")]
    InvalidRelationValue {
        type_name: String,
        relation: String,
        value: String,
    },

    #[error("{type_name}.{relation} holds a single entity but was given {len} entities")]
    CardinalityMismatch {
        type_name: String,
        relation: String,
        len: usize,
    },

    #[error("unsupported value for {field}: {reason}")]
    UnsupportedValue { field: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] serde_yaml_ng::Error),

    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}

impl FixtureError {
    pub(crate) fn missing_attribute(type_name: &str, field: &str) -> Self {
        FixtureError::MissingAttribute {
            type_name: type_name.to_string(),
            field: field.to_string(),
        }
    }

    pub(crate) fn unsupported(field: &str, reason: impl Into<String>) -> Self {
        FixtureError::UnsupportedValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

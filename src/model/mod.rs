//! Entity model provider interface.
//!
//! This module provides:
//! - The [`EntityModel`] trait the engine consults for fields, identifiers and
//!   relationship descriptors
//! - Relationship descriptors with per-side cardinality and foreign-key placement
//! - [`SchemaModel`], a declarative provider built in code or loaded from YAML
//! - [`ModelGraph`], a type dependency graph with topological sorting

mod graph;
mod schema;

pub use graph::*;
pub use schema::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// How many entities one side of a relationship holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    /// At most one related entity
    Single,
    /// Any number of related entities, no duplicates
    Collection,
}

/// Which side of a relationship stores the foreign-key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeySide {
    /// The owning entity holds the column, referencing the target's identifier
    Local,
    /// The target holds the column, referencing the owner's identifier
    Remote,
}

/// Foreign-key column backing a relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub side: KeySide,
    pub column: String,
}

/// One named relationship as seen from the type that declares it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relation attribute name on this type
    pub name: String,
    /// Type on the other side
    pub target: String,
    /// Cardinality of this side
    pub cardinality: Cardinality,
    /// Mirrored relation attribute on the target type, if declared
    pub paired: Option<String>,
    /// Cardinality of the mirrored side
    pub paired_cardinality: Cardinality,
    /// Backing foreign-key column, if any
    pub foreign_key: Option<ForeignKeyRef>,
}

impl Relationship {
    pub fn is_collection(&self) -> bool {
        self.cardinality == Cardinality::Collection
    }

    /// The local foreign-key column, when this side stores one.
    pub fn local_column(&self) -> Option<&str> {
        match &self.foreign_key {
            Some(ForeignKeyRef {
                side: KeySide::Local,
                column,
            }) => Some(column),
            _ => None,
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = match (self.cardinality, self.paired_cardinality) {
            (Cardinality::Single, Cardinality::Single) => "1:1",
            (Cardinality::Single, Cardinality::Collection) => "N:1",
            (Cardinality::Collection, Cardinality::Single) => "1:N",
            (Cardinality::Collection, Cardinality::Collection) => "N:N",
        };
        write!(f, "{} -> {} ({})", self.name, self.target, arrow)
    }
}

/// Source of schema and relationship metadata for entity types.
///
/// Type names are the keys builders are registered under.
pub trait EntityModel {
    /// Whether the model describes `type_name` at all.
    fn has_type(&self, type_name: &str) -> bool;

    /// Simple (non-relation) field names of a type.
    fn fields_of(&self, type_name: &str) -> Vec<String>;

    /// All relationships declared on a type.
    fn relationships_of(&self, type_name: &str) -> Vec<Relationship>;

    /// Name of the identity field of a type.
    fn identifier_field_of(&self, type_name: &str) -> String {
        let _ = type_name;
        "id".to_string()
    }

    /// Table the type's rows are inserted into.
    fn table_name_of(&self, type_name: &str) -> String {
        to_snake_case(type_name)
    }

    /// Look up one relationship by name.
    fn relationship(&self, type_name: &str, name: &str) -> Option<Relationship> {
        self.relationships_of(type_name)
            .into_iter()
            .find(|r| r.name == name)
    }
}

/// `CoWrite` -> `co_write`
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

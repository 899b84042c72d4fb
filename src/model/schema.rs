//! Declarative entity model.
//!
//! A [`SchemaModel`] is assembled from entity type declarations and
//! foreign-key links. Each link yields up to two relationship descriptors:
//! the single-valued side on the type holding the column, and the mirrored
//! side on the referenced type (a collection unless the link is one-to-one).
//!
//! ```yaml
//! types:
//!   - name: Author
//!     fields: [name, alias]
//!   - name: Article
//!     fields: [title, sub_title, is_visible]
//! links:
//!   - child: Article
//!     column: main_author_id
//!     parent: Author
//!     relation: author
//!     backref: articles
//! ```

use super::{
    to_snake_case, Cardinality, EntityModel, ForeignKeyRef, KeySide, Relationship,
};
use crate::error::Result;
use ahash::AHashMap;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Unique identifier for an entity type within a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityTypeId(pub u32);

impl fmt::Display for EntityTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityTypeId({})", self.0)
    }
}

fn default_identifier() -> String {
    "id".to_string()
}

/// Entity type declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityType {
    /// Type name builders are registered under
    pub name: String,
    /// Table name for SQL output (snake_case of the type name when absent)
    #[serde(default)]
    pub table: Option<String>,
    /// Identity field
    #[serde(default = "default_identifier")]
    pub identifier: String,
    /// Simple fields besides the identifier and foreign-key columns
    #[serde(default)]
    pub fields: Vec<String>,
}

impl EntityType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            identifier: default_identifier(),
            fields: Vec::new(),
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn identifier(mut self, field: impl Into<String>) -> Self {
        self.identifier = field.into();
        self
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }
}

/// Foreign key from `child.column` to the identifier of `parent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyLink {
    pub child: String,
    pub column: String,
    pub parent: String,
    /// Single-valued relation attribute on the child
    #[serde(default)]
    pub relation: Option<String>,
    /// Mirrored relation attribute on the parent
    #[serde(default)]
    pub backref: Option<String>,
    /// Parent side holds a single child instead of a collection
    #[serde(default)]
    pub one_to_one: bool,
}

impl ForeignKeyLink {
    pub fn new(
        child: impl Into<String>,
        column: impl Into<String>,
        parent: impl Into<String>,
    ) -> Self {
        Self {
            child: child.into(),
            column: column.into(),
            parent: parent.into(),
            relation: None,
            backref: None,
            one_to_one: false,
        }
    }

    pub fn relation(mut self, name: impl Into<String>) -> Self {
        self.relation = Some(name.into());
        self
    }

    pub fn backref(mut self, name: impl Into<String>) -> Self {
        self.backref = Some(name.into());
        self
    }

    pub fn one_to_one(mut self) -> Self {
        self.one_to_one = true;
        self
    }

    fn parent_cardinality(&self) -> Cardinality {
        if self.one_to_one {
            Cardinality::Single
        } else {
            Cardinality::Collection
        }
    }

    fn child_side(&self) -> Option<Relationship> {
        let name = self.relation.clone()?;
        Some(Relationship {
            name,
            target: self.parent.clone(),
            cardinality: Cardinality::Single,
            paired: self.backref.clone(),
            paired_cardinality: self.parent_cardinality(),
            foreign_key: Some(ForeignKeyRef {
                side: KeySide::Local,
                column: self.column.clone(),
            }),
        })
    }

    fn parent_side(&self) -> Option<Relationship> {
        let name = self.backref.clone()?;
        Some(Relationship {
            name,
            target: self.child.clone(),
            cardinality: self.parent_cardinality(),
            paired: self.relation.clone(),
            paired_cardinality: Cardinality::Single,
            foreign_key: Some(ForeignKeyRef {
                side: KeySide::Remote,
                column: self.column.clone(),
            }),
        })
    }
}

/// On-disk form of a schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaDocument {
    pub types: Vec<EntityType>,
    pub links: Vec<ForeignKeyLink>,
}

/// Entity model assembled from declarations
#[derive(Debug, Clone, Default)]
pub struct SchemaModel {
    /// Map from type name to type ID
    types: AHashMap<String, EntityTypeId>,
    /// Type declarations indexed by EntityTypeId
    entity_types: Vec<EntityType>,
    links: Vec<ForeignKeyLink>,
    /// Relationships declared directly rather than through a link
    extra: AHashMap<String, Vec<Relationship>>,
}

impl SchemaModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, entity_type: EntityType) -> Self {
        self.add_type(entity_type);
        self
    }

    pub fn with_link(mut self, link: ForeignKeyLink) -> Self {
        self.add_link(link);
        self
    }

    pub fn with_relationship(mut self, type_name: &str, relationship: Relationship) -> Self {
        self.add_relationship(type_name, relationship);
        self
    }

    /// Add a type declaration, replacing any earlier one with the same name.
    pub fn add_type(&mut self, entity_type: EntityType) -> EntityTypeId {
        if let Some(&id) = self.types.get(&entity_type.name) {
            self.entity_types[id.0 as usize] = entity_type;
            return id;
        }
        let id = EntityTypeId(self.entity_types.len() as u32);
        self.types.insert(entity_type.name.clone(), id);
        self.entity_types.push(entity_type);
        id
    }

    pub fn add_link(&mut self, link: ForeignKeyLink) {
        self.links.push(link);
    }

    /// Declare a relationship that has no single foreign-key column behind it.
    pub fn add_relationship(&mut self, type_name: &str, relationship: Relationship) {
        self.extra
            .entry(type_name.to_string())
            .or_default()
            .push(relationship);
    }

    pub fn get_type_id(&self, name: &str) -> Option<EntityTypeId> {
        self.types.get(name).copied()
    }

    pub fn entity_type(&self, id: EntityTypeId) -> Option<&EntityType> {
        self.entity_types.get(id.0 as usize)
    }

    pub fn get_type(&self, name: &str) -> Option<&EntityType> {
        self.get_type_id(name).and_then(|id| self.entity_type(id))
    }

    /// Type names in declaration order
    pub fn type_names(&self) -> Vec<String> {
        self.entity_types.iter().map(|t| t.name.clone()).collect()
    }

    pub fn links(&self) -> &[ForeignKeyLink] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.entity_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entity_types.is_empty()
    }

    pub fn from_document(doc: SchemaDocument) -> Self {
        let mut model = Self::new();
        for t in doc.types {
            model.add_type(t);
        }
        for link in doc.links {
            model.add_link(link);
        }
        model
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let doc: SchemaDocument = serde_yaml_ng::from_str(content)?;
        Ok(Self::from_document(doc))
    }

    /// Load a schema document from a YAML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema file: {}", path.display()))?;
        let doc: SchemaDocument = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Invalid schema file: {}", path.display()))?;
        Ok(Self::from_document(doc))
    }
}

impl EntityModel for SchemaModel {
    /// Declared types, and types only mentioned by a link.
    fn has_type(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
            || self
                .links
                .iter()
                .any(|l| l.child == type_name || l.parent == type_name)
    }

    fn fields_of(&self, type_name: &str) -> Vec<String> {
        let mut fields: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            if !fields.iter().any(|f| f == name) {
                fields.push(name.to_string());
            }
        };
        if let Some(t) = self.get_type(type_name) {
            push(t.identifier.as_str());
            t.fields.iter().for_each(|f| push(f.as_str()));
        }
        self.links
            .iter()
            .filter(|l| l.child == type_name)
            .for_each(|l| push(l.column.as_str()));
        fields
    }

    fn relationships_of(&self, type_name: &str) -> Vec<Relationship> {
        let mut out = Vec::new();
        for link in &self.links {
            if link.child == type_name {
                out.extend(link.child_side());
            }
            if link.parent == type_name {
                out.extend(link.parent_side());
            }
        }
        if let Some(extra) = self.extra.get(type_name) {
            out.extend(extra.iter().cloned());
        }
        out
    }

    fn identifier_field_of(&self, type_name: &str) -> String {
        self.get_type(type_name)
            .map(|t| t.identifier.clone())
            .unwrap_or_else(default_identifier)
    }

    fn table_name_of(&self, type_name: &str) -> String {
        self.get_type(type_name)
            .and_then(|t| t.table.clone())
            .unwrap_or_else(|| to_snake_case(type_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blog() -> SchemaModel {
        SchemaModel::new()
            .with_type(EntityType::new("Author").fields(["name", "alias"]))
            .with_type(EntityType::new("Article").fields(["title", "sub_title"]))
            .with_link(
                ForeignKeyLink::new("Article", "main_author_id", "Author")
                    .relation("author")
                    .backref("articles"),
            )
    }

    #[test]
    fn test_link_produces_both_sides() {
        let model = blog();
        let author = model.relationship("Article", "author").unwrap();
        assert_eq!(author.cardinality, Cardinality::Single);
        assert_eq!(author.paired.as_deref(), Some("articles"));
        assert_eq!(author.paired_cardinality, Cardinality::Collection);
        assert_eq!(author.local_column(), Some("main_author_id"));

        let articles = model.relationship("Author", "articles").unwrap();
        assert!(articles.is_collection());
        assert_eq!(articles.paired.as_deref(), Some("author"));
        assert_eq!(
            articles.foreign_key,
            Some(ForeignKeyRef {
                side: KeySide::Remote,
                column: "main_author_id".to_string()
            })
        );
    }

    #[test]
    fn test_fields_include_identifier_and_fk_columns() {
        let model = blog();
        assert_eq!(
            model.fields_of("Article"),
            ["id", "title", "sub_title", "main_author_id"]
        );
        assert_eq!(model.fields_of("Author"), ["id", "name", "alias"]);
    }

    #[test]
    fn test_table_names() {
        let model = blog().with_type(EntityType::new("CoWrite"));
        assert_eq!(model.table_name_of("CoWrite"), "co_write");
        let model = model.with_type(EntityType::new("Author").table("authors"));
        assert_eq!(model.table_name_of("Author"), "authors");
        assert_eq!(model.len(), 3);
    }

    #[test]
    fn test_from_yaml() {
        let model = SchemaModel::from_yaml(
            r#"
types:
  - name: C
  - name: A
    fields: [label]
links:
  - child: A
    column: c_id
    parent: C
    relation: c
    backref: a
    one_to_one: true
"#,
        )
        .unwrap();
        let back = model.relationship("C", "a").unwrap();
        assert_eq!(back.cardinality, Cardinality::Single);
        assert_eq!(model.fields_of("A"), ["id", "label", "c_id"]);
    }
}

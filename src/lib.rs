//! Identifier-stable, relation-consistent test fixtures.
//!
//! Builders are declared per entity type in a [`Namespace`] and instantiated
//! by a [`Registry`]. Each builder hands out sequential identifiers, applies
//! defaults and generators in a deterministic order, and links relations on
//! both sides. The fixtures of a registry can be broken down into tagged
//! JSON (and replayed from it) or into ordered SQL INSERT statements.
//!
//! ```
//! use fixture_upper::model::{EntityType, ForeignKeyLink, SchemaModel};
//! use fixture_upper::{fields, BuilderDecl, Namespace, Registry};
//! use std::rc::Rc;
//!
//! let model = SchemaModel::new()
//!     .with_type(EntityType::new("Author").field("name"))
//!     .with_type(EntityType::new("Article").field("title"))
//!     .with_link(
//!         ForeignKeyLink::new("Article", "main_author_id", "Author")
//!             .relation("author")
//!             .backref("articles"),
//!     );
//! let ns = Namespace::anonymous()
//!     .with_builder(BuilderDecl::new("Author"))
//!     .with_builder(BuilderDecl::new("Article"));
//! let registry = Registry::new(&ns, Rc::new(model)).with_start_id(150);
//!
//! let author = registry.get_upper("Author").unwrap().fixup(fields! {}).unwrap();
//! let article = registry
//!     .get_upper("Article")
//!     .unwrap()
//!     .fixup(fields! { "author" => &author })
//!     .unwrap();
//! assert_eq!(article.get("main_author_id"), Some(150.into()));
//! assert_eq!(author.many("articles"), [article]);
//! ```

pub mod breakdown;
pub mod builder;
pub mod config;
pub mod entity;
pub mod error;
pub mod field;
pub mod model;
pub mod register;
pub mod relation;
pub mod resolve;
pub mod value;

pub use breakdown::json::{breakdown_schema, TaggedFixture};
pub use builder::{Builder, BuilderDecl, BuilderOptions, Fixed, FixupData, FixupOptions};
pub use config::{BuilderConfig, RegistryConfig};
pub use entity::{Entity, WeakEntity};
pub use error::{FixtureError, Result};
pub use field::{inherit, inherit_attr, FieldMap, FieldValue, Generator, Inherit};
pub use model::EntityModel;
pub use register::{Namespace, Registry};
pub use relation::{RelationResolver, RelationTarget};
pub use resolve::{sorted_by_generated_order, FieldResolver};
pub use value::Value;

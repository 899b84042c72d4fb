//! Schemas used throughout the test suites.

use fixture_upper::model::{EntityType, ForeignKeyLink, SchemaModel};
use fixture_upper::{BuilderDecl, Namespace, Registry};
use std::rc::Rc;

/// Blog types in registration order
pub const BLOG_TYPES: &[&str] = &["Author", "Article", "Draft", "CoWrite"];

/// Authors write articles; articles have drafts and co-writes.
///
/// - `Article.author` / `Author.articles` via `Article.main_author_id`
/// - `Draft.article` / `Article.drafts` via `Draft.article_id`
/// - `CoWrite.article` / `Article.co_writes` via `CoWrite.article_id`
/// - `CoWrite.author` / `Author.co_writes` via `CoWrite.author_id`
pub fn blog_model() -> SchemaModel {
    SchemaModel::new()
        .with_type(EntityType::new("Author").fields(["name", "alias"]))
        .with_type(EntityType::new("Article").fields(["title", "sub_title", "is_visible"]))
        .with_type(EntityType::new("Draft").fields(["title", "sub_title"]))
        .with_type(EntityType::new("CoWrite"))
        .with_link(
            ForeignKeyLink::new("Article", "main_author_id", "Author")
                .relation("author")
                .backref("articles"),
        )
        .with_link(
            ForeignKeyLink::new("Draft", "article_id", "Article")
                .relation("article")
                .backref("drafts"),
        )
        .with_link(
            ForeignKeyLink::new("CoWrite", "article_id", "Article")
                .relation("article")
                .backref("co_writes"),
        )
        .with_link(
            ForeignKeyLink::new("CoWrite", "author_id", "Author")
                .relation("author")
                .backref("co_writes"),
        )
}

/// A fresh namespace with an empty-defaults builder for every blog type.
pub fn blog_namespace() -> Namespace {
    let ns = Namespace::anonymous();
    for type_name in BLOG_TYPES {
        ns.register(BuilderDecl::new(*type_name));
    }
    ns
}

/// A registry over [`blog_namespace`] and [`blog_model`].
pub fn blog_registry(start_id: i64) -> Registry {
    Registry::new(&blog_namespace(), Rc::new(blog_model())).with_start_id(start_id)
}

/// One link per relationship shape, all on type `A`:
///
/// - `A.b` -> `B`, mirrored as the collection `B.a`
/// - `A.c` -> `C`, mirrored as the single `C.a`
/// - `A.d` -> `D`, mirrored as the collection `D.a`
/// - `A.e`, a collection of `E` whose `E.a` holds the key `E.a_id`
pub fn shapes_model() -> SchemaModel {
    SchemaModel::new()
        .with_type(EntityType::new("A"))
        .with_type(EntityType::new("B"))
        .with_type(EntityType::new("C"))
        .with_type(EntityType::new("D"))
        .with_type(EntityType::new("E"))
        .with_link(ForeignKeyLink::new("A", "b_id", "B").relation("b").backref("a"))
        .with_link(
            ForeignKeyLink::new("A", "c_id", "C")
                .relation("c")
                .backref("a")
                .one_to_one(),
        )
        .with_link(ForeignKeyLink::new("A", "d_id", "D").relation("d").backref("a"))
        .with_link(ForeignKeyLink::new("E", "a_id", "A").relation("a").backref("e"))
}

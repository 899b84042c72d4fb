//! Tests for loading registry configuration from YAML.

use fixture_upper::model::SchemaModel;
use fixture_upper::{fields, Namespace, Registry, RegistryConfig, Value};
use std::fs;
use std::rc::Rc;
use tempfile::TempDir;
use test_models::blog_model;

const CONFIG: &str = r#"
start_id: 150
all_fixtures_order: [Author, Article]
builders:
  Author:
    defaults:
      name: Default Name
  Article:
    start_id: 250
    generated_field_order: [author, title]
    defaults:
      is_visible: false
"#;

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fixtures.yaml");
    fs::write(&path, CONFIG).unwrap();

    let config = RegistryConfig::load(&path).unwrap();
    assert_eq!(config.start_id, 150);
    assert_eq!(config.all_fixtures_order, ["Author", "Article"]);
    assert_eq!(config.builders.len(), 2);
}

#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().unwrap();
    assert!(RegistryConfig::load(&dir.path().join("missing.yaml")).is_err());
}

#[test]
fn test_registry_from_config() {
    let config = RegistryConfig::from_yaml(CONFIG).unwrap();
    let ns = Namespace::anonymous();
    let registry = Registry::from_config(&ns, Rc::new(blog_model()), &config).unwrap();

    let author = registry.get_upper("Author").unwrap().fixup(fields! {}).unwrap();
    assert_eq!(author.id(), Value::Int(150));
    assert_eq!(author.get("name"), Some(Value::from("Default Name")));

    let articles = registry.get_upper("Article").unwrap();
    assert_eq!(articles.generated_field_order(), ["author", "title"]);
    let article = articles.fixup(fields! { "author" => &author }).unwrap();
    assert_eq!(article.id(), Value::Int(250));
    assert_eq!(article.get("is_visible"), Some(Value::Bool(false)));

    assert_eq!(registry.sorted_fixtures_key("Author"), "0000_Author");
}

#[test]
fn test_config_updates_existing_declaration() {
    let ns = test_models::blog_namespace();
    ns.register(
        fixture_upper::BuilderDecl::new("Author")
            .default_value("alias", "kept")
            .start_id(10),
    );
    let config = RegistryConfig::from_yaml(
        r#"
builders:
  Author:
    defaults:
      name: configured
"#,
    )
    .unwrap();
    ns.apply_config(&config, &blog_model()).unwrap();

    let decl = ns.decl("Author").unwrap();
    assert_eq!(decl.start_id, Some(10));
    assert!(decl.defaults.contains_key("alias"));
    assert!(decl.defaults.contains_key("name"));
}

#[test]
fn test_dependency_order_from_config() {
    let config = RegistryConfig::from_yaml("dependency_order: true").unwrap();
    let ns = test_models::blog_namespace();
    Registry::from_config(&ns, Rc::new(blog_model()), &config).unwrap();
    assert_eq!(
        ns.all_fixtures_order(),
        ["Author", "Article", "Draft", "CoWrite"]
    );
}

#[test]
fn test_schema_model_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("schema.yaml");
    fs::write(
        &path,
        r#"
types:
  - name: Author
    fields: [name]
  - name: Article
    table: articles
links:
  - child: Article
    column: main_author_id
    parent: Author
    relation: author
    backref: articles
"#,
    )
    .unwrap();

    let model = SchemaModel::load(&path).unwrap();
    assert_eq!(model.type_names(), ["Author", "Article"]);
    let ns = Namespace::anonymous()
        .with_builder(fixture_upper::BuilderDecl::new("Author"))
        .with_builder(fixture_upper::BuilderDecl::new("Article"));
    let registry = Registry::new(&ns, Rc::new(model));
    let author = registry.get_upper("Author").unwrap().fixup(fields! {}).unwrap();
    registry
        .get_upper("Article")
        .unwrap()
        .fixup(fields! { "author" => &author })
        .unwrap();
    assert_eq!(
        registry.breakdown_to_sql(&registry.get_all_fixtures()),
        "INSERT INTO articles (id, main_author_id) VALUES\n(1, 1);\n\nINSERT INTO author (id) VALUES\n(1);"
    );
}

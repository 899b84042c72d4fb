//! Integration tests for builders: identifiers, defaults, relations,
//! inheritance and generator evaluation order.

use fixture_upper::{
    fields, inherit, inherit_attr, Builder, BuilderOptions, Entity, FieldValue, FixtureError,
    Fixed, FixupOptions, Registry, Value,
};
use test_models::blog_registry;

struct Blog {
    registry: Registry,
    au_fu: Builder,
    ar_fu: Builder,
    dr_fu: Builder,
    co_fu: Builder,
}

fn setup() -> Blog {
    let _ = env_logger::builder().is_test(true).try_init();
    let registry = blog_registry(150);
    let au_fu = registry.get_upper("Author").unwrap();
    let ar_fu = registry
        .get_upper_with("Article", BuilderOptions::start_id(250))
        .unwrap();
    let dr_fu = registry
        .get_upper_with("Draft", BuilderOptions::start_id(300))
        .unwrap();
    let co_fu = registry
        .get_upper_with("CoWrite", BuilderOptions::start_id(370))
        .unwrap();
    Blog {
        registry,
        au_fu,
        ar_fu,
        dr_fu,
        co_fu,
    }
}

fn text(s: &str) -> Option<Value> {
    Some(Value::from(s))
}

fn assert_relations_and_ids(author: &Entity, article: &Entity) {
    assert_eq!(author.nth("articles", 0).unwrap(), *article);
    assert_eq!(article.one("author").as_ref(), Some(author));
    assert_eq!(article.get("main_author_id"), Some(author.id()));
}

// =============================================================================
// Identifiers and defaults
// =============================================================================

#[test]
fn test_get_upper_returns_cached_builder() {
    let blog = setup();
    let again = blog.registry.get_upper("Author").unwrap();
    again.fixup(fields! {}).unwrap();
    assert_eq!(blog.au_fu.fixtures().len(), 1);
    assert_eq!(blog.registry.uppers().len(), 4);
}

#[test]
fn test_fixes_up_fixture() {
    let blog = setup();
    let fixture = blog.au_fu.fixup(fields! {}).unwrap();
    assert_eq!(blog.au_fu.fixtures(), [fixture.clone()]);
    assert_eq!(fixture.id(), Value::Int(150));
    assert_eq!(fixture.get("name"), None);
    assert!(matches!(
        fixture.require("name"),
        Err(FixtureError::MissingAttribute { .. })
    ));
}

#[test]
fn test_sets_data() {
    let blog = setup();
    let fixture = blog.au_fu.fixup(fields! { "name" => "Test Name" }).unwrap();
    assert_eq!(fixture.get("name"), text("Test Name"));
}

#[test]
fn test_sets_data_with_default() {
    let blog = setup();
    blog.au_fu.set_default("name", "Default Name");
    let fixture = blog.au_fu.fixup(fields! {}).unwrap();
    assert_eq!(fixture.get("name"), text("Default Name"));
}

#[test]
fn test_sets_data_with_default_function() {
    let blog = setup();
    blog.au_fu.set_default(
        "name",
        FieldValue::generate(|fixture, key| {
            Ok(format!("{}: Author with id {}", key, fixture.id()).into())
        }),
    );

    let fixture = blog.au_fu.fixup(fields! {}).unwrap();
    assert_eq!(fixture.get("name"), text("name: Author with id 150"));

    let fixture = blog.au_fu.fixup(fields! {}).unwrap();
    assert_eq!(fixture.get("name"), text("name: Author with id 151"));
}

#[test]
fn test_sets_data_with_lazy_default() {
    let blog = setup();
    blog.au_fu
        .set_default("alias", FieldValue::lazy(|| Ok("anonymous".into())));
    let fixture = blog.au_fu.fixup(fields! {}).unwrap();
    assert_eq!(fixture.get("alias"), text("anonymous"));
}

#[test]
fn test_sets_data_with_new_defaults() {
    let blog = setup();
    blog.au_fu.set_defaults(fields! {
        "name" => "Default Name",
        "alias" => "Default Alias",
    });
    let options = FixupOptions::default().defaults(fields! { "name" => "New Default Name" });
    let fixture = blog
        .au_fu
        .fixup_with(fields! {}, &options)
        .unwrap()
        .one()
        .unwrap();
    assert_eq!(fixture.get("name"), text("New Default Name"));
    assert_eq!(fixture.get("alias"), None);
}

#[test]
fn test_sets_data_with_default_overrides() {
    let blog = setup();
    blog.au_fu.set_defaults(fields! {
        "name" => "Default Name",
        "alias" => "Default Alias",
    });
    let options =
        FixupOptions::default().default_overrides(fields! { "name" => "New Default Name" });
    let fixture = blog
        .au_fu
        .fixup_with(fields! {}, &options)
        .unwrap()
        .one()
        .unwrap();
    assert_eq!(fixture.get("name"), text("New Default Name"));
    assert_eq!(fixture.get("alias"), text("Default Alias"));
}

#[test]
fn test_defaults_do_not_leak_between_registries() {
    let blog = setup();
    blog.au_fu.set_default("name", "Only Here");

    let other = blog_registry(1);
    let fixture = other.get_upper("Author").unwrap().fixup(fields! {}).unwrap();
    assert_eq!(fixture.get("name"), None);
}

#[test]
fn test_fixes_up_multiple_fixtures() {
    let blog = setup();
    let fixtures = blog
        .au_fu
        .fixup_many(vec![fields! {}, fields! { "name" => "Test Name 2" }, fields! {}])
        .unwrap();
    assert_eq!(blog.au_fu.fixtures(), fixtures);

    assert_eq!(fixtures[0].get("name"), None);
    assert_eq!(fixtures[0].id(), Value::Int(150));
    assert_eq!(fixtures[1].get("name"), text("Test Name 2"));
    assert_eq!(fixtures[1].id(), Value::Int(151));
    assert_eq!(fixtures[2].get("name"), None);
    assert_eq!(fixtures[2].id(), Value::Int(152));
}

#[test]
fn test_fixup_with_sequence_returns_sequence() {
    let blog = setup();
    let fixed = blog
        .ar_fu
        .fixup_with(vec![fields! {}, fields! {}], &FixupOptions::default())
        .unwrap();
    match fixed {
        Fixed::Many(fixtures) => assert_eq!(fixtures.len(), 2),
        Fixed::One(_) => panic!("expected a sequence"),
    }
}

#[test]
fn test_identifiers_strictly_increase() {
    let blog = setup();
    let ids: Vec<i64> = (0..5)
        .map(|_| blog.dr_fu.fixup(fields! {}).unwrap().id().as_i64().unwrap())
        .collect();
    assert_eq!(ids, [300, 301, 302, 303, 304]);
    assert_eq!(blog.dr_fu.next_id(), 305);
}

#[test]
fn test_explicit_identifier_is_kept_and_advances_counter() {
    let blog = setup();
    let explicit = blog.au_fu.fixup(fields! { "id" => 500 }).unwrap();
    assert_eq!(explicit.id(), Value::Int(500));
    let next = blog.au_fu.fixup(fields! {}).unwrap();
    assert_eq!(next.id(), Value::Int(501));

    let low = blog.au_fu.fixup(fields! { "id" => 7 }).unwrap();
    assert_eq!(low.id(), Value::Int(7));
    assert_eq!(blog.au_fu.next_id(), 502);
}

#[test]
fn test_failed_fixup_is_not_recorded() {
    let blog = setup();
    let result = blog.au_fu.fixup(fields! {
        "name" => FieldValue::generate(|_, _| Err(anyhow::anyhow!("no name").into())),
    });
    assert!(matches!(result, Err(FixtureError::Custom(_))));
    assert!(blog.au_fu.fixtures().is_empty());
    assert_eq!(blog.au_fu.next_id(), 151);
}

// =============================================================================
// Relations
// =============================================================================

#[test]
fn test_sets_relation_one_way() {
    let blog = setup();
    let author = blog.au_fu.fixup(fields! {}).unwrap();
    let article = blog.ar_fu.fixup(fields! { "author" => &author }).unwrap();
    assert_relations_and_ids(&author, &article);
}

#[test]
fn test_sets_relation_other_way() {
    let blog = setup();
    let article = blog.ar_fu.fixup(fields! {}).unwrap();
    let author = blog
        .au_fu
        .fixup(fields! { "articles" => vec![article.clone()] })
        .unwrap();
    assert_relations_and_ids(&author, &article);
}

#[test]
fn test_sets_relation_with_generator_function() {
    let blog = setup();
    let author = blog.au_fu.fixup(fields! {}).unwrap();
    let target = author.clone();
    let article = blog
        .ar_fu
        .fixup(fields! {
            "author" => FieldValue::generate(move |_, _| Ok(target.clone().into())),
        })
        .unwrap();
    assert_relations_and_ids(&author, &article);
}

#[test]
fn test_does_not_set_relation_if_none() {
    let blog = setup();
    let author = blog.au_fu.fixup(fields! {}).unwrap();
    let article = blog
        .ar_fu
        .fixup(fields! { "author" => FieldValue::null() })
        .unwrap();

    assert!(author.many("articles").is_empty());
    assert!(article.one("author").is_none());
    assert_eq!(article.get("main_author_id"), None);
}

#[test]
fn test_does_not_override_relation_if_none() {
    let blog = setup();
    let author = blog.au_fu.fixup(fields! {}).unwrap();
    let article = blog
        .ar_fu
        .fixup(fields! {
            "author" => FieldValue::null(),
            "main_author_id" => 1,
        })
        .unwrap();

    assert!(author.many("articles").is_empty());
    assert!(article.one("author").is_none());
    assert_eq!(article.get("main_author_id"), Some(Value::Int(1)));
}

#[test]
fn test_scalar_for_relation_is_rejected() {
    let blog = setup();
    let result = blog.ar_fu.fixup(fields! { "author" => 3 });
    assert!(matches!(
        result,
        Err(FixtureError::InvalidRelationValue { .. })
    ));
}

#[test]
fn test_entity_for_scalar_is_rejected() {
    let blog = setup();
    let author = blog.au_fu.fixup(fields! {}).unwrap();
    let result = blog.ar_fu.fixup(fields! { "title" => &author });
    assert!(matches!(result, Err(FixtureError::NotARelation { .. })));
}

// =============================================================================
// Inheritance
// =============================================================================

#[test]
fn test_inherit_value() {
    let blog = setup();
    let article = blog
        .ar_fu
        .fixup(fields! { "title" => "some title", "sub_title" => "some sub title" })
        .unwrap();
    let draft = blog
        .dr_fu
        .fixup(fields! { "article" => &article, "title" => inherit("article") })
        .unwrap();
    assert_eq!(draft.get("title"), text("some title"));
}

#[test]
fn test_inherit_value_of_other_key() {
    let blog = setup();
    let article = blog
        .ar_fu
        .fixup(fields! { "title" => "some title", "sub_title" => "some sub title" })
        .unwrap();
    let draft = blog
        .dr_fu
        .fixup(fields! {
            "article" => &article,
            "title" => inherit_attr("article", "sub_title"),
        })
        .unwrap();
    assert_eq!(draft.get("title"), text("some sub title"));
}

#[test]
fn test_inherits_nothing_without_relation() {
    let blog = setup();
    let draft = blog
        .dr_fu
        .fixup(fields! { "title" => inherit_attr("article", "sub_title") })
        .unwrap();
    assert_eq!(draft.get("title"), Some(Value::Null));
}

#[test]
fn test_inherit_related_entity() {
    let blog = setup();
    let author = blog.au_fu.fixup(fields! {}).unwrap();
    let article = blog.ar_fu.fixup(fields! { "author" => &author }).unwrap();
    let draft = blog.dr_fu.fixup(fields! { "article" => &article }).unwrap();

    let co_write = blog
        .co_fu
        .fixup(fields! {
            "article" => draft.one("article"),
            "author" => inherit("article"),
        })
        .unwrap();
    assert_eq!(co_write.one("author").as_ref(), Some(&author));

    let co_write = blog
        .co_fu
        .fixup(fields! {
            "article" => &article,
            "author" => inherit_attr("article", "author"),
        })
        .unwrap();
    assert_eq!(co_write.one("author").as_ref(), Some(&author));
    assert_eq!(co_write.get("author_id"), Some(Value::Int(150)));
}

// =============================================================================
// Evaluation order
// =============================================================================

fn author_with_co_write(blog: &Blog) -> Entity {
    let co_writes = blog.co_fu.fixup_many(vec![fields! {}]).unwrap();
    blog.au_fu.fixup(fields! { "co_writes" => co_writes }).unwrap()
}

#[test]
fn test_sets_relation_with_generator_based_on_static_relation() {
    let blog = setup();
    let author = author_with_co_write(&blog);

    let article = blog
        .ar_fu
        .fixup(fields! {
            "author" => FieldValue::generate(|fixture, _| {
                Ok(fixture.nth("co_writes", 0)?.require_one("author")?.into())
            }),
            "co_writes" => author.many("co_writes"),
        })
        .unwrap();
    assert_relations_and_ids(&author, &article);
}

#[test]
fn test_sets_relation_with_generator_in_one_order() {
    let blog = setup();
    let author = author_with_co_write(&blog);
    blog.ar_fu.set_generated_field_order(["author", "co_writes"]);

    let target = author.clone();
    let article = blog
        .ar_fu
        .fixup(fields! {
            "author" => FieldValue::generate(move |_, _| Ok(target.clone().into())),
            "co_writes" => FieldValue::generate(|fixture, _| {
                Ok(fixture.require_one("author")?.many("co_writes").into())
            }),
        })
        .unwrap();
    assert_relations_and_ids(&author, &article);

    let source = author.clone();
    let result = blog.ar_fu.fixup(fields! {
        "author" => FieldValue::generate(|fixture, _| {
            Ok(fixture.nth("co_writes", 0)?.require_one("author")?.into())
        }),
        "co_writes" => FieldValue::generate(move |_, _| Ok(source.many("co_writes").into())),
    });
    assert!(matches!(result, Err(FixtureError::IndexOutOfRange { .. })));
}

#[test]
fn test_sets_relation_with_generator_in_other_order() {
    let blog = setup();
    let author = author_with_co_write(&blog);
    blog.ar_fu.set_generated_field_order(["co_writes", "author"]);

    let source = author.clone();
    let article = blog
        .ar_fu
        .fixup(fields! {
            "author" => FieldValue::generate(|fixture, _| {
                Ok(fixture.nth("co_writes", 0)?.require_one("author")?.into())
            }),
            "co_writes" => FieldValue::generate(move |_, _| Ok(source.many("co_writes").into())),
        })
        .unwrap();
    assert_relations_and_ids(&author, &article);

    let target = author.clone();
    let result = blog.ar_fu.fixup(fields! {
        "author" => FieldValue::generate(move |_, _| Ok(target.clone().into())),
        "co_writes" => FieldValue::generate(|fixture, _| {
            Ok(fixture.require_one("author")?.many("co_writes").into())
        }),
    });
    assert!(matches!(result, Err(FixtureError::RelationUnset { .. })));
}

fn author_if_titled(author: &Entity) -> FieldValue {
    let author = author.clone();
    FieldValue::generate(move |fixture, _| {
        if fixture.get("title").map_or(true, |t| !t.is_truthy()) {
            return Err(anyhow::anyhow!("title not resolved yet").into());
        }
        Ok(author.clone().into())
    })
}

#[test]
fn test_relation_generator_can_come_after_nonrelated_generator() {
    let blog = setup();
    let author = blog.au_fu.fixup(fields! {}).unwrap();

    blog.ar_fu.set_generated_field_order(["title", "author"]);
    let article = blog
        .ar_fu
        .fixup(fields! {
            "title" => FieldValue::generate(|_, _| Ok("some title".into())),
            "author" => author_if_titled(&author),
        })
        .unwrap();
    assert_relations_and_ids(&author, &article);

    blog.ar_fu.set_generated_field_order(["author", "title"]);
    let result = blog.ar_fu.fixup(fields! {
        "title" => FieldValue::generate(|_, _| Ok("some title".into())),
        "author" => author_if_titled(&author),
    });
    assert!(matches!(result, Err(FixtureError::Custom(_))));
}

#[test]
fn test_attribute_generator_can_come_after_relation_generator() {
    let blog = setup();
    let author = blog.au_fu.fixup(fields! {}).unwrap();
    let title_if_authored = || {
        FieldValue::generate(|fixture, _| {
            fixture.require_one("author")?;
            Ok("some title".into())
        })
    };

    blog.ar_fu.set_generated_field_order(["author", "title"]);
    let target = author.clone();
    let article = blog
        .ar_fu
        .fixup(fields! {
            "author" => FieldValue::generate(move |_, _| Ok(target.clone().into())),
            "title" => title_if_authored(),
        })
        .unwrap();
    assert_relations_and_ids(&author, &article);
    assert_eq!(article.get("title"), text("some title"));

    blog.ar_fu.set_generated_field_order(["title", "author"]);
    let target = author.clone();
    let result = blog.ar_fu.fixup(fields! {
        "author" => FieldValue::generate(move |_, _| Ok(target.clone().into())),
        "title" => title_if_authored(),
    });
    assert!(matches!(result, Err(FixtureError::RelationUnset { .. })));
}

#[test]
fn test_generator_can_nest_fixup_on_same_builder() {
    let blog = setup();
    let authors = blog.au_fu.clone();
    let parent = blog
        .au_fu
        .fixup(fields! {
            "alias" => FieldValue::generate(move |_, _| {
                let other = authors.fixup(fields! { "name" => "nested" })?;
                Ok(format!("after {}", other.id()).into())
            }),
        })
        .unwrap();
    assert_eq!(parent.id(), Value::Int(150));
    assert_eq!(parent.get("alias"), text("after 151"));
    let ids: Vec<Value> = blog.au_fu.fixtures().iter().map(Entity::id).collect();
    assert_eq!(ids, [Value::Int(151), Value::Int(150)]);
}

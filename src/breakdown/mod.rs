//! Breakdown of a registry's fixtures into portable forms.
//!
//! All fixtures of all instantiated builders are ordered by type first and
//! creation second:
//! - a type listed in `all_fixtures_order` sorts by its position in that list
//! - every other type shares the slot after the last listed one and sorts by name
//! - fixtures of one type keep the order their builder created them in
//!
//! [`json`] renders the ordered fixtures as tagged records and replays them;
//! [`sql`] renders them as one INSERT statement per type.

pub mod json;
pub mod sql;

use crate::entity::Entity;
use crate::register::Registry;

/// Composite sort key of a type: zero-padded position, then the type name.
pub fn sort_key(all_fixtures_order: &[String], type_name: &str) -> String {
    let position = all_fixtures_order
        .iter()
        .position(|t| t == type_name)
        .unwrap_or(all_fixtures_order.len());
    format!("{:04}_{}", position, type_name)
}

/// Stable sort of `fixtures` by their type's sort key.
pub fn sort_fixtures(all_fixtures_order: &[String], fixtures: &mut [Entity]) {
    fixtures.sort_by_cached_key(|f| sort_key(all_fixtures_order, &f.type_name()));
}

/// Every fixture in `registry`, in breakdown order.
pub fn sorted_fixtures(registry: &Registry) -> Vec<Entity> {
    let mut fixtures: Vec<Entity> = registry
        .uppers()
        .iter()
        .flat_map(|builder| builder.fixtures())
        .collect();
    sort_fixtures(&registry.namespace().all_fixtures_order(), &mut fixtures);
    fixtures
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(types: &[&str]) -> Vec<String> {
        types.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_sort_key_declared_and_undeclared() {
        let order = order(&["a", "b", "TestModelFixture", "c"]);
        assert_eq!(sort_key(&order, "TestModelFixture"), "0002_TestModelFixture");
        assert_eq!(
            sort_key(&order, "TestNotInOrderModelFixture"),
            "0004_TestNotInOrderModelFixture"
        );
    }

    #[test]
    fn test_sort_is_stable_within_a_type() {
        let mut fixtures = vec![
            Entity::new("Article", "id").with("id", 1),
            Entity::new("Author", "id").with("id", 2),
            Entity::new("Article", "id").with("id", 3),
        ];
        sort_fixtures(&order(&["Author"]), &mut fixtures);
        let ids: Vec<_> = fixtures.iter().map(|f| f.id().as_i64().unwrap()).collect();
        assert_eq!(ids, [2, 1, 3]);
    }
}

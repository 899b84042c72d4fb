//! SQL breakdown: one multi-row INSERT per entity type.
//!
//! ```sql
//! INSERT INTO author (id) VALUES
//! (150),
//! (151);
//! ```
//!
//! Columns are the union of attributes assigned on any fixture of the type,
//! alphabetized; a fixture without a column gets `NULL`.

use super::sort_fixtures;
use crate::entity::Entity;
use crate::model::EntityModel;
use crate::register::Registry;
use std::collections::BTreeSet;

/// Fixtures of one type, in breakdown order
struct TypeGroup {
    type_name: String,
    fixtures: Vec<Entity>,
}

fn group_by_type(fixtures: Vec<Entity>) -> Vec<TypeGroup> {
    let mut groups: Vec<TypeGroup> = Vec::new();
    for fixture in fixtures {
        let type_name = fixture.type_name();
        match groups.iter_mut().find(|g| g.type_name == type_name) {
            Some(group) => group.fixtures.push(fixture),
            None => groups.push(TypeGroup {
                type_name,
                fixtures: vec![fixture],
            }),
        }
    }
    groups
}

fn insert_statement(model: &dyn EntityModel, group: &TypeGroup) -> Option<String> {
    let columns: BTreeSet<String> = group
        .fixtures
        .iter()
        .flat_map(|f| f.attributes().into_keys())
        .collect();
    if columns.is_empty() {
        return None;
    }

    let rows: Vec<String> = group
        .fixtures
        .iter()
        .map(|fixture| {
            let values: Vec<String> = columns
                .iter()
                .map(|column| {
                    fixture
                        .get(column)
                        .map(|v| v.to_sql())
                        .unwrap_or_else(|| "NULL".to_string())
                })
                .collect();
            format!("({})", values.join(", "))
        })
        .collect();

    Some(format!(
        "INSERT INTO {} ({}) VALUES\n{};",
        model.table_name_of(&group.type_name),
        columns.iter().cloned().collect::<Vec<_>>().join(", "),
        rows.join(",\n")
    ))
}

/// INSERT statements for `fixtures`, grouped by type in breakdown order and
/// separated by blank lines.
pub fn breakdown_to_sql(registry: &Registry, fixtures: &[Entity]) -> String {
    let mut ordered = fixtures.to_vec();
    sort_fixtures(&registry.namespace().all_fixtures_order(), &mut ordered);

    group_by_type(ordered)
        .iter()
        .filter_map(|group| insert_statement(registry.model(), group))
        .collect::<Vec<_>>()
        .join("\n\n")
}

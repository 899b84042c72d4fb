//! Tagged JSON breakdown and replay.
//!
//! ```json
//! [
//!   { "__class__": "Article", "__value__": { "id": 250, "main_author_id": 150 } },
//!   { "__class__": "Author", "__value__": { "id": 150 } }
//! ]
//! ```
//!
//! Only scalar attributes are written. Relations are rebuilt on replay from
//! foreign-key columns that match the identifier of a fixture in the
//! registry.

use crate::entity::Entity;
use crate::error::Result;
use crate::field::FieldMap;
use crate::register::Registry;
use crate::relation::RelationResolver;
use crate::value::Value;
use ahash::AHashMap;
use log::{debug, info};
use schemars::{schema_for, JsonSchema, Schema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One fixture in tagged form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TaggedFixture {
    /// Type name the fixture's builder is registered under
    #[serde(rename = "__class__")]
    pub class: String,
    /// Assigned scalar attributes, alphabetized
    #[serde(rename = "__value__")]
    pub value: BTreeMap<String, serde_json::Value>,
}

impl TaggedFixture {
    pub fn from_entity(fixture: &Entity) -> Result<Self> {
        let value: BTreeMap<String, serde_json::Value> = fixture
            .attributes()
            .iter()
            .map(|(field, v)| Ok((field.clone(), v.to_json(field)?)))
            .collect::<Result<_>>()?;
        Ok(Self {
            class: fixture.type_name(),
            value,
        })
    }

    /// The recorded attributes as literal field specifications.
    pub fn to_field_map(&self) -> Result<FieldMap> {
        let mut data = FieldMap::new();
        for (field, json) in &self.value {
            data.insert(field.as_str(), Value::from_json(field, json)?);
        }
        Ok(data)
    }
}

/// Tagged records of `fixtures`, in the given order.
pub fn breakdown(fixtures: &[Entity]) -> Result<Vec<TaggedFixture>> {
    fixtures.iter().map(TaggedFixture::from_entity).collect()
}

/// Pretty-printed tagged records of every fixture in `registry`, in breakdown order.
pub fn get_current_json_breakdown(registry: &Registry) -> Result<String> {
    let records = breakdown(&registry.get_all_fixtures())?;
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Rebuild fixtures from a tagged breakdown, in record order.
///
/// Each record goes through its type's builder, so recorded identifiers are
/// kept and the builders' defaults fill in unrecorded fields. Afterwards,
/// every local foreign key matching a fixture of the referenced type is
/// linked back into a relation.
pub fn fixup_from_json(registry: &Registry, text: &str) -> Result<Vec<Entity>> {
    let records: Vec<TaggedFixture> = serde_json::from_str(text)?;
    let mut produced = Vec::with_capacity(records.len());
    for record in &records {
        let builder = registry.get_upper(&record.class)?;
        produced.push(builder.fixup(record.to_field_map()?)?);
    }

    let relinked = relink(registry, &produced)?;
    info!(
        "Replayed {} fixtures from JSON ({} relations relinked)",
        produced.len(),
        relinked
    );
    Ok(produced)
}

/// Link each unlinked single-valued relation whose foreign-key column
/// references a known fixture. Returns the number of relations linked.
///
/// Targets are looked up among `fixtures` first; fixtures the registry held
/// before the replay only fill identifiers the replay did not produce.
fn relink(registry: &Registry, fixtures: &[Entity]) -> Result<usize> {
    let mut by_id: AHashMap<(String, i64), Entity> = AHashMap::new();
    let earlier = registry.uppers().into_iter().flat_map(|b| b.fixtures());
    for fixture in fixtures.iter().cloned().chain(earlier) {
        if let Some(id) = fixture.id().as_i64() {
            by_id.entry((fixture.type_name(), id)).or_insert(fixture);
        }
    }

    let model = registry.model();
    let resolver = RelationResolver::new(model);
    let mut relinked = 0;
    for fixture in fixtures {
        for rel in model.relationships_of(&fixture.type_name()) {
            let Some(column) = rel.local_column() else {
                continue;
            };
            if fixture.one(&rel.name).is_some() {
                continue;
            }
            let Some(key) = fixture.get(column).and_then(|v| v.as_i64()) else {
                continue;
            };
            if let Some(target) = by_id.get(&(rel.target.clone(), key)) {
                resolver.set_relation(fixture, target, &rel.name)?;
                relinked += 1;
            } else {
                debug!(
                    "{:?}.{} = {} references no known {}",
                    fixture, column, key, rel.target
                );
            }
        }
    }
    Ok(relinked)
}

/// JSON Schema of a tagged breakdown document.
pub fn breakdown_schema() -> Schema {
    schema_for!(Vec<TaggedFixture>)
}

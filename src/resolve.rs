//! Field resolution engine.
//!
//! Decides the order in which one entity's field specifications are
//! evaluated and applies them one at a time. The order is part of the
//! contract: a generator sees every field applied before it and none
//! applied after it.
//!
//! Order:
//! 1. fields named in `generated_field_order`, in that list's order
//! 2. prioritized fields (relation fields with non-lazy values), in insertion order
//! 3. everything else, in insertion order

use crate::entity::Entity;
use crate::error::{FixtureError, Result};
use crate::field::{FieldMap, FieldValue, Inherit};
use crate::model::{EntityModel, Relationship};
use crate::relation::RelationResolver;
use crate::value::Value;
use ahash::AHashSet;
use log::{debug, trace};

/// Field specifications of `data` in evaluation order.
pub fn sorted_by_generated_order<'m>(
    data: &'m FieldMap,
    generated_field_order: &[String],
    other_prioritized: &AHashSet<String>,
) -> Vec<(&'m str, &'m FieldValue)> {
    let mut sorted: Vec<(&'m str, &'m FieldValue)> = Vec::with_capacity(data.len());

    for wanted in generated_field_order {
        if sorted.iter().any(|(k, _)| *k == wanted.as_str()) {
            continue;
        }
        if let Some(entry) = data.iter().find(|(k, _)| *k == wanted.as_str()) {
            sorted.push(entry);
        }
    }

    let in_order = |key: &str| generated_field_order.iter().any(|k| k == key);

    sorted.extend(
        data.iter()
            .filter(|(k, _)| !in_order(*k) && other_prioritized.contains(*k)),
    );
    sorted.extend(
        data.iter()
            .filter(|(k, _)| !in_order(*k) && !other_prioritized.contains(*k)),
    );
    sorted
}

/// A field specification after generators and inherit markers have run.
enum Resolved {
    Value(Value),
    One(Entity),
    Many(Vec<Entity>),
}

pub struct FieldResolver<'a> {
    model: &'a dyn EntityModel,
    generated_field_order: &'a [String],
}

impl<'a> FieldResolver<'a> {
    pub fn new(model: &'a dyn EntityModel, generated_field_order: &'a [String]) -> Self {
        Self {
            model,
            generated_field_order,
        }
    }

    /// Relation fields whose value is already known (entities or explicit null).
    ///
    /// They are applied before other fields outside `generated_field_order`
    /// so that lazy values can read them.
    pub fn prioritized_relations(&self, type_name: &str, data: &FieldMap) -> AHashSet<String> {
        data.iter()
            .filter(|(k, v)| !v.is_lazy() && self.model.relationship(type_name, k).is_some())
            .map(|(k, _)| k.to_string())
            .collect()
    }

    /// Evaluate and apply every entry of `data` to `fixture`, in evaluation order.
    ///
    /// Stops at the first failing field; fields applied before it stay applied.
    pub fn set_fixture_values(&self, data: &FieldMap, fixture: &Entity) -> Result<()> {
        let type_name = fixture.type_name();
        let prioritized = self.prioritized_relations(&type_name, data);
        let order = sorted_by_generated_order(data, self.generated_field_order, &prioritized);
        trace!(
            "{} evaluation order: {:?}",
            type_name,
            order.iter().map(|(k, _)| *k).collect::<Vec<_>>()
        );

        for (field, spec) in order {
            let relationship = self.model.relationship(&type_name, field);
            self.apply(fixture, field, spec, relationship)?;
        }
        Ok(())
    }

    fn apply(
        &self,
        fixture: &Entity,
        field: &str,
        spec: &FieldValue,
        relationship: Option<Relationship>,
    ) -> Result<()> {
        let resolved = evaluate(fixture, field, spec)?;
        let resolver = RelationResolver::new(self.model);

        match (relationship, resolved) {
            (Some(_), Resolved::Value(Value::Null)) => {
                debug!("{:?}.{} explicitly has no relation", fixture, field);
                resolver.clear_relation(fixture, field)
            }
            (Some(_), Resolved::Value(value)) => Err(FixtureError::InvalidRelationValue {
                type_name: fixture.type_name(),
                relation: field.to_string(),
                value: value.to_string(),
            }),
            (Some(_), Resolved::One(target)) => resolver.set_relation(fixture, target, field),
            (Some(_), Resolved::Many(targets)) => resolver.set_relation(fixture, targets, field),
            (None, Resolved::Value(value)) => {
                fixture.set(field, value);
                Ok(())
            }
            (None, Resolved::One(_) | Resolved::Many(_)) => Err(FixtureError::NotARelation {
                type_name: fixture.type_name(),
                field: field.to_string(),
            }),
        }
    }
}

fn evaluate(fixture: &Entity, field: &str, spec: &FieldValue) -> Result<Resolved> {
    let mut current = spec.clone();
    loop {
        current = match current {
            FieldValue::Value(v) => return Ok(Resolved::Value(v)),
            FieldValue::One(e) => return Ok(Resolved::One(e)),
            FieldValue::Many(v) => return Ok(Resolved::Many(v)),
            FieldValue::Generate(generator) => generator.call(fixture, field)?,
            FieldValue::Inherit(inherit) => resolve_inherit(fixture, field, &inherit),
        };
    }
}

/// Read the inherited attribute from the entity behind the source relation.
/// An unset source relation inherits nothing (null).
fn resolve_inherit(fixture: &Entity, field: &str, inherit: &Inherit) -> FieldValue {
    let Some(source) = fixture.one(&inherit.relation) else {
        debug!(
            "{:?}.{} inherits nothing: {} is unset",
            fixture, field, inherit.relation
        );
        return FieldValue::null();
    };
    let attribute = inherit.attribute.as_deref().unwrap_or(field);

    if let Some(value) = source.get(attribute) {
        return FieldValue::Value(value);
    }
    if let Some(related) = source.one(attribute) {
        return FieldValue::One(related);
    }
    let members = source.many(attribute);
    if !members.is_empty() {
        return FieldValue::Many(members);
    }
    FieldValue::null()
}

//! Relation resolver.
//!
//! Writes both ends of a relationship: the relation link on the owner, the
//! mirrored link on each target, and the foreign-key scalar on whichever
//! side stores it. Direction and cardinality come from the
//! [`EntityModel`]'s relationship descriptors.
//!
//! An owner displaced from a one-to-one pairing has its local foreign key
//! reset to null, so no two owners hold the same key.
//!
//! Foreign keys are copied from the identifiers present at link time. An
//! entity whose identifier is assigned after it was linked leaves the
//! previously written foreign key (possibly null) in place.

use crate::entity::Entity;
use crate::error::{FixtureError, Result};
use crate::model::{Cardinality, EntityModel, ForeignKeyRef, KeySide, Relationship};
use crate::value::Value;
use log::{debug, warn};

/// Right-hand side of a relation assignment
#[derive(Debug, Clone)]
pub enum RelationTarget {
    One(Entity),
    Many(Vec<Entity>),
}

impl From<Entity> for RelationTarget {
    fn from(e: Entity) -> Self {
        RelationTarget::One(e)
    }
}

impl From<&Entity> for RelationTarget {
    fn from(e: &Entity) -> Self {
        RelationTarget::One(e.clone())
    }
}

impl From<Vec<Entity>> for RelationTarget {
    fn from(v: Vec<Entity>) -> Self {
        RelationTarget::Many(v)
    }
}

impl From<&[Entity]> for RelationTarget {
    fn from(v: &[Entity]) -> Self {
        RelationTarget::Many(v.to_vec())
    }
}

pub struct RelationResolver<'a> {
    model: &'a dyn EntityModel,
}

impl<'a> RelationResolver<'a> {
    pub fn new(model: &'a dyn EntityModel) -> Self {
        Self { model }
    }

    fn lookup(&self, owner: &Entity, relation: &str) -> Result<Relationship> {
        let type_name = owner.type_name();
        self.model
            .relationship(&type_name, relation)
            .ok_or_else(|| FixtureError::NotARelation {
                type_name,
                field: relation.to_string(),
            })
    }

    /// Link `owner.relation` to `target` and mirror it on the other side.
    ///
    /// Collection sides accumulate without duplicates; single sides are
    /// re-pointed, and the previous target loses its mirrored link.
    pub fn set_relation(
        &self,
        owner: &Entity,
        target: impl Into<RelationTarget>,
        relation: &str,
    ) -> Result<()> {
        let rel = self.lookup(owner, relation)?;
        match (rel.cardinality, target.into()) {
            (Cardinality::Single, RelationTarget::One(target)) => {
                self.link_single(owner, &rel, &target);
            }
            (Cardinality::Single, RelationTarget::Many(mut targets)) => {
                if targets.len() != 1 {
                    return Err(FixtureError::CardinalityMismatch {
                        type_name: owner.type_name(),
                        relation: rel.name,
                        len: targets.len(),
                    });
                }
                let target = targets.remove(0);
                self.link_single(owner, &rel, &target);
            }
            (Cardinality::Collection, RelationTarget::One(member)) => {
                self.link_member(owner, &rel, &member);
            }
            (Cardinality::Collection, RelationTarget::Many(members)) => {
                for member in &members {
                    self.link_member(owner, &rel, member);
                }
            }
        }
        Ok(())
    }

    /// Apply the same assignment from each owner in turn.
    pub fn set_relation_for_each(
        &self,
        owners: &[Entity],
        target: impl Into<RelationTarget>,
        relation: &str,
    ) -> Result<()> {
        let target = target.into();
        for owner in owners {
            self.set_relation(owner, target.clone(), relation)?;
        }
        Ok(())
    }

    /// Unlink `owner.relation` on both sides. Foreign-key scalars are left as they are.
    pub fn clear_relation(&self, owner: &Entity, relation: &str) -> Result<()> {
        let rel = self.lookup(owner, relation)?;
        match rel.cardinality {
            Cardinality::Single => {
                if let Some(previous) = owner.unlink_one(&rel.name) {
                    unmirror(&previous, &rel, owner);
                }
            }
            Cardinality::Collection => {
                for member in owner.many(&rel.name) {
                    owner.unlink_many(&rel.name, &member);
                    unmirror(&member, &rel, owner);
                }
            }
        }
        debug!("cleared {:?}.{}", owner, rel.name);
        Ok(())
    }

    fn link_single(&self, owner: &Entity, rel: &Relationship, target: &Entity) {
        if let Some(previous) = owner.link_one(&rel.name, target) {
            if previous != *target {
                unmirror(&previous, rel, owner);
            }
        }

        match &rel.foreign_key {
            Some(ForeignKeyRef {
                side: KeySide::Local,
                column,
            }) => write_key(owner, column, target),
            Some(ForeignKeyRef {
                side: KeySide::Remote,
                column,
            }) => write_key(target, column, owner),
            None => {}
        }

        if let Some(paired) = &rel.paired {
            match rel.paired_cardinality {
                Cardinality::Collection => {
                    target.link_many(paired, owner);
                }
                Cardinality::Single => {
                    if let Some(displaced) = target.link_one(paired, owner) {
                        if displaced != *owner && displaced.one(&rel.name).as_ref() == Some(target)
                        {
                            displaced.unlink_one(&rel.name);
                            release_key(&displaced, rel);
                        }
                    }
                }
            }
        }
        debug!("linked {:?}.{} -> {:?}", owner, rel.name, target);
    }

    fn link_member(&self, owner: &Entity, rel: &Relationship, member: &Entity) {
        owner.link_many(&rel.name, member);

        match &rel.foreign_key {
            Some(ForeignKeyRef {
                side: KeySide::Remote,
                column,
            }) => write_key(member, column, owner),
            Some(ForeignKeyRef {
                side: KeySide::Local,
                column,
            }) => {
                debug!(
                    "{:?}.{} is a collection; local column {} left untouched",
                    owner, rel.name, column
                );
            }
            None => {}
        }

        if let Some(paired) = &rel.paired {
            match rel.paired_cardinality {
                Cardinality::Single => {
                    if let Some(previous) = member.link_one(paired, owner) {
                        if previous != *owner {
                            previous.unlink_many(&rel.name, member);
                        }
                    }
                }
                Cardinality::Collection => {
                    member.link_many(paired, owner);
                }
            }
        }
        debug!("linked {:?}.{} += {:?}", owner, rel.name, member);
    }
}

/// Remove `owner` from the mirrored side of `rel` on `former`.
fn unmirror(former: &Entity, rel: &Relationship, owner: &Entity) {
    let Some(paired) = &rel.paired else {
        return;
    };
    match rel.paired_cardinality {
        Cardinality::Collection => former.unlink_many(paired, owner),
        Cardinality::Single => {
            if former.one(paired).as_ref() == Some(owner) {
                former.unlink_one(paired);
            }
        }
    }
}

/// Null the local foreign key of an owner displaced from a one-to-one pairing.
fn release_key(displaced: &Entity, rel: &Relationship) {
    if let Some(ForeignKeyRef {
        side: KeySide::Local,
        column,
    }) = &rel.foreign_key
    {
        debug!("{:?}.{} released to NULL", displaced, column);
        displaced.set(column, Value::Null);
    }
}

/// Copy `referenced`'s identifier into `holder.column`.
fn write_key(holder: &Entity, column: &str, referenced: &Entity) {
    let id = referenced.id();
    if id.is_null() {
        warn!(
            "{:?} has no identifier yet; {:?}.{} set to NULL",
            referenced, holder, column
        );
    }
    holder.set(column, id);
}

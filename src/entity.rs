//! Fixture entities.
//!
//! An [`Entity`] is a shared handle to a dynamically shaped record: a type
//! name, the name of its identifier field, the scalar attributes that have
//! been assigned, and relation links to other entities. Builders own the
//! strong handles; links between entities are weak so that the mirrored
//! sides of a relationship never keep each other alive.

use crate::error::{FixtureError, Result};
use crate::value::Value;
use ahash::AHashMap;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

#[derive(Debug)]
struct EntityState {
    type_name: String,
    identifier: String,
    attributes: BTreeMap<String, Value>,
    links: AHashMap<String, Link>,
}

#[derive(Debug)]
enum Link {
    One(WeakEntity),
    Many(Vec<WeakEntity>),
}

/// Shared handle to one fixture. Equality is identity.
#[derive(Clone)]
pub struct Entity(Rc<RefCell<EntityState>>);

/// Non-owning handle used for relation links.
#[derive(Clone)]
pub struct WeakEntity(Weak<RefCell<EntityState>>);

impl WeakEntity {
    pub fn upgrade(&self) -> Option<Entity> {
        self.0.upgrade().map(Entity)
    }
}

impl fmt::Debug for WeakEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(entity) => write!(f, "Weak({:?})", entity),
            None => write!(f, "Weak(<dropped>)"),
        }
    }
}

impl Entity {
    /// Create an empty entity of `type_name` whose identity lives in `identifier`.
    pub fn new(type_name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Entity(Rc::new(RefCell::new(EntityState {
            type_name: type_name.into(),
            identifier: identifier.into(),
            attributes: BTreeMap::new(),
            links: AHashMap::new(),
        })))
    }

    /// Builder-style scalar assignment, handy when wiring entities by hand.
    pub fn with(self, field: &str, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn type_name(&self) -> String {
        self.0.borrow().type_name.clone()
    }

    pub fn identifier_field(&self) -> String {
        self.0.borrow().identifier.clone()
    }

    /// Current identifier, `Value::Null` while unassigned.
    pub fn id(&self) -> Value {
        let state = self.0.borrow();
        state
            .attributes
            .get(&state.identifier)
            .cloned()
            .unwrap_or(Value::Null)
    }

    pub fn get(&self, field: &str) -> Option<Value> {
        self.0.borrow().attributes.get(field).cloned()
    }

    /// Read a scalar that must already have been assigned.
    pub fn require(&self, field: &str) -> Result<Value> {
        let state = self.0.borrow();
        state
            .attributes
            .get(field)
            .cloned()
            .ok_or_else(|| FixtureError::missing_attribute(&state.type_name, field))
    }

    pub fn set(&self, field: &str, value: impl Into<Value>) {
        self.0
            .borrow_mut()
            .attributes
            .insert(field.to_string(), value.into());
    }

    pub fn is_assigned(&self, field: &str) -> bool {
        self.0.borrow().attributes.contains_key(field)
    }

    /// Snapshot of all assigned scalar attributes, alphabetized.
    pub fn attributes(&self) -> BTreeMap<String, Value> {
        self.0.borrow().attributes.clone()
    }

    /// The entity held by a single-valued relation, if any.
    pub fn one(&self, relation: &str) -> Option<Entity> {
        match self.0.borrow().links.get(relation) {
            Some(Link::One(target)) => target.upgrade(),
            _ => None,
        }
    }

    pub fn require_one(&self, relation: &str) -> Result<Entity> {
        self.one(relation).ok_or_else(|| FixtureError::RelationUnset {
            type_name: self.type_name(),
            relation: relation.to_string(),
        })
    }

    /// Members of a collection relation in link order; empty when unset.
    pub fn many(&self, relation: &str) -> Vec<Entity> {
        match self.0.borrow().links.get(relation) {
            Some(Link::Many(members)) => members.iter().filter_map(WeakEntity::upgrade).collect(),
            _ => Vec::new(),
        }
    }

    pub fn nth(&self, relation: &str, index: usize) -> Result<Entity> {
        let members = self.many(relation);
        let len = members.len();
        members
            .into_iter()
            .nth(index)
            .ok_or_else(|| FixtureError::IndexOutOfRange {
                type_name: self.type_name(),
                relation: relation.to_string(),
                index,
                len,
            })
    }

    pub fn ptr_eq(&self, other: &Entity) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakEntity {
        WeakEntity(Rc::downgrade(&self.0))
    }

    /// Point a single-valued relation at `target`, returning the previous target.
    pub(crate) fn link_one(&self, relation: &str, target: &Entity) -> Option<Entity> {
        let previous = self.one(relation);
        self.0
            .borrow_mut()
            .links
            .insert(relation.to_string(), Link::One(target.downgrade()));
        previous
    }

    /// Drop a single-valued relation, returning what it pointed at.
    pub(crate) fn unlink_one(&self, relation: &str) -> Option<Entity> {
        let previous = self.one(relation);
        let mut state = self.0.borrow_mut();
        if let Some(Link::One(_)) = state.links.get(relation) {
            state.links.remove(relation);
        }
        previous
    }

    /// Append `member` to a collection relation. Returns false if already present.
    pub(crate) fn link_many(&self, relation: &str, member: &Entity) -> bool {
        let mut state = self.0.borrow_mut();
        let link = state
            .links
            .entry(relation.to_string())
            .or_insert_with(|| Link::Many(Vec::new()));
        if let Link::One(_) = link {
            *link = Link::Many(Vec::new());
        }
        let Link::Many(members) = link else {
            return false;
        };
        members.retain(|m| m.0.strong_count() > 0);
        if members.iter().any(|m| Weak::ptr_eq(&m.0, &Rc::downgrade(&member.0))) {
            return false;
        }
        members.push(member.downgrade());
        true
    }

    pub(crate) fn unlink_many(&self, relation: &str, member: &Entity) {
        if let Some(Link::Many(members)) = self.0.borrow_mut().links.get_mut(relation) {
            members.retain(|m| !Weak::ptr_eq(&m.0, &Rc::downgrade(&member.0)));
        }
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Entity {}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.borrow();
        match state.attributes.get(&state.identifier) {
            Some(id) => write!(f, "{}({}={})", state.type_name, state.identifier, id),
            None => write!(f, "{}(<no {}>)", state.type_name, state.identifier),
        }
    }
}

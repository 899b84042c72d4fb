//! Per-type fixture builders.
//!
//! A [`Builder`] owns an identifier counter, a defaults table, a field
//! evaluation-order hint and the append-only list of fixtures it produced.
//! Its configuration is copied from a [`BuilderDecl`] when the builder is
//! instantiated, so changing one builder never affects another.

use crate::entity::Entity;
use crate::error::Result;
use crate::field::{FieldMap, FieldValue};
use crate::model::EntityModel;
use crate::resolve::FieldResolver;
use crate::value::Value;
use log::{debug, warn};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Declared builder for one entity type.
#[derive(Debug, Clone, Default)]
pub struct BuilderDecl {
    pub type_name: String,
    /// Overrides the registry-wide start identifier
    pub start_id: Option<i64>,
    pub defaults: FieldMap,
    pub generated_field_order: Vec<String>,
}

impl BuilderDecl {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    pub fn start_id(mut self, start_id: i64) -> Self {
        self.start_id = Some(start_id);
        self
    }

    pub fn defaults(mut self, defaults: FieldMap) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn default_value(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.defaults.insert(key, value);
        self
    }

    pub fn generated_field_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.generated_field_order = order.into_iter().map(Into::into).collect();
        self
    }
}

/// Per-instantiation overrides passed to `Registry::get_upper_with`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuilderOptions {
    pub start_id: Option<i64>,
}

impl BuilderOptions {
    pub fn start_id(start_id: i64) -> Self {
        Self {
            start_id: Some(start_id),
        }
    }
}

/// Per-call defaults handling for `fixup_with`.
///
/// `defaults` replaces the builder's defaults table outright;
/// `default_overrides` shadows only the keys it names. When both are given,
/// the overrides are laid over the replacement table.
#[derive(Debug, Clone, Default)]
pub struct FixupOptions {
    pub defaults: Option<FieldMap>,
    pub default_overrides: Option<FieldMap>,
}

impl FixupOptions {
    pub fn defaults(mut self, defaults: FieldMap) -> Self {
        self.defaults = Some(defaults);
        self
    }

    pub fn default_overrides(mut self, overrides: FieldMap) -> Self {
        self.default_overrides = Some(overrides);
        self
    }
}

/// Input of a fixup call: one field map or a sequence of them.
#[derive(Debug, Clone)]
pub enum FixupData {
    One(FieldMap),
    Many(Vec<FieldMap>),
}

impl From<FieldMap> for FixupData {
    fn from(data: FieldMap) -> Self {
        FixupData::One(data)
    }
}

impl From<Vec<FieldMap>> for FixupData {
    fn from(data: Vec<FieldMap>) -> Self {
        FixupData::Many(data)
    }
}

/// Output of a fixup call, shaped like its input.
#[derive(Debug, Clone, PartialEq)]
pub enum Fixed {
    One(Entity),
    Many(Vec<Entity>),
}

impl Fixed {
    pub fn into_vec(self) -> Vec<Entity> {
        match self {
            Fixed::One(e) => vec![e],
            Fixed::Many(v) => v,
        }
    }

    pub fn one(self) -> Option<Entity> {
        match self {
            Fixed::One(e) => Some(e),
            Fixed::Many(_) => None,
        }
    }
}

struct BuilderState {
    type_name: String,
    identifier: String,
    next_id: i64,
    defaults: FieldMap,
    generated_field_order: Vec<String>,
    fixtures: Vec<Entity>,
}

/// Shared handle to one type's builder within a registry.
#[derive(Clone)]
pub struct Builder {
    state: Rc<RefCell<BuilderState>>,
    model: Rc<dyn EntityModel>,
}

impl Builder {
    pub(crate) fn new(decl: &BuilderDecl, model: Rc<dyn EntityModel>, start_id: i64) -> Self {
        let identifier = model.identifier_field_of(&decl.type_name);
        Self {
            state: Rc::new(RefCell::new(BuilderState {
                type_name: decl.type_name.clone(),
                identifier,
                next_id: start_id,
                defaults: decl.defaults.clone(),
                generated_field_order: decl.generated_field_order.clone(),
                fixtures: Vec::new(),
            })),
            model,
        }
    }

    pub fn type_name(&self) -> String {
        self.state.borrow().type_name.clone()
    }

    /// The identifier the next generated fixture will receive.
    pub fn next_id(&self) -> i64 {
        self.state.borrow().next_id
    }

    /// Every fixture produced so far, in creation order.
    pub fn fixtures(&self) -> Vec<Entity> {
        self.state.borrow().fixtures.clone()
    }

    pub fn defaults(&self) -> FieldMap {
        self.state.borrow().defaults.clone()
    }

    pub fn set_defaults(&self, defaults: FieldMap) {
        self.state.borrow_mut().defaults = defaults;
    }

    pub fn set_default(&self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.state.borrow_mut().defaults.insert(key, value);
    }

    pub fn generated_field_order(&self) -> Vec<String> {
        self.state.borrow().generated_field_order.clone()
    }

    pub fn set_generated_field_order<I, S>(&self, order: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.borrow_mut().generated_field_order = order.into_iter().map(Into::into).collect();
    }

    /// Build one fixture from `data` merged over the builder's defaults.
    pub fn fixup(&self, data: FieldMap) -> Result<Entity> {
        self.single_fixup(data, &FixupOptions::default())
    }

    /// Build one fixture per map, in order.
    pub fn fixup_many(&self, data: Vec<FieldMap>) -> Result<Vec<Entity>> {
        let options = FixupOptions::default();
        data.into_iter()
            .map(|d| self.single_fixup(d, &options))
            .collect()
    }

    pub fn fixup_with(&self, data: impl Into<FixupData>, options: &FixupOptions) -> Result<Fixed> {
        match data.into() {
            FixupData::One(d) => self.single_fixup(d, options).map(Fixed::One),
            FixupData::Many(ds) => ds
                .into_iter()
                .map(|d| self.single_fixup(d, options))
                .collect::<Result<Vec<_>>>()
                .map(Fixed::Many),
        }
    }

    /// Build, resolve and record a single fixture.
    ///
    /// The identifier is taken from `data` when given as a literal, otherwise
    /// drawn from the counter before any other field is resolved, so defaults
    /// and generators can read it. A fixture whose resolution fails is not
    /// recorded, but the identifier it drew stays consumed.
    pub fn single_fixup(&self, data: FieldMap, options: &FixupOptions) -> Result<Entity> {
        let mut merged = self.merged_data(&data, options);
        let (type_name, identifier) = {
            let state = self.state.borrow();
            (state.type_name.clone(), state.identifier.clone())
        };
        let fixture = Entity::new(&type_name, &identifier);

        match merged.get(&identifier) {
            Some(FieldValue::Value(value)) if !value.is_null() => {
                let value = value.clone();
                merged.remove(&identifier);
                self.observe_explicit_id(&value);
                fixture.set(&identifier, value);
            }
            Some(_) => {}
            None => fixture.set(&identifier, self.allocate_id()),
        }

        self.set_fixture_values(&merged, &fixture)?;
        self.state.borrow_mut().fixtures.push(fixture.clone());
        debug!("fixed up {:?}", fixture);
        Ok(fixture)
    }

    /// Resolve `data` onto an existing fixture without recording it.
    pub fn set_fixture_values(&self, data: &FieldMap, fixture: &Entity) -> Result<()> {
        let order = self.generated_field_order();
        FieldResolver::new(self.model.as_ref(), &order).set_fixture_values(data, fixture)
    }

    fn merged_data(&self, data: &FieldMap, options: &FixupOptions) -> FieldMap {
        let mut merged = match &options.defaults {
            Some(defaults) => defaults.clone(),
            None => self.defaults(),
        };
        if let Some(overrides) = &options.default_overrides {
            merged.overlay(overrides);
        }
        merged.overlay(data);
        merged
    }

    fn allocate_id(&self) -> i64 {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        id
    }

    /// Keep generated identifiers ahead of explicitly supplied ones.
    fn observe_explicit_id(&self, value: &Value) {
        let Some(id) = value.as_i64() else {
            return;
        };
        let mut state = self.state.borrow_mut();
        if id >= state.next_id {
            debug!(
                "{}: explicit identifier {} moves the counter to {}",
                state.type_name,
                id,
                id + 1
            );
            state.next_id = id + 1;
        } else if state.fixtures.iter().any(|f| f.id() == *value) {
            warn!(
                "{}: identifier {} is already used by an earlier fixture",
                state.type_name, id
            );
        }
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Builder")
            .field("type_name", &state.type_name)
            .field("next_id", &state.next_id)
            .field("fixtures", &state.fixtures.len())
            .finish()
    }
}

//! Field specifications: what a fixup call or a defaults table says about one field.

use crate::entity::Entity;
use crate::error::Result;
use crate::value::Value;
use smallvec::SmallVec;
use std::fmt;
use std::rc::Rc;

type GeneratorFn = dyn Fn(&Entity, &str) -> Result<FieldValue>;

/// A lazily evaluated field value.
///
/// Called with the entity under construction and the field name, at the
/// moment the field's turn comes in the evaluation order. Fields resolved
/// earlier are visible on the entity; later ones are not.
#[derive(Clone)]
pub struct Generator(Rc<GeneratorFn>);

impl Generator {
    pub fn new(f: impl Fn(&Entity, &str) -> Result<FieldValue> + 'static) -> Self {
        Generator(Rc::new(f))
    }

    pub fn call(&self, fixture: &Entity, field: &str) -> Result<FieldValue> {
        (self.0)(fixture, field)
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Generator(..)")
    }
}

/// Copy an attribute from whatever entity a single-valued relation points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inherit {
    pub relation: String,
    /// Attribute to read on the related entity; the field's own name when `None`.
    pub attribute: Option<String>,
}

/// Inherit the same-named attribute from the entity behind `relation`.
pub fn inherit(relation: &str) -> FieldValue {
    FieldValue::Inherit(Inherit {
        relation: relation.to_string(),
        attribute: None,
    })
}

/// Inherit `attribute` from the entity behind `relation`.
pub fn inherit_attr(relation: &str, attribute: &str) -> FieldValue {
    FieldValue::Inherit(Inherit {
        relation: relation.to_string(),
        attribute: Some(attribute.to_string()),
    })
}

/// One field specification.
///
/// `Value(Value::Null)` on a relation field means "no relation": the relation
/// is left unset and nothing else on the entity is touched.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Value(Value),
    One(Entity),
    Many(Vec<Entity>),
    Generate(Generator),
    Inherit(Inherit),
}

impl FieldValue {
    /// A generator receiving the entity under construction and the field name.
    pub fn generate(f: impl Fn(&Entity, &str) -> Result<FieldValue> + 'static) -> Self {
        FieldValue::Generate(Generator::new(f))
    }

    /// A zero-argument generator, still evaluated once per entity.
    pub fn lazy(f: impl Fn() -> Result<FieldValue> + 'static) -> Self {
        FieldValue::Generate(Generator::new(move |_, _| f()))
    }

    pub fn null() -> Self {
        FieldValue::Value(Value::Null)
    }

    /// True for values that are only known once the entity is being built.
    pub fn is_lazy(&self) -> bool {
        matches!(self, FieldValue::Generate(_) | FieldValue::Inherit(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Value(Value::Null))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Value(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! impl_from_scalar {
    ($($t:ty),*) => {
        $(
            impl From<$t> for FieldValue {
                fn from(v: $t) -> Self {
                    FieldValue::Value(Value::from(v))
                }
            }
        )*
    };
}

impl_from_scalar!(bool, i32, i64, u32, f64, &str, String);

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        FieldValue::Value(v)
    }
}

impl From<Entity> for FieldValue {
    fn from(e: Entity) -> Self {
        FieldValue::One(e)
    }
}

impl From<&Entity> for FieldValue {
    fn from(e: &Entity) -> Self {
        FieldValue::One(e.clone())
    }
}

impl From<Option<Entity>> for FieldValue {
    fn from(e: Option<Entity>) -> Self {
        e.map(FieldValue::One).unwrap_or_else(FieldValue::null)
    }
}

impl From<Vec<Entity>> for FieldValue {
    fn from(members: Vec<Entity>) -> Self {
        FieldValue::Many(members)
    }
}

impl From<&[Entity]> for FieldValue {
    fn from(members: &[Entity]) -> Self {
        FieldValue::Many(members.to_vec())
    }
}

impl From<Generator> for FieldValue {
    fn from(g: Generator) -> Self {
        FieldValue::Generate(g)
    }
}

impl From<Inherit> for FieldValue {
    fn from(i: Inherit) -> Self {
        FieldValue::Inherit(i)
    }
}

/// Ordered field-name to specification pairs.
///
/// Insertion order is the tie-breaker of the evaluation order, so this is a
/// sequence rather than a hash map. Re-inserting a key replaces its value in
/// place.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    entries: SmallVec<[(String, FieldValue); 8]>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Overlay every entry of `other`, keeping existing positions for shared keys.
    pub fn overlay(&mut self, other: &FieldMap) {
        for (k, v) in other.iter() {
            self.insert(k, v.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// Build a [`FieldMap`] from `key => value` pairs, keeping their order.
///
/// ```
/// use fixture_upper::fields;
///
/// let data = fields! { "title" => "some title", "is_visible" => true };
/// assert_eq!(data.keys().collect::<Vec<_>>(), ["title", "is_visible"]);
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::FieldMap::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::FieldMap::new();
        $(map.insert($key, $value);)+
        map
    }};
}

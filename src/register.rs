//! Upper registry: namespaces of builder declarations and the registries
//! that instantiate builders from them.
//!
//! A [`Namespace`] maps type names to [`BuilderDecl`]s. Namespaces obtained
//! with the same name on one thread are the same table; anonymous namespaces
//! are never shared. A [`Registry`] binds a namespace to an entity model and
//! caches one [`Builder`] per type on first use.

use crate::breakdown;
use crate::builder::{Builder, BuilderDecl, BuilderOptions};
use crate::config::RegistryConfig;
use crate::entity::Entity;
use crate::error::{FixtureError, Result};
use crate::model::{EntityModel, ModelGraph};
use ahash::AHashMap;
use log::{debug, info, warn};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

thread_local! {
    static NAMESPACES: RefCell<AHashMap<String, Namespace>> = RefCell::new(AHashMap::new());
    static ANONYMOUS_SEQ: Cell<u64> = const { Cell::new(0) };
}

struct NamespaceState {
    name: String,
    /// Declarations in registration order
    decls: Vec<BuilderDecl>,
    all_fixtures_order: Vec<String>,
}

/// Shared table of builder declarations keyed by type name.
#[derive(Clone)]
pub struct Namespace(Rc<RefCell<NamespaceState>>);

impl Namespace {
    fn with_name(name: String) -> Self {
        Namespace(Rc::new(RefCell::new(NamespaceState {
            name,
            decls: Vec::new(),
            all_fixtures_order: Vec::new(),
        })))
    }

    /// The namespace registered under `name`, created on first use.
    pub fn named(name: &str) -> Self {
        NAMESPACES.with(|table| {
            table
                .borrow_mut()
                .entry(name.to_string())
                .or_insert_with(|| {
                    debug!("created namespace {}", name);
                    Namespace::with_name(name.to_string())
                })
                .clone()
        })
    }

    /// A fresh namespace no other caller can obtain by name.
    pub fn anonymous() -> Self {
        let seq = ANONYMOUS_SEQ.with(|c| {
            let n = c.get();
            c.set(n + 1);
            n
        });
        Namespace::with_name(format!("<anonymous #{}>", seq))
    }

    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    /// Declare the builder for `decl.type_name`, replacing an earlier declaration.
    pub fn register(&self, decl: BuilderDecl) {
        let mut state = self.0.borrow_mut();
        info!(
            "Registered builder for {} in namespace {}",
            decl.type_name, state.name
        );
        match state
            .decls
            .iter_mut()
            .find(|d| d.type_name == decl.type_name)
        {
            Some(existing) => *existing = decl,
            None => state.decls.push(decl),
        }
    }

    pub fn with_builder(self, decl: BuilderDecl) -> Self {
        self.register(decl);
        self
    }

    /// Registered type names in registration order
    pub fn type_names(&self) -> Vec<String> {
        self.0
            .borrow()
            .decls
            .iter()
            .map(|d| d.type_name.clone())
            .collect()
    }

    pub fn is_registered(&self, type_name: &str) -> bool {
        self.0.borrow().decls.iter().any(|d| d.type_name == type_name)
    }

    pub fn decl(&self, type_name: &str) -> Option<BuilderDecl> {
        self.0
            .borrow()
            .decls
            .iter()
            .find(|d| d.type_name == type_name)
            .cloned()
    }

    pub fn all_fixtures_order(&self) -> Vec<String> {
        self.0.borrow().all_fixtures_order.clone()
    }

    pub fn set_all_fixtures_order<I, S>(&self, order: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.borrow_mut().all_fixtures_order = order.into_iter().map(Into::into).collect();
    }

    /// Order breakdowns so referenced types come before referencing ones.
    ///
    /// Types caught in a foreign-key cycle are appended in registration order.
    pub fn use_dependency_order(&self, model: &dyn EntityModel) {
        let types = self.type_names();
        let graph = ModelGraph::from_model(model, &types);
        let result = graph.topo_sort();
        if !result.cyclic_types.is_empty() {
            warn!(
                "{}: cyclic type dependencies among {:?}",
                self.name(),
                result.cyclic_types
            );
        }
        let self_referencing = graph.self_referencing_types();
        if !self_referencing.is_empty() {
            debug!(
                "{}: {:?} reference themselves; their rows keep creation order",
                self.name(),
                self_referencing
            );
        }
        let order = result.processing_order();
        debug!("{}: dependency order {:?}", self.name(), order);
        self.set_all_fixtures_order(order);
    }

    /// Register or update one builder per configured type and apply the
    /// configured breakdown order.
    pub fn apply_config(&self, config: &RegistryConfig, model: &dyn EntityModel) -> Result<()> {
        for (type_name, builder_config) in &config.builders {
            let configured = builder_config.to_decl(type_name)?;
            let decl = match self.decl(type_name) {
                Some(mut existing) => {
                    if configured.start_id.is_some() {
                        existing.start_id = configured.start_id;
                    }
                    if !configured.generated_field_order.is_empty() {
                        existing.generated_field_order = configured.generated_field_order;
                    }
                    existing.defaults.overlay(&configured.defaults);
                    existing
                }
                None => configured,
            };
            self.register(decl);
        }

        if config.dependency_order {
            self.use_dependency_order(model);
        } else if !config.all_fixtures_order.is_empty() {
            self.set_all_fixtures_order(config.all_fixtures_order.iter().cloned());
        }
        Ok(())
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.borrow();
        f.debug_struct("Namespace")
            .field("name", &state.name)
            .field("types", &state.decls.len())
            .finish()
    }
}

/// One set of builders over a namespace and an entity model.
pub struct Registry {
    namespace: Namespace,
    model: Rc<dyn EntityModel>,
    start_id: i64,
    /// Instantiated builders in instantiation order
    uppers: RefCell<Vec<Builder>>,
}

impl Registry {
    pub fn new(namespace: &Namespace, model: Rc<dyn EntityModel>) -> Self {
        Self {
            namespace: namespace.clone(),
            model,
            start_id: 1,
            uppers: RefCell::new(Vec::new()),
        }
    }

    /// Default start identifier for builders without their own
    pub fn with_start_id(mut self, start_id: i64) -> Self {
        self.start_id = start_id;
        self
    }

    /// Apply `config` to `namespace` and create a registry over it.
    pub fn from_config(
        namespace: &Namespace,
        model: Rc<dyn EntityModel>,
        config: &RegistryConfig,
    ) -> Result<Self> {
        namespace.apply_config(config, model.as_ref())?;
        Ok(Self::new(namespace, model).with_start_id(config.start_id))
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn model(&self) -> &dyn EntityModel {
        self.model.as_ref()
    }

    pub fn start_id(&self) -> i64 {
        self.start_id
    }

    /// The builder for `type_name`, instantiated on first use.
    pub fn get_upper(&self, type_name: &str) -> Result<Builder> {
        self.get_upper_with(type_name, BuilderOptions::default())
    }

    /// Like [`Registry::get_upper`], with instantiation options.
    ///
    /// Options only take effect when the builder is instantiated by this call.
    pub fn get_upper_with(&self, type_name: &str, options: BuilderOptions) -> Result<Builder> {
        if let Some(builder) = self.cached(type_name) {
            if options.start_id.is_some() {
                warn!(
                    "{} builder already instantiated; ignoring {:?}",
                    type_name, options
                );
            }
            return Ok(builder);
        }

        let decl = self
            .namespace
            .decl(type_name)
            .ok_or_else(|| FixtureError::NotRegistered {
                namespace: self.namespace.name(),
                type_name: type_name.to_string(),
            })?;
        if !self.model.has_type(type_name) {
            return Err(FixtureError::UnknownType(type_name.to_string()));
        }

        let start_id = options
            .start_id
            .or(decl.start_id)
            .unwrap_or(self.start_id);
        let builder = Builder::new(&decl, Rc::clone(&self.model), start_id);
        debug!("instantiated {} builder starting at {}", type_name, start_id);
        self.uppers.borrow_mut().push(builder.clone());
        Ok(builder)
    }

    fn cached(&self, type_name: &str) -> Option<Builder> {
        self.uppers
            .borrow()
            .iter()
            .find(|b| b.type_name() == type_name)
            .cloned()
    }

    /// Instantiated builders in instantiation order
    pub fn uppers(&self) -> Vec<Builder> {
        self.uppers.borrow().clone()
    }

    /// Breakdown position of a type, e.g. `0002_Article`.
    pub fn sorted_fixtures_key(&self, type_name: &str) -> String {
        breakdown::sort_key(&self.namespace.all_fixtures_order(), type_name)
    }

    /// Every fixture of every instantiated builder, in breakdown order.
    pub fn get_all_fixtures(&self) -> Vec<Entity> {
        breakdown::sorted_fixtures(self)
    }

    pub fn get_current_json_breakdown(&self) -> Result<String> {
        breakdown::json::get_current_json_breakdown(self)
    }

    pub fn fixup_from_json(&self, text: &str) -> Result<Vec<Entity>> {
        breakdown::json::fixup_from_json(self, text)
    }

    pub fn breakdown_to_sql(&self, fixtures: &[Entity]) -> String {
        breakdown::sql::breakdown_to_sql(self, fixtures)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("namespace", &self.namespace)
            .field("start_id", &self.start_id)
            .field("uppers", &self.uppers.borrow())
            .finish()
    }
}

//! Type dependency graph for foreign-key-aware fixture ordering.
//!
//! Provides:
//! - Dependency graph construction from local foreign keys
//! - Topological sorting so referenced types come before referencing ones
//! - Cycle detection for types that reference each other

use super::{EntityModel, EntityTypeId};
use std::collections::VecDeque;

/// Dependency graph over a set of entity types.
///
/// A parent is a type referenced by another type's foreign key; a child is a
/// type holding a foreign key. Inserting parents first keeps every
/// foreign-key value pointing at an already inserted row.
#[derive(Debug)]
pub struct ModelGraph {
    /// Type names indexed by EntityTypeId
    pub types: Vec<String>,
    /// For each type, the types it references
    pub parents: Vec<Vec<EntityTypeId>>,
    /// For each type, the types referencing it
    pub children: Vec<Vec<EntityTypeId>>,
    self_referencing: Vec<bool>,
}

/// Result of topological sort
#[derive(Debug)]
pub struct TopoSortResult {
    /// Types in dependency order (parents before children)
    pub order: Vec<String>,
    /// Types that are part of cycles (could not be ordered)
    pub cyclic_types: Vec<String>,
}

impl TopoSortResult {
    /// Ordered types first, then the cyclic ones in input order.
    pub fn processing_order(self) -> Vec<String> {
        let mut order = self.order;
        order.extend(self.cyclic_types);
        order
    }
}

impl ModelGraph {
    /// Build the graph for `types`, ignoring relationships to types outside the set.
    pub fn from_model(model: &dyn EntityModel, types: &[String]) -> Self {
        let n = types.len();
        let mut parents: Vec<Vec<EntityTypeId>> = vec![Vec::new(); n];
        let mut children: Vec<Vec<EntityTypeId>> = vec![Vec::new(); n];
        let mut self_referencing = vec![false; n];

        let id_of = |name: &str| {
            types
                .iter()
                .position(|t| t == name)
                .map(|i| EntityTypeId(i as u32))
        };

        for (i, type_name) in types.iter().enumerate() {
            let child_id = EntityTypeId(i as u32);
            for rel in model.relationships_of(type_name) {
                if rel.local_column().is_none() {
                    continue;
                }
                let Some(parent_id) = id_of(&rel.target) else {
                    continue;
                };
                if parent_id == child_id {
                    self_referencing[i] = true;
                    continue;
                }
                if !parents[i].contains(&parent_id) {
                    parents[i].push(parent_id);
                }
                if !children[parent_id.0 as usize].contains(&child_id) {
                    children[parent_id.0 as usize].push(child_id);
                }
            }
        }

        Self {
            types: types.to_vec(),
            parents,
            children,
            self_referencing,
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Types with a foreign key to themselves, in input order
    pub fn self_referencing_types(&self) -> Vec<String> {
        self.types
            .iter()
            .zip(&self.self_referencing)
            .filter(|(_, &self_ref)| self_ref)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Perform topological sort using Kahn's algorithm.
    ///
    /// Ties are broken by the order of the input type list.
    pub fn topo_sort(&self) -> TopoSortResult {
        let n = self.len();
        let mut in_degree: Vec<usize> = self.parents.iter().map(Vec::len).collect();

        let mut queue: VecDeque<EntityTypeId> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &deg)| deg == 0)
            .map(|(i, _)| EntityTypeId(i as u32))
            .collect();

        let mut order = Vec::with_capacity(n);
        while let Some(id) = queue.pop_front() {
            order.push(self.types[id.0 as usize].clone());
            for &child in &self.children[id.0 as usize] {
                in_degree[child.0 as usize] -= 1;
                if in_degree[child.0 as usize] == 0 {
                    queue.push_back(child);
                }
            }
        }

        let cyclic_types = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &deg)| deg > 0)
            .map(|(i, _)| self.types[i].clone())
            .collect();

        TopoSortResult {
            order,
            cyclic_types,
        }
    }
}

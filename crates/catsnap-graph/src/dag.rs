//! Dependency graph construction and ordering
//!
//! Nodes are the snapshot's objects, edges point from an object to the
//! objects it depends on. Edges come from each routine's `depends_upon`
//! list plus the structural references records carry (a role's resource
//! queue, a cast's function, a language's handlers and so on).
//!
//! The sequencer emits dependencies before dependents. Cycles are reported,
//! never broken: members of a strongly connected component are emitted
//! together in visitation order.

use catsnap_core::{CatalogContents, CatalogObject, ObjectKey, Oid};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::resolver::NameResolver;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("{object} depends on {dependency}, which is not part of the snapshot")]
    MissingDependency { object: ObjectKey, dependency: String },
}

/// Objects of the snapshot in catalog-reader order
///
/// Built-in types and table row types are not objects; everything else the
/// reader returned is.
pub fn graph_objects(contents: &CatalogContents) -> Vec<CatalogObject> {
    let mut objects = Vec::new();

    objects.extend(contents.resource_queues.iter().cloned().map(CatalogObject::ResourceQueue));
    objects.extend(contents.roles.iter().cloned().map(CatalogObject::Role));
    objects.extend(contents.role_members.iter().cloned().map(CatalogObject::RoleMember));
    objects.extend(contents.tablespaces.iter().cloned().map(CatalogObject::Tablespace));
    objects.extend(contents.languages.iter().cloned().map(CatalogObject::Language));
    objects.extend(
        contents
            .types
            .iter()
            .filter(|ty| ty.is_user_defined())
            .cloned()
            .map(CatalogObject::Type),
    );
    objects.extend(contents.conversions.iter().cloned().map(CatalogObject::Conversion));
    objects.extend(contents.casts.iter().cloned().map(CatalogObject::Cast));
    objects.extend(contents.functions.iter().cloned().map(CatalogObject::Function));
    objects.extend(contents.aggregates.iter().cloned().map(CatalogObject::Aggregate));

    objects
}

/// Dependency-first ordering of a graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sequence {
    pub order: Vec<ObjectKey>,

    /// Member sets of every cycle, each in visitation order
    pub cycles: Vec<Vec<ObjectKey>>,
}

impl Sequence {
    pub fn in_cycle(&self, key: &ObjectKey) -> bool {
        self.cycles.iter().any(|cycle| cycle.contains(key))
    }

    pub fn position(&self, key: &ObjectKey) -> Option<usize> {
        self.order.iter().position(|k| k == key)
    }
}

/// Directed dependency graph over the snapshot's objects
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Nodes in catalog-reader order
    nodes: Vec<ObjectKey>,

    index: HashMap<ObjectKey, usize>,

    /// Forward edges: node -> nodes it depends on, in discovery order
    parents: Vec<Vec<usize>>,

    /// Reverse edges: node -> nodes that depend on it
    children: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Build the graph for `objects`, resolving structural references
    /// through `resolver`
    pub fn build(objects: &[CatalogObject], resolver: &NameResolver) -> Result<Self, GraphError> {
        let mut graph = Self::default();

        for object in objects {
            let key = object.key();
            if graph.index.contains_key(&key) {
                debug!(object = %key, "duplicate object key");
                continue;
            }
            graph.index.insert(key.clone(), graph.nodes.len());
            graph.nodes.push(key);
            graph.parents.push(Vec::new());
            graph.children.push(Vec::new());
        }

        let by_name: HashMap<String, ObjectKey> = graph
            .nodes
            .iter()
            .filter_map(|key| key.qualified_name().map(|name| (name.to_string(), key.clone())))
            .collect();

        for object in objects {
            let key = object.key();

            for dependency in object.depends_upon() {
                let target = by_name.get(dependency).ok_or_else(|| GraphError::MissingDependency {
                    object: key.clone(),
                    dependency: dependency.clone(),
                })?;
                graph.add_edge(&key, target);
            }

            for target in graph.structural_dependencies(object, resolver) {
                graph.add_edge(&key, &target);
            }
        }

        debug!(
            nodes = graph.nodes.len(),
            edges = graph.parents.iter().map(Vec::len).sum::<usize>(),
            "built dependency graph"
        );
        Ok(graph)
    }

    fn structural_dependencies(&self, object: &CatalogObject, resolver: &NameResolver) -> Vec<ObjectKey> {
        let mut keys = Vec::new();
        let mut oids: Vec<Oid> = Vec::new();

        match object {
            CatalogObject::Role(role) => {
                if !role.res_queue.is_empty() {
                    keys.push(ObjectKey::ResourceQueue(role.res_queue.clone()));
                }
            }
            CatalogObject::RoleMember(member) => {
                keys.push(ObjectKey::Role(member.role.clone()));
                keys.push(ObjectKey::Role(member.member.clone()));
                keys.push(ObjectKey::Role(member.grantor.clone()));
            }
            CatalogObject::Language(language) => {
                oids.extend([language.handler_oid, language.inline_oid, language.validator_oid]);
            }
            CatalogObject::Type(ty) => {
                oids.extend(ty.io_functions());
                oids.extend(ty.component_types());
            }
            CatalogObject::Conversion(conversion) => oids.push(conversion.conversion_function_oid),
            CatalogObject::Cast(cast) => {
                oids.extend([cast.function_oid, cast.source_type_oid, cast.target_type_oid]);
            }
            CatalogObject::Function(function) => {
                keys.push(ObjectKey::Language(function.language.clone()));
            }
            CatalogObject::Aggregate(aggregate) => oids.extend(aggregate.component_functions()),
            CatalogObject::ResourceQueue(_) | CatalogObject::Tablespace(_) => {}
        }

        for oid in oids {
            match resolver.resolve(oid) {
                Ok(Some(target)) if target.extracted => keys.push(target.key.clone()),
                Ok(_) => {}
                Err(err) => debug!(object = %object.key(), error = %err, "dropped structural reference"),
            }
        }

        // Only objects of the snapshot are edge targets; built-ins never are
        keys.retain(|key| self.index.contains_key(key));
        keys
    }

    fn add_edge(&mut self, from: &ObjectKey, to: &ObjectKey) {
        let (Some(&from), Some(&to)) = (self.index.get(from), self.index.get(to)) else {
            return;
        };
        if from == to || self.parents[from].contains(&to) {
            return;
        }
        self.parents[from].push(to);
        self.children[to].push(from);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in catalog-reader order
    pub fn nodes(&self) -> &[ObjectKey] {
        &self.nodes
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.index.contains_key(key)
    }

    /// Immediate dependencies of a node
    pub fn parents(&self, key: &ObjectKey) -> Vec<&ObjectKey> {
        self.index
            .get(key)
            .map(|&i| self.parents[i].iter().map(|&p| &self.nodes[p]).collect())
            .unwrap_or_default()
    }

    /// Immediate dependents of a node
    pub fn children(&self, key: &ObjectKey) -> Vec<&ObjectKey> {
        self.index
            .get(key)
            .map(|&i| self.children[i].iter().map(|&c| &self.nodes[c]).collect())
            .unwrap_or_default()
    }

    /// Order every node so that dependencies come first
    ///
    /// Depth-first from each node in catalog-reader order, following edges
    /// in discovery order. Strongly connected components are emitted as
    /// they complete, which puts every component after the components it
    /// depends on.
    pub fn sequence(&self) -> Sequence {
        let n = self.nodes.len();
        let mut visit: Vec<Option<usize>> = vec![None; n];
        let mut low = vec![0usize; n];
        let mut on_stack = vec![false; n];
        let mut stack: Vec<usize> = Vec::new();
        let mut next = 0usize;

        let mut sequence = Sequence::default();

        for root in 0..n {
            if visit[root].is_some() {
                continue;
            }

            // (node, next edge to follow)
            let mut work: Vec<(usize, usize)> = vec![(root, 0)];
            while let Some(&(v, edge)) = work.last() {
                if visit[v].is_none() {
                    visit[v] = Some(next);
                    low[v] = next;
                    next += 1;
                    stack.push(v);
                    on_stack[v] = true;
                }

                if let Some(&w) = self.parents[v].get(edge) {
                    if let Some(top) = work.last_mut() {
                        top.1 = edge + 1;
                    }
                    match visit[w] {
                        None => work.push((w, 0)),
                        Some(w_index) if on_stack[w] => low[v] = low[v].min(w_index),
                        Some(_) => {}
                    }
                    continue;
                }

                work.pop();
                if let Some(&(parent, _)) = work.last() {
                    low[parent] = low[parent].min(low[v]);
                }

                if Some(low[v]) == visit[v] {
                    let mut members = Vec::new();
                    while let Some(w) = stack.pop() {
                        on_stack[w] = false;
                        members.push(w);
                        if w == v {
                            break;
                        }
                    }
                    members.sort_by_key(|&m| visit[m]);

                    let keys: Vec<ObjectKey> = members.iter().map(|&m| self.nodes[m].clone()).collect();
                    if keys.len() > 1 {
                        let names: Vec<String> = keys.iter().map(ToString::to_string).collect();
                        warn!(members = ?names, "dependency cycle");
                        sequence.cycles.push(keys.clone());
                    }
                    sequence.order.extend(keys);
                }
            }
        }

        sequence
    }

    /// Nodes reachable through dependency edges
    pub fn upstream(&self, key: &ObjectKey) -> Vec<ObjectKey> {
        let Some(&start) = self.index.get(key) else {
            return Vec::new();
        };

        let mut visited = HashSet::new();
        let mut pending: Vec<usize> = self.parents[start].iter().rev().copied().collect();
        let mut result = Vec::new();

        while let Some(current) = pending.pop() {
            if current == start || !visited.insert(current) {
                continue;
            }
            result.push(self.nodes[current].clone());
            pending.extend(self.parents[current].iter().rev());
        }

        result
    }
}

// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Dependency graph resolution.
//!
//! Every relation and function carries a set of [`DependencyEdges`]. Direct
//! edges are attached from the dependencies query by [`resolve`]; afterwards
//! [`compute_closures`] derives, for every object, everything it reaches
//! transitively in each direction.
//!
//! ```text
//! CREATE TABLE t (...);
//! CREATE VIEW a AS SELECT * FROM t;
//! CREATE VIEW b AS SELECT * FROM a;
//!
//! b.dependent_on     = [a]      b.dependent_on_all = [a, t]
//! t.dependents       = [a]      t.dependents_all   = [a, b]
//! ```
//!
//! Views and functions may depend on each other cyclically, so traversals
//! keep a visited set and an explicit stack.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::inspector::Catalog;
use crate::row::DependencyRow;
use crate::{InspectError, qualified_signature};

/// The dependency edges of a single object.
///
/// All four lists are kept sorted and free of duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyEdges {
    dependent_on: Vec<String>,
    dependents: Vec<String>,
    dependent_on_all: Vec<String>,
    dependents_all: Vec<String>,
}

impl DependencyEdges {
    /// Qualified names of the objects this object directly references.
    pub fn dependent_on(&self) -> &[String] {
        &self.dependent_on
    }

    /// Qualified names of the objects that directly reference this object.
    pub fn dependents(&self) -> &[String] {
        &self.dependents
    }

    /// Signatures of every object this object transitively references.
    pub fn dependent_on_all(&self) -> &[String] {
        &self.dependent_on_all
    }

    /// Signatures of every object that transitively references this object.
    pub fn dependents_all(&self) -> &[String] {
        &self.dependents_all
    }

    fn add_dependent_on(&mut self, name: &str) {
        insert_sorted(&mut self.dependent_on, name);
    }

    fn add_dependent(&mut self, name: &str) {
        insert_sorted(&mut self.dependents, name);
    }
}

fn insert_sorted(list: &mut Vec<String>, name: &str) {
    if let Err(position) = list.binary_search_by(|probe| probe.as_str().cmp(name)) {
        list.insert(position, name.to_string());
    }
}

/// A directed edge: `dependent` references `dependent_on`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DependencyEdge {
    pub dependent: String,
    pub dependent_on: String,
}

impl DependencyEdge {
    pub fn new(dependent: impl Into<String>, dependent_on: impl Into<String>) -> Self {
        DependencyEdge {
            dependent: dependent.into(),
            dependent_on: dependent_on.into(),
        }
    }
}

impl From<&DependencyRow> for DependencyEdge {
    fn from(row: &DependencyRow) -> Self {
        DependencyEdge {
            dependent: qualified_signature(&row.schema, &row.name, row.identity_arguments.as_deref()),
            dependent_on: qualified_signature(
                &row.schema_dependent_on,
                &row.name_dependent_on,
                row.identity_arguments_dependent_on.as_deref(),
            ),
        }
    }
}

/// Attaches direct edges to the objects of `catalog`.
///
/// # Errors
///
/// Fails on the first edge with an endpoint missing from the catalog. Such an
/// edge means the dependencies query disagrees with the object queries, so it
/// is never skipped.
pub fn resolve<I>(catalog: &mut Catalog, edges: I) -> Result<(), InspectError>
where
    I: IntoIterator<Item = DependencyEdge>,
{
    let mut count = 0;
    for edge in edges {
        for endpoint in [&edge.dependent, &edge.dependent_on] {
            if !catalog.contains_selectable(endpoint) {
                return Err(InspectError::UnknownDependency {
                    dependent: edge.dependent.clone(),
                    dependent_on: edge.dependent_on.clone(),
                    missing: endpoint.clone(),
                });
            }
        }
        if let Some(edges) = catalog.edges_mut(&edge.dependent) {
            edges.add_dependent_on(&edge.dependent_on);
        }
        if let Some(edges) = catalog.edges_mut(&edge.dependent_on) {
            edges.add_dependent(&edge.dependent);
        }
        count += 1;
    }
    debug!(edges = count, "resolved dependency edges");
    Ok(())
}

/// Computes the transitive closures of the direct edges of every object.
///
/// Idempotent: closures are derived only from direct edges, and recomputing
/// them replaces the previous result.
pub fn compute_closures(catalog: &mut Catalog) {
    let keys: Vec<String> = catalog.selectables().map(|(key, _)| key.to_string()).collect();
    let index: BTreeMap<&str, usize> = keys
        .iter()
        .enumerate()
        .map(|(i, key)| (key.as_str(), i))
        .collect();
    let signatures: Vec<String> = catalog.selectables().map(|(_, s)| s.signature()).collect();

    let adjacency = |direction: fn(&DependencyEdges) -> &[String]| -> Vec<Vec<usize>> {
        catalog
            .selectables()
            .map(|(_, s)| {
                direction(s.edges())
                    .iter()
                    .filter_map(|name| index.get(name.as_str()).copied())
                    .collect()
            })
            .collect()
    };
    let forward = adjacency(DependencyEdges::dependent_on);
    let backward = adjacency(DependencyEdges::dependents);

    let closures: Vec<_> = (0..keys.len())
        .map(|start| {
            (
                reachable(start, &forward, &signatures),
                reachable(start, &backward, &signatures),
            )
        })
        .collect();

    for (key, (dependent_on_all, dependents_all)) in keys.iter().zip(closures) {
        if let Some(edges) = catalog.edges_mut(key) {
            edges.dependent_on_all = dependent_on_all;
            edges.dependents_all = dependents_all;
        }
    }
}

/// Returns the sorted, deduplicated signatures of every node reachable from
/// `start`, excluding `start` itself.
fn reachable(start: usize, adjacency: &[Vec<usize>], signatures: &[String]) -> Vec<String> {
    let mut visited = BTreeSet::from([start]);
    let mut found = BTreeSet::new();
    let mut stack = adjacency[start].clone();
    while let Some(node) = stack.pop() {
        if !visited.insert(node) {
            continue;
        }
        found.insert(signatures[node].as_str());
        stack.extend(adjacency[node].iter().copied());
    }
    found.into_iter().map(str::to_string).collect()
}

/// Orders the keys of `catalog` so that every object follows the objects it
/// depends on. Cycles are broken in catalog order.
pub fn creation_order(catalog: &Catalog) -> Vec<String> {
    let keys: Vec<&str> = catalog.selectables().map(|(key, _)| key).collect();
    let mut visited = BTreeSet::new();
    let mut sorted = Vec::with_capacity(keys.len());

    for root in keys {
        if visited.contains(root) {
            continue;
        }
        // Each frame is a node and the index of its next unvisited dependency.
        let mut stack = vec![(root, 0)];
        visited.insert(root);
        while let Some((node, next)) = stack.pop() {
            let deps = catalog
                .selectable(node)
                .map(|s| s.edges().dependent_on())
                .unwrap_or_default();
            match deps.get(next) {
                Some(dep) => {
                    stack.push((node, next + 1));
                    if visited.insert(dep.as_str()) {
                        stack.push((dep.as_str(), 0));
                    }
                }
                None => sorted.push(node.to_string()),
            }
        }
    }
    sorted
}

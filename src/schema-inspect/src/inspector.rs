// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Loading a [`Catalog`] through a [`CatalogClient`].

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::InspectError;
use crate::builder::ObjectBuilder;
use crate::client::CatalogClient;
use crate::deps::{self, DependencyEdge, DependencyEdges};
use crate::desc::{Constraint, Function, Relation, Schema, Selectable};
use crate::group::GroupContiguous;
use crate::query::{CatalogQuery, Dialect, QueryKind};
use crate::row::{CatalogRow, ConstraintRow, DependencyRow, FunctionRow, RelationRow, SchemaRow};

/// Maps a database type name to the name of a type in a host language.
#[derive(Clone)]
pub struct TypeMapping(Arc<dyn Fn(&str) -> String + Send + Sync>);

impl TypeMapping {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        TypeMapping(Arc::new(f))
    }

    /// Uses the database type name as the host type.
    pub fn passthrough() -> Self {
        TypeMapping::new(str::to_string)
    }

    /// Maps common PostgreSQL types to Rust types. Unknown types map to
    /// `"unknown"`.
    pub fn rust() -> Self {
        TypeMapping::new(|db_type| {
            let rust_type = match db_type {
                "boolean" | "bool" => "bool",
                "smallint" | "int2" => "i16",
                "integer" | "int" | "int4" => "i32",
                "bigint" | "int8" => "i64",
                "real" | "float4" => "f32",
                "double precision" | "float8" => "f64",
                "oid" => "u32",
                "text" | "character varying" | "varchar" | "character" | "bpchar" | "name" => {
                    "String"
                }
                "bytea" => "Vec<u8>",
                _ => "unknown",
            };
            rust_type.to_string()
        })
    }

    pub fn map(&self, db_type: &str) -> String {
        (self.0)(db_type)
    }
}

impl Default for TypeMapping {
    fn default() -> Self {
        TypeMapping::passthrough()
    }
}

impl fmt::Debug for TypeMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TypeMapping")
    }
}

/// Configures an [`Inspector`].
#[derive(Debug, Clone, Default)]
pub struct InspectorConfig {
    pub dialect: Dialect,
    /// Whether to load system schemas and objects owned by extensions.
    pub include_internal: bool,
    pub type_mapping: TypeMapping,
}

impl InspectorConfig {
    pub fn new(dialect: Dialect) -> Self {
        InspectorConfig {
            dialect,
            ..Default::default()
        }
    }

    pub fn include_internal(mut self, include_internal: bool) -> Self {
        self.include_internal = include_internal;
        self
    }

    pub fn type_mapping(mut self, type_mapping: TypeMapping) -> Self {
        self.type_mapping = type_mapping;
        self
    }

    fn query(&self, kind: QueryKind) -> CatalogQuery {
        CatalogQuery::new(kind, self.dialect, self.include_internal)
    }
}

/// The objects of a database, as loaded by an [`Inspector`].
///
/// Relations and functions share a single namespace, keyed by signature: a
/// relation's signature is its qualified name, a function's is its qualified
/// name followed by its parenthesized identity arguments. Together they are
/// the catalog's *selectables*.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    dialect: Dialect,
    schemas: IndexMap<String, Schema>,
    relations: IndexMap<String, Relation>,
    functions: IndexMap<String, Function>,
    /// Maps each constraint's qualified name to its relation's.
    constraints: IndexMap<String, String>,
}

impl Catalog {
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn schemas(&self) -> &IndexMap<String, Schema> {
        &self.schemas
    }

    /// Tables and views, keyed by qualified name.
    pub fn relations(&self) -> &IndexMap<String, Relation> {
        &self.relations
    }

    /// Ordinary and partitioned tables.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &Relation)> {
        self.relations
            .iter()
            .filter(|(_, r)| r.kind.is_table())
            .map(|(k, r)| (k.as_str(), r))
    }

    /// Views and materialized views.
    pub fn views(&self) -> impl Iterator<Item = (&str, &Relation)> {
        self.relations
            .iter()
            .filter(|(_, r)| r.kind.is_view())
            .map(|(k, r)| (k.as_str(), r))
    }

    /// Functions, keyed by signature.
    pub fn functions(&self) -> &IndexMap<String, Function> {
        &self.functions
    }

    /// Constraints, keyed by qualified name, in the order they were loaded.
    pub fn constraints(&self) -> impl Iterator<Item = (&str, &Constraint)> {
        self.constraints.iter().filter_map(|(name, table)| {
            let constraint = self.relations.get(table)?.constraints.get(name)?;
            Some((name.as_str(), constraint))
        })
    }

    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        let table = self.constraints.get(name)?;
        self.relations.get(table)?.constraints.get(name)
    }

    /// Relations followed by functions.
    pub fn selectables(&self) -> impl Iterator<Item = (&str, Selectable<'_>)> {
        let relations = self
            .relations
            .iter()
            .map(|(k, r)| (k.as_str(), Selectable::Relation(r)));
        let functions = self
            .functions
            .iter()
            .map(|(k, f)| (k.as_str(), Selectable::Function(f)));
        relations.chain(functions)
    }

    pub fn selectable(&self, key: &str) -> Option<Selectable<'_>> {
        if let Some(relation) = self.relations.get(key) {
            return Some(Selectable::Relation(relation));
        }
        self.functions.get(key).map(Selectable::Function)
    }

    pub fn contains_selectable(&self, key: &str) -> bool {
        self.relations.contains_key(key) || self.functions.contains_key(key)
    }

    /// Selectable keys ordered so that every object follows everything it
    /// depends on.
    pub fn creation_order(&self) -> Vec<String> {
        deps::creation_order(self)
    }

    pub(crate) fn edges_mut(&mut self, key: &str) -> Option<&mut DependencyEdges> {
        if let Some(relation) = self.relations.get_mut(key) {
            return Some(&mut relation.edges);
        }
        self.functions.get_mut(key).map(|f| &mut f.edges)
    }

    /// Adds a relation. Qualified names are unique across relation kinds, so
    /// a second relation under a loaded name is an error.
    pub(crate) fn insert_relation(&mut self, relation: Relation) -> Result<(), InspectError> {
        let key = relation.quoted_full_name();
        if let Some(existing) = self.relations.get(&key) {
            warn!(
                relation = %key,
                existing_kind = %existing.kind,
                kind = %relation.kind,
                "relation loaded twice"
            );
            return Err(InspectError::DuplicateRelation {
                name: key,
                existing: existing.kind,
                duplicate: relation.kind,
            });
        }
        self.relations.insert(key, relation);
        Ok(())
    }

    fn insert_function(&mut self, function: Function) {
        self.functions.insert(function.signature(), function);
    }

    /// Attaches a constraint to its relation, which must already be loaded.
    fn insert_constraint(&mut self, constraint: Constraint) -> Result<(), InspectError> {
        let name = constraint.quoted_full_name();
        let table = constraint.quoted_full_table_name();
        let Some(relation) = self.relations.get_mut(&table) else {
            return Err(InspectError::MissingConstraintTable {
                constraint: name,
                table,
            });
        };
        relation.constraints.insert(name.clone(), constraint);
        self.constraints.insert(name, table);
        Ok(())
    }
}

/// Constraints serialize as a map from qualified name to constraint, in load
/// order, rather than as the internal name-to-table index.
impl Serialize for Catalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let constraints: IndexMap<&str, &Constraint> = self.constraints().collect();
        let mut state = serializer.serialize_struct("Catalog", 5)?;
        state.serialize_field("dialect", &self.dialect)?;
        state.serialize_field("schemas", &self.schemas)?;
        state.serialize_field("relations", &self.relations)?;
        state.serialize_field("functions", &self.functions)?;
        state.serialize_field("constraints", &constraints)?;
        state.end()
    }
}

/// Loads [`Catalog`]s.
#[derive(Debug)]
pub struct Inspector<C> {
    client: C,
    config: InspectorConfig,
}

impl<C: CatalogClient> Inspector<C> {
    pub fn new(client: C, config: InspectorConfig) -> Self {
        Inspector { client, config }
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    /// Loads the full catalog.
    ///
    /// Either the whole pipeline succeeds, or the first error is returned and
    /// nothing is: a partially constructed catalog is never exposed.
    pub async fn load(&self) -> Result<Catalog, InspectError> {
        let builder = ObjectBuilder::new(self.config.dialect, &self.config.type_mapping);
        let mut catalog = Catalog {
            dialect: self.config.dialect,
            ..Default::default()
        };

        for row in self.fetch::<SchemaRow>(QueryKind::Schemas).await? {
            let schema = builder.schema(row);
            catalog.schemas.insert(schema.name.clone(), schema);
        }

        let relation_rows = self.fetch::<RelationRow>(QueryKind::Relations).await?;
        let groups = relation_rows
            .into_iter()
            .group_contiguous(|row| (row.kind, row.schema.clone(), row.name.clone()));
        for (_, rows) in groups {
            if let Some(relation) = builder.relation(rows) {
                catalog.insert_relation(relation)?;
            }
        }

        // Constraints attach to relations, so relations must be loaded first.
        for row in self.fetch::<ConstraintRow>(QueryKind::Constraints).await? {
            catalog.insert_constraint(builder.constraint(row))?;
        }

        let function_rows = self.fetch::<FunctionRow>(QueryKind::Functions).await?;
        let groups = function_rows.into_iter().group_contiguous(|row| {
            (
                row.schema.clone(),
                row.name.clone(),
                row.identity_arguments.clone(),
            )
        });
        for (_, rows) in groups {
            if let Some(function) = builder.function(rows) {
                catalog.insert_function(function);
            }
        }

        let dependency_rows = self.fetch::<DependencyRow>(QueryKind::Dependencies).await?;
        deps::resolve(
            &mut catalog,
            dependency_rows.iter().map(DependencyEdge::from),
        )?;
        deps::compute_closures(&mut catalog);

        info!(
            dialect = %self.config.dialect,
            schemas = catalog.schemas.len(),
            relations = catalog.relations.len(),
            constraints = catalog.constraints.len(),
            functions = catalog.functions.len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    async fn fetch<R>(&self, kind: QueryKind) -> Result<Vec<R>, InspectError>
    where
        R: for<'r> TryFrom<&'r CatalogRow, Error = InspectError>,
    {
        let query = self.config.query(kind);
        let rows = self.client.query(&query).await?;
        debug!(query = %kind, rows = rows.len(), "fetched catalog rows");
        rows.iter().map(R::try_from).collect()
    }
}

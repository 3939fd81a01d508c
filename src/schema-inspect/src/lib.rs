// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Schema inspection for PostgreSQL and Redshift.
//!
//! This crate reads a database's system catalog and reconstructs an in-memory
//! model of its tables, views, functions and constraints. The model carries
//! enough information to regenerate equivalent DDL and records the dependency
//! graph between objects, including the transitive closure of that graph in
//! both directions.
//!
//! A load is one sequential pipeline:
//!
//! ```text
//! schemas → relations (+ columns) → constraints → functions → dependencies → closures
//! ```
//!
//! Rows are fetched through a [`CatalogClient`], which is implemented for
//! [`tokio_postgres::Client`] and can be implemented by anything else able to
//! execute a catalog query.

mod builder;
mod client;
pub mod ddl;
pub mod deps;
pub mod desc;
pub mod group;
pub mod inspector;
pub mod query;
pub mod row;

pub use builder::ObjectBuilder;
pub use client::CatalogClient;
pub use deps::{DependencyEdge, DependencyEdges};
pub use desc::{
    ColumnInfo, Constraint, DistributionAttributes, Function, Relation, RelationKind, Schema,
    Selectable,
};
pub use group::{GroupContiguous, Grouped};
pub use inspector::{Catalog, Inspector, InspectorConfig, TypeMapping};
pub use query::{CatalogQuery, Dialect, QueryKind};
pub use row::{CatalogRow, Value};

#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    /// A catalog row did not carry a field the query is declared to return.
    #[error("catalog row is missing field '{field}'")]
    MissingField { field: String },
    /// A catalog row carried a field with an unexpected type or value.
    #[error("catalog field '{field}': expected {expected}, found {found}")]
    InvalidField {
        field: String,
        expected: String,
        found: String,
    },
    /// A dependency edge names an object that was never loaded.
    #[error(
        "dependency of {dependent} on {dependent_on} references unknown object {missing}"
    )]
    UnknownDependency {
        dependent: String,
        dependent_on: String,
        missing: String,
    },
    /// Two relations share a qualified name.
    #[error("relation {name} loaded as both {existing} and {duplicate}")]
    DuplicateRelation {
        name: String,
        existing: RelationKind,
        duplicate: RelationKind,
    },
    /// A constraint belongs to a relation that was never loaded.
    #[error("constraint {constraint} belongs to unknown relation {table}")]
    MissingConstraintTable { constraint: String, table: String },
    /// DDL was requested for a relation kind the dialect has no rendering for.
    #[error("cannot render {kind} {name} for {dialect}")]
    UnsupportedRelationKind {
        name: String,
        kind: RelationKind,
        dialect: Dialect,
    },
    /// A tokio-postgres error.
    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),
    /// Any other error we bail on.
    #[error(transparent)]
    Generic(#[from] anyhow::Error),
}

/// Quotes an identifier, doubling any embedded double quotes.
pub fn quoted_identifier(identifier: &str) -> String {
    let mut escaped = identifier.replace('"', "\"\"");
    escaped.insert(0, '"');
    escaped.push('"');
    escaped
}

/// Returns `"schema"."name"`.
pub fn qualified_name(schema: &str, name: &str) -> String {
    format!("{}.{}", quoted_identifier(schema), quoted_identifier(name))
}

/// Returns the qualified name of an object, suffixed with its parenthesized
/// identity arguments when it has any.
///
/// Functions always carry identity arguments, even if empty, so a function
/// without parameters renders as `"schema"."name"()`.
pub fn qualified_signature(schema: &str, name: &str, identity_arguments: Option<&str>) -> String {
    let qualified = qualified_name(schema, name);
    match identity_arguments {
        Some(args) => format!("{qualified}({args})"),
        None => qualified,
    }
}

/// Quotes a string literal, doubling any embedded single quotes.
pub(crate) fn quoted_literal(literal: &str) -> String {
    format!("'{}'", literal.replace('\'', "''"))
}

// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Descriptions of catalog objects.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::deps::DependencyEdges;
use crate::query::Dialect;
use crate::{InspectError, ddl, qualified_name, qualified_signature, quoted_identifier};

/// The distribution style a table gets when the catalog reports none.
pub const DEFAULT_DISTSTYLE: &str = "auto";

/// A column of a relation, or a parameter or output column of a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    /// The type as the catalog identifies it, e.g. `character varying`.
    pub db_type: String,
    /// The type as it is written in DDL, e.g. `character varying(10)`.
    pub db_type_str: Option<String>,
    /// The type produced by the configured type mapping.
    pub host_type: String,
    pub default: Option<String>,
    pub not_null: bool,
}

impl ColumnInfo {
    pub fn quoted_name(&self) -> String {
        quoted_identifier(&self.name)
    }

    fn type_str(&self) -> &str {
        self.db_type_str.as_deref().unwrap_or(&self.db_type)
    }

    /// The column as it appears in a `create table` statement.
    pub fn creation_clause(&self) -> String {
        let mut clause = format!("{} {}", self.quoted_name(), self.type_str());
        if self.not_null {
            clause.push_str(" not null");
        }
        if let Some(default) = &self.default {
            clause.push_str(" default ");
            clause.push_str(default);
        }
        clause
    }

    /// The column as it appears in a function's parameter list.
    pub fn parameter_clause(&self) -> String {
        let mut clause = format!("{} {}", self.quoted_name(), self.type_str());
        if let Some(default) = &self.default {
            clause.push_str(" default ");
            clause.push_str(default);
        }
        clause
    }
}

/// A schema (namespace).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub name: String,
}

impl Schema {
    pub fn quoted_name(&self) -> String {
        quoted_identifier(&self.name)
    }

    pub fn create_statement(&self) -> String {
        format!("create schema if not exists {};\n", self.quoted_name())
    }

    pub fn drop_statement(&self) -> String {
        format!("drop schema if exists {};\n", self.quoted_name())
    }
}

/// The kind of a relation, as recorded in `pg_class.relkind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationKind {
    Table,
    PartitionedTable,
    View,
    MaterializedView,
    /// Any other `relkind`. Such relations are modeled but cannot be rendered.
    Other(char),
}

impl RelationKind {
    pub fn from_code(code: &str) -> Self {
        match code {
            "r" => RelationKind::Table,
            "p" => RelationKind::PartitionedTable,
            "v" => RelationKind::View,
            "m" => RelationKind::MaterializedView,
            other => RelationKind::Other(other.chars().next().unwrap_or('?')),
        }
    }

    pub fn code(&self) -> char {
        match self {
            RelationKind::Table => 'r',
            RelationKind::PartitionedTable => 'p',
            RelationKind::View => 'v',
            RelationKind::MaterializedView => 'm',
            RelationKind::Other(code) => *code,
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self, RelationKind::Table | RelationKind::PartitionedTable)
    }

    pub fn is_view(&self) -> bool {
        matches!(self, RelationKind::View | RelationKind::MaterializedView)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationKind::Table => f.write_str("table"),
            RelationKind::PartitionedTable => f.write_str("partitioned table"),
            RelationKind::View => f.write_str("view"),
            RelationKind::MaterializedView => f.write_str("materialized view"),
            RelationKind::Other(code) => write!(f, "relation of kind '{code}'"),
        }
    }
}

/// Redshift's physical storage attributes of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionAttributes {
    pub diststyle: String,
    pub dist_key: Option<String>,
    /// Sort key columns, in catalog column order, mapped to their rank. The
    /// magnitude of the rank is the key's position in the sort key; a negative
    /// rank marks an interleaved sort key.
    pub sort_keys: IndexMap<String, i64>,
}

impl Default for DistributionAttributes {
    fn default() -> Self {
        DistributionAttributes {
            diststyle: DEFAULT_DISTSTYLE.to_string(),
            dist_key: None,
            sort_keys: IndexMap::new(),
        }
    }
}

/// A table or view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relation {
    pub schema: String,
    pub name: String,
    pub kind: RelationKind,
    pub dialect: Dialect,
    /// Columns in catalog position order.
    pub columns: IndexMap<String, ColumnInfo>,
    /// The query of a view.
    pub definition: Option<String>,
    pub comment: Option<String>,
    /// Constraints keyed by [`Constraint::quoted_full_name`].
    pub constraints: IndexMap<String, Constraint>,
    /// Present for relations loaded from Redshift.
    pub distribution: Option<DistributionAttributes>,
    pub edges: DependencyEdges,
}

impl Relation {
    pub fn quoted_full_name(&self) -> String {
        qualified_name(&self.schema, &self.name)
    }

    pub fn signature(&self) -> String {
        self.quoted_full_name()
    }

    /// Renders the statement that creates this relation.
    ///
    /// Fails for relation kinds the relation's dialect cannot render.
    pub fn create_statement(&self) -> Result<String, InspectError> {
        ddl::relation_create_statement(self)
    }

    pub fn drop_statement(&self) -> Result<String, InspectError> {
        ddl::relation_drop_statement(self)
    }

    /// Renders a `comment on` statement, if the relation has a comment.
    pub fn comment_statement(&self) -> Result<Option<String>, InspectError> {
        ddl::relation_comment_statement(self)
    }
}

/// A function.
///
/// Functions may be overloaded, so they are identified by their
/// [signature](Function::signature) rather than their name alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Function {
    pub schema: String,
    pub name: String,
    /// The rendered list of input parameter types, without parentheses.
    pub identity_arguments: String,
    pub result_string: Option<String>,
    /// Output columns: one per OUT parameter, or a single column named after
    /// the function carrying its return type.
    pub columns: IndexMap<String, ColumnInfo>,
    /// IN parameters in declaration order.
    pub inputs: Vec<ColumnInfo>,
    pub definition: Option<String>,
    pub full_definition: String,
    pub language: String,
    pub strictness: Option<String>,
    pub security_type: Option<String>,
    pub volatility: Option<String>,
    pub comment: Option<String>,
    pub edges: DependencyEdges,
}

impl Function {
    pub fn quoted_full_name(&self) -> String {
        qualified_name(&self.schema, &self.name)
    }

    /// The qualified name suffixed with the parenthesized identity arguments.
    pub fn signature(&self) -> String {
        qualified_signature(&self.schema, &self.name, Some(&self.identity_arguments))
    }

    /// The input parameters as they appear in a parameter list, including
    /// their defaults.
    pub fn parameters_clause(&self) -> String {
        self.inputs
            .iter()
            .map(ColumnInfo::parameter_clause)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn create_statement(&self) -> String {
        ddl::function_create_statement(self)
    }

    pub fn drop_statement(&self) -> String {
        ddl::function_drop_statement(self)
    }

    pub fn comment_statement(&self) -> Option<String> {
        ddl::function_comment_statement(self)
    }
}

/// A table constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Constraint {
    pub name: String,
    pub schema: String,
    pub table_name: String,
    pub constraint_type: String,
    pub definition: String,
    /// The index backing the constraint, if any.
    pub index: Option<String>,
}

impl Constraint {
    /// Constraint names are unique per table, so the table is part of the
    /// constraint's name: `"schema"."table"."constraint"`.
    pub fn quoted_full_name(&self) -> String {
        format!(
            "{}.{}",
            self.quoted_full_table_name(),
            quoted_identifier(&self.name)
        )
    }

    pub fn quoted_full_table_name(&self) -> String {
        qualified_name(&self.schema, &self.table_name)
    }

    pub fn create_statement(&self) -> String {
        format!(
            "alter table {} add constraint {} {};\n",
            self.quoted_full_table_name(),
            quoted_identifier(&self.name),
            self.definition
        )
    }

    pub fn drop_statement(&self) -> String {
        format!(
            "alter table {} drop constraint {};\n",
            self.quoted_full_table_name(),
            quoted_identifier(&self.name)
        )
    }
}

/// An object that participates in the dependency graph.
#[derive(Debug, Clone, Copy)]
pub enum Selectable<'a> {
    Relation(&'a Relation),
    Function(&'a Function),
}

impl<'a> Selectable<'a> {
    pub fn schema(&self) -> &'a str {
        match self {
            Selectable::Relation(r) => &r.schema,
            Selectable::Function(f) => &f.schema,
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            Selectable::Relation(r) => &r.name,
            Selectable::Function(f) => &f.name,
        }
    }

    pub fn signature(&self) -> String {
        match self {
            Selectable::Relation(r) => r.signature(),
            Selectable::Function(f) => f.signature(),
        }
    }

    pub fn edges(&self) -> &'a DependencyEdges {
        match self {
            Selectable::Relation(r) => &r.edges,
            Selectable::Function(f) => &f.edges,
        }
    }

    pub fn create_statement(&self) -> Result<String, InspectError> {
        match self {
            Selectable::Relation(r) => r.create_statement(),
            Selectable::Function(f) => Ok(f.create_statement()),
        }
    }

    pub fn drop_statement(&self) -> Result<String, InspectError> {
        match self {
            Selectable::Relation(r) => r.drop_statement(),
            Selectable::Function(f) => Ok(f.drop_statement()),
        }
    }
}

// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Catalog queries, per dialect.
//!
//! The query text lives in `src/sql/<dialect>/*.sql`. Lines that filter out
//! internal objects (system schemas, extension members) are prefixed with a
//! `-- SKIP_INTERNAL` marker, which comments them out. Unless internal objects
//! were requested, the marker is removed so the filter takes effect.

use std::fmt;

use serde::Serialize;

/// Marker prefixing each line that excludes internal objects.
const SKIP_INTERNAL: &str = "-- SKIP_INTERNAL";

/// The SQL dialect of the inspected database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    /// PostgreSQL.
    #[default]
    Postgres,
    /// Amazon Redshift, which adds distribution and sort keys to tables.
    Redshift,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Postgres => f.write_str("postgres"),
            Dialect::Redshift => f.write_str("redshift"),
        }
    }
}

/// The catalog queries issued during a load, in the order they are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Schemas,
    Relations,
    Constraints,
    Functions,
    Dependencies,
}

impl QueryKind {
    fn source(self, dialect: Dialect) -> &'static str {
        match (dialect, self) {
            // Redshift shares PostgreSQL's namespace catalog.
            (_, QueryKind::Schemas) => include_str!("sql/postgres/schemas.sql"),
            (Dialect::Postgres, QueryKind::Relations) => include_str!("sql/postgres/relations.sql"),
            (Dialect::Postgres, QueryKind::Constraints) => {
                include_str!("sql/postgres/constraints.sql")
            }
            (Dialect::Postgres, QueryKind::Functions) => include_str!("sql/postgres/functions.sql"),
            (Dialect::Postgres, QueryKind::Dependencies) => include_str!("sql/postgres/deps.sql"),
            (Dialect::Redshift, QueryKind::Relations) => include_str!("sql/redshift/relations.sql"),
            (Dialect::Redshift, QueryKind::Constraints) => {
                include_str!("sql/redshift/constraints.sql")
            }
            (Dialect::Redshift, QueryKind::Functions) => include_str!("sql/redshift/functions.sql"),
            (Dialect::Redshift, QueryKind::Dependencies) => include_str!("sql/redshift/deps.sql"),
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryKind::Schemas => "schemas",
            QueryKind::Relations => "relations",
            QueryKind::Constraints => "constraints",
            QueryKind::Functions => "functions",
            QueryKind::Dependencies => "dependencies",
        };
        f.write_str(name)
    }
}

/// A catalog query ready to be executed by a
/// [`CatalogClient`](crate::CatalogClient).
///
/// The query must return rows ordered by the identity of the object they
/// describe; see [`crate::group`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    kind: QueryKind,
    dialect: Dialect,
    sql: String,
}

impl CatalogQuery {
    pub fn new(kind: QueryKind, dialect: Dialect, include_internal: bool) -> Self {
        let source = kind.source(dialect);
        let sql = if include_internal {
            source.to_string()
        } else {
            source.replace(SKIP_INTERNAL, "")
        };
        CatalogQuery { kind, dialect, sql }
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

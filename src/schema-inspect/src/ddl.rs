// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Rendering of DDL statements.
//!
//! Rendering is a pure function of an object's state: the same object always
//! renders to the same bytes. Relations dispatch on their kind and dialect.
//! Tables loaded from Redshift are followed by their storage attributes, one
//! per line, in a fixed order:
//!
//! ```text
//! create table "public"."events" (
//!     "id" integer not null,
//!     "at" timestamp without time zone
//! )
//! diststyle key
//! distkey (id)
//! compound sortkey (at, id);
//! ```

use indexmap::IndexMap;
use itertools::Itertools;

use crate::desc::{DistributionAttributes, Function, Relation, RelationKind};
use crate::query::Dialect;
use crate::{InspectError, quoted_literal};

pub(crate) fn relation_create_statement(relation: &Relation) -> Result<String, InspectError> {
    let name = relation.quoted_full_name();
    match (relation.kind, relation.dialect) {
        (RelationKind::Table | RelationKind::PartitionedTable, dialect) => {
            Ok(create_table(relation, dialect))
        }
        (RelationKind::View, _) => Ok(format!(
            "create or replace view {} as {}\n",
            name,
            relation.definition.as_deref().unwrap_or_default()
        )),
        (RelationKind::MaterializedView, Dialect::Postgres) => Ok(format!(
            "create materialized view {} as {}\n",
            name,
            relation.definition.as_deref().unwrap_or_default()
        )),
        (kind, dialect) => Err(unsupported(relation, kind, dialect)),
    }
}

pub(crate) fn relation_drop_statement(relation: &Relation) -> Result<String, InspectError> {
    let name = relation.quoted_full_name();
    match (relation.kind, relation.dialect) {
        (RelationKind::Table | RelationKind::PartitionedTable, _) => {
            Ok(format!("drop table {name};\n"))
        }
        (RelationKind::View, _) => Ok(format!("drop view if exists {name};\n")),
        (RelationKind::MaterializedView, Dialect::Postgres) => {
            Ok(format!("drop materialized view if exists {name};\n"))
        }
        (kind, dialect) => Err(unsupported(relation, kind, dialect)),
    }
}

pub(crate) fn relation_comment_statement(
    relation: &Relation,
) -> Result<Option<String>, InspectError> {
    let Some(comment) = &relation.comment else {
        return Ok(None);
    };
    let object = match (relation.kind, relation.dialect) {
        (RelationKind::Table | RelationKind::PartitionedTable, _) => "table",
        (RelationKind::View, _) => "view",
        (RelationKind::MaterializedView, Dialect::Postgres) => "materialized view",
        (kind, dialect) => return Err(unsupported(relation, kind, dialect)),
    };
    Ok(Some(format!(
        "comment on {} {} is {};\n",
        object,
        relation.quoted_full_name(),
        quoted_literal(comment)
    )))
}

fn unsupported(relation: &Relation, kind: RelationKind, dialect: Dialect) -> InspectError {
    InspectError::UnsupportedRelationKind {
        name: relation.quoted_full_name(),
        kind,
        dialect,
    }
}

fn create_table(relation: &Relation, dialect: Dialect) -> String {
    let mut sql = format!("create table {} (", relation.quoted_full_name());
    if !relation.columns.is_empty() {
        sql.push('\n');
        sql.push_str(
            &relation
                .columns
                .values()
                .map(|c| format!("    {}", c.creation_clause()))
                .join(",\n"),
        );
    }
    sql.push_str("\n)");
    if dialect == Dialect::Redshift {
        let default = DistributionAttributes::default();
        let attributes = relation.distribution.as_ref().unwrap_or(&default);
        for line in table_attributes(attributes) {
            sql.push('\n');
            sql.push_str(&line);
        }
    }
    sql.push_str(";\n");
    sql
}

/// The storage clauses of a Redshift table: the distribution style, then the
/// distribution key and sort key when present.
pub fn table_attributes(attributes: &DistributionAttributes) -> Vec<String> {
    let mut lines = vec![format!("diststyle {}", attributes.diststyle)];
    if let Some(dist_key) = &attributes.dist_key {
        lines.push(format!("distkey ({dist_key})"));
    }
    if let Some(sortkey) = sortkey_clause(&attributes.sort_keys) {
        lines.push(sortkey);
    }
    lines
}

/// Renders a sort key clause, or `None` if there are no sort keys.
///
/// A single key is unlabeled. Otherwise the key is `interleaved` if any rank
/// is negative and `compound` if not. Keys are listed by the absolute value of
/// their rank, ties keeping catalog order.
pub fn sortkey_clause(sort_keys: &IndexMap<String, i64>) -> Option<String> {
    if sort_keys.is_empty() {
        return None;
    }
    let style = if sort_keys.len() == 1 {
        ""
    } else if sort_keys.values().any(|rank| *rank < 0) {
        "interleaved "
    } else {
        "compound "
    };
    let keys = sort_keys
        .iter()
        .sorted_by_key(|(_, rank)| rank.unsigned_abs())
        .map(|(name, _)| name)
        .join(", ");
    Some(format!("{style}sortkey ({keys})"))
}

pub(crate) fn function_create_statement(function: &Function) -> String {
    format!("{};\n", function.full_definition.trim_end())
}

pub(crate) fn function_drop_statement(function: &Function) -> String {
    format!("drop function if exists {};\n", function.signature())
}

pub(crate) fn function_comment_statement(function: &Function) -> Option<String> {
    let comment = function.comment.as_ref()?;
    Some(format!(
        "comment on function {} is {};\n",
        function.signature(),
        quoted_literal(comment)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::DependencyEdges;
    use crate::desc::ColumnInfo;

    fn sort_keys(keys: &[(&str, i64)]) -> IndexMap<String, i64> {
        keys.iter()
            .map(|(name, rank)| (name.to_string(), *rank))
            .collect()
    }

    fn column(name: &str, db_type: &str, not_null: bool) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            db_type: db_type.to_string(),
            db_type_str: Some(db_type.to_string()),
            host_type: db_type.to_string(),
            default: None,
            not_null,
        }
    }

    fn relation(kind: RelationKind, dialect: Dialect) -> Relation {
        Relation {
            schema: "public".to_string(),
            name: "t".to_string(),
            kind,
            dialect,
            columns: [column("id", "int", true), column("name", "text", false)]
                .into_iter()
                .map(|c| (c.name.clone(), c))
                .collect(),
            definition: None,
            comment: None,
            constraints: IndexMap::new(),
            distribution: match dialect {
                Dialect::Postgres => None,
                Dialect::Redshift => Some(DistributionAttributes::default()),
            },
            edges: DependencyEdges::default(),
        }
    }

    #[test]
    fn test_sortkey_clause() {
        assert_eq!(
            sortkey_clause(&sort_keys(&[("a", 1), ("b", 2)])).as_deref(),
            Some("compound sortkey (a, b)")
        );
        assert_eq!(
            sortkey_clause(&sort_keys(&[("a", -1), ("b", 2)])).as_deref(),
            Some("interleaved sortkey (a, b)")
        );
        assert_eq!(
            sortkey_clause(&sort_keys(&[("a", 1)])).as_deref(),
            Some("sortkey (a)")
        );
        assert_eq!(sortkey_clause(&sort_keys(&[])), None);
    }

    #[test]
    fn test_sortkey_clause_orders_by_absolute_rank() {
        assert_eq!(
            sortkey_clause(&sort_keys(&[("a", -3), ("b", 1), ("c", -2)])).as_deref(),
            Some("interleaved sortkey (b, c, a)")
        );
        // Equal ranks keep catalog order.
        assert_eq!(
            sortkey_clause(&sort_keys(&[("z", 1), ("y", -1), ("x", 2)])).as_deref(),
            Some("interleaved sortkey (z, y, x)")
        );
    }

    #[test]
    fn test_redshift_table() {
        let table = relation(RelationKind::Table, Dialect::Redshift);
        let sql = table.create_statement().unwrap();
        assert_eq!(
            sql,
            "create table \"public\".\"t\" (\n    \"id\" int not null,\n    \"name\" text\n)\ndiststyle auto;\n"
        );
        assert_eq!(sql.matches("diststyle").count(), 1);
        assert!(!sql.contains("distkey"));
        assert!(!sql.contains("sortkey"));
    }

    #[test]
    fn test_redshift_table_with_keys() {
        let mut table = relation(RelationKind::Table, Dialect::Redshift);
        table.distribution = Some(DistributionAttributes {
            diststyle: "key".to_string(),
            dist_key: Some("id".to_string()),
            sort_keys: sort_keys(&[("name", 1), ("id", 2)]),
        });
        assert_eq!(
            table.create_statement().unwrap(),
            "create table \"public\".\"t\" (\n    \"id\" int not null,\n    \"name\" text\n)\n\
             diststyle key\ndistkey (id)\ncompound sortkey (name, id);\n"
        );
    }

    #[test]
    fn test_redshift_table_without_attributes_uses_default() {
        let mut table = relation(RelationKind::Table, Dialect::Redshift);
        table.distribution = None;
        assert!(table.create_statement().unwrap().ends_with(")\ndiststyle auto;\n"));
    }

    #[test]
    fn test_postgres_table() {
        let table = relation(RelationKind::PartitionedTable, Dialect::Postgres);
        assert_eq!(
            table.create_statement().unwrap(),
            "create table \"public\".\"t\" (\n    \"id\" int not null,\n    \"name\" text\n);\n"
        );
        assert_eq!(table.drop_statement().unwrap(), "drop table \"public\".\"t\";\n");
    }

    #[test]
    fn test_table_without_columns() {
        let mut table = relation(RelationKind::Table, Dialect::Postgres);
        table.columns.clear();
        assert_eq!(
            table.create_statement().unwrap(),
            "create table \"public\".\"t\" (\n);\n"
        );
    }

    #[test]
    fn test_views() {
        let mut view = relation(RelationKind::View, Dialect::Redshift);
        view.definition = Some(" SELECT 1 AS one;".to_string());
        assert_eq!(
            view.create_statement().unwrap(),
            "create or replace view \"public\".\"t\" as  SELECT 1 AS one;\n"
        );
        assert_eq!(
            view.drop_statement().unwrap(),
            "drop view if exists \"public\".\"t\";\n"
        );

        let mut mv = relation(RelationKind::MaterializedView, Dialect::Postgres);
        mv.definition = Some(" SELECT 1 AS one;".to_string());
        assert_eq!(
            mv.create_statement().unwrap(),
            "create materialized view \"public\".\"t\" as  SELECT 1 AS one;\n"
        );
    }

    #[test]
    fn test_unsupported_kinds() {
        let mv = relation(RelationKind::MaterializedView, Dialect::Redshift);
        assert!(matches!(
            mv.create_statement(),
            Err(InspectError::UnsupportedRelationKind {
                kind: RelationKind::MaterializedView,
                dialect: Dialect::Redshift,
                ..
            })
        ));

        let foreign = relation(RelationKind::Other('f'), Dialect::Postgres);
        assert!(matches!(
            foreign.create_statement(),
            Err(InspectError::UnsupportedRelationKind { .. })
        ));
        assert!(foreign.drop_statement().is_err());
    }

    #[test]
    fn test_comments() {
        let mut table = relation(RelationKind::Table, Dialect::Postgres);
        assert_eq!(table.comment_statement().unwrap(), None);
        table.comment = Some("the 't' table".to_string());
        assert_eq!(
            table.comment_statement().unwrap().as_deref(),
            Some("comment on table \"public\".\"t\" is 'the ''t'' table';\n")
        );
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let mut table = relation(RelationKind::Table, Dialect::Redshift);
        table.distribution = Some(DistributionAttributes {
            diststyle: "even".to_string(),
            dist_key: None,
            sort_keys: sort_keys(&[("b", -2), ("a", -1)]),
        });
        let first = table.create_statement().unwrap();
        let second = table.clone().create_statement().unwrap();
        assert_eq!(first, second);
    }
}

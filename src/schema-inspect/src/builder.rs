// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Construction of catalog objects from grouped catalog rows.

use indexmap::IndexMap;

use crate::deps::DependencyEdges;
use crate::desc::{
    ColumnInfo, Constraint, DEFAULT_DISTSTYLE, DistributionAttributes, Function, Relation, Schema,
};
use crate::inspector::TypeMapping;
use crate::query::Dialect;
use crate::row::{ConstraintRow, FunctionRow, ParameterMode, RelationRow, SchemaRow};

/// Builds catalog objects for one dialect.
#[derive(Debug, Clone)]
pub struct ObjectBuilder<'a> {
    dialect: Dialect,
    type_mapping: &'a TypeMapping,
}

impl<'a> ObjectBuilder<'a> {
    pub fn new(dialect: Dialect, type_mapping: &'a TypeMapping) -> Self {
        ObjectBuilder {
            dialect,
            type_mapping,
        }
    }

    pub fn schema(&self, row: SchemaRow) -> Schema {
        Schema { name: row.schema }
    }

    /// Builds a relation from the rows of a single relation.
    ///
    /// The first row supplies the object-level fields. Rows that carry a
    /// column position become columns, ordered by that position.
    ///
    /// Returns `None` if `rows` is empty.
    pub fn relation(&self, mut rows: Vec<RelationRow>) -> Option<Relation> {
        // Stable, so rows the query already ordered keep their order.
        rows.sort_by_key(|row| row.position_number);
        let first = rows.first()?.clone();
        let members: Vec<&RelationRow> = rows.iter().filter(|row| row.is_column()).collect();

        let columns = members
            .iter()
            .filter_map(|row| {
                let name = row.attname.clone()?;
                let db_type = row.datatype.clone().unwrap_or_default();
                let column = ColumnInfo {
                    name: name.clone(),
                    host_type: self.type_mapping.map(&db_type),
                    db_type,
                    db_type_str: row.datatypestring.clone(),
                    default: row.defaultdef.clone(),
                    not_null: row.not_null,
                };
                Some((name, column))
            })
            .collect();

        let distribution = match self.dialect {
            Dialect::Postgres => None,
            Dialect::Redshift => Some(DistributionAttributes {
                diststyle: first
                    .diststyle
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DISTSTYLE.to_string()),
                dist_key: members
                    .iter()
                    .find(|row| row.is_dist_key)
                    .and_then(|row| row.attname.clone()),
                sort_keys: members
                    .iter()
                    .filter_map(|row| match (row.sort_key_ord, &row.attname) {
                        (Some(ord), Some(name)) if ord != 0 => Some((name.clone(), ord)),
                        _ => None,
                    })
                    .collect(),
            }),
        };

        Some(Relation {
            schema: first.schema,
            name: first.name,
            kind: first.kind,
            dialect: self.dialect,
            columns,
            definition: first.definition,
            comment: first.comment,
            constraints: IndexMap::new(),
            distribution,
            edges: DependencyEdges::default(),
        })
    }

    /// Builds a function from the rows of a single function.
    ///
    /// If the function has OUT parameters they become its output columns;
    /// otherwise its output is a single column named after the function and
    /// typed by its return type. IN parameters become its inputs, each keeping
    /// its default.
    ///
    /// Returns `None` if `rows` is empty.
    pub fn function(&self, rows: Vec<FunctionRow>) -> Option<Function> {
        let first = rows.first()?.clone();

        let outputs: Vec<ColumnInfo> = self
            .parameters(&rows, ParameterMode::Out)
            .map(|column| ColumnInfo {
                default: None,
                ..column
            })
            .collect();
        let columns = if outputs.is_empty() {
            let return_type = first
                .returntype
                .clone()
                .or_else(|| first.data_type.clone())
                .unwrap_or_default();
            let column = ColumnInfo {
                name: first.name.clone(),
                host_type: self.type_mapping.map(&return_type),
                db_type: return_type,
                db_type_str: None,
                default: first.parameter_default.clone(),
                not_null: false,
            };
            IndexMap::from([(column.name.clone(), column)])
        } else {
            outputs
                .into_iter()
                .map(|column| (column.name.clone(), column))
                .collect()
        };
        let inputs = self.parameters(&rows, ParameterMode::In).collect();

        Some(Function {
            schema: first.schema,
            name: first.name,
            identity_arguments: first.identity_arguments,
            result_string: first.result_string,
            columns,
            inputs,
            definition: first.definition,
            full_definition: first.full_definition,
            language: first.language,
            strictness: first.strictness,
            security_type: first.security_type,
            volatility: first.volatility,
            comment: first.comment,
            edges: DependencyEdges::default(),
        })
    }

    fn parameters<'r>(
        &self,
        rows: &'r [FunctionRow],
        mode: ParameterMode,
    ) -> impl Iterator<Item = ColumnInfo> + use<'r, 'a> {
        let type_mapping = self.type_mapping;
        rows.iter()
            .filter(move |row| row.parameter_mode == Some(mode))
            .map(move |row| {
                let db_type = row.data_type.clone().unwrap_or_default();
                ColumnInfo {
                    name: row.parameter_name.clone().unwrap_or_default(),
                    host_type: type_mapping.map(&db_type),
                    db_type,
                    db_type_str: None,
                    default: row.parameter_default.clone(),
                    not_null: false,
                }
            })
    }

    pub fn constraint(&self, row: ConstraintRow) -> Constraint {
        Constraint {
            name: row.name,
            schema: row.schema,
            table_name: row.table_name,
            constraint_type: row.constraint_type,
            definition: row.definition,
            index: row.index,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::desc::RelationKind;

    fn column_row(position: i64, name: &str) -> RelationRow {
        RelationRow {
            kind: RelationKind::Table,
            schema: "public".to_string(),
            name: "t".to_string(),
            definition: None,
            comment: None,
            position_number: Some(position),
            attname: Some(name.to_string()),
            datatype: Some("integer".to_string()),
            datatypestring: Some("integer".to_string()),
            defaultdef: None,
            not_null: false,
            diststyle: None,
            is_dist_key: false,
            sort_key_ord: None,
        }
    }

    fn function_row(mode: Option<ParameterMode>, name: &str, data_type: &str) -> FunctionRow {
        FunctionRow {
            schema: "s".to_string(),
            name: "f".to_string(),
            identity_arguments: "integer".to_string(),
            result_string: Some("integer".to_string()),
            returntype: Some("integer".to_string()),
            language: "sql".to_string(),
            definition: Some("select $1".to_string()),
            full_definition: "CREATE FUNCTION s.f(a integer) ...".to_string(),
            strictness: None,
            security_type: None,
            volatility: Some("IMMUTABLE".to_string()),
            comment: None,
            parameter_name: Some(name.to_string()),
            data_type: Some(data_type.to_string()),
            parameter_mode: mode,
            parameter_default: None,
        }
    }

    #[test]
    fn test_postgres_relation_has_no_distribution() {
        let mapping = TypeMapping::default();
        let builder = ObjectBuilder::new(Dialect::Postgres, &mapping);
        let relation = builder
            .relation(vec![column_row(1, "id"), column_row(2, "name")])
            .unwrap();
        assert_eq!(relation.distribution, None);
        assert_eq!(
            relation.columns.keys().collect::<Vec<_>>(),
            vec!["id", "name"]
        );
        assert_eq!(relation.columns["id"].host_type, "integer");
    }

    #[test]
    fn test_redshift_relation_distribution() {
        let mapping = TypeMapping::default();
        let builder = ObjectBuilder::new(Dialect::Redshift, &mapping);

        let mut a = column_row(1, "a");
        a.diststyle = Some("key".to_string());
        a.sort_key_ord = Some(2);
        let mut b = column_row(2, "b");
        b.diststyle = Some("key".to_string());
        b.is_dist_key = true;
        b.sort_key_ord = Some(1);
        let mut c = column_row(3, "c");
        c.diststyle = Some("key".to_string());
        c.sort_key_ord = Some(0);

        let relation = builder.relation(vec![a, b, c]).unwrap();
        let distribution = relation.distribution.unwrap();
        assert_eq!(distribution.diststyle, "key");
        assert_eq!(distribution.dist_key.as_deref(), Some("b"));
        assert_eq!(
            distribution.sort_keys.into_iter().collect::<Vec<_>>(),
            vec![("a".to_string(), 2), ("b".to_string(), 1)]
        );
    }

    #[test]
    fn test_redshift_relation_missing_attributes() {
        let mapping = TypeMapping::default();
        let builder = ObjectBuilder::new(Dialect::Redshift, &mapping);
        let relation = builder.relation(vec![column_row(1, "a")]).unwrap();
        assert_eq!(relation.distribution, Some(DistributionAttributes::default()));
    }

    #[test]
    fn test_view_without_columns() {
        let mapping = TypeMapping::default();
        let builder = ObjectBuilder::new(Dialect::Postgres, &mapping);
        let mut row = column_row(0, "x");
        row.kind = RelationKind::View;
        row.position_number = None;
        row.attname = None;
        row.definition = Some(" SELECT 1;".to_string());
        let relation = builder.relation(vec![row]).unwrap();
        assert!(relation.columns.is_empty());
        assert_eq!(relation.definition.as_deref(), Some(" SELECT 1;"));
        assert!(builder.relation(vec![]).is_none());
    }

    #[test]
    fn test_function_without_out_parameters() {
        let mapping = TypeMapping::new(|t| format!("host:{t}"));
        let builder = ObjectBuilder::new(Dialect::Postgres, &mapping);
        let mut row = function_row(Some(ParameterMode::In), "a", "integer");
        row.parameter_default = Some("1".to_string());
        let function = builder.function(vec![row]).unwrap();

        let output = &function.columns["f"];
        assert_eq!(output.db_type, "integer");
        assert_eq!(output.host_type, "host:integer");
        assert_eq!(function.inputs.len(), 1);
        assert_eq!(function.inputs[0].name, "a");
        assert_eq!(function.inputs[0].default.as_deref(), Some("1"));
        assert_eq!(function.signature(), r#""s"."f"(integer)"#);
    }

    #[test]
    fn test_function_with_out_parameters() {
        let mapping = TypeMapping::default();
        let builder = ObjectBuilder::new(Dialect::Postgres, &mapping);
        let mut out = function_row(Some(ParameterMode::Out), "total", "bigint");
        out.parameter_default = Some("0".to_string());
        let rows = vec![
            function_row(Some(ParameterMode::In), "a", "integer"),
            out,
            function_row(Some(ParameterMode::Out), "label", "text"),
        ];
        let function = builder.function(rows).unwrap();
        assert_eq!(
            function.columns.keys().collect::<Vec<_>>(),
            vec!["total", "label"]
        );
        assert_eq!(function.columns["total"].default, None);
        assert_eq!(function.inputs.len(), 1);
    }

    #[test]
    fn test_function_without_parameters() {
        let mapping = TypeMapping::default();
        let builder = ObjectBuilder::new(Dialect::Postgres, &mapping);
        let mut row = function_row(None, "", "");
        row.identity_arguments = String::new();
        row.parameter_name = None;
        row.data_type = None;
        row.returntype = Some("timestamp with time zone".to_string());
        let function = builder.function(vec![row]).unwrap();
        assert!(function.inputs.is_empty());
        assert_eq!(function.columns["f"].db_type, "timestamp with time zone");
        assert_eq!(function.signature(), r#""s"."f"()"#);
    }

    proptest! {
        #[test]
        fn columns_follow_position_order(
            positions in Just((1i64..=12).collect::<Vec<_>>()).prop_shuffle(),
        ) {
            let mapping = TypeMapping::default();
            let builder = ObjectBuilder::new(Dialect::Postgres, &mapping);
            let rows = positions
                .iter()
                .map(|p| column_row(*p, &format!("c{p}")))
                .collect();
            let relation = builder.relation(rows).unwrap();
            let names: Vec<String> = relation.columns.keys().cloned().collect();
            let expected: Vec<String> = (1..=12).map(|p| format!("c{p}")).collect();
            prop_assert_eq!(names, expected);
        }
    }
}

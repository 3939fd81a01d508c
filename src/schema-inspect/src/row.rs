// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Catalog rows.
//!
//! A [`CatalogRow`] is the untyped form in which a [`CatalogClient`] hands
//! back query results: an ordered list of named fields. Each catalog query has
//! a typed counterpart (`RelationRow`, `FunctionRow`, ...) into which rows are
//! converted exactly once, so that field presence and types are validated at
//! the boundary instead of at every access site.
//!
//! Fields read by the typed rows come in three flavors:
//!
//! - required: the field must be present and non-null;
//! - nullable: the field must be present but may be null;
//! - optional: the field may be missing from the row entirely. Dialect
//!   specific attributes are read this way, so that a query lacking them
//!   yields "no attribute" rather than an error.
//!
//! [`CatalogClient`]: crate::CatalogClient

use std::fmt;

use crate::InspectError;
use crate::desc::RelationKind;

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Text(_) => "text",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i.into())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A row returned by a catalog query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogRow {
    fields: Vec<(String, Value)>,
}

impl CatalogRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field, builder style.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    fn required(&self, field: &str) -> Result<&Value, InspectError> {
        self.get(field).ok_or_else(|| InspectError::MissingField {
            field: field.to_string(),
        })
    }

    fn text(&self, field: &str) -> Result<String, InspectError> {
        match self.nullable_text(field)? {
            Some(s) => Ok(s),
            None => Err(invalid(field, "text", &Value::Null)),
        }
    }

    fn nullable_text(&self, field: &str) -> Result<Option<String>, InspectError> {
        match self.required(field)? {
            Value::Null => Ok(None),
            Value::Text(s) => Ok(Some(s.clone())),
            other => Err(invalid(field, "text", other)),
        }
    }

    fn optional_text(&self, field: &str) -> Result<Option<String>, InspectError> {
        if self.contains(field) {
            self.nullable_text(field)
        } else {
            Ok(None)
        }
    }

    /// Reads a nullable boolean, treating null as `false`.
    fn flag(&self, field: &str) -> Result<bool, InspectError> {
        match self.required(field)? {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(*b),
            other => Err(invalid(field, "bool", other)),
        }
    }

    fn optional_flag(&self, field: &str) -> Result<bool, InspectError> {
        if self.contains(field) {
            self.flag(field)
        } else {
            Ok(false)
        }
    }

    fn nullable_int(&self, field: &str) -> Result<Option<i64>, InspectError> {
        match self.required(field)? {
            Value::Null => Ok(None),
            Value::Int(i) => Ok(Some(*i)),
            other => Err(invalid(field, "int", other)),
        }
    }

    fn optional_int(&self, field: &str) -> Result<Option<i64>, InspectError> {
        if self.contains(field) {
            self.nullable_int(field)
        } else {
            Ok(None)
        }
    }
}

fn invalid(field: &str, expected: &str, found: &Value) -> InspectError {
    InspectError::InvalidField {
        field: field.to_string(),
        expected: expected.to_string(),
        found: found.type_name().to_string(),
    }
}

/// A row of the schemas query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRow {
    pub schema: String,
}

impl TryFrom<&CatalogRow> for SchemaRow {
    type Error = InspectError;

    fn try_from(row: &CatalogRow) -> Result<Self, Self::Error> {
        Ok(SchemaRow {
            schema: row.text("schema")?,
        })
    }
}

/// A row of the relations query: one per column, plus one for each relation
/// without columns. Object-level fields repeat on every row of a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationRow {
    pub kind: RelationKind,
    pub schema: String,
    pub name: String,
    pub definition: Option<String>,
    pub comment: Option<String>,
    /// The column's position, or `None` on rows that carry no column.
    pub position_number: Option<i64>,
    pub attname: Option<String>,
    pub datatype: Option<String>,
    pub datatypestring: Option<String>,
    pub defaultdef: Option<String>,
    pub not_null: bool,
    pub diststyle: Option<String>,
    pub is_dist_key: bool,
    pub sort_key_ord: Option<i64>,
}

impl RelationRow {
    /// The key rows of one relation share, in the order the query sorts by.
    pub fn identity(&self) -> (RelationKind, &str, &str) {
        (self.kind, &self.schema, &self.name)
    }

    /// Whether this row describes a column. Column positions start at 1.
    pub fn is_column(&self) -> bool {
        self.position_number.is_some_and(|position| position != 0)
    }
}

impl TryFrom<&CatalogRow> for RelationRow {
    type Error = InspectError;

    fn try_from(row: &CatalogRow) -> Result<Self, Self::Error> {
        Ok(RelationRow {
            kind: RelationKind::from_code(&row.text("relationtype")?),
            schema: row.text("schema")?,
            name: row.text("name")?,
            definition: row.nullable_text("definition")?,
            comment: row.nullable_text("comment")?,
            position_number: row.nullable_int("position_number")?,
            attname: row.nullable_text("attname")?,
            datatype: row.nullable_text("datatype")?,
            datatypestring: row.nullable_text("datatypestring")?,
            defaultdef: row.nullable_text("defaultdef")?,
            not_null: row.flag("not_null")?,
            diststyle: row.optional_text("diststyle")?,
            is_dist_key: row.optional_flag("is_dist_key")?,
            sort_key_ord: row.optional_int("sort_key_ord")?,
        })
    }
}

/// A row of the constraints query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintRow {
    pub schema: String,
    pub name: String,
    pub table_name: String,
    pub constraint_type: String,
    pub definition: String,
    pub index: Option<String>,
}

impl TryFrom<&CatalogRow> for ConstraintRow {
    type Error = InspectError;

    fn try_from(row: &CatalogRow) -> Result<Self, Self::Error> {
        Ok(ConstraintRow {
            schema: row.text("schema")?,
            name: row.text("name")?,
            table_name: row.text("table_name")?,
            constraint_type: row.text("constraint_type")?,
            definition: row.text("definition")?,
            index: row.optional_text("index")?,
        })
    }
}

/// The mode of a function parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterMode {
    In,
    Out,
    InOut,
    Variadic,
    Table,
}

impl ParameterMode {
    fn parse(field: &str, mode: &str) -> Result<Self, InspectError> {
        match mode.to_ascii_uppercase().as_str() {
            "IN" => Ok(ParameterMode::In),
            "OUT" => Ok(ParameterMode::Out),
            "INOUT" => Ok(ParameterMode::InOut),
            "VARIADIC" => Ok(ParameterMode::Variadic),
            "TABLE" => Ok(ParameterMode::Table),
            _ => Err(InspectError::InvalidField {
                field: field.to_string(),
                expected: "parameter mode".to_string(),
                found: mode.to_string(),
            }),
        }
    }
}

/// A row of the functions query: one per parameter, plus one for each function
/// without parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRow {
    pub schema: String,
    pub name: String,
    pub identity_arguments: String,
    pub result_string: Option<String>,
    pub returntype: Option<String>,
    pub language: String,
    pub definition: Option<String>,
    pub full_definition: String,
    pub strictness: Option<String>,
    pub security_type: Option<String>,
    pub volatility: Option<String>,
    pub comment: Option<String>,
    pub parameter_name: Option<String>,
    pub data_type: Option<String>,
    pub parameter_mode: Option<ParameterMode>,
    pub parameter_default: Option<String>,
}

impl FunctionRow {
    /// The key rows of one function share, in the order the query sorts by.
    pub fn identity(&self) -> (&str, &str, &str) {
        (&self.schema, &self.name, &self.identity_arguments)
    }
}

impl TryFrom<&CatalogRow> for FunctionRow {
    type Error = InspectError;

    fn try_from(row: &CatalogRow) -> Result<Self, Self::Error> {
        let parameter_mode = row
            .nullable_text("parameter_mode")?
            .map(|mode| ParameterMode::parse("parameter_mode", &mode))
            .transpose()?;
        Ok(FunctionRow {
            schema: row.text("schema")?,
            name: row.text("name")?,
            identity_arguments: row.text("identity_arguments")?,
            result_string: row.nullable_text("result_string")?,
            returntype: row.optional_text("returntype")?,
            language: row.text("language")?,
            definition: row.nullable_text("definition")?,
            full_definition: row.text("full_definition")?,
            strictness: row.nullable_text("strictness")?,
            security_type: row.nullable_text("security_type")?,
            volatility: row.nullable_text("volatility")?,
            comment: row.nullable_text("comment")?,
            parameter_name: row.nullable_text("parameter_name")?,
            data_type: row.nullable_text("data_type")?,
            parameter_mode,
            parameter_default: row.nullable_text("parameter_default")?,
        })
    }
}

/// A row of the dependencies query: one directed edge, from a dependent
/// object to the object it depends on.
///
/// Identity arguments are present when the endpoint is a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRow {
    pub schema: String,
    pub name: String,
    pub identity_arguments: Option<String>,
    pub schema_dependent_on: String,
    pub name_dependent_on: String,
    pub identity_arguments_dependent_on: Option<String>,
}

impl TryFrom<&CatalogRow> for DependencyRow {
    type Error = InspectError;

    fn try_from(row: &CatalogRow) -> Result<Self, Self::Error> {
        Ok(DependencyRow {
            schema: row.text("schema")?,
            name: row.text("name")?,
            identity_arguments: row.optional_text("identity_arguments")?,
            schema_dependent_on: row.text("schema_dependent_on")?,
            name_dependent_on: row.text("name_dependent_on")?,
            identity_arguments_dependent_on: row
                .optional_text("identity_arguments_dependent_on")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_row() -> CatalogRow {
        CatalogRow::new()
            .with("relationtype", "r")
            .with("schema", "public")
            .with("name", "t")
            .with("definition", Value::Null)
            .with("comment", Value::Null)
            .with("position_number", 1)
            .with("attname", "id")
            .with("datatype", "integer")
            .with("datatypestring", "integer")
            .with("defaultdef", Value::Null)
            .with("not_null", true)
    }

    #[test]
    fn test_relation_row_without_dialect_columns() {
        let row = RelationRow::try_from(&column_row()).unwrap();
        assert_eq!(row.identity(), (RelationKind::Table, "public", "t"));
        assert!(row.is_column());
        assert_eq!(row.diststyle, None);
        assert!(!row.is_dist_key);
        assert_eq!(row.sort_key_ord, None);
    }

    #[test]
    fn test_relation_row_with_dialect_columns() {
        let row = column_row()
            .with("diststyle", "key")
            .with("is_dist_key", true)
            .with("sort_key_ord", -2);
        let row = RelationRow::try_from(&row).unwrap();
        assert_eq!(row.diststyle.as_deref(), Some("key"));
        assert!(row.is_dist_key);
        assert_eq!(row.sort_key_ord, Some(-2));
    }

    #[test]
    fn test_relation_row_without_column() {
        let row = CatalogRow::new()
            .with("relationtype", "v")
            .with("schema", "public")
            .with("name", "v")
            .with("definition", " SELECT 1;")
            .with("comment", Value::Null)
            .with("position_number", Value::Null)
            .with("attname", Value::Null)
            .with("datatype", Value::Null)
            .with("datatypestring", Value::Null)
            .with("defaultdef", Value::Null)
            .with("not_null", Value::Null);
        let row = RelationRow::try_from(&row).unwrap();
        assert_eq!(row.kind, RelationKind::View);
        assert!(!row.is_column());
        assert!(!row.not_null);
    }

    #[test]
    fn test_missing_and_invalid_fields() {
        let row = CatalogRow::new().with("schema", "public");
        match ConstraintRow::try_from(&row) {
            Err(InspectError::MissingField { field }) => assert_eq!(field, "name"),
            other => panic!("unexpected result: {other:?}"),
        }

        let row = CatalogRow::new().with("schema", 1);
        match SchemaRow::try_from(&row) {
            Err(InspectError::InvalidField {
                field,
                expected,
                found,
            }) => {
                assert_eq!(field, "schema");
                assert_eq!(expected, "text");
                assert_eq!(found, "int");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let row = CatalogRow::new().with("schema", Value::Null);
        assert!(matches!(
            SchemaRow::try_from(&row),
            Err(InspectError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_parameter_mode() {
        assert_eq!(
            ParameterMode::parse("mode", "in").unwrap(),
            ParameterMode::In
        );
        assert_eq!(
            ParameterMode::parse("mode", "OUT").unwrap(),
            ParameterMode::Out
        );
        assert!(ParameterMode::parse("mode", "sideways").is_err());
    }

    #[test]
    fn test_dependency_row_identity_arguments() {
        let row = CatalogRow::new()
            .with("schema", "s")
            .with("name", "v")
            .with("schema_dependent_on", "s")
            .with("name_dependent_on", "f")
            .with("identity_arguments_dependent_on", "integer");
        let row = DependencyRow::try_from(&row).unwrap();
        assert_eq!(row.identity_arguments, None);
        assert_eq!(row.identity_arguments_dependent_on.as_deref(), Some("integer"));
    }
}

// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use anyhow::anyhow;
use async_trait::async_trait;
use tokio_postgres::Row;
use tokio_postgres::types::Type;

use crate::InspectError;
use crate::query::CatalogQuery;
use crate::row::{CatalogRow, Value};

/// Executes catalog queries.
///
/// Implementations return rows in the order the query produces them; the
/// inspector relies on each query's `ORDER BY` to group rows by object.
#[async_trait]
pub trait CatalogClient {
    async fn query(&self, query: &CatalogQuery) -> Result<Vec<CatalogRow>, InspectError>;
}

#[async_trait]
impl CatalogClient for tokio_postgres::Client {
    async fn query(&self, query: &CatalogQuery) -> Result<Vec<CatalogRow>, InspectError> {
        tokio_postgres::Client::query(self, query.sql(), &[])
            .await?
            .iter()
            .map(catalog_row)
            .collect()
    }
}

fn catalog_row(row: &Row) -> Result<CatalogRow, InspectError> {
    let mut out = CatalogRow::new();
    for (i, column) in row.columns().iter().enumerate() {
        let ty = column.type_();
        let value = if *ty == Type::BOOL {
            Value::from(row.try_get::<_, Option<bool>>(i)?)
        } else if *ty == Type::INT2 {
            Value::from(row.try_get::<_, Option<i16>>(i)?.map(i64::from))
        } else if *ty == Type::INT4 {
            Value::from(row.try_get::<_, Option<i32>>(i)?)
        } else if *ty == Type::INT8 {
            Value::from(row.try_get::<_, Option<i64>>(i)?)
        } else if *ty == Type::OID {
            Value::from(row.try_get::<_, Option<u32>>(i)?.map(i64::from))
        } else if *ty == Type::CHAR {
            // The single-byte `"char"` type, e.g. `pg_class.relkind`.
            let code = row.try_get::<_, Option<i8>>(i)?;
            Value::from(code.map(|c| char::from(c.to_ne_bytes()[0]).to_string()))
        } else if <String as tokio_postgres::types::FromSql>::accepts(ty) {
            Value::from(row.try_get::<_, Option<String>>(i)?)
        } else {
            return Err(anyhow!(
                "catalog column '{}' has unsupported type {}",
                column.name(),
                ty
            )
            .into());
        };
        out.push(column.name(), value);
    }
    Ok(out)
}

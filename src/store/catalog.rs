//! Schema Catalog - Table and column discovery against the store
//!
//! Metadata queries have a fixed shape with the database and table names
//! bound as parameters. Column order is the store's native order and must be
//! preserved: the projection and generated CREATE/INSERT statements rely on
//! positional correspondence with preview rows.

use crate::error::{IngestError, Result};
use crate::query::Query;
use crate::store::client::StoreClient;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub database: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Declared type tag, carried verbatim; the pipeline treats every value
    /// as text regardless.
    pub column_type: String,
}

pub struct SchemaCatalog<'a> {
    client: &'a StoreClient,
}

impl<'a> SchemaCatalog<'a> {
    pub fn new(client: &'a StoreClient) -> Self {
        Self { client }
    }

    pub async fn list_tables(&self) -> Result<Vec<TableDescriptor>> {
        let database = self.client.profile().database.clone();
        let query = Query::new("SELECT name FROM system.tables WHERE database = {db:String}")
            .bind("db", database.clone());

        let rows = self.client.fetch_rows(&query).await?;
        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            let name = string_field(&row, "name")?;
            tables.push(TableDescriptor {
                name,
                database: database.clone(),
            });
        }
        info!(database = %database, count = tables.len(), "listed tables");
        Ok(tables)
    }

    pub async fn list_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let database = self.client.profile().database.clone();
        let query = Query::new(
            "SELECT name, type FROM system.columns \
             WHERE database = {db:String} AND table = {table:String} \
             ORDER BY position",
        )
        .bind("db", database)
        .bind("table", table.to_string());

        let rows = self.client.fetch_rows(&query).await?;
        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            columns.push(ColumnDescriptor {
                name: string_field(&row, "name")?,
                column_type: string_field(&row, "type")?,
            });
        }
        info!(table = %table, count = columns.len(), "listed columns");
        Ok(columns)
    }
}

fn string_field(row: &serde_json::Value, field: &str) -> Result<String> {
    row.get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            IngestError::Query(format!(
                "Metadata row is missing the '{}' field: {}",
                field, row
            ))
        })
}

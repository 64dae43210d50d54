//! Store Record Stream - Streaming cursor over a store query result
//!
//! Executes a built select statement and decodes one JSONEachRow object per
//! pull. The column set is the projection the statement was built from, so
//! every record carries exactly the selected identifiers in order. Values of
//! any scalar type are carried as text; JSON null stays null.

use crate::error::Result;
use crate::query::Query;
use crate::record::{ColumnSet, Record};
use crate::store::client::{JsonRowCursor, StoreClient};
use crate::stream::RecordStream;
use async_trait::async_trait;

pub struct StoreRecordStream {
    cursor: JsonRowCursor,
    columns: ColumnSet,
}

impl StoreRecordStream {
    pub async fn open(client: &StoreClient, query: &Query, columns: ColumnSet) -> Result<Self> {
        let cursor = client.stream_rows(query).await?;
        Ok(Self { cursor, columns })
    }
}

fn json_to_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl RecordStream for StoreRecordStream {
    fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    async fn next_record(&mut self) -> Result<Option<Record>> {
        let row = match self.cursor.next_row().await? {
            Some(row) => row,
            None => return Ok(None),
        };

        let mut values = Vec::with_capacity(self.columns.len());
        for column in self.columns.iter() {
            let value = row.get(column).map(json_to_text).unwrap_or(None);
            values.push(value);
        }
        Ok(Some(Record::new(self.columns.clone(), values)?))
    }
}

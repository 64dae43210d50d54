//! Record and Projection - The row representation moved through the pipeline
//!
//! A `Record` is an ordered mapping from column identifier to a text-or-null
//! value. The column set is fixed when a stream is constructed and shared by
//! every record pulled from it, so presence and ordering invariants are carried
//! by the type instead of by convention. All values travel as text; fidelity of
//! numerics and dates is the destination's concern.

use crate::error::{IngestError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Ordered, duplicate-free set of column identifiers selected for transfer.
///
/// Identifiers are bare column names for a single-table source and
/// `table.column` qualified names when built from a join.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Projection {
    columns: Vec<String>,
}

impl TryFrom<Vec<String>> for Projection {
    type Error = IngestError;

    fn try_from(columns: Vec<String>) -> Result<Self> {
        Projection::new(columns)
    }
}

impl From<Projection> for Vec<String> {
    fn from(projection: Projection) -> Self {
        projection.columns
    }
}

impl Projection {
    pub fn new(columns: Vec<String>) -> Result<Self> {
        if columns.is_empty() {
            return Err(IngestError::Validation(
                "Projection must contain at least one column".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for column in &columns {
            if column.trim().is_empty() {
                return Err(IngestError::Validation(
                    "Projection contains an empty column identifier".to_string(),
                ));
            }
            if !seen.insert(column.as_str()) {
                return Err(IngestError::Validation(format!(
                    "Duplicate column identifier in projection: {}",
                    column
                )));
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.columns.iter().any(|c| c == identifier)
    }
}

/// Shared column set for a stream of records.
pub type ColumnSet = Arc<Vec<String>>;

pub fn column_set(columns: Vec<String>) -> ColumnSet {
    Arc::new(columns)
}

/// One row: positional text-or-null values against a shared column set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    columns: ColumnSet,
    values: Vec<Option<String>>,
}

// Serialized as an ordered map so callers see rows keyed by identifier.
impl Serialize for Record {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, &value)?;
        }
        map.end()
    }
}

impl Record {
    pub fn new(columns: ColumnSet, values: Vec<Option<String>>) -> Result<Self> {
        if columns.len() != values.len() {
            return Err(IngestError::Validation(format!(
                "Record has {} values but the column set has {} columns",
                values.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, values })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Value for `identifier`; outer `None` means the column is absent.
    pub fn get(&self, identifier: &str) -> Option<Option<&str>> {
        self.columns
            .iter()
            .position(|c| c == identifier)
            .map(|idx| self.values[idx].as_deref())
    }

    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }

    /// Iterate `(identifier, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.columns
            .iter()
            .map(|c| c.as_str())
            .zip(self.values.iter().map(|v| v.as_deref()))
    }

    /// Narrow this record to the given column set, which must be a subset of
    /// the record's columns. Used when a file carries unselected header columns.
    pub fn narrow(&self, target: &ColumnSet) -> Result<Record> {
        let mut values = Vec::with_capacity(target.len());
        for column in target.iter() {
            match self.get(column) {
                Some(value) => values.push(value.map(|v| v.to_string())),
                None => {
                    return Err(IngestError::Validation(format!(
                        "Projected column not present in source record: {}",
                        column
                    )))
                }
            }
        }
        Record::new(Arc::clone(target), values)
    }

    /// Serialize as one JSONEachRow object for a store insert. Nulls stay null
    /// so the store, not the pipeline, decides their representation.
    pub fn to_json_row(&self) -> serde_json::Value {
        let mut object = serde_json::Map::with_capacity(self.columns.len());
        for (column, value) in self.iter() {
            let json = match value {
                Some(v) => serde_json::Value::String(v.to_string()),
                None => serde_json::Value::Null,
            };
            object.insert(column.to_string(), json);
        }
        serde_json::Value::Object(object)
    }
}

//! Preview Sampler - Operator-facing samples before committing to a Job
//!
//! Store sources run the real select with a row limit; file sources reuse the
//! sample captured during schema discovery, so a preview never makes a second
//! pass over the file and never touches any destination.

use crate::config::INSPECT_SAMPLE_ROWS;
use crate::error::Result;
use crate::query::{build_select, SelectSource};
use crate::record::{column_set, Projection, Record};
use crate::store::{ColumnDescriptor, ConnectionProfile, StoreClient};
use crate::stream::{FileRecordStream, RecordStream, StoreRecordStream};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// What `inspect_file` learns from one pass over a delimited file.
#[derive(Clone, Debug, Serialize)]
pub struct FileInspection {
    /// Header columns in file order. The declared type is always text.
    pub columns: Vec<ColumnDescriptor>,
    /// First few data rows, for operator inspection.
    pub sample: Vec<Record>,
    pub total_rows: u64,
}

/// Sample the first `limit` records of a store source.
pub async fn sample_store(
    profile: &ConnectionProfile,
    source: &SelectSource,
    projection: &Projection,
    limit: u64,
) -> Result<Vec<Record>> {
    let client = StoreClient::new(profile.clone());
    let query = build_select(source, projection, Some(limit))?;
    let columns = column_set(projection.columns().to_vec());

    let mut stream = StoreRecordStream::open(&client, &query, columns).await?;
    let mut records = Vec::new();
    while let Some(record) = stream.next_record().await? {
        records.push(record);
    }
    info!(rows = records.len(), limit = limit, "store preview sampled");
    Ok(records)
}

/// One pass over a delimited file: header columns, the first few data rows,
/// and the total row count.
pub async fn inspect_file(path: impl AsRef<Path>, delimiter: u8) -> Result<FileInspection> {
    let mut stream = FileRecordStream::open(path.as_ref(), delimiter)?;
    let columns = stream
        .columns()
        .iter()
        .map(|name| ColumnDescriptor {
            name: name.clone(),
            column_type: "String".to_string(),
        })
        .collect();

    let mut sample = Vec::new();
    let mut total_rows = 0u64;
    while let Some(record) = stream.next_record().await? {
        if sample.len() < INSPECT_SAMPLE_ROWS {
            sample.push(record);
        }
        total_rows += 1;
    }

    info!(path = %path.as_ref().display(), rows = total_rows, "file inspected");
    Ok(FileInspection {
        columns,
        sample,
        total_rows,
    })
}

/// Preview a file source: the inspection sample, narrowed to the projection.
pub async fn sample_file(
    path: impl AsRef<Path>,
    delimiter: u8,
    projection: &Projection,
) -> Result<Vec<Record>> {
    let inspection = inspect_file(path, delimiter).await?;
    let target = column_set(projection.columns().to_vec());
    inspection
        .sample
        .into_iter()
        .map(|record| record.narrow(&target))
        .collect()
}

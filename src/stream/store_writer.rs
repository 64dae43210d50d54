//! Store Record Sink - Batched loading into the store
//!
//! Ensures the destination table exists, then loads records in fixed-size
//! batches, one insert per batch, sequentially. A failed batch fails the Job;
//! batches already committed stay committed (no rollback), and the error
//! carries the count of rows that landed so the operator can reconcile.

use crate::error::{IngestError, Result};
use crate::query::{build_create_if_absent, build_insert_head};
use crate::record::{ColumnSet, Record};
use crate::store::client::StoreClient;
use crate::stream::RecordSink;
use async_trait::async_trait;
use tracing::{debug, info};

/// Seam between batching and the store transport, so batching behavior is
/// testable without a live store.
#[async_trait]
pub trait BatchLoader: Send + Sync {
    async fn ensure_table(&self, table: &str, columns: &[String]) -> Result<()>;
    async fn load_batch(&self, table: &str, columns: &[String], rows: &[Record]) -> Result<()>;
}

#[async_trait]
impl BatchLoader for StoreClient {
    async fn ensure_table(&self, table: &str, columns: &[String]) -> Result<()> {
        let ddl = build_create_if_absent(table, columns)?;
        self.execute(&ddl).await
    }

    async fn load_batch(&self, table: &str, columns: &[String], rows: &[Record]) -> Result<()> {
        let head = build_insert_head(table, columns)?;
        self.insert_rows(&head, rows).await
    }
}

pub struct StoreRecordSink<L: BatchLoader> {
    loader: L,
    table: String,
    columns: ColumnSet,
    batch_size: usize,
    buffer: Vec<Record>,
    committed: u64,
    table_ready: bool,
}

impl<L: BatchLoader> StoreRecordSink<L> {
    pub fn new(loader: L, table: impl Into<String>, columns: ColumnSet, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(IngestError::Validation(
                "Batch size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            loader,
            table: table.into(),
            columns,
            batch_size,
            buffer: Vec::with_capacity(batch_size),
            committed: 0,
            table_ready: false,
        })
    }

    pub fn committed(&self) -> u64 {
        self.committed
    }

    /// Create the destination table if it does not exist yet. Runs before any
    /// record is consumed, so an empty source still leaves an empty table.
    async fn ensure_ready(&mut self) -> Result<()> {
        if self.table_ready {
            return Ok(());
        }
        self.loader
            .ensure_table(&self.table, &self.columns)
            .await
            .map_err(|e| IngestError::Load {
                reason: format!("could not ensure destination table: {}", e),
                rows_committed: self.committed,
            })?;
        self.table_ready = true;
        Ok(())
    }

    async fn flush_batch(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let batch = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.batch_size));
        let batch_len = batch.len() as u64;
        self.loader
            .load_batch(&self.table, &self.columns, &batch)
            .await
            .map_err(|e| IngestError::Load {
                reason: e.to_string(),
                rows_committed: self.committed,
            })?;

        self.committed += batch_len;
        debug!(table = %self.table, rows = batch_len, total = self.committed, "batch committed");
        Ok(())
    }
}

#[async_trait]
impl<L: BatchLoader> RecordSink for StoreRecordSink<L> {
    async fn write_record(&mut self, record: Record) -> Result<()> {
        self.ensure_ready().await?;
        self.buffer.push(record);
        if self.buffer.len() >= self.batch_size {
            self.flush_batch().await?;
        }
        Ok(())
    }

    async fn finish(&mut self) -> Result<u64> {
        self.ensure_ready().await?;
        self.flush_batch().await?;
        info!(table = %self.table, rows = self.committed, "load finished");
        Ok(self.committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::column_set;
    use std::sync::Mutex;

    /// Records every batch it receives; optionally fails a chosen batch.
    struct RecordingLoader {
        batches: Mutex<Vec<usize>>,
        ensured: Mutex<Vec<String>>,
        fail_on_batch: Option<usize>,
    }

    impl RecordingLoader {
        fn new() -> Self {
            Self {
                batches: Mutex::new(Vec::new()),
                ensured: Mutex::new(Vec::new()),
                fail_on_batch: None,
            }
        }

        fn failing_on(batch: usize) -> Self {
            Self {
                fail_on_batch: Some(batch),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl BatchLoader for &RecordingLoader {
        async fn ensure_table(&self, table: &str, _columns: &[String]) -> Result<()> {
            self.ensured.lock().unwrap().push(table.to_string());
            Ok(())
        }

        async fn load_batch(
            &self,
            _table: &str,
            _columns: &[String],
            rows: &[Record],
        ) -> Result<()> {
            let mut batches = self.batches.lock().unwrap();
            if self.fail_on_batch == Some(batches.len()) {
                return Err(IngestError::Query("insert rejected".to_string()));
            }
            batches.push(rows.len());
            Ok(())
        }
    }

    fn sample_record(columns: &ColumnSet, n: usize) -> Record {
        Record::new(columns.clone(), vec![Some(n.to_string())]).unwrap()
    }

    async fn load_n(loader: &RecordingLoader, n: usize, batch_size: usize) -> Result<u64> {
        let columns = column_set(vec!["id".to_string()]);
        let mut sink = StoreRecordSink::new(loader, "target", columns.clone(), batch_size)?;
        for i in 0..n {
            sink.write_record(sample_record(&columns, i)).await?;
        }
        sink.finish().await
    }

    #[tokio::test]
    async fn test_batching_boundaries() {
        for n in [999usize, 1000, 1001] {
            let loader = RecordingLoader::new();
            let committed = load_n(&loader, n, 1000).await.unwrap();
            assert_eq!(committed, n as u64, "all {} records must commit", n);

            let batches = loader.batches.lock().unwrap().clone();
            assert_eq!(batches.iter().sum::<usize>(), n);
            assert!(batches.iter().all(|&b| b <= 1000));
        }
    }

    #[tokio::test]
    async fn test_exact_batch_sizes() {
        let loader = RecordingLoader::new();
        load_n(&loader, 1001, 1000).await.unwrap();
        assert_eq!(*loader.batches.lock().unwrap(), vec![1000, 1]);
    }

    #[tokio::test]
    async fn test_zero_records_creates_table_but_loads_nothing() {
        let loader = RecordingLoader::new();
        let committed = load_n(&loader, 0, 1000).await.unwrap();
        assert_eq!(committed, 0);
        assert!(loader.batches.lock().unwrap().is_empty());
        // The destination table must exist even when the source is empty.
        assert_eq!(*loader.ensured.lock().unwrap(), vec!["target".to_string()]);
    }

    #[tokio::test]
    async fn test_table_ensured_once() {
        let loader = RecordingLoader::new();
        load_n(&loader, 2500, 1000).await.unwrap();
        assert_eq!(*loader.ensured.lock().unwrap(), vec!["target".to_string()]);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_reports_committed_rows() {
        // Second batch fails: the first 1000 rows stay committed and the
        // error says so.
        let loader = RecordingLoader::failing_on(1);
        let err = load_n(&loader, 2500, 1000).await.unwrap_err();
        match err {
            IngestError::Load { rows_committed, .. } => assert_eq!(rows_committed, 1000),
            other => panic!("expected Load error, got {:?}", other),
        }
        assert_eq!(*loader.batches.lock().unwrap(), vec![1000]);
    }

    #[tokio::test]
    async fn test_zero_batch_size_rejected() {
        let loader = RecordingLoader::new();
        let columns = column_set(vec!["id".to_string()]);
        assert!(StoreRecordSink::new(&loader, "t", columns, 0).is_err());
    }
}

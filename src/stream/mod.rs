//! Record streams and sinks - The transport layer of the pipeline
//!
//! Readers are pull-based, forward-only cursors: one suspension per I/O wait,
//! no callback wiring. Sinks consume records one at a time and report the
//! total written on `finish`. Reader and writer compose through one
//! sequential pull-loop driven by the orchestrator.

pub mod file_reader;
pub mod file_writer;
pub mod store_reader;
pub mod store_writer;

use crate::error::Result;
use crate::record::{ColumnSet, Record};
use async_trait::async_trait;

pub use file_reader::FileRecordStream;
pub use file_writer::FileRecordSink;
pub use store_reader::StoreRecordStream;
pub use store_writer::{BatchLoader, StoreRecordSink};

/// Ordered, non-restartable sequence of records with a fixed column set.
#[async_trait]
pub trait RecordStream: Send {
    /// Column identifiers every record of this stream carries, in order.
    fn columns(&self) -> &ColumnSet;

    /// Pull the next record; `None` once the stream is exhausted.
    async fn next_record(&mut self) -> Result<Option<Record>>;
}

/// Consumer of a record sequence.
#[async_trait]
pub trait RecordSink: Send {
    async fn write_record(&mut self, record: Record) -> Result<()>;

    /// Flush buffered records and return the total durably written.
    async fn finish(&mut self) -> Result<u64>;
}

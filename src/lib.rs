//! tabflow - Bidirectional ingestion between a columnar store and flat files
//!
//! Moves tabular data between a ClickHouse store (over its HTTP interface)
//! and delimited flat files, in either direction:
//! - Schema discovery (tables, columns in native order)
//! - Join-query construction across multiple tables
//! - Streaming record transport with bounded memory
//! - Chunked, batched loading into the destination
//!
//! One Job per invocation; a Job either fully succeeds with a record count or
//! fails. Committed batches are never rolled back; the failure carries the
//! count of rows that landed.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod preview;
pub mod query;
pub mod record;
pub mod service;
pub mod store;
pub mod stream;

pub use config::ServiceConfig;
pub use error::{IngestError, Result};
pub use pipeline::{CancelToken, JobResult, JobSpec, JobState, SourceSpec, TargetSpec};
pub use preview::FileInspection;
pub use query::{JoinSpec, SelectSource};
pub use record::{Projection, Record};
pub use service::{parse_delimiter, IngestService};
pub use store::{ColumnDescriptor, ConnectionProfile, TableDescriptor};

//! Pipeline Orchestrator - One Job from spec to result
//!
//! A Job is a linear state machine with no backward transitions:
//! `Idle -> ReadingSchema -> ColumnsReady -> Transferring -> Completed | Failed`.
//! The orchestrator validates the spec before any I/O, wires the reader into
//! the sink through one sequential pull-loop, and either reports a full
//! success with a count or fails. On a mid-stream load failure, batches
//! already committed stay in the destination; the count of committed rows
//! travels inside the error.

use crate::config::ServiceConfig;
use crate::error::{IngestError, Result};
use crate::query::{build_select, validate_bare_identifier, validate_identifier, SelectSource};
use crate::record::{column_set, ColumnSet, Projection};
use crate::store::{ConnectionProfile, StoreClient};
use crate::stream::{
    FileRecordSink, FileRecordStream, RecordSink, RecordStream, StoreRecordSink, StoreRecordStream,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SourceSpec {
    Store {
        profile: ConnectionProfile,
        source: SelectSource,
    },
    File {
        path: PathBuf,
        delimiter: u8,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum TargetSpec {
    Store {
        profile: ConnectionProfile,
        table: String,
    },
    File {
        /// File name inside the service output directory. A bare name, not a
        /// path: separators are rejected up front.
        file_name: String,
        delimiter: u8,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobSpec {
    pub source: SourceSpec,
    pub target: TargetSpec,
    pub projection: Projection,
}

/// Created only on full success of a Job.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobResult {
    pub run_id: String,
    pub records: u64,
    /// Populated for file targets.
    pub output_path: Option<PathBuf>,
}

/// States of one transfer Job. Previewing happens at the service layer,
/// before a Job exists, so it is not a state here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Idle,
    ReadingSchema,
    ColumnsReady,
    Transferring,
    Completed,
    Failed,
}

/// Cooperative cancellation flag, checked between records so a long transfer
/// can be aborted without waiting for it to finish.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drive every record from `reader` into `sink`, narrowing to `projection`
/// when the reader's native columns are wider (file sources may carry
/// unselected header columns; store sources already project in SQL).
pub async fn transfer(
    reader: &mut dyn RecordStream,
    sink: &mut dyn RecordSink,
    projection: &ColumnSet,
    cancel: &CancelToken,
) -> Result<u64> {
    loop {
        if cancel.is_cancelled() {
            return Err(IngestError::Cancelled);
        }
        match reader.next_record().await? {
            Some(record) => {
                let record = if record.columns() == projection.as_slice() {
                    record
                } else {
                    record.narrow(projection)?
                };
                sink.write_record(record).await?;
            }
            None => break,
        }
    }
    sink.finish().await
}

pub struct PipelineOrchestrator {
    config: ServiceConfig,
}

impl PipelineOrchestrator {
    pub fn new(config: ServiceConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self, spec: JobSpec) -> Result<JobResult> {
        self.run_with_cancel(spec, CancelToken::new()).await
    }

    pub async fn run_with_cancel(&self, spec: JobSpec, cancel: CancelToken) -> Result<JobResult> {
        let run_id = Uuid::new_v4().to_string();
        let mut state = JobState::Idle;
        info!(run_id = %run_id, "job started");

        let result = self.execute(&spec, &cancel, &run_id, &mut state).await;
        match &result {
            Ok(result) => {
                advance(&mut state, JobState::Completed, &run_id);
                info!(run_id = %run_id, records = result.records, "job completed");
            }
            Err(err) => {
                advance(&mut state, JobState::Failed, &run_id);
                warn!(run_id = %run_id, error = %err, "job failed");
            }
        }
        result
    }

    async fn execute(
        &self,
        spec: &JobSpec,
        cancel: &CancelToken,
        run_id: &str,
        state: &mut JobState,
    ) -> Result<JobResult> {
        // Everything here is rejected before any I/O happens.
        validate_pairing(spec)?;
        if let TargetSpec::Store { table, .. } = &spec.target {
            validate_identifier(table)?;
            // Destination columns become CREATE/INSERT column lists, so a
            // qualified projection identifier can never load into a store.
            for column in spec.projection.columns() {
                validate_bare_identifier(column)?;
            }
        }
        if let TargetSpec::File { file_name, .. } = &spec.target {
            validate_file_name(file_name)?;
        }

        advance(state, JobState::ReadingSchema, run_id);
        let projection = column_set(spec.projection.columns().to_vec());

        let mut reader: Box<dyn RecordStream> = match &spec.source {
            SourceSpec::Store { profile, source } => {
                let client = StoreClient::new(profile.clone());
                let query = build_select(source, &spec.projection, None)?;
                Box::new(StoreRecordStream::open(&client, &query, projection.clone()).await?)
            }
            SourceSpec::File { path, delimiter } => {
                Box::new(FileRecordStream::open(path, *delimiter)?)
            }
        };
        advance(state, JobState::ColumnsReady, run_id);

        let mut output_path = None;
        let mut sink: Box<dyn RecordSink> = match &spec.target {
            TargetSpec::Store { profile, table } => {
                let client = StoreClient::new(profile.clone());
                Box::new(StoreRecordSink::new(
                    client,
                    table.clone(),
                    projection.clone(),
                    self.config.batch_size,
                )?)
            }
            TargetSpec::File {
                file_name,
                delimiter,
            } => {
                let path = self.config.ensure_output_dir()?.join(file_name);
                let sink = FileRecordSink::create(&path, *delimiter, projection.clone())?;
                output_path = Some(sink.path().to_path_buf());
                Box::new(sink)
            }
        };

        advance(state, JobState::Transferring, run_id);
        let records = transfer(reader.as_mut(), sink.as_mut(), &projection, cancel).await?;

        Ok(JobResult {
            run_id: run_id.to_string(),
            records,
            output_path,
        })
    }
}

fn advance(state: &mut JobState, next: JobState, run_id: &str) {
    debug!(run_id = %run_id, from = ?state, to = ?next, "job state");
    *state = next;
}

fn validate_pairing(spec: &JobSpec) -> Result<()> {
    match (&spec.source, &spec.target) {
        (SourceSpec::Store { .. }, TargetSpec::File { .. }) => Ok(()),
        (SourceSpec::File { .. }, TargetSpec::Store { .. }) => Ok(()),
        (SourceSpec::Store { .. }, TargetSpec::Store { .. }) => Err(IngestError::Validation(
            "store-to-store transfers are not supported".to_string(),
        )),
        (SourceSpec::File { .. }, TargetSpec::File { .. }) => Err(IngestError::Validation(
            "file-to-file transfers are not supported".to_string(),
        )),
    }
}

fn validate_file_name(file_name: &str) -> Result<()> {
    if file_name.is_empty()
        || file_name.contains('/')
        || file_name.contains('\\')
        || file_name == "."
        || file_name == ".."
    {
        return Err(IngestError::Validation(format!(
            "Invalid output file name: {}",
            file_name
        )));
    }
    Ok(())
}

//! Ingestion Service - The narrow boundary the outer layers call
//!
//! One service instance per process; every operation constructs its own
//! store client from the profile it is handed, so nothing is cached or
//! shared across Jobs.

use crate::config::ServiceConfig;
use crate::error::{IngestError, Result};
use crate::pipeline::{CancelToken, JobResult, JobSpec, PipelineOrchestrator, SourceSpec};
use crate::preview::{self, FileInspection};
use crate::record::{Projection, Record};
use crate::store::{ColumnDescriptor, ConnectionProfile, SchemaCatalog, StoreClient, TableDescriptor};
use std::path::Path;

pub struct IngestService {
    config: ServiceConfig,
    orchestrator: PipelineOrchestrator,
}

impl IngestService {
    pub fn new(config: ServiceConfig) -> Self {
        let orchestrator = PipelineOrchestrator::new(config.clone());
        Self {
            config,
            orchestrator,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// List the tables of the profile's database.
    pub async fn discover_tables(
        &self,
        profile: &ConnectionProfile,
    ) -> Result<Vec<TableDescriptor>> {
        let client = StoreClient::new(profile.clone());
        SchemaCatalog::new(&client).list_tables().await
    }

    /// List the columns of a table, in the store's native order.
    pub async fn discover_columns(
        &self,
        profile: &ConnectionProfile,
        table: &str,
    ) -> Result<Vec<ColumnDescriptor>> {
        let client = StoreClient::new(profile.clone());
        SchemaCatalog::new(&client).list_columns(table).await
    }

    /// Sample a configured source without touching any destination.
    pub async fn preview(
        &self,
        source: &SourceSpec,
        projection: &Projection,
    ) -> Result<Vec<Record>> {
        match source {
            SourceSpec::Store {
                profile,
                source: select,
            } => preview::sample_store(profile, select, projection, self.config.preview_limit).await,
            SourceSpec::File { path, delimiter } => {
                preview::sample_file(path, *delimiter, projection).await
            }
        }
    }

    /// Discover a delimited file's schema plus a small sample and row count.
    pub async fn inspect_file(
        &self,
        path: impl AsRef<Path>,
        delimiter: u8,
    ) -> Result<FileInspection> {
        preview::inspect_file(path, delimiter).await
    }

    /// Run a full transfer Job.
    pub async fn run_ingestion(&self, spec: JobSpec) -> Result<JobResult> {
        self.orchestrator.run(spec).await
    }

    /// Run a full transfer Job with an external cancellation handle.
    pub async fn run_ingestion_with_cancel(
        &self,
        spec: JobSpec,
        cancel: CancelToken,
    ) -> Result<JobResult> {
        self.orchestrator.run_with_cancel(spec, cancel).await
    }
}

/// Parse an operator-supplied delimiter: a name (`comma`, `semicolon`, `tab`,
/// `pipe`) or a literal single character.
pub fn parse_delimiter(input: &str) -> Result<u8> {
    match input {
        "comma" | "," => Ok(b','),
        "semicolon" | ";" => Ok(b';'),
        "tab" | "\t" => Ok(b'\t'),
        "pipe" | "|" => Ok(b'|'),
        other if other.len() == 1 && other.is_ascii() => Ok(other.as_bytes()[0]),
        other => Err(IngestError::Validation(format!(
            "Unsupported delimiter: {:?} (expected comma, semicolon, tab, pipe, or one character)",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delimiter_names_and_literals() {
        assert_eq!(parse_delimiter("comma").unwrap(), b',');
        assert_eq!(parse_delimiter("semicolon").unwrap(), b';');
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert_eq!(parse_delimiter("pipe").unwrap(), b'|');
        assert_eq!(parse_delimiter(";").unwrap(), b';');

        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("||").is_err());
        assert!(parse_delimiter("é").is_err());
    }
}

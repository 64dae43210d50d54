//! Service Configuration - Explicit, per-service settings
//!
//! The output directory is an explicit value handed to file-handling
//! collaborators, not process-global state. It is created on demand and
//! owned for the duration of one Job.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of records per store insert batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default number of records returned by a preview.
pub const DEFAULT_PREVIEW_LIMIT: u64 = 100;

/// Number of sample rows captured during file inspection.
pub const INSPECT_SAMPLE_ROWS: usize = 5;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Directory where exported files are written and uploaded files are read from.
    pub output_dir: PathBuf,

    /// Records per insert batch when loading into the store.
    pub batch_size: usize,

    /// Maximum rows returned by a preview.
    pub preview_limit: u64,
}

impl ServiceConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Ensure the output directory exists, creating it if absent.
    pub fn ensure_output_dir(&self) -> Result<&Path> {
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(&self.output_dir)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new("uploads")
    }
}

//! File Record Stream - Delimited file source
//!
//! The first line is the header and fixes the column set for every data
//! line. One disk read per pull; restartable only by reopening the file.
//! A short row pads absent trailing columns with the empty string. A row
//! with more fields than the header is rejected outright rather than
//! silently truncated.

use crate::error::{IngestError, Result};
use crate::record::{column_set, ColumnSet, Record};
use crate::stream::RecordStream;
use async_trait::async_trait;
use std::fs::File;
use std::path::Path;

pub struct FileRecordStream {
    reader: csv::Reader<File>,
    columns: ColumnSet,
    row: csv::StringRecord,
    line: u64,
}

impl FileRecordStream {
    pub fn open(path: impl AsRef<Path>, delimiter: u8) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        Ok(Self {
            reader,
            columns: column_set(columns),
            row: csv::StringRecord::new(),
            line: 1,
        })
    }
}

#[async_trait]
impl RecordStream for FileRecordStream {
    fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    async fn next_record(&mut self) -> Result<Option<Record>> {
        if !self.reader.read_record(&mut self.row)? {
            return Ok(None);
        }
        self.line += 1;

        if self.row.len() > self.columns.len() {
            return Err(IngestError::Validation(format!(
                "Line {} has {} fields but the header declares {} columns",
                self.line,
                self.row.len(),
                self.columns.len()
            )));
        }

        let mut values = Vec::with_capacity(self.columns.len());
        for idx in 0..self.columns.len() {
            values.push(Some(self.row.get(idx).unwrap_or("").to_string()));
        }
        Ok(Some(Record::new(self.columns.clone(), values)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn stream_over(contents: &str, delimiter: u8) -> FileRecordStream {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        FileRecordStream::open(file.path(), delimiter).unwrap()
    }

    #[tokio::test]
    async fn test_header_fixes_columns() {
        let mut stream = stream_over("id,name\n1,Ann\n2,O'Brien\n", b',');
        assert_eq!(
            stream.columns().as_slice(),
            &["id".to_string(), "name".to_string()]
        );

        let first = stream.next_record().await.unwrap().unwrap();
        assert_eq!(first.get("name"), Some(Some("Ann")));

        let second = stream.next_record().await.unwrap().unwrap();
        assert_eq!(second.get("name"), Some(Some("O'Brien")));

        assert!(stream.next_record().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_file_yields_empty_stream() {
        let mut stream = stream_over("id,name\n", b',');
        assert!(stream.next_record().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_short_row_pads_trailing_columns() {
        let mut stream = stream_over("id,name,email\n1,Ann\n", b',');
        let record = stream.next_record().await.unwrap().unwrap();
        assert_eq!(record.get("email"), Some(Some("")));
    }

    #[tokio::test]
    async fn test_long_row_is_rejected() {
        let mut stream = stream_over("id,name\n1,Ann,extra\n", b',');
        let err = stream.next_record().await.unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
        assert!(err.to_string().contains("Line 2"));
    }

    #[tokio::test]
    async fn test_alternate_delimiter() {
        let mut stream = stream_over("id|name\n1|Ann\n", b'|');
        let record = stream.next_record().await.unwrap().unwrap();
        assert_eq!(record.get("id"), Some(Some("1")));
        assert_eq!(record.get("name"), Some(Some("Ann")));
    }

    #[tokio::test]
    async fn test_quoted_field_with_delimiter_and_newline() {
        let mut stream = stream_over("id,note\n1,\"a,b\nc\"\n", b',');
        let record = stream.next_record().await.unwrap().unwrap();
        assert_eq!(record.get("note"), Some(Some("a,b\nc")));
    }
}

//! File Record Sink - Delimited file target
//!
//! Writes one header line of column identifiers followed by one line per
//! record. Fields containing the delimiter, a quote, or a newline are quoted
//! per conventional delimited-file rules so a written file always round-trips
//! through the file reader. Null values serialize as empty fields.

use crate::error::Result;
use crate::record::{ColumnSet, Record};
use crate::stream::RecordSink;
use async_trait::async_trait;
use std::fs::File;
use std::path::{Path, PathBuf};

pub struct FileRecordSink {
    writer: csv::Writer<File>,
    columns: ColumnSet,
    path: PathBuf,
    written: u64,
}

impl FileRecordSink {
    pub fn create(path: impl AsRef<Path>, delimiter: u8, columns: ColumnSet) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(file);
        writer.write_record(columns.iter())?;

        Ok(Self {
            writer,
            columns,
            path,
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }
}

#[async_trait]
impl RecordSink for FileRecordSink {
    async fn write_record(&mut self, record: Record) -> Result<()> {
        let fields = record.values().iter().map(|v| v.as_deref().unwrap_or(""));
        self.writer.write_record(fields)?;
        self.written += 1;
        Ok(())
    }

    async fn finish(&mut self) -> Result<u64> {
        self.writer.flush()?;
        Ok(self.written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::column_set;

    fn record(columns: &ColumnSet, values: &[Option<&str>]) -> Record {
        Record::new(
            columns.clone(),
            values.iter().map(|v| v.map(|s| s.to_string())).collect(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.csv");
        let columns = column_set(vec!["id".to_string(), "name".to_string()]);

        let mut sink = FileRecordSink::create(&path, b',', columns.clone()).unwrap();
        sink.write_record(record(&columns, &[Some("1"), Some("Ann")]))
            .await
            .unwrap();
        sink.write_record(record(&columns, &[Some("2"), Some("O'Brien")]))
            .await
            .unwrap();
        let written = sink.finish().await.unwrap();

        assert_eq!(written, 2);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "id,name\n1,Ann\n2,O'Brien\n");
    }

    #[tokio::test]
    async fn test_embedded_delimiter_and_newline_are_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.csv");
        let columns = column_set(vec!["note".to_string()]);

        let mut sink = FileRecordSink::create(&path, b',', columns.clone()).unwrap();
        sink.write_record(record(&columns, &[Some("a,b")]))
            .await
            .unwrap();
        sink.write_record(record(&columns, &[Some("line1\nline2")]))
            .await
            .unwrap();
        sink.write_record(record(&columns, &[Some("say \"hi\"")]))
            .await
            .unwrap();
        sink.finish().await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "note\n\"a,b\"\n\"line1\nline2\"\n\"say \"\"hi\"\"\"\n"
        );
    }

    #[tokio::test]
    async fn test_null_serializes_as_empty_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nulls.csv");
        let columns = column_set(vec!["id".to_string(), "note".to_string()]);

        let mut sink = FileRecordSink::create(&path, b',', columns.clone()).unwrap();
        sink.write_record(record(&columns, &[Some("1"), None]))
            .await
            .unwrap();
        sink.finish().await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "id,note\n1,\n");
    }

    #[tokio::test]
    async fn test_zero_records_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let columns = column_set(vec!["id".to_string()]);

        let mut sink = FileRecordSink::create(&path, b',', columns).unwrap();
        let written = sink.finish().await.unwrap();

        assert_eq!(written, 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "id\n");
    }
}

//! Write row streams to CSV files.

use std::path::Path;

use ::csv::{QuoteStyle, WriterBuilder};
use futures_util::{Stream, StreamExt};
use tracing::{info, warn};

use crate::models::{value_to_text, Row};
use crate::Result;

/// Options for [`to_csv`].
///
/// # Example
///
/// ```
/// use enverus_rs::export::CsvOptions;
///
/// let options = CsvOptions::default().with_delimiter(b'|').with_log_progress(true);
/// assert_eq!(options.delimiter, b'|');
/// ```
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Field delimiter
    pub delimiter: u8,
    /// When fields are quoted
    pub quoting: QuoteStyle,
    /// Log progress while writing
    pub log_progress: bool,
    /// Rows between progress lines
    pub progress_interval: u64,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quoting: QuoteStyle::Necessary,
            log_progress: false,
            progress_interval: 100_000,
        }
    }
}

impl CsvOptions {
    /// Set the field delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the quoting style.
    pub fn with_quoting(mut self, quoting: QuoteStyle) -> Self {
        self.quoting = quoting;
        self
    }

    /// Enable or disable progress logging.
    pub fn with_log_progress(mut self, enabled: bool) -> Self {
        self.log_progress = enabled;
        self
    }

    /// Set how many rows pass between progress lines.
    pub fn with_progress_interval(mut self, rows: u64) -> Self {
        self.progress_interval = rows;
        self
    }
}

/// Drain `rows` into a CSV file at `path`.
///
/// The header is taken from the first row's fields, in order. Later rows are
/// written in header order: missing fields are left empty and fields the
/// first row lacked are dropped. An empty stream produces an empty file.
///
/// Returns the number of data rows written (the file has one more line).
///
/// # Errors
///
/// The first error from the stream aborts the export and is returned; the
/// file keeps the rows written so far.
pub async fn to_csv<S, P>(rows: S, path: P, options: &CsvOptions) -> Result<u64>
where
    S: Stream<Item = Result<Row>>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let mut writer = WriterBuilder::new()
        .delimiter(options.delimiter)
        .quote_style(options.quoting)
        .from_path(path)?;

    futures_util::pin_mut!(rows);

    let mut header: Option<Vec<String>> = None;
    let mut written: u64 = 0;
    let mut warned_extra = false;

    while let Some(row) = rows.next().await {
        let row = row?;

        if header.is_none() {
            let columns: Vec<String> = row.keys().cloned().collect();
            writer.write_record(&columns)?;
            header = Some(columns);
        }

        if let Some(columns) = &header {
            let matched = columns.iter().filter(|c| row.contains_key(c.as_str())).count();
            if matched < row.len() && !warned_extra {
                warn!(
                    path = %path.display(),
                    "row has fields missing from the CSV header; they are dropped"
                );
                warned_extra = true;
            }

            let record = columns
                .iter()
                .map(|c| row.get(c).and_then(value_to_text).unwrap_or_default());
            writer.write_record(record)?;
        }

        written += 1;
        if options.log_progress
            && options.progress_interval > 0
            && written % options.progress_interval == 0
        {
            info!(rows = written, path = %path.display(), "writing CSV");
        }
    }

    writer.flush()?;

    if options.log_progress {
        info!(rows = written, path = %path.display(), "finished writing CSV");
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rigs.csv");

        let rows = futures_util::stream::iter(vec![
            Ok(row(json!({"RigID": 1, "Name": "Alpha, Inc", "Depth": null}))),
            Ok(row(json!({"RigID": 2, "Name": "Bravo", "Depth": 12000.5}))),
            Ok(row(json!({"Name": "Charlie", "RigID": 3}))),
        ]);

        let written = to_csv(rows, &path, &CsvOptions::default()).await.unwrap();
        assert_eq!(written, 3);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "RigID,Name,Depth");
        assert_eq!(lines[1], "1,\"Alpha, Inc\",");
        assert_eq!(lines[2], "2,Bravo,12000.5");
        assert_eq!(lines[3], "3,Charlie,");
    }

    #[tokio::test]
    async fn test_custom_delimiter_and_quoting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tsv");

        let rows = futures_util::stream::iter(vec![Ok(row(json!({"a": "x", "b": 1})))]);
        let options = CsvOptions::default()
            .with_delimiter(b'\t')
            .with_quoting(QuoteStyle::Always);

        to_csv(rows, &path, &options).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "\"a\"\t\"b\"\n\"x\"\t\"1\"\n");
    }

    #[tokio::test]
    async fn test_empty_stream_writes_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        let rows = futures_util::stream::iter(Vec::<Result<Row>>::new());
        let written = to_csv(rows, &path, &CsvOptions::default()).await.unwrap();

        assert_eq!(written, 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[tokio::test]
    async fn test_stream_error_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.csv");

        let rows = futures_util::stream::iter(vec![
            Ok(row(json!({"a": 1}))),
            Err(Error::Dataset("rigs".into())),
        ]);

        let err = to_csv(rows, &path, &CsvOptions::default()).await.unwrap_err();
        assert!(matches!(err, Error::Dataset(_)));
    }
}

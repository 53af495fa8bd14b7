//! # sommelier-ingest
//!
//! Loads the tabular dataset into [`Document`]s.
//!
//! Rows whose required field (default `variety`) is empty are dropped here,
//! before anything reaches the encoder. Numeric cells become numbers, empty
//! cells are left out of the document entirely.

use std::io::Read;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use sommelier_types::{Document, FieldValue};

/// Columns every dataset must carry.
pub const DEFAULT_COLUMNS: &[&str] = &["name", "region", "variety", "notes"];

/// Errors while reading a dataset.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Dataset is missing required column '{0}'")]
    MissingColumn(String),
}

/// CSV loader configuration.
#[derive(Debug, Clone)]
pub struct CsvLoader {
    required_columns: Vec<String>,
    drop_if_empty: Option<String>,
}

impl Default for CsvLoader {
    fn default() -> Self {
        Self {
            required_columns: DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            drop_if_empty: Some("variety".to_string()),
        }
    }
}

impl CsvLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the set of columns the header must contain.
    pub fn with_required_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Drop rows where this column is missing or blank.
    pub fn with_drop_if_empty(mut self, column: impl Into<String>) -> Self {
        self.drop_if_empty = Some(column.into());
        self
    }

    /// Keep every row regardless of blank cells.
    pub fn keep_all_rows(mut self) -> Self {
        self.drop_if_empty = None;
        self
    }

    /// Load documents from a CSV file.
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<Vec<Document>, IngestError> {
        let path = path.as_ref();
        info!(path = ?path, "Loading dataset");
        let file = std::fs::File::open(path)?;
        self.load_reader(file)
    }

    /// Load documents from any CSV source with a header row.
    pub fn load_reader<R: Read>(&self, reader: R) -> Result<Vec<Document>, IngestError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect();

        for column in &self.required_columns {
            if !headers.iter().any(|h| h == column) {
                return Err(IngestError::MissingColumn(column.clone()));
            }
        }

        let mut documents = Vec::new();
        let mut dropped = 0usize;

        for record in csv_reader.records() {
            let record = record?;
            let doc: Document = headers
                .iter()
                .zip(record.iter())
                .filter(|(_, cell)| !cell.trim().is_empty())
                .map(|(header, cell)| (header.clone(), FieldValue::parse(cell)))
                .collect();

            if let Some(column) = &self.drop_if_empty {
                if !doc.has_value(column) {
                    dropped += 1;
                    debug!(column = %column, "Dropping row with empty required field");
                    continue;
                }
            }

            documents.push(doc);
        }

        info!(kept = documents.len(), dropped, "Dataset loaded");
        Ok(documents)
    }
}

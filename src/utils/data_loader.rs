//! Data loading utilities

use crate::error::{FoldwiseError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Where a table comes from: a file on disk or a frame already in memory.
#[derive(Debug, Clone)]
pub enum TableSource {
    Path(PathBuf),
    Frame(DataFrame),
}

impl TableSource {
    /// Resolve the source into a DataFrame
    pub fn load(self, loader: &DataLoader) -> Result<DataFrame> {
        match self {
            TableSource::Path(path) => loader.load_auto(&path),
            TableSource::Frame(df) => Ok(df),
        }
    }
}

impl From<&str> for TableSource {
    fn from(path: &str) -> Self {
        TableSource::Path(PathBuf::from(path))
    }
}

impl From<String> for TableSource {
    fn from(path: String) -> Self {
        TableSource::Path(PathBuf::from(path))
    }
}

impl From<&Path> for TableSource {
    fn from(path: &Path) -> Self {
        TableSource::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for TableSource {
    fn from(path: PathBuf) -> Self {
        TableSource::Path(path)
    }
}

impl From<&PathBuf> for TableSource {
    fn from(path: &PathBuf) -> Self {
        TableSource::Path(path.clone())
    }
}

impl From<DataFrame> for TableSource {
    fn from(df: DataFrame) -> Self {
        TableSource::Frame(df)
    }
}

/// Data loader for delimited text and Parquet files
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Field separator for delimited text
    delimiter: u8,
    /// Whether the first line holds column names
    has_header: bool,
    /// Rows scanned to infer column types
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            infer_schema_length: Some(100),
        }
    }

    /// Set the field separator
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set whether files carry a header row
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Set how many rows are used for type inference (`None` scans everything)
    pub fn with_infer_schema_length(mut self, n: Option<usize>) -> Self {
        self.infer_schema_length = n;
        self
    }

    /// Load a CSV file with the loader's settings
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        self.load_csv_with_options(path, self.delimiter, self.has_header, 0)
    }

    /// Load a delimited file with explicit options
    pub fn load_csv_with_options(
        &self,
        path: impl AsRef<Path>,
        delimiter: u8,
        has_header: bool,
        skip_rows: usize,
    ) -> Result<DataFrame> {
        let file = open(path.as_ref())?;

        let parse_opts = CsvParseOptions::default().with_separator(delimiter);

        CsvReadOptions::default()
            .with_has_header(has_header)
            .with_skip_rows(skip_rows)
            .with_infer_schema_length(self.infer_schema_length)
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| FoldwiseError::DataError(e.to_string()))
    }

    /// Load a Parquet file
    pub fn load_parquet(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let file = open(path.as_ref())?;

        ParquetReader::new(file)
            .finish()
            .map_err(|e| FoldwiseError::DataError(e.to_string()))
    }

    /// Detect file format from extension and load
    pub fn load_auto(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "tsv" => self.load_csv_with_options(path, b'\t', self.has_header, 0),
            "parquet" | "pq" => self.load_parquet(path),
            // CSV is the default for anything else
            _ => self.load_csv(path),
        }
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path)
        .map_err(|e| FoldwiseError::DataError(format!("{}: {}", path.display(), e)))
}

/// Save DataFrames to disk
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV
    pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path.as_ref())
            .map_err(|e| FoldwiseError::DataError(e.to_string()))?;

        CsvWriter::new(&mut file)
            .finish(df)
            .map_err(|e| FoldwiseError::DataError(e.to_string()))
    }
}

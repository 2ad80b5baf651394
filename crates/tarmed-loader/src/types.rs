//! Loader-specific types: errors and configuration.

use std::path::PathBuf;

use tarmed_types::well_known::DEFAULT_RELEVANT_TARIFF;
use thiserror::Error;

/// Errors that can occur while loading, packaging, evaluating or exporting.
#[derive(Error, Debug)]
pub enum PackagerError {
    /// I/O error reading or writing a file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON error while reading or writing a rule file.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Required column missing from the input table.
    #[error("Required column '{column}' is missing from the input table")]
    MissingColumn {
        /// The name of the missing column.
        column: String,
    },

    /// A row has a different number of fields than the header.
    #[error("Row {row} has {found} fields, expected {expected}")]
    RowLength {
        /// Zero-based data row index.
        row: usize,
        /// Number of header columns.
        expected: usize,
        /// Number of fields in the row.
        found: usize,
    },

    /// Invalid date value in the date column.
    #[error("Invalid date format: {value}")]
    InvalidDate {
        /// The invalid date value.
        value: String,
    },

    /// Aggregate export without any rule.
    #[error("No rules defined")]
    NoRules,

    /// Operation that needs a loaded table, but none is loaded.
    #[error("No data loaded")]
    NoData,

    /// Malformed rule file.
    #[error("Invalid rule file: {0}")]
    Format(String),

    /// File not found.
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Directory not found.
    #[error("Directory not found: {path}")]
    DirectoryNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Input file with an extension the loader does not read.
    #[error("Unsupported file type (expected .csv or .txt): {path}")]
    UnsupportedFile {
        /// The offending path.
        path: String,
    },

    /// Category list expected but not found.
    #[error("No category file found next to {path}")]
    MissingCategories {
        /// The data file or directory that was searched.
        path: String,
    },
}

/// Result type for packager operations.
pub type PackagerResult<T> = Result<T, PackagerError>;

/// Configuration for ingestion, packaging and export.
#[derive(Debug, Clone)]
pub struct PackagingConfig {
    /// Marker of the relevant tariff system, matched case-insensitively
    /// as a substring of the tariff group.
    pub relevant_tariff: String,
    /// Whether loading fails when no category list is found.
    pub require_categories: bool,
    /// Field delimiter of input and output files.
    pub delimiter: u8,
    /// Whether exported sheets carry the alternating package band column.
    pub band_column: bool,
}

impl Default for PackagingConfig {
    fn default() -> Self {
        Self {
            relevant_tariff: DEFAULT_RELEVANT_TARIFF.to_string(),
            require_categories: false,
            delimiter: b',',
            band_column: true,
        }
    }
}

impl PackagingConfig {
    /// Creates a config for semicolon-separated exports.
    pub fn semicolon() -> Self {
        Self {
            delimiter: b';',
            ..Self::default()
        }
    }
}

/// Discovered input files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputFiles {
    /// Path to the line item table.
    pub data_file: PathBuf,
    /// Path to the ordered category list, if any.
    pub category_file: Option<PathBuf>,
}

impl InputFiles {
    /// Creates input files for a data file without categories.
    pub fn new(data_file: impl Into<PathBuf>) -> Self {
        Self {
            data_file: data_file.into(),
            category_file: None,
        }
    }

    /// Sets the category file.
    pub fn with_categories(mut self, category_file: impl Into<PathBuf>) -> Self {
        self.category_file = Some(category_file.into());
        self
    }

    /// Returns true if a category list is available.
    pub fn has_categories(&self) -> bool {
        self.category_file.is_some()
    }
}

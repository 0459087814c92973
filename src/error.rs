//! Error types for loading FEA results and analysing stress fields.

use std::path::PathBuf;
use thiserror::Error;

use crate::record::ScalarField;

/// A record whose sequences disagree in length or whose node ids repeat.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RecordError {
    #[error("{what} has {got} entries, expected {expected}")]
    LengthMismatch {
        /// Name of the offending sequence.
        what: String,
        expected: usize,
        got: usize,
    },
    #[error("node id {0} appears more than once")]
    DuplicateNodeId(i64),
}

/// Errors produced while reading a result file.
///
/// Apart from [`LoadError::UnsupportedFormat`], every variant is a load failure:
/// the file was recognized but could not be turned into a record.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported result file format: .{extension}")]
    UnsupportedFormat {
        /// The unrecognized extension, or `(none)`.
        extension: String,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse table {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        /// 1-based line (or data row) where the problem was found.
        line: usize,
        message: String,
    },

    #[error("inconsistent result data in {}: {source}", path.display())]
    InvalidRecord {
        path: PathBuf,
        #[source]
        source: RecordError,
    },

    #[error("no reader available for {format} files, cannot load {}", path.display())]
    ReaderUnavailable {
        path: PathBuf,
        /// Human readable name of the format.
        format: &'static str,
    },
}

impl LoadError {
    /// `true` for an unrecognized extension, `false` for every load failure.
    pub fn is_unsupported_format(&self) -> bool {
        matches!(self, LoadError::UnsupportedFormat { .. })
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        LoadError::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}

/// Errors produced by the stress analyzer.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no {0} data found in results")]
    MissingField(ScalarField),

    #[error("stress sample is empty")]
    EmptyInput,

    #[error("sample {index} is not a finite number ({value})")]
    NonFiniteSample { index: usize, value: f64 },

    #[error("failed to write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write statistics table {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

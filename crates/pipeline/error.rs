use polars::prelude::PolarsError;
use thiserror::Error;

/// Failures while reading the student file.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("polars failed to read the source: {0}")]
    Polars(#[from] PolarsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("required column '{0}' was not found in the source file")]
    ColumnNotFound(String),
    #[error("column '{column}' could not be read as {expected} (found {found})")]
    ColumnWrongType {
        column: String,
        expected: &'static str,
        found: String,
    },
    #[error("column '{column}' has a missing value at row {row}")]
    MissingValues { column: String, row: usize },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    DataLoad(#[from] LoadError),
    #[error("no students in {0}, the dropout rate is undefined")]
    EmptyDataset(String),
    #[error("no courses to rank in {0}")]
    EmptyAggregate(String),
    #[error("modality '{0}' does not exist in the source")]
    UnknownModality(String),
    #[error("course '{course}' does not exist in modality '{modality}'")]
    UnknownCourse { modality: String, course: String },
}

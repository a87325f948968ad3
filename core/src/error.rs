use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed table {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Model error: {0}")]
    Model(#[from] candle_core::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Table {path} is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Table {path}, row {row}, column '{column}': '{value}' is not a finite number")]
    InvalidNumber {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },

    #[error("Table {path}, row {row}: '{value}' is not a binary label")]
    InvalidLabel {
        path: PathBuf,
        row: usize,
        value: String,
    },

    #[error("Table {path} lists txId '{tx_id}' more than once")]
    DuplicateTxId { path: PathBuf, tx_id: String },

    #[error("Insufficient data: {licit} licit rows cannot balance {illicit} illicit rows")]
    InsufficientData { illicit: usize, licit: usize },

    #[error("Insufficient features: need {required} feature columns, found {found}")]
    InsufficientFeatures { required: usize, found: usize },

    #[error("Empty join: no txId in {features_path} matched {labels_path}")]
    EmptyJoin {
        features_path: PathBuf,
        labels_path: PathBuf,
    },

    #[error("Degenerate class: {partition} partition has no rows with label {missing_label}")]
    DegenerateClass {
        partition: &'static str,
        missing_label: u8,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

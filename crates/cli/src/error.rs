use filter::error::FilterError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read input file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to compile the filter: {0}")]
    Filter(#[from] FilterError),

    #[error("Failed to serialize output to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),
}

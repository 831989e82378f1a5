use thiserror::Error;

mod ids;

pub use ids::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid block ID format: {0}")]
    InvalidId(String),

    #[error("Empty required field: {0}")]
    EmptyField(&'static str),

    #[error("Value out of bounds: {value}, expected {min}..={max}")]
    OutOfBounds { value: u64, min: u64, max: u64 },

    #[error("Invalid file path: {path} - {reason}")]
    InvalidFilePath { path: String, reason: String },
}

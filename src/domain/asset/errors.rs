//! Asset Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Failed to read mapping document {path}: {message}")]
    Io { path: String, message: String },

    #[error("Invalid mapping document: {0}")]
    Parse(String),

    #[error("Category default without keyword list: {0}")]
    OrphanCategoryDefault(String),

    #[error("Empty asset path for {0}")]
    EmptyAsset(String),
}

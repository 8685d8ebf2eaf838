//! Error types for the schema registry

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Invalid StructureDefinition: {0}")]
    InvalidStructureDefinition(String),

    #[error("Invalid cardinality '{0}'")]
    InvalidCardinality(String),

    #[error("Base type '{base}' of {type_name} is not loaded")]
    UnresolvedBase { type_name: String, base: String },

    #[error("Invalid schema table: {0}")]
    InvalidTable(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

//! Error types for FHIR data type decoding

use thiserror::Error;

/// A decoding failure. Every variant tied to a document location carries the
/// FHIR path of the offending element (e.g. `Timing.repeat.bounds[x]`).
#[derive(Error, Debug)]
pub enum Error {
    #[error("{path}: more than one choice variant is populated ({})", .keys.join(", "))]
    ChoiceConflict { path: String, keys: Vec<String> },

    #[error("{path}: required field is missing")]
    RequiredFieldMissing { path: String },

    #[error("{path}: '{key}' is not an allowed variant")]
    UnknownVariant { path: String, key: String },

    #[error("{path}: unknown element '{key}'")]
    UnknownElement { path: String, key: String },

    #[error("{path}: at most {max} entries allowed, found {found}")]
    TooMany { path: String, max: u32, found: usize },

    #[error("{path}: at least {min} entries required, found {found}")]
    TooFew { path: String, min: u32, found: usize },

    #[error("{path}: invalid {type_code}: {reason}")]
    InvalidPrimitive {
        path: String,
        type_code: String,
        reason: String,
    },

    #[error("{path}: expected {expected}, found {found}")]
    UnexpectedShape {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{path}: nesting exceeds the maximum depth of {max_depth}")]
    TooDeep { path: String, max_depth: usize },

    #[error("{path}: '{key}' is only kept by a generic record, not by the typed struct")]
    NotRepresentable { path: String, key: String },

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Malformed {type_name}: {message}")]
    Malformed { type_name: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Schema(#[from] fhirtypes_schema::Error),
}

impl Error {
    /// FHIR path of the failing element, when the error is tied to one
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::ChoiceConflict { path, .. }
            | Error::RequiredFieldMissing { path }
            | Error::UnknownVariant { path, .. }
            | Error::UnknownElement { path, .. }
            | Error::TooMany { path, .. }
            | Error::TooFew { path, .. }
            | Error::InvalidPrimitive { path, .. }
            | Error::UnexpectedShape { path, .. }
            | Error::TooDeep { path, .. }
            | Error::NotRepresentable { path, .. } => Some(path),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Short name of a JSON value's kind, for shape errors
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

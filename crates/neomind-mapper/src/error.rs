//! Error types for the mapper crate.

use crate::types::TypePair;

/// Mapper error types.
#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    /// Source or destination argument is missing.
    #[error("Argument is null: {0}")]
    NullArgument(String),

    /// The registry has never been configured.
    #[error("Mapping registry is not initialized")]
    RegistryUninitialized,

    /// The copy could not produce a valid destination.
    #[error("Mapping {pair} failed: {message}")]
    MappingFailure { pair: TypePair, message: String },

    /// A strict rule left destination members without a source.
    #[error("Mapping {pair} has unmapped destination members: {}", .members.join(", "))]
    UnmappedMembers { pair: TypePair, members: Vec<String> },

    /// A member transform returned an error.
    #[error("Transform for member '{member}' failed: {source}")]
    Transform {
        member: String,
        #[source]
        source: anyhow::Error,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid rule or option.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for mapper operations.
pub type Result<T> = std::result::Result<T, MapperError>;

impl MapperError {
    /// Shorthand for a mapping failure on `pair`.
    pub fn mapping(pair: TypePair, message: impl Into<String>) -> Self {
        MapperError::MappingFailure {
            pair,
            message: message.into(),
        }
    }

    /// Whether the error was raised before any member was touched.
    pub fn is_null_argument(&self) -> bool {
        matches!(self, MapperError::NullArgument(_))
    }
}

impl From<serde_json::Error> for MapperError {
    fn from(err: serde_json::Error) -> Self {
        MapperError::Serialization(err.to_string())
    }
}

//! Error taxonomy for the editing core.
//!
//! Every variant is recovered inside the core and surfaced to the host as a
//! validation report or banner; none of them abort an editing session.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    /// The document does not parse as JSON.
    #[error("invalid JSON at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// The document parses but does not satisfy the configured schema.
    #[error("{count} schema violation(s), first: {first}")]
    SchemaViolation { count: usize, first: String },

    /// A schema was configured but could not be turned into a validator.
    #[error("schema validation unavailable: {0}")]
    SchemaEngineUnavailable(String),

    /// A structured value could not be serialized into the buffer.
    #[error("could not serialize value: {0}")]
    Serialization(String),

    /// Table mode was requested for a document that is not a JSON array.
    #[error("cannot show table: {0}")]
    TableConstruction(String),

    /// A form edit needs the document to be a single entity object.
    #[error("not an entity: {0}")]
    NotAnEntity(String),

    /// A form edit targeted a field that cannot be changed.
    #[error("field `{0}` is read-only")]
    ReadOnlyField(String),
}

/// Reasons a JSON Schema document cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("schema must be an object or boolean")]
    NotASchema,

    #[error("{0}")]
    Invalid(String),
}

//! Query-parameter translation layer
//!
//! Turns the wire-level query surface (textual filter expressions, structured
//! JSON filters, typed variable payloads, sorting and pagination parameters)
//! into validated criteria that are replayed onto an engine query object.
//! Everything here fails before the first engine call: a request either
//! produces a fully converted criteria set or a 400.

pub mod criteria;
pub mod filter;
pub mod instructions;
pub mod pagination;
pub mod params;
pub mod sorting;
pub mod value;

/// A request parameter that could not be parsed, converted or validated.
///
/// The message is final wire text; callers that add an operation context
/// (e.g. `Cannot deliver message`) do so through [`ParamError::context`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ParamError(pub String);

impl ParamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// Prefix the message with an operation-specific context string.
    #[must_use]
    pub fn context(self, context: &str) -> Self {
        Self(format!("{context}: {}", self.0))
    }
}

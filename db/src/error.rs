//! Error taxonomy for the wrapper.
//!
//! Every fallible public operation returns exactly one of these kinds:
//! invalid-state errors for contract violations (wrong open/read state),
//! invalid-argument for unknown named parameters, out-of-range for rejected
//! bind indexes, allocation failures, and engine errors carrying the engine's
//! numeric code and message. None of these are retried internally; retry
//! policy (if any) belongs to the caller.

use thiserror::Error;

use crate::engine::EngineError;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// An operation required an open resource, but it was closed.
    #[error("{resource} is not open")]
    NotOpen { resource: &'static str },

    /// `connect` was called on a Database that already holds a connection.
    #[error("{resource} is already open")]
    AlreadyOpen { resource: &'static str },

    /// A column read or count was attempted while the statement has no
    /// current row (never stepped, or the last step reported done).
    #[error("no data to read from the current statement")]
    NoRow,

    /// A named parameter does not exist in the statement text.
    #[error("no such parameter: {name}")]
    NoSuchParameter { name: String },

    /// The engine rejected a positional bind index.
    #[error("bind index {index} is out of range")]
    IndexOutOfRange { index: usize },

    /// The engine could not allocate memory for a connection, statement,
    /// or bound value.
    #[error("engine could not allocate memory for {what}")]
    OutOfMemory { what: &'static str },

    /// Any other engine-reported failure, with the engine's numeric code
    /// and human-readable message.
    #[error("engine error {code}: {message}")]
    Engine { code: i32, message: String },
}

impl Error {
    /// Maps an engine status onto the taxonomy for operations where a RANGE
    /// status is not meaningful (everything except positional binds, which
    /// map RANGE themselves to keep the offending index in the error).
    pub(crate) fn from_engine(err: EngineError, what: &'static str) -> Self {
        match err {
            EngineError::NoMem => Error::OutOfMemory { what },
            EngineError::Range => Error::Engine {
                code: EngineError::RANGE_CODE,
                message: format!("unexpected range status during {what}"),
            },
            EngineError::Failure { code, message } => Error::Engine { code, message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn not_open_names_the_resource() {
        let err = Error::NotOpen {
            resource: "Database",
        };
        assert_eq!(err.to_string(), "Database is not open");
    }

    #[rstest]
    fn engine_error_carries_code_and_message() {
        let err = Error::from_engine(
            EngineError::Failure {
                code: 1,
                message: "no such table: missing".into(),
            },
            "step",
        );
        assert_eq!(err.to_string(), "engine error 1: no such table: missing");
    }

    #[rstest]
    fn nomem_maps_to_allocation_failure() {
        let err = Error::from_engine(EngineError::NoMem, "connection");
        assert!(matches!(err, Error::OutOfMemory { what: "connection" }));
    }
}

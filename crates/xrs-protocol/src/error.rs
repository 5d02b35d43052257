//! Error types for AT protocol parsing

use thiserror::Error;

/// Errors that can occur while parsing protocol lines
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Line was empty after trimming
    #[error("empty line")]
    Empty,

    /// A known prefix was present but its payload was missing
    #[error("missing payload for {0}")]
    MissingPayload(&'static str),

    /// A numeric argument could not be parsed
    #[error("invalid number in {prefix}: {value:?}")]
    InvalidNumber {
        /// Prefix of the line being parsed
        prefix: &'static str,
        /// Offending field
        value: String,
    },

    /// Argument out of the range accepted by the radio
    #[error("value out of range in {prefix}: {value}")]
    OutOfRange {
        /// Prefix of the line being parsed
        prefix: &'static str,
        /// Offending value
        value: i64,
    },

    /// Unknown or unsupported command
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

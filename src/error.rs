//! Error types for label codec operations.
//!
//! The editing core itself raises no errors: misuse is a silent no-op and
//! edge cases are expressed through return values. Only parsing label text
//! can actually fail.

use thiserror::Error;

/// Errors that can occur while decoding label text.
#[derive(Error, Debug)]
pub enum LabelError {
    /// A label line had the wrong number of fields
    #[error("line {line}: expected 5 fields, found {count}")]
    WrongFieldCount {
        /// 1-based line number in the label text
        line: usize,
        /// Number of whitespace-separated fields found
        count: usize,
    },

    /// The class id field did not parse as an integer
    #[error("line {line}: invalid class id '{token}'")]
    InvalidClassId {
        /// 1-based line number in the label text
        line: usize,
        /// The offending token
        token: String,
    },

    /// A coordinate field did not parse or was outside [0, 1]
    #[error("line {line}: invalid coordinates: {message}")]
    InvalidCoordinates {
        /// 1-based line number in the label text
        line: usize,
        /// Description of the coordinate error
        message: String,
    },
}

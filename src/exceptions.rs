//! ## Custom Errors for Rindex
//!
//! This module defines custom errors and exceptions that are used by Rindex.

use std::error::Error;
use std::fmt;

/// Represents errors specific to invalid operations or parameters in Rindex.
#[derive(Debug, Clone, PartialEq)]
pub enum RindexError {
    /// Occurs when an identifier is inserted while it is already stored.
    DuplicateId {
        /// The identifier that was passed to `insert`.
        id: u64,
    },
    /// Occurs when an operation refers to an identifier that is not stored.
    NotFound {
        /// The identifier that was looked up.
        id: u64,
    },
    /// Occurs when a coordinate is NaN or infinite.
    InvalidCoordinate {
        /// The offending coordinate value.
        value: f64,
    },
    /// Occurs when the fan-out bounds passed at construction are out of range.
    InvalidFanout {
        /// The maximum fan-out that was requested.
        max_entries: usize,
        /// The minimum fan-out that was requested.
        min_entries: usize,
    },
}

impl fmt::Display for RindexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RindexError::DuplicateId { id } => {
                write!(f, "Duplicate id: {id}. Each id can be stored at most once.")
            }
            RindexError::NotFound { id } => {
                write!(f, "Id not found: {id}. No entry with this id is stored.")
            }
            RindexError::InvalidCoordinate { value } => {
                write!(f, "Invalid coordinate: {value}. Coordinates must be finite.")
            }
            RindexError::InvalidFanout {
                max_entries,
                min_entries,
            } => {
                write!(
                    f,
                    "Invalid fan-out: max_entries={max_entries}, min_entries={min_entries}. \
                     Expected 4 <= max_entries <= 64 and 2 <= min_entries <= max_entries / 2."
                )
            }
        }
    }
}

impl Error for RindexError {}

//! Protocol error status codes and per-request errors
//!
//! [`ErrorStatus`] carries the RFC 3416 numbering surfaced in a response PDU.
//! [`RequestError`] is what a single variable binding fails with; every
//! variant maps to exactly one status.

use crate::value::Syntax;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Response error status (RFC 3416)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorStatus {
    NoError,
    TooBig,
    GenErr,
    NoAccess,
    WrongType,
    WrongLength,
    WrongValue,
    NoCreation,
    InconsistentValue,
    CommitFailed,
    UndoFailed,
    NotWritable,
}

impl ErrorStatus {
    /// Numeric code on the wire
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            ErrorStatus::NoError => 0,
            ErrorStatus::TooBig => 1,
            ErrorStatus::GenErr => 5,
            ErrorStatus::NoAccess => 6,
            ErrorStatus::WrongType => 7,
            ErrorStatus::WrongLength => 8,
            ErrorStatus::WrongValue => 10,
            ErrorStatus::NoCreation => 11,
            ErrorStatus::InconsistentValue => 12,
            ErrorStatus::CommitFailed => 14,
            ErrorStatus::UndoFailed => 15,
            ErrorStatus::NotWritable => 17,
        }
    }

    /// Status from a numeric code
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => ErrorStatus::NoError,
            1 => ErrorStatus::TooBig,
            5 => ErrorStatus::GenErr,
            6 => ErrorStatus::NoAccess,
            7 => ErrorStatus::WrongType,
            8 => ErrorStatus::WrongLength,
            10 => ErrorStatus::WrongValue,
            11 => ErrorStatus::NoCreation,
            12 => ErrorStatus::InconsistentValue,
            14 => ErrorStatus::CommitFailed,
            15 => ErrorStatus::UndoFailed,
            17 => ErrorStatus::NotWritable,
            _ => return None,
        })
    }

    /// `true` for `noError`
    #[inline]
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, ErrorStatus::NoError)
    }
}

impl Display for ErrorStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorStatus::NoError => "noError",
            ErrorStatus::TooBig => "tooBig",
            ErrorStatus::GenErr => "genErr",
            ErrorStatus::NoAccess => "noAccess",
            ErrorStatus::WrongType => "wrongType",
            ErrorStatus::WrongLength => "wrongLength",
            ErrorStatus::WrongValue => "wrongValue",
            ErrorStatus::NoCreation => "noCreation",
            ErrorStatus::InconsistentValue => "inconsistentValue",
            ErrorStatus::CommitFailed => "commitFailed",
            ErrorStatus::UndoFailed => "undoFailed",
            ErrorStatus::NotWritable => "notWritable",
        };
        write!(f, "{name}({})", self.code())
    }
}

/// Failure of a single variable binding
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// Byte length outside the configured bounds
    #[error("length {actual} outside [{min}, {max}]")]
    WrongLength { actual: usize, min: usize, max: usize },

    /// Domain-specific range or content check failed
    #[error("wrong value: {0}")]
    WrongValue(String),

    /// Proposed syntax differs from the object's syntax
    #[error("wrong type: expected {expected}, got {actual}")]
    WrongType { expected: Syntax, actual: Syntax },

    /// Optimistic-concurrency or cross-object precondition not met
    #[error("inconsistent value: {0}")]
    InconsistentValue(String),

    /// Permission or identity check failed
    #[error("no access: {0}")]
    NoAccess(String),

    /// Structurally invalid input
    #[error("malformed value: {reason}")]
    Malformed { reason: String },

    /// Object is read-only
    #[error("object is not writable")]
    NotWritable,

    /// Object does not exist and cannot be created
    #[error("object does not exist and cannot be created")]
    NoCreation,

    /// Commit could not be completed; siblings were undone
    #[error("commit failed: {0}")]
    CommitFailed(String),

    /// Batch exceeds the configured number of bindings
    #[error("request too big: {count} bindings, limit {limit}")]
    TooBig { count: usize, limit: usize },
}

impl RequestError {
    /// Protocol status this error is reported as
    #[must_use]
    pub fn status(&self) -> ErrorStatus {
        match self {
            RequestError::WrongLength { .. } | RequestError::Malformed { .. } => {
                ErrorStatus::WrongLength
            }
            RequestError::WrongValue(_) => ErrorStatus::WrongValue,
            RequestError::WrongType { .. } => ErrorStatus::WrongType,
            RequestError::InconsistentValue(_) => ErrorStatus::InconsistentValue,
            RequestError::NoAccess(_) => ErrorStatus::NoAccess,
            RequestError::NotWritable => ErrorStatus::NotWritable,
            RequestError::NoCreation => ErrorStatus::NoCreation,
            RequestError::CommitFailed(_) => ErrorStatus::CommitFailed,
            RequestError::TooBig { .. } => ErrorStatus::TooBig,
        }
    }

    /// Shorthand for [`RequestError::Malformed`]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_round_trip() {
        for status in [
            ErrorStatus::NoError,
            ErrorStatus::TooBig,
            ErrorStatus::GenErr,
            ErrorStatus::NoAccess,
            ErrorStatus::WrongType,
            ErrorStatus::WrongLength,
            ErrorStatus::WrongValue,
            ErrorStatus::NoCreation,
            ErrorStatus::InconsistentValue,
            ErrorStatus::CommitFailed,
            ErrorStatus::UndoFailed,
            ErrorStatus::NotWritable,
        ] {
            assert_eq!(ErrorStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(ErrorStatus::from_code(2), None);
    }

    #[test]
    fn request_error_maps_to_standard_codes() {
        let wrong_length = RequestError::WrongLength {
            actual: 300,
            min: 0,
            max: 255,
        };
        assert_eq!(wrong_length.status().code(), 8);
        assert_eq!(RequestError::WrongValue("x".into()).status().code(), 10);
        assert_eq!(
            RequestError::InconsistentValue("x".into()).status().code(),
            12
        );
        assert_eq!(RequestError::NoAccess("x".into()).status().code(), 6);
        assert_eq!(RequestError::malformed("short").status(), ErrorStatus::WrongLength);
    }

    #[test]
    fn status_display() {
        assert_eq!(ErrorStatus::InconsistentValue.to_string(), "inconsistentValue(12)");
        assert!(ErrorStatus::NoError.is_success());
        assert!(!ErrorStatus::NoAccess.is_success());
    }
}

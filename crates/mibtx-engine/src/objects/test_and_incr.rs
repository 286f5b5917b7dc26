//! TestAndIncr (RFC 2579)
//!
//! A manager reads the counter and writes the value it read back. The write
//! succeeds only if nobody else got there first, and the stored value then
//! moves on by one, wrapping to 0 after `i32::MAX`.

use super::Committed;
use mibtx_core::{RequestError, Value};

/// Successor of `current`
#[inline]
#[must_use]
pub const fn next(current: i32) -> i32 {
    if current == i32::MAX {
        0
    } else {
        current + 1
    }
}

/// Proposal must match the live value
///
/// # Errors
/// Returns [`RequestError::InconsistentValue`] on mismatch
pub fn prepare(stored: &Value, proposed: &Value) -> Result<(), RequestError> {
    if stored != proposed {
        return Err(RequestError::InconsistentValue(format!(
            "expected {stored}, got {proposed}"
        )));
    }
    Ok(())
}

/// Proposal must be a non-negative integer
///
/// # Errors
/// Returns [`RequestError::WrongValue`] for negative proposals
pub fn check(proposed: &Value) -> Result<(), RequestError> {
    match proposed.as_integer() {
        Some(v) if v >= 0 => Ok(()),
        _ => Err(RequestError::WrongValue(format!(
            "{proposed} is not a non-negative integer"
        ))),
    }
}

/// Store the successor, report the proposal
///
/// # Errors
/// Returns [`RequestError::CommitFailed`] if the live value is not an integer
pub fn commit(stored: &Value, proposed: &Value) -> Result<Committed, RequestError> {
    let current = stored
        .as_integer()
        .ok_or_else(|| RequestError::CommitFailed(format!("counter holds {stored}")))?;
    Ok(Committed {
        stored: Value::from(next(current)),
        reported: proposed.clone(),
    })
}

//! Transactional object kinds
//!
//! Every managed object is one of a closed set of kinds. The kind decides
//! what a proposal must satisfy beyond the attached validation rules, and
//! what is stored and echoed when it commits.

pub mod key_change;
pub mod test_and_incr;
pub mod time_stamp;

pub use key_change::{change_key, encode_key_change, KeyChange, KeyRotation};
pub use time_stamp::TimeStamp;

use crate::collab::SecurityContext;
use mibtx_core::{RequestError, Value};

/// Outcome of a successful commit
///
/// `stored` becomes the object's value; `reported` goes back in the
/// response. They differ for counters and key-change columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    pub stored: Value,
    pub reported: Value,
}

impl Committed {
    /// Store and report the same value
    #[must_use]
    pub fn echo(value: Value) -> Self {
        Self {
            stored: value.clone(),
            reported: value,
        }
    }
}

/// Behaviour attached to a managed object
#[derive(Debug, Clone)]
pub enum ObjectKind {
    /// Takes the proposed value as-is
    Plain,
    /// TestAndIncr spin lock (RFC 2579)
    TestAndIncr,
    /// Read-only uptime stamp
    TimeStamp(TimeStamp),
    /// Key-change column (RFC 3414 §5)
    KeyChange(KeyChange),
    /// Key-change column writable only by the user it belongs to
    OwnKeyChange(KeyChange),
}

impl ObjectKind {
    /// Short name for logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Plain => "plain",
            ObjectKind::TestAndIncr => "test_and_incr",
            ObjectKind::TimeStamp(_) => "time_stamp",
            ObjectKind::KeyChange(_) => "key_change",
            ObjectKind::OwnKeyChange(_) => "own_key_change",
        }
    }

    /// Whether the stored value is key material
    #[must_use]
    pub fn holds_secret(&self) -> bool {
        matches!(self, ObjectKind::KeyChange(_) | ObjectKind::OwnKeyChange(_))
    }

    /// Requester checks that precede any look at the proposed value
    ///
    /// # Errors
    /// Returns [`RequestError::NoAccess`] when a self-service column is
    /// written by anyone but its owner
    pub fn authorize(&self, context: Option<&dyn SecurityContext>) -> Result<(), RequestError> {
        match self {
            ObjectKind::OwnKeyChange(column) => column.authorize(context),
            _ => Ok(()),
        }
    }

    /// Reject writes to read-only kinds
    ///
    /// # Errors
    /// Returns [`RequestError::NotWritable`] for time stamps
    pub fn ensure_writable(&self) -> Result<(), RequestError> {
        match self {
            ObjectKind::TimeStamp(_) => Err(RequestError::NotWritable),
            _ => Ok(()),
        }
    }

    /// Kind-specific consistency checks against the live value
    ///
    /// # Errors
    /// Returns the first reason the proposal cannot be accepted
    pub fn prepare(
        &self,
        stored: &Value,
        proposed: &Value,
        context: Option<&dyn SecurityContext>,
    ) -> Result<(), RequestError> {
        self.authorize(context)?;
        match self {
            ObjectKind::Plain => Ok(()),
            ObjectKind::TestAndIncr => test_and_incr::prepare(stored, proposed),
            ObjectKind::TimeStamp(_) => Err(RequestError::NotWritable),
            ObjectKind::KeyChange(column) | ObjectKind::OwnKeyChange(column) => {
                column.prepare(proposed)
            }
        }
    }

    /// Kind-specific checks on the proposal alone
    ///
    /// # Errors
    /// Returns [`RequestError::WrongValue`] class errors
    pub fn check(&self, proposed: &Value) -> Result<(), RequestError> {
        match self {
            ObjectKind::TestAndIncr => test_and_incr::check(proposed),
            _ => Ok(()),
        }
    }

    /// Compute what to store and what to report
    ///
    /// # Errors
    /// Returns [`RequestError::CommitFailed`] when the value cannot be derived
    pub fn commit(&self, stored: &Value, proposed: &Value) -> Result<Committed, RequestError> {
        match self {
            ObjectKind::Plain => Ok(Committed::echo(proposed.clone())),
            ObjectKind::TestAndIncr => test_and_incr::commit(stored, proposed),
            ObjectKind::TimeStamp(_) => Err(RequestError::NotWritable),
            ObjectKind::KeyChange(column) | ObjectKind::OwnKeyChange(column) => {
                column.commit(stored, proposed)
            }
        }
    }

    /// Value returned to a protocol read
    ///
    /// # Errors
    /// Returns [`RequestError::NoAccess`] for unreadable key-change columns
    pub fn read(&self, stored: &Value) -> Result<Value, RequestError> {
        match self {
            ObjectKind::KeyChange(column) | ObjectKind::OwnKeyChange(column) => column.read(),
            _ => Ok(stored.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::KeyChangeAlgorithm;
    use mibtx_core::{AgentUpTime, Oid};
    use std::sync::Arc;

    #[test]
    fn plain_echoes_proposal() {
        let kind = ObjectKind::Plain;
        let committed = kind.commit(&Value::from("a"), &Value::from("b")).unwrap();
        assert_eq!(committed, Committed::echo(Value::from("b")));
    }

    #[test]
    fn time_stamp_is_read_only() {
        let kind = ObjectKind::TimeStamp(TimeStamp::new(Some(Arc::new(AgentUpTime::start()))));
        assert_eq!(kind.ensure_writable(), Err(RequestError::NotWritable));
        assert!(ObjectKind::Plain.ensure_writable().is_ok());
        assert_eq!(kind.name(), "time_stamp");
    }

    #[test]
    fn key_change_reads_empty() {
        let column = KeyChange::new(KeyChangeAlgorithm::Sha256.protocol(), Oid::empty());
        let kind = ObjectKind::KeyChange(column);
        assert_eq!(kind.read(&Value::from(vec![1u8; 32])), Ok(Value::empty_octets()));
    }
}

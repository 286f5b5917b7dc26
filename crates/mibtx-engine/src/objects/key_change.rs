//! Key-change columns (RFC 3414 §5)
//!
//! A manager never sends a key in the clear. It sends `random || delta`,
//! where `random` is exactly one key length long, and the agent derives the
//! new key from the old one with the column's [`AuthProtocol`].
//!
//! The key length always comes from the column's protocol, never from the
//! request.

use super::Committed;
use crate::collab::{AuthProtocol, SecurityContext, SecurityModel};
use mibtx_core::{Oid, OidError, RequestError, Value};
use std::sync::Arc;

/// Result of applying a key-change value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRotation {
    /// Key to store
    pub new_key: Vec<u8>,
    /// `random || new_key[key_length..]`, echoed to the manager
    pub reported: Vec<u8>,
}

/// `random` and `delta` must each span at least one key length
fn check_key_change_len(len: usize, key_length: usize) -> Result<(), RequestError> {
    if len < 2 * key_length {
        return Err(RequestError::malformed(format!(
            "key change of {len} bytes is shorter than twice the key length {key_length}"
        )));
    }
    Ok(())
}

/// Derive a new key from `old_key` and a transmitted `key_change`
///
/// # Errors
/// Returns [`RequestError::Malformed`] when `key_change` is shorter than
/// `2 * key_length`
pub fn change_key(
    protocol: &dyn AuthProtocol,
    old_key: &[u8],
    key_change: &[u8],
    key_length: usize,
) -> Result<KeyRotation, RequestError> {
    check_key_change_len(key_change.len(), key_length)?;
    let (random, delta) = key_change.split_at(key_length);
    let new_key = protocol.change_delta(old_key, delta, random);

    let mut reported = random.to_vec();
    reported.extend_from_slice(new_key.get(key_length..).unwrap_or_default());
    Ok(KeyRotation { new_key, reported })
}

/// Build the `random || delta` a manager sends to move from `old_key` to
/// `new_key`
#[must_use]
pub fn encode_key_change(
    protocol: &dyn AuthProtocol,
    old_key: &[u8],
    new_key: &[u8],
    random: &[u8],
) -> Vec<u8> {
    let mut key_change = random.to_vec();
    key_change.extend(protocol.change_delta(old_key, new_key, random));
    key_change
}

/// Key-change column of a USM user row
///
/// The row index is `engineID || userName`, both length-prefixed.
#[derive(Debug, Clone)]
pub struct KeyChange {
    protocol: Arc<dyn AuthProtocol>,
    row_index: Oid,
    readable: bool,
}

impl KeyChange {
    /// Readable column keyed by `row_index`
    #[must_use]
    pub fn new(protocol: Arc<dyn AuthProtocol>, row_index: Oid) -> Self {
        Self {
            protocol,
            row_index,
            readable: true,
        }
    }

    /// Reads answer `noAccess` instead of an empty string
    #[must_use]
    pub fn write_only(mut self) -> Self {
        self.readable = false;
        self
    }

    #[inline]
    #[must_use]
    pub fn protocol(&self) -> &Arc<dyn AuthProtocol> {
        &self.protocol
    }

    #[inline]
    #[must_use]
    pub fn key_length(&self) -> usize {
        self.protocol.key_length()
    }

    #[inline]
    #[must_use]
    pub fn row_index(&self) -> &Oid {
        &self.row_index
    }

    /// User-name component of the row index
    ///
    /// # Errors
    /// Returns [`OidError`] when the index is not `engineID || userName`
    pub fn user_name(&self) -> Result<Vec<u8>, OidError> {
        let (_engine_id, next) = self.row_index.octet_index_at(0)?;
        let (user_name, _) = self.row_index.octet_index_at(next)?;
        Ok(user_name)
    }

    /// Requester must be the USM user the row belongs to
    ///
    /// # Errors
    /// Returns [`RequestError::NoAccess`] otherwise
    pub fn authorize(&self, context: Option<&dyn SecurityContext>) -> Result<(), RequestError> {
        let context = context
            .ok_or_else(|| RequestError::NoAccess("no security context".to_string()))?;
        if context.security_model() != SecurityModel::Usm {
            return Err(RequestError::NoAccess(format!(
                "security model {:?} cannot change own key",
                context.security_model()
            )));
        }
        let owner = self
            .user_name()
            .map_err(|e| RequestError::NoAccess(format!("row index names no user: {e}")))?;
        if context.claimed_identity() != owner.as_slice() {
            return Err(RequestError::NoAccess(
                "requester does not own this row".to_string(),
            ));
        }
        Ok(())
    }

    /// Structural checks on a proposed key-change value
    ///
    /// # Errors
    /// Returns [`RequestError::Malformed`] for values without a full
    /// random part and a full delta
    pub fn prepare(&self, proposed: &Value) -> Result<(), RequestError> {
        let key_change = proposed
            .as_octets()
            .ok_or_else(|| RequestError::malformed("key change is not an octet string"))?;
        check_key_change_len(key_change.len(), self.key_length())
    }

    /// Rotate the stored key
    ///
    /// # Errors
    /// Returns [`RequestError::CommitFailed`] when the protocol produces a key
    /// of the wrong length
    pub fn commit(&self, stored: &Value, proposed: &Value) -> Result<Committed, RequestError> {
        let old_key = stored
            .as_octets()
            .ok_or_else(|| RequestError::CommitFailed(format!("stored key is {}", stored.syntax())))?;
        let key_change = proposed
            .as_octets()
            .ok_or_else(|| RequestError::malformed("key change is not an octet string"))?;
        let key_length = self.key_length();
        let rotation = change_key(self.protocol.as_ref(), old_key, key_change, key_length)?;

        let expected = key_change.len() - key_length;
        if rotation.new_key.len() != expected {
            return Err(RequestError::CommitFailed(format!(
                "protocol {} derived {} key bytes, expected {expected}",
                self.protocol.id(),
                rotation.new_key.len()
            )));
        }
        Ok(Committed {
            stored: Value::from(rotation.new_key),
            reported: Value::from(rotation.reported),
        })
    }

    /// Protocol read of the column
    ///
    /// # Errors
    /// Returns [`RequestError::NoAccess`] for write-only columns
    pub fn read(&self) -> Result<Value, RequestError> {
        if self.readable {
            Ok(Value::empty_octets())
        } else {
            Err(RequestError::NoAccess("key-change column is not readable".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::KeyChangeAlgorithm;
    use crate::collab::Principal;

    fn usm_index(engine_id: &[u8], user: &[u8]) -> Oid {
        Oid::empty()
            .with_octet_index(engine_id, false)
            .with_octet_index(user, false)
    }

    fn column(user: &[u8]) -> KeyChange {
        KeyChange::new(
            KeyChangeAlgorithm::Sha256.protocol(),
            usm_index(b"\x80\x00\x1f\x88\x04agent", user),
        )
    }

    #[test]
    fn short_key_change_is_malformed() {
        let protocol = KeyChangeAlgorithm::Sha256.protocol();
        let err = change_key(protocol.as_ref(), &[0u8; 32], &[0u8; 31], 32).unwrap_err();
        assert!(matches!(err, RequestError::Malformed { .. }));
        assert_eq!(err.status(), mibtx_core::ErrorStatus::WrongLength);
    }

    #[test]
    fn key_change_without_full_delta_is_malformed() {
        let protocol = KeyChangeAlgorithm::Sha256.protocol();
        for len in [32, 33, 63] {
            let err = change_key(protocol.as_ref(), &[0u8; 32], &vec![1u8; len], 32).unwrap_err();
            assert!(matches!(err, RequestError::Malformed { .. }), "{len} bytes");
        }
        assert!(matches!(
            column(b"alice").prepare(&Value::from(vec![1u8; 32])),
            Err(RequestError::Malformed { .. })
        ));
    }

    #[test]
    fn rotation_is_deterministic() {
        let protocol = KeyChangeAlgorithm::Sha256.protocol();
        let input: Vec<u8> = (0u8..64).collect();
        let a = change_key(protocol.as_ref(), &[9u8; 32], &input, 32).unwrap();
        let b = change_key(protocol.as_ref(), &[9u8; 32], &input, 32).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.new_key.len(), 32);
        assert_eq!(&a.reported[..32], &input[..32]);
    }

    #[test]
    fn reported_carries_key_tail_beyond_key_length() {
        let protocol = KeyChangeAlgorithm::Sha256.protocol();
        let input: Vec<u8> = (0u8..100).collect();
        let rotation = change_key(protocol.as_ref(), &[1u8; 32], &input, 32).unwrap();
        assert_eq!(rotation.new_key.len(), 68);
        let mut expected = input[..32].to_vec();
        expected.extend_from_slice(&rotation.new_key[32..]);
        assert_eq!(rotation.reported, expected);
    }

    #[test]
    fn encode_then_change_recovers_new_key() {
        let protocol = KeyChangeAlgorithm::Sha384.protocol();
        let old_key = vec![0x5au8; 48];
        let new_key = vec![0xa5u8; 48];
        let random = vec![0x3cu8; 48];
        let sent = encode_key_change(protocol.as_ref(), &old_key, &new_key, &random);
        assert_eq!(sent.len(), 96);
        let rotation = change_key(protocol.as_ref(), &old_key, &sent, 48).unwrap();
        assert_eq!(rotation.new_key, new_key);
    }

    #[test]
    fn user_name_from_row_index() {
        assert_eq!(column(b"alice").user_name().unwrap(), b"alice".to_vec());
        let bad = KeyChange::new(KeyChangeAlgorithm::Sha256.protocol(), Oid::from([5, 1]));
        assert!(bad.user_name().is_err());
    }

    #[test]
    fn authorize_requires_owner_under_usm() {
        let col = column(b"alice");
        assert!(col.authorize(Some(&Principal::usm("alice"))).is_ok());
        assert!(matches!(
            col.authorize(Some(&Principal::usm("bob"))),
            Err(RequestError::NoAccess(_))
        ));
        assert!(matches!(
            col.authorize(Some(&Principal::new("alice", SecurityModel::Tsm))),
            Err(RequestError::NoAccess(_))
        ));
        assert!(matches!(col.authorize(None), Err(RequestError::NoAccess(_))));
    }

    #[test]
    fn write_only_column_denies_reads() {
        assert_eq!(column(b"alice").read(), Ok(Value::empty_octets()));
        assert!(matches!(
            column(b"alice").write_only().read(),
            Err(RequestError::NoAccess(_))
        ));
    }
}

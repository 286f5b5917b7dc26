//! Collaborator interfaces
//!
//! The engine calls out to these for key derivation, requester identity and
//! access verdicts. It never implements the policy behind them.

use mibtx_core::Oid;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authentication protocol used by key-change columns
pub trait AuthProtocol: Send + Sync + fmt::Debug {
    /// Registered protocol identifier
    fn id(&self) -> &Oid;

    /// Length in bytes of a localized key for this protocol
    fn key_length(&self) -> usize;

    /// Derive a new key from the old key and a transmitted `delta`/`random` pair
    fn change_delta(&self, old_key: &[u8], delta: &[u8], random: &[u8]) -> Vec<u8>;
}

/// Security model of the requesting message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityModel {
    Any,
    SnmpV1,
    SnmpV2c,
    Usm,
    Tsm,
}

impl SecurityModel {
    /// SnmpSecurityModel value (RFC 3411)
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            SecurityModel::Any => 0,
            SecurityModel::SnmpV1 => 1,
            SecurityModel::SnmpV2c => 2,
            SecurityModel::Usm => 3,
            SecurityModel::Tsm => 4,
        }
    }
}

/// Identity of the principal behind the in-flight request
pub trait SecurityContext: Send + Sync + fmt::Debug {
    /// Security name claimed (and authenticated) by the requester
    fn claimed_identity(&self) -> &[u8];

    /// Security model the request arrived under
    fn security_model(&self) -> SecurityModel;
}

/// Plain security context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    identity: Vec<u8>,
    model: SecurityModel,
}

impl Principal {
    /// Create new principal
    #[must_use]
    pub fn new(identity: impl Into<Vec<u8>>, model: SecurityModel) -> Self {
        Self {
            identity: identity.into(),
            model,
        }
    }

    /// USM user
    #[must_use]
    pub fn usm(user_name: impl Into<Vec<u8>>) -> Self {
        Self::new(user_name, SecurityModel::Usm)
    }
}

impl SecurityContext for Principal {
    fn claimed_identity(&self) -> &[u8] {
        &self.identity
    }

    fn security_model(&self) -> SecurityModel {
        self.model
    }
}

/// Write access verdict
///
/// Backed by the agent's access-control subsystem (VACM or similar).
pub trait AccessPolicy: Send + Sync + fmt::Debug {
    /// May the requester write `oid`?
    fn may_write(&self, context: Option<&dyn SecurityContext>, oid: &Oid) -> bool;
}

/// Grants every write
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn may_write(&self, _context: Option<&dyn SecurityContext>, _oid: &Oid) -> bool {
        true
    }
}

/// Grants writes only under the listed prefixes
#[derive(Debug, Clone, Default)]
pub struct PrefixPolicy {
    writable: Vec<Oid>,
}

impl PrefixPolicy {
    /// Create policy with no writable subtree
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow writes under `prefix`
    #[must_use]
    pub fn allow(mut self, prefix: Oid) -> Self {
        self.writable.push(prefix);
        self
    }
}

impl AccessPolicy for PrefixPolicy {
    fn may_write(&self, _context: Option<&dyn SecurityContext>, oid: &Oid) -> bool {
        self.writable.iter().any(|p| p.is_prefix_of(oid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_exposes_identity() {
        let p = Principal::usm("alice");
        assert_eq!(p.claimed_identity(), b"alice");
        assert_eq!(p.security_model(), SecurityModel::Usm);
        assert_eq!(p.security_model().code(), 3);
    }

    #[test]
    fn prefix_policy() {
        let policy = PrefixPolicy::new().allow(Oid::from([1, 3, 6, 1, 6, 3]));
        assert!(policy.may_write(None, &Oid::from([1, 3, 6, 1, 6, 3, 1, 1, 6, 1, 0])));
        assert!(!policy.may_write(None, &Oid::from([1, 3, 6, 1, 2, 1, 1, 5, 0])));
        assert!(AllowAll.may_write(None, &Oid::from([1])));
    }
}

//! SHA-2 key-change derivation (RFC 3414 §5, RFC 7860 protocols)
//!
//! ```text
//! temp = oldKey
//! for each digest-sized chunk i of delta:
//!     temp      = H(temp || random)
//!     newKey[i] = temp XOR delta[i]
//! ```
//!
//! The construction is its own inverse, so a manager builds `delta` by running
//! it over the desired new key.

use crate::collab::AuthProtocol;
use mibtx_core::Oid;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

/// RFC 3414 key change over digest `D`
///
/// Key length equals the digest output size.
pub struct DigestKeyChange<D> {
    id: Oid,
    _digest: PhantomData<fn() -> D>,
}

impl<D: Digest> DigestKeyChange<D> {
    /// Create protocol with the given registration OID
    #[must_use]
    pub fn new(id: Oid) -> Self {
        Self {
            id,
            _digest: PhantomData,
        }
    }
}

impl<D> fmt::Debug for DigestKeyChange<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestKeyChange")
            .field("id", &self.id)
            .finish()
    }
}

impl<D> AuthProtocol for DigestKeyChange<D>
where
    D: Digest + 'static,
{
    fn id(&self) -> &Oid {
        &self.id
    }

    fn key_length(&self) -> usize {
        <D as Digest>::output_size()
    }

    fn change_delta(&self, old_key: &[u8], delta: &[u8], random: &[u8]) -> Vec<u8> {
        let mut temp = old_key.to_vec();
        let mut new_key = Vec::with_capacity(delta.len());
        for chunk in delta.chunks(<D as Digest>::output_size()) {
            let mut hasher = D::new();
            hasher.update(&temp);
            hasher.update(random);
            temp = hasher.finalize().to_vec();
            new_key.extend(chunk.iter().zip(&temp).map(|(d, t)| d ^ t));
        }
        new_key
    }
}

const USM_AUTH_PROTOCOLS: [u32; 9] = [1, 3, 6, 1, 6, 3, 10, 1, 1];

/// Key-change algorithms shipped with the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyChangeAlgorithm {
    /// usmHMAC128SHA224AuthProtocol
    Sha224,
    /// usmHMAC192SHA256AuthProtocol
    Sha256,
    /// usmHMAC256SHA384AuthProtocol
    Sha384,
    /// usmHMAC384SHA512AuthProtocol
    Sha512,
}

impl KeyChangeAlgorithm {
    /// Registered protocol OID
    #[must_use]
    pub fn protocol_oid(self) -> Oid {
        let arc = match self {
            KeyChangeAlgorithm::Sha224 => 4,
            KeyChangeAlgorithm::Sha256 => 5,
            KeyChangeAlgorithm::Sha384 => 6,
            KeyChangeAlgorithm::Sha512 => 7,
        };
        Oid::from(USM_AUTH_PROTOCOLS).child(arc)
    }

    /// Protocol instance
    #[must_use]
    pub fn protocol(self) -> Arc<dyn AuthProtocol> {
        let id = self.protocol_oid();
        match self {
            KeyChangeAlgorithm::Sha224 => Arc::new(DigestKeyChange::<Sha224>::new(id)),
            KeyChangeAlgorithm::Sha256 => Arc::new(DigestKeyChange::<Sha256>::new(id)),
            KeyChangeAlgorithm::Sha384 => Arc::new(DigestKeyChange::<Sha384>::new(id)),
            KeyChangeAlgorithm::Sha512 => Arc::new(DigestKeyChange::<Sha512>::new(id)),
        }
    }
}

impl FromStr for KeyChangeAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha224" => Ok(Self::Sha224),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            other => Err(format!("unknown key-change algorithm: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sha256() -> DigestKeyChange<Sha256> {
        DigestKeyChange::new(KeyChangeAlgorithm::Sha256.protocol_oid())
    }

    #[test]
    fn key_lengths_follow_digest() {
        assert_eq!(KeyChangeAlgorithm::Sha224.protocol().key_length(), 28);
        assert_eq!(KeyChangeAlgorithm::Sha256.protocol().key_length(), 32);
        assert_eq!(KeyChangeAlgorithm::Sha384.protocol().key_length(), 48);
        assert_eq!(KeyChangeAlgorithm::Sha512.protocol().key_length(), 64);
    }

    #[test]
    fn protocol_oids() {
        assert_eq!(
            KeyChangeAlgorithm::Sha256.protocol_oid().to_string(),
            "1.3.6.1.6.3.10.1.1.5"
        );
        assert_eq!(
            KeyChangeAlgorithm::Sha512.protocol().id().to_string(),
            "1.3.6.1.6.3.10.1.1.7"
        );
    }

    #[test]
    fn single_block_matches_digest_chain() {
        let old_key = [0x11u8; 32];
        let random = [0x22u8; 32];
        let delta = [0x33u8; 32];

        let mut hasher = Sha256::new();
        hasher.update(old_key);
        hasher.update(random);
        let temp = hasher.finalize();
        let expected: Vec<u8> = temp.iter().zip(delta).map(|(t, d)| t ^ d).collect();

        assert_eq!(sha256().change_delta(&old_key, &delta, &random), expected);
    }

    #[test]
    fn multi_block_chains_digest() {
        let old_key = [0x01u8; 32];
        let random = [0x02u8; 32];
        let delta: Vec<u8> = (0u8..40).collect();

        let mut h1 = Sha256::new();
        h1.update(old_key);
        h1.update(random);
        let t1 = h1.finalize();
        let mut h2 = Sha256::new();
        h2.update(t1);
        h2.update(random);
        let t2 = h2.finalize();

        let mut expected: Vec<u8> = t1.iter().zip(&delta[..32]).map(|(t, d)| t ^ d).collect();
        expected.extend(t2.iter().zip(&delta[32..]).map(|(t, d)| t ^ d));

        let new_key = sha256().change_delta(&old_key, &delta, &random);
        assert_eq!(new_key.len(), 40);
        assert_eq!(new_key, expected);
    }

    #[test]
    fn construction_is_self_inverse() {
        let protocol = sha256();
        let old_key = b"0123456789abcdef0123456789abcdef";
        let wanted = b"fedcba9876543210fedcba9876543210";
        let random = [7u8; 32];
        let delta = protocol.change_delta(old_key, wanted, &random);
        assert_eq!(protocol.change_delta(old_key, &delta, &random), wanted.to_vec());
    }

    #[test]
    fn algorithm_from_str() {
        assert_eq!("SHA256".parse::<KeyChangeAlgorithm>(), Ok(KeyChangeAlgorithm::Sha256));
        assert!("md5".parse::<KeyChangeAlgorithm>().is_err());
    }
}

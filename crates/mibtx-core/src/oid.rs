//! Object identifiers
//!
//! Provides [`Oid`], the address of a managed object or table-row instance.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Object identifier
///
/// Ordered sequence of sub-identifiers. Ordering is lexicographic over the
/// sub-identifiers, which is the order rows and objects are walked in.
///
/// # Examples
/// - `[1, 3, 6, 1, 2, 1, 1, 3, 0]` → `1.3.6.1.2.1.1.3.0`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Oid(Vec<u32>);

impl Oid {
    /// Create new OID from sub-identifiers
    #[inline]
    #[must_use]
    pub fn new(sub_ids: Vec<u32>) -> Self {
        Self(sub_ids)
    }

    /// Create OID from a slice of sub-identifiers
    #[inline]
    #[must_use]
    pub fn from_slice(sub_ids: &[u32]) -> Self {
        Self(sub_ids.to_vec())
    }

    /// Empty OID (zero sub-identifiers)
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Get sub-identifiers
    #[inline]
    #[must_use]
    pub fn sub_ids(&self) -> &[u32] {
        &self.0
    }

    /// Get number of sub-identifiers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if OID has no sub-identifiers
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get last sub-identifier
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<u32> {
        self.0.last().copied()
    }

    /// Append a sub-identifier, returning new OID
    #[inline]
    #[must_use]
    pub fn child(&self, sub_id: u32) -> Self {
        let mut new = self.clone();
        new.0.push(sub_id);
        new
    }

    /// Append another OID, returning new OID
    #[inline]
    #[must_use]
    pub fn append(&self, suffix: &Oid) -> Self {
        let mut new = self.clone();
        new.0.extend_from_slice(&suffix.0);
        new
    }

    /// Check if this OID is a prefix of another
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Sub-identifiers of `self` after `prefix`
    ///
    /// # Errors
    /// Returns error if `prefix` is not a prefix of `self`
    pub fn suffix_after(&self, prefix: &Self) -> Result<Self, OidError> {
        if !prefix.is_prefix_of(self) {
            return Err(OidError::NotUnderPrefix {
                oid: self.to_string(),
                prefix: prefix.to_string(),
            });
        }
        Ok(Self(self.0[prefix.0.len()..].to_vec()))
    }

    /// Append an OCTET STRING index component (RFC 2578 §7.7)
    ///
    /// Non-implied strings are prefixed with their length; implied strings
    /// (only legal as the last index component) are not.
    #[must_use]
    pub fn with_octet_index(&self, bytes: &[u8], implied: bool) -> Self {
        let mut new = self.clone();
        if !implied {
            new.0.push(bytes.len() as u32);
        }
        new.0.extend(bytes.iter().map(|b| u32::from(*b)));
        new
    }

    /// Decode a length-prefixed OCTET STRING index component starting at `pos`
    ///
    /// Returns the bytes and the position just past the component.
    ///
    /// # Errors
    /// Returns error if the component runs past the end of the OID or a
    /// sub-identifier does not fit in a byte.
    pub fn octet_index_at(&self, pos: usize) -> Result<(Vec<u8>, usize), OidError> {
        let len = *self.0.get(pos).ok_or(OidError::TruncatedIndex { at: pos })? as usize;
        let start = pos + 1;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= self.0.len())
            .ok_or(OidError::TruncatedIndex { at: pos })?;
        let bytes = self.0[start..end]
            .iter()
            .map(|s| u8::try_from(*s).map_err(|_| OidError::IndexOctetRange(*s)))
            .collect::<Result<Vec<u8>, _>>()?;
        Ok((bytes, end))
    }

    /// Iterator over sub-identifiers
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

impl Display for Oid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for sub_id in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{sub_id}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for Oid {
    type Err = OidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix('.').unwrap_or(s);
        if s.is_empty() {
            return Err(OidError::Empty);
        }

        let sub_ids = s
            .split('.')
            .map(|seg| {
                if seg.is_empty() {
                    Err(OidError::EmptySubId)
                } else {
                    seg.parse::<u32>()
                        .map_err(|_| OidError::InvalidSubId(seg.to_string()))
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(Self(sub_ids))
    }
}

impl From<Vec<u32>> for Oid {
    fn from(sub_ids: Vec<u32>) -> Self {
        Self(sub_ids)
    }
}

impl From<&[u32]> for Oid {
    fn from(sub_ids: &[u32]) -> Self {
        Self(sub_ids.to_vec())
    }
}

impl<const N: usize> From<[u32; N]> for Oid {
    fn from(sub_ids: [u32; N]) -> Self {
        Self(sub_ids.to_vec())
    }
}

impl serde::Serialize for Oid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Oid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct OidVisitor;

        impl serde::de::Visitor<'_> for OidVisitor {
            type Value = Oid;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str("a dotted-decimal object identifier")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Oid::from_str(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(OidVisitor)
    }
}

/// Errors related to object identifiers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OidError {
    /// No sub-identifiers at all
    #[error("object identifier is empty")]
    Empty,

    /// Empty sub-identifier between dots
    #[error("object identifier contains empty sub-identifier")]
    EmptySubId,

    /// Sub-identifier is not an unsigned 32-bit integer
    #[error("invalid sub-identifier: {0}")]
    InvalidSubId(String),

    /// Not under the expected prefix
    #[error("'{oid}' is not under '{prefix}'")]
    NotUnderPrefix { oid: String, prefix: String },

    /// Index component runs past the end of the OID
    #[error("index component at position {at} is truncated")]
    TruncatedIndex { at: usize },

    /// Index octet does not fit in a byte
    #[error("index sub-identifier {0} is not an octet")]
    IndexOctetRange(u32),
}

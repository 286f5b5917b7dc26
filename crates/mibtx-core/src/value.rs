//! Typed values carried by variable bindings

use crate::oid::Oid;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Hundredths of a second since some epoch (usually agent start)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TimeTicks(pub u32);

impl TimeTicks {
    /// Ticks from a duration, wrapping at `u32::MAX` like the wire type
    #[must_use]
    pub fn from_duration(elapsed: std::time::Duration) -> Self {
        Self((elapsed.as_millis() / 10) as u32)
    }

    /// Raw tick count
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u32 {
        self.0
    }
}

impl Display for TimeTicks {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Syntax tag of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Syntax {
    Integer,
    TimeTicks,
    OctetString,
    ObjectIdentifier,
}

impl Display for Syntax {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Syntax::Integer => "INTEGER",
            Syntax::TimeTicks => "TimeTicks",
            Syntax::OctetString => "OCTET STRING",
            Syntax::ObjectIdentifier => "OBJECT IDENTIFIER",
        };
        f.write_str(name)
    }
}

/// Value of a managed object
///
/// Immutable; a mutation always produces a new value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Integer(i32),
    TimeTicks(TimeTicks),
    OctetString(Vec<u8>),
    ObjectIdentifier(Oid),
}

impl Value {
    /// Zero-length OCTET STRING
    #[inline]
    #[must_use]
    pub fn empty_octets() -> Self {
        Self::OctetString(Vec::new())
    }

    /// Syntax tag
    #[must_use]
    pub fn syntax(&self) -> Syntax {
        match self {
            Value::Integer(_) => Syntax::Integer,
            Value::TimeTicks(_) => Syntax::TimeTicks,
            Value::OctetString(_) => Syntax::OctetString,
            Value::ObjectIdentifier(_) => Syntax::ObjectIdentifier,
        }
    }

    /// Integer payload, if any
    #[inline]
    #[must_use]
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// TimeTicks payload, if any
    #[inline]
    #[must_use]
    pub fn as_time_ticks(&self) -> Option<TimeTicks> {
        match self {
            Value::TimeTicks(v) => Some(*v),
            _ => None,
        }
    }

    /// OCTET STRING payload, if any
    #[inline]
    #[must_use]
    pub fn as_octets(&self) -> Option<&[u8]> {
        match self {
            Value::OctetString(v) => Some(v),
            _ => None,
        }
    }

    /// OBJECT IDENTIFIER payload, if any
    #[inline]
    #[must_use]
    pub fn as_oid(&self) -> Option<&Oid> {
        match self {
            Value::ObjectIdentifier(v) => Some(v),
            _ => None,
        }
    }

    /// Formats as syntax and length only, never the content
    #[inline]
    #[must_use]
    pub fn redacted(&self) -> Redacted<'_> {
        Redacted(self)
    }
}

/// View of a [`Value`] that hides its content
#[derive(Clone, Copy)]
pub struct Redacted<'a>(&'a Value);

impl Display for Redacted<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::OctetString(bytes) => write!(f, "<{}, {} bytes>", self.0.syntax(), bytes.len()),
            other => write!(f, "<{}>", other.syntax()),
        }
    }
}

impl fmt::Debug for Redacted<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::TimeTicks(v) => write!(f, "{v} ticks"),
            Value::OctetString(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) if s.chars().all(|c| !c.is_control()) => write!(f, "\"{s}\""),
                _ => {
                    for b in bytes {
                        write!(f, "{b:02x}")?;
                    }
                    Ok(())
                }
            },
            Value::ObjectIdentifier(oid) => write!(f, "{oid}"),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<TimeTicks> for Value {
    fn from(v: TimeTicks) -> Self {
        Value::TimeTicks(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::OctetString(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::OctetString(v.to_vec())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::OctetString(v.as_bytes().to_vec())
    }
}

impl From<Oid> for Value {
    fn from(v: Oid) -> Self {
        Value::ObjectIdentifier(v)
    }
}

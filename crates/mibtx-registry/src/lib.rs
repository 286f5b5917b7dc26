//! mibtx registry - capability statements
//!
//! Keeps track of which capability statements (AGENT-CAPABILITIES or
//! MODULE-COMPLIANCE OIDs) the agent currently implements, and exports them
//! as rows of a sysORTable-style table.
//!
//! # Example
//!
//! ```rust
//! use mibtx_core::Oid;
//! use mibtx_registry::CapabilityRegistry;
//!
//! let registry = CapabilityRegistry::new();
//! let index = registry.register(Oid::from([1, 3, 6, 1, 6, 3, 1]), "SNMPv2-MIB").unwrap();
//! assert_eq!(index, Oid::from([1]));
//! assert!(registry.deregister(&index).is_some());
//! assert!(registry.deregister(&index).is_none());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

use mibtx_core::{Oid, SysUpTime, TableRow, TimeTicks};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Column holding the capability statement OID
pub const COLUMN_ID: u32 = 2;
/// Column holding the description
pub const COLUMN_DESCR: u32 = 3;
/// Column holding the registration uptime
pub const COLUMN_UPTIME: u32 = 4;

/// Registry failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("capability indexes exhausted")]
    IndexesExhausted,
}

/// One registered capability statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityEntry {
    pub index: Oid,
    pub capability: Oid,
    pub description: String,
    pub registered_at: TimeTicks,
}

impl CapabilityEntry {
    /// Table row for this entry
    #[must_use]
    pub fn to_row(&self) -> TableRow {
        TableRow::new(self.index.clone())
            .with_cell(COLUMN_ID, self.capability.clone())
            .with_cell(COLUMN_DESCR, self.description.as_str())
            .with_cell(COLUMN_UPTIME, self.registered_at)
    }
}

#[derive(Debug)]
struct Entries {
    by_index: BTreeMap<Oid, CapabilityEntry>,
    last_change: TimeTicks,
    /// `None` once `u32::MAX` has been handed out
    next_index: Option<u32>,
}

impl Entries {
    fn starting_at(first: u32) -> Self {
        Self {
            by_index: BTreeMap::new(),
            last_change: TimeTicks(0),
            next_index: Some(first),
        }
    }
}

/// Registry of implemented capability statements
///
/// Indexes are allocated from 1 upwards and never reused, so an index is a
/// stable handle for removal.
#[derive(Debug)]
pub struct CapabilityRegistry {
    entries: RwLock<Entries>,
    clock: Option<Arc<dyn SysUpTime>>,
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityRegistry {
    /// Registry without a time source; uptimes read as 0
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Entries::starting_at(1)),
            clock: None,
        }
    }

    /// Registry stamping entries from `clock`
    #[must_use]
    pub fn with_clock(clock: Arc<dyn SysUpTime>) -> Self {
        Self {
            clock: Some(clock),
            ..Self::new()
        }
    }

    fn now(&self) -> TimeTicks {
        self.clock.as_ref().map_or(TimeTicks(0), |clock| clock.get())
    }

    /// Register a capability statement and return its index
    ///
    /// Index allocation and the clock read happen under the write lock, so
    /// indexes and `last_change` both follow registration order.
    ///
    /// # Errors
    /// Returns [`RegistryError::IndexesExhausted`] once every index up to
    /// `u32::MAX` has been used
    pub fn register(
        &self,
        capability: Oid,
        description: impl Into<String>,
    ) -> Result<Oid, RegistryError> {
        let mut entries = self.entries.write();
        let next = entries.next_index.ok_or(RegistryError::IndexesExhausted)?;
        entries.next_index = next.checked_add(1);

        let index = Oid::from([next]);
        let now = self.now();
        let entry = CapabilityEntry {
            index: index.clone(),
            capability,
            description: description.into(),
            registered_at: now,
        };
        tracing::debug!("registered capability {} at index {}", entry.capability, index);
        entries.by_index.insert(index.clone(), entry);
        entries.last_change = now;
        Ok(index)
    }

    /// Remove the entry at `index`
    ///
    /// Returns the entry the first time, `None` afterwards.
    pub fn deregister(&self, index: &Oid) -> Option<CapabilityEntry> {
        let mut entries = self.entries.write();
        let removed = entries.by_index.remove(index)?;
        entries.last_change = self.now();
        tracing::debug!("deregistered capability {} from index {}", removed.capability, index);
        Some(removed)
    }

    #[must_use]
    pub fn get(&self, index: &Oid) -> Option<CapabilityEntry> {
        self.entries.read().by_index.get(index).cloned()
    }

    /// Entries in index order
    #[must_use]
    pub fn entries(&self) -> Vec<CapabilityEntry> {
        self.entries.read().by_index.values().cloned().collect()
    }

    /// Entries as table rows, in index order
    #[must_use]
    pub fn rows(&self) -> Vec<TableRow> {
        self.entries
            .read()
            .by_index
            .values()
            .map(CapabilityEntry::to_row)
            .collect()
    }

    /// Uptime of the most recent register or deregister
    #[must_use]
    pub fn last_change(&self) -> TimeTicks {
        self.entries.read().last_change
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().by_index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().by_index.is_empty()
    }
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Object store
//!
//! Flat concurrent map from instance OID to [`ManagedObject`]. Stands in for
//! the agent's MIB tree: the engine only needs exact-match resolution.

use crate::object::ManagedObject;
use dashmap::DashMap;
use mibtx_core::Oid;
use std::sync::Arc;

/// Registered managed objects
#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: DashMap<Oid, Arc<ManagedObject>>,
}

impl ObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `object` under its OID, returning the one it replaced
    pub fn register(&self, object: ManagedObject) -> Option<Arc<ManagedObject>> {
        let oid = object.oid().clone();
        tracing::debug!("registering {} at {}", object.lock().kind().name(), oid);
        self.objects.insert(oid, Arc::new(object))
    }

    /// Object registered at exactly `oid`
    #[must_use]
    pub fn resolve(&self, oid: &Oid) -> Option<Arc<ManagedObject>> {
        self.objects.get(oid).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove the object at `oid`
    pub fn deregister(&self, oid: &Oid) -> Option<Arc<ManagedObject>> {
        self.objects.remove(oid).map(|(_, object)| object)
    }

    #[must_use]
    pub fn contains(&self, oid: &Oid) -> bool {
        self.objects.contains_key(oid)
    }

    /// Registered OIDs in ascending order
    #[must_use]
    pub fn oids(&self) -> Vec<Oid> {
        let mut oids: Vec<Oid> = self.objects.iter().map(|entry| entry.key().clone()).collect();
        oids.sort();
        oids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

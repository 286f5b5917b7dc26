//! Testing utilities for the mibtx workspace
//!
//! Shared fixtures: a hand-driven clock, USM principals and row indexes,
//! a protocol that always fails to derive a key, and an observer that
//! records every change.

#![allow(missing_docs)]

use mibtx_core::{Oid, SysUpTime, TimeTicks, Value};
use mibtx_engine::{
    AuthProtocol, KeyChangeAlgorithm, ManagedObject, ObjectStore, Principal, RequestContext,
    SecurityModel, SetEngine, ValueObserver,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Engine ID used by the fixtures
pub const ENGINE_ID: &[u8] = b"\x80\x00\x1f\x88\x04mibtx";

/// usmUserAuthKeyChange column prefix
pub const USM_AUTH_KEY_CHANGE: [u32; 12] = [1, 3, 6, 1, 6, 3, 15, 1, 2, 2, 1, 6];

/// usmUserOwnAuthKeyChange column prefix
pub const USM_OWN_AUTH_KEY_CHANGE: [u32; 12] = [1, 3, 6, 1, 6, 3, 15, 1, 2, 2, 1, 7];

/// snmpSetSerialNo.0
pub const SET_SERIAL_NO: [u32; 11] = [1, 3, 6, 1, 6, 3, 1, 1, 6, 1, 0];

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock(AtomicU32);

impl ManualClock {
    pub fn at(ticks: u32) -> Arc<Self> {
        Arc::new(Self(AtomicU32::new(ticks)))
    }

    pub fn set(&self, ticks: u32) {
        self.0.store(ticks, Ordering::SeqCst);
    }

    pub fn advance(&self, ticks: u32) {
        self.0.fetch_add(ticks, Ordering::SeqCst);
    }
}

impl SysUpTime for ManualClock {
    fn get(&self) -> TimeTicks {
        TimeTicks(self.0.load(Ordering::SeqCst))
    }
}

/// `engineID || userName` row index
pub fn usm_row_index(user: &str) -> Oid {
    Oid::empty()
        .with_octet_index(ENGINE_ID, false)
        .with_octet_index(user.as_bytes(), false)
}

/// Instance OID of `column` in `user`'s row
pub fn usm_cell(column: [u32; 12], user: &str) -> Oid {
    Oid::from(column).append(&usm_row_index(user))
}

pub fn usm_context(user: &str) -> RequestContext {
    RequestContext::new(Arc::new(Principal::usm(user)))
}

pub fn context_with_model(user: &str, model: SecurityModel) -> RequestContext {
    RequestContext::new(Arc::new(Principal::new(user, model)))
}

/// Protocol whose key derivation always comes back empty
#[derive(Debug)]
pub struct FailingProtocol {
    id: Oid,
    key_length: usize,
}

impl FailingProtocol {
    pub fn new(key_length: usize) -> Arc<Self> {
        Arc::new(Self {
            id: Oid::from([1, 3, 6, 1, 4, 1, 99999, 1]),
            key_length,
        })
    }
}

impl AuthProtocol for FailingProtocol {
    fn id(&self) -> &Oid {
        &self.id
    }

    fn key_length(&self) -> usize {
        self.key_length
    }

    fn change_delta(&self, _old_key: &[u8], _delta: &[u8], _random: &[u8]) -> Vec<u8> {
        Vec::new()
    }
}

/// Observer keeping every (oid, old, new) it sees
#[derive(Debug, Default)]
pub struct RecordingObserver {
    changes: Mutex<Vec<(Oid, Value, Value)>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn changes(&self) -> Vec<(Oid, Value, Value)> {
        self.changes.lock().clone()
    }
}

impl ValueObserver for RecordingObserver {
    fn value_changed(&self, oid: &Oid, old: &Value, new: &Value) {
        self.changes.lock().push((oid.clone(), old.clone(), new.clone()));
    }
}

/// Engine over a store with snmpSetSerialNo and one SHA-256 USM user
/// holding `key` in both key-change columns
pub fn usm_engine(user: &str, key: &[u8]) -> SetEngine {
    let protocol = KeyChangeAlgorithm::Sha256.protocol();
    let store = Arc::new(ObjectStore::new());
    store.register(ManagedObject::test_and_incr(Oid::from(SET_SERIAL_NO), 0));
    store.register(ManagedObject::key_change(
        usm_cell(USM_AUTH_KEY_CHANGE, user),
        Arc::clone(&protocol),
        usm_row_index(user),
        key.to_vec(),
    ));
    store.register(ManagedObject::own_key_change(
        usm_cell(USM_OWN_AUTH_KEY_CHANGE, user),
        protocol,
        usm_row_index(user),
        key.to_vec(),
    ));
    SetEngine::new(store)
}

//! Managed objects
//!
//! A [`ManagedObject`] owns one current value, its kind, its validation rules
//! and its observers, all behind one mutex. The SET engine locks an object
//! for the whole transaction through [`ManagedObject::lock`]; the convenience
//! methods here lock for a single call.

use crate::collab::{AuthProtocol, SecurityContext};
use crate::error::EngineFault;
use crate::objects::{Committed, KeyChange, ObjectKind, TimeStamp};
use crate::validation::{Stage, ValidationPipeline, ValueConstraint};
use mibtx_core::{Oid, RequestError, SysUpTime, TimeTicks, Value};
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::Arc;

/// Notified after every value change (commit and undo)
///
/// Runs while the object's lock is held; must not touch the same object.
pub trait ValueObserver: Send + Sync {
    fn value_changed(&self, oid: &Oid, old: &Value, new: &Value);
}

/// Exclusive access to an object's state
pub type ObjectGuard<'a> = MutexGuard<'a, ObjectState>;

/// Mutable state of a managed object
pub struct ObjectState {
    value: Value,
    kind: ObjectKind,
    rules: ValidationPipeline,
    observers: Vec<Arc<dyn ValueObserver>>,
}

impl ObjectState {
    #[inline]
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    /// Value as fit for logs; key material shows syntax and length only
    #[must_use]
    pub fn describe_value(&self) -> String {
        if self.kind.holds_secret() {
            self.value.redacted().to_string()
        } else {
            self.value.to_string()
        }
    }

    /// Writability, requester, syntax, Prepare-stage rules, then kind checks
    ///
    /// # Errors
    /// Returns the first reason the proposal is rejected
    pub fn prepare(
        &self,
        proposed: &Value,
        context: Option<&dyn SecurityContext>,
    ) -> Result<(), RequestError> {
        self.kind.ensure_writable()?;
        self.kind.authorize(context)?;
        if proposed.syntax() != self.value.syntax() {
            return Err(RequestError::WrongType {
                expected: self.value.syntax(),
                actual: proposed.syntax(),
            });
        }
        self.rules.validate(Stage::Prepare, proposed, &self.value)?;
        self.kind.prepare(&self.value, proposed, context)
    }

    /// Check-stage rules, then kind checks
    ///
    /// # Errors
    /// Returns the first reason the proposal is rejected
    pub fn check(&self, proposed: &Value) -> Result<(), RequestError> {
        self.rules.validate(Stage::Check, proposed, &self.value)?;
        self.kind.check(proposed)
    }

    /// Derive and store the committed value
    ///
    /// # Errors
    /// Returns the kind's commit error; the value is left untouched
    pub fn commit(&mut self, oid: &Oid, proposed: &Value) -> Result<Committed, RequestError> {
        let committed = self.kind.commit(&self.value, proposed)?;
        self.apply(oid, committed.stored.clone());
        Ok(committed)
    }

    /// Store `value` unconditionally and notify observers
    pub fn apply(&mut self, oid: &Oid, value: Value) {
        let old = std::mem::replace(&mut self.value, value);
        for observer in &self.observers {
            observer.value_changed(oid, &old, &self.value);
        }
    }

    /// Protocol read
    ///
    /// # Errors
    /// Returns [`RequestError::NoAccess`] for unreadable columns
    pub fn read(&self) -> Result<Value, RequestError> {
        self.kind.read(&self.value)
    }
}

impl fmt::Debug for ObjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("ObjectState");
        if self.kind.holds_secret() {
            debug.field("value", &self.value.redacted());
        } else {
            debug.field("value", &self.value);
        }
        debug
            .field("kind", &self.kind.name())
            .field("rules", &self.rules)
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Addressable value binding
pub struct ManagedObject {
    oid: Oid,
    state: Mutex<ObjectState>,
}

impl ManagedObject {
    fn with_kind(oid: Oid, value: Value, kind: ObjectKind) -> Self {
        Self {
            oid,
            state: Mutex::new(ObjectState {
                value,
                kind,
                rules: ValidationPipeline::new(),
                observers: Vec::new(),
            }),
        }
    }

    /// Object that stores whatever passes its rules
    #[must_use]
    pub fn plain(oid: Oid, value: impl Into<Value>) -> Self {
        Self::with_kind(oid, value.into(), ObjectKind::Plain)
    }

    /// TestAndIncr counter; negative initial values start at 0
    #[must_use]
    pub fn test_and_incr(oid: Oid, initial: i32) -> Self {
        Self::with_kind(oid, Value::from(initial.max(0)), ObjectKind::TestAndIncr)
    }

    /// Read-only uptime stamp, initially 0
    #[must_use]
    pub fn time_stamp(oid: Oid, source: Option<Arc<dyn SysUpTime>>) -> Self {
        Self::with_kind(
            oid,
            Value::from(TimeTicks(0)),
            ObjectKind::TimeStamp(TimeStamp::new(source)),
        )
    }

    /// Key-change column holding `key`
    #[must_use]
    pub fn key_change(
        oid: Oid,
        protocol: Arc<dyn AuthProtocol>,
        row_index: Oid,
        key: Vec<u8>,
    ) -> Self {
        let column = KeyChange::new(protocol, row_index);
        Self::with_kind(oid, Value::from(key), ObjectKind::KeyChange(column))
    }

    /// Key-change column only its own user may write
    #[must_use]
    pub fn own_key_change(
        oid: Oid,
        protocol: Arc<dyn AuthProtocol>,
        row_index: Oid,
        key: Vec<u8>,
    ) -> Self {
        let column = KeyChange::new(protocol, row_index);
        Self::with_kind(oid, Value::from(key), ObjectKind::OwnKeyChange(column))
    }

    /// Object with an explicit kind
    #[must_use]
    pub fn from_kind(oid: Oid, value: Value, kind: ObjectKind) -> Self {
        Self::with_kind(oid, value, kind)
    }

    /// Attach a validation rule
    #[must_use]
    pub fn with_constraint(mut self, rule: impl ValueConstraint + 'static) -> Self {
        self.state.get_mut().rules.push(rule);
        self
    }

    /// Attach an observer
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ValueObserver>) -> Self {
        self.state.get_mut().observers.push(observer);
        self
    }

    #[inline]
    #[must_use]
    pub fn oid(&self) -> &Oid {
        &self.oid
    }

    /// Lock the object's state
    pub fn lock(&self) -> ObjectGuard<'_> {
        self.state.lock()
    }

    /// Stored value
    #[must_use]
    pub fn current_value(&self) -> Value {
        self.state.lock().value.clone()
    }

    /// Value a protocol read returns
    ///
    /// # Errors
    /// Returns [`RequestError::NoAccess`] for unreadable columns
    pub fn read(&self) -> Result<Value, RequestError> {
        self.state.lock().read()
    }

    /// Validate a proposal without committing it
    ///
    /// # Errors
    /// Returns the first rejection from Prepare or Check
    pub fn propose_value(&self, proposed: &Value) -> Result<(), RequestError> {
        let state = self.state.lock();
        state.prepare(proposed, None)?;
        state.check(proposed)
    }

    /// Store `value` without validation
    pub fn apply_value(&self, value: Value) {
        self.state.lock().apply(&self.oid, value);
    }

    /// Attach a time source to a time stamp
    ///
    /// # Errors
    /// Returns [`EngineFault::Configuration`] if the object is not a stamp
    pub fn attach_time_source(&self, source: Arc<dyn SysUpTime>) -> Result<(), EngineFault> {
        let mut state = self.state.lock();
        match &mut state.kind {
            ObjectKind::TimeStamp(stamp) => {
                stamp.attach(source);
                Ok(())
            }
            _ => Err(EngineFault::Configuration {
                oid: self.oid.clone(),
                missing: "time stamp kind",
            }),
        }
    }

    /// Stamp the current uptime into the object
    ///
    /// # Errors
    /// Returns [`EngineFault::Configuration`] without a time source
    pub fn update_stamp(&self) -> Result<TimeTicks, EngineFault> {
        let mut state = self.state.lock();
        let ticks = match &state.kind {
            ObjectKind::TimeStamp(stamp) => stamp.now(&self.oid)?,
            _ => {
                return Err(EngineFault::Configuration {
                    oid: self.oid.clone(),
                    missing: "time stamp kind",
                })
            }
        };
        state.apply(&self.oid, Value::from(ticks));
        Ok(ticks)
    }
}

impl fmt::Debug for ManagedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedObject")
            .field("oid", &self.oid)
            .finish_non_exhaustive()
    }
}

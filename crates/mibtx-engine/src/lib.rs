//! mibtx engine - SNMP SET transactions
//!
//! Applies a batch of variable bindings against managed objects
//! all-or-nothing:
//! - Validates proposals through per-object rule pipelines
//! - Drives every binding through Prepare, Check and Commit
//! - Undoes committed siblings when a later commit fails
//! - Serializes concurrent writers with per-object locks
//!
//! # Core Concepts
//!
//! - [`ManagedObject`]: one addressable value with rules and observers
//! - [`ObjectKind`]: plain, TestAndIncr, time stamp or key-change behaviour
//! - [`SubRequest`]: one binding's progress through the [`Phase`] machine
//! - [`SetEngine`]: resolves, locks and drives a batch
//! - [`EngineConfig`]: TOML description of the exposed objects
//!
//! # Example
//!
//! ```rust
//! use mibtx_core::{ErrorStatus, Oid, Value};
//! use mibtx_engine::{ManagedObject, ObjectStore, RequestContext, SetEngine, VarBind};
//! use std::sync::Arc;
//!
//! let spin_lock: Oid = "1.3.6.1.6.3.1.1.6.1.0".parse().unwrap();
//! let store = Arc::new(ObjectStore::new());
//! store.register(ManagedObject::test_and_incr(spin_lock.clone(), 0));
//! let engine = SetEngine::new(store);
//!
//! let response = engine
//!     .set(&RequestContext::anonymous(), vec![VarBind::new(spin_lock.clone(), 0)])
//!     .unwrap();
//! assert!(response.is_success());
//! assert_eq!(engine.get(&spin_lock), Ok(Value::from(1)));
//!
//! let stale = engine
//!     .set(&RequestContext::anonymous(), vec![VarBind::new(spin_lock, 0)])
//!     .unwrap();
//! assert_eq!(stale.status, ErrorStatus::InconsistentValue);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod auth;
pub mod collab;
pub mod config;
pub mod engine;
pub mod error;
pub mod object;
pub mod objects;
pub mod phase;
pub mod store;
pub mod subrequest;
pub mod validation;

pub use auth::{DigestKeyChange, KeyChangeAlgorithm};
pub use collab::{
    AccessPolicy, AllowAll, AuthProtocol, PrefixPolicy, Principal, SecurityContext, SecurityModel,
};
pub use config::{ConfigError, EngineConfig, EngineSettings, ObjectConfig};
pub use engine::{RequestContext, SetEngine, SetResponse, VarBind, DEFAULT_MAX_BINDINGS};
pub use error::{EngineFault, PhaseError};
pub use object::{ManagedObject, ObjectGuard, ObjectState, ValueObserver};
pub use objects::{
    change_key, encode_key_change, Committed, KeyChange, KeyRotation, ObjectKind, TimeStamp,
};
pub use phase::{allowed_transitions, validate_transition, Phase};
pub use store::ObjectStore;
pub use subrequest::SubRequest;
pub use validation::{
    DisplayString, IntegerRange, LengthRange, Stage, ValidationPipeline, ValueConstraint,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

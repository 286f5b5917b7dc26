//! mibtx core types
//!
//! Shared vocabulary for SNMP SET processing.
//!
//! # Core Concepts
//!
//! - [`Oid`]: address of a managed object or table-row instance
//! - [`Value`]: typed payload of a variable binding
//! - [`ErrorStatus`]: RFC 3416 response status
//! - [`RequestError`]: why a single variable binding was rejected
//! - [`TableRow`]: column-indexed cells of a conceptual table row
//! - [`SysUpTime`]: injected uptime source
//!
//! # Example
//!
//! ```rust
//! use mibtx_core::{Oid, Value};
//!
//! let sys_descr: Oid = "1.3.6.1.2.1.1.1.0".parse().unwrap();
//! let value = Value::from("router-1");
//! assert_eq!(sys_descr.len(), 9);
//! assert_eq!(value.as_octets(), Some(&b"router-1"[..]));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod clock;
mod oid;
mod row;
mod status;
mod value;

pub use clock::{AgentUpTime, SysUpTime};
pub use oid::{Oid, OidError};
pub use row::TableRow;
pub use status::{ErrorStatus, RequestError};
pub use value::{Redacted, Syntax, TimeTicks, Value};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Engine configuration
//!
//! A TOML file describes the engine limits and the managed objects to
//! expose:
//!
//! ```toml
//! [engine]
//! max_bindings = 32
//!
//! [[objects]]
//! kind = "plain"
//! oid = "1.3.6.1.2.1.1.5.0"
//! string = "router-1"
//! max_length = 255
//! display_string = true
//!
//! [[objects]]
//! kind = "test_and_incr"
//! oid = "1.3.6.1.6.3.1.1.6.1.0"
//!
//! [[objects]]
//! kind = "key_change"
//! oid = "1.3.6.1.6.3.15.1.2.2.1.6.5.128.0.31.136.4.5.97.108.105.99.101"
//! protocol = "sha256"
//! row_index = "5.128.0.31.136.4.5.97.108.105.99.101"
//! key = "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff"
//! own = true
//! ```

use crate::auth::KeyChangeAlgorithm;
use crate::engine::{SetEngine, DEFAULT_MAX_BINDINGS};
use crate::object::ManagedObject;
use crate::objects::{KeyChange, ObjectKind};
use crate::store::ObjectStore;
use crate::validation::{DisplayString, IntegerRange, LengthRange};
use mibtx_core::{Oid, SysUpTime, Value};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid hex key for {oid}: {source}")]
    InvalidHex {
        oid: Oid,
        #[source]
        source: hex::FromHexError,
    },

    #[error("key for {oid} is {actual} bytes, protocol needs {expected}")]
    KeyLength {
        oid: Oid,
        expected: usize,
        actual: usize,
    },

    #[error("invalid object {oid}: {reason}")]
    InvalidObject { oid: Oid, reason: String },

    #[error("object {0} configured more than once")]
    DuplicateOid(Oid),
}

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub objects: Vec<ObjectConfig>,
}

/// `[engine]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSettings {
    #[serde(default = "default_max_bindings")]
    pub max_bindings: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_bindings: DEFAULT_MAX_BINDINGS,
        }
    }
}

fn default_max_bindings() -> usize {
    DEFAULT_MAX_BINDINGS
}

fn default_true() -> bool {
    true
}

/// One `[[objects]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectConfig {
    Plain {
        oid: Oid,
        #[serde(default)]
        integer: Option<i32>,
        #[serde(default)]
        string: Option<String>,
        #[serde(default)]
        min_length: Option<usize>,
        #[serde(default)]
        max_length: Option<usize>,
        #[serde(default)]
        display_string: bool,
        #[serde(default)]
        min: Option<i32>,
        #[serde(default)]
        max: Option<i32>,
    },
    TestAndIncr {
        oid: Oid,
        #[serde(default)]
        initial: i32,
    },
    TimeStamp {
        oid: Oid,
    },
    KeyChange {
        oid: Oid,
        protocol: KeyChangeAlgorithm,
        row_index: Oid,
        /// Current key, hex
        key: String,
        #[serde(default)]
        own: bool,
        #[serde(default = "default_true")]
        readable: bool,
    },
}

impl ObjectConfig {
    #[must_use]
    pub fn oid(&self) -> &Oid {
        match self {
            ObjectConfig::Plain { oid, .. }
            | ObjectConfig::TestAndIncr { oid, .. }
            | ObjectConfig::TimeStamp { oid }
            | ObjectConfig::KeyChange { oid, .. } => oid,
        }
    }

    /// Build the managed object
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the entry is inconsistent
    pub fn build(&self, clock: &Arc<dyn SysUpTime>) -> Result<ManagedObject, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidObject {
            oid: self.oid().clone(),
            reason: reason.to_string(),
        };
        match self {
            ObjectConfig::Plain {
                oid,
                integer,
                string,
                min_length,
                max_length,
                display_string,
                min,
                max,
            } => {
                let value = match (integer, string) {
                    (Some(i), None) => Value::from(*i),
                    (None, Some(s)) => Value::from(s.as_str()),
                    _ => return Err(invalid("exactly one of `integer` or `string` is required")),
                };
                let mut object = ManagedObject::plain(oid.clone(), value);
                if min_length.is_some() || max_length.is_some() {
                    let range = LengthRange::new(
                        min_length.unwrap_or(0),
                        max_length.unwrap_or(LengthRange::display_string().max),
                    );
                    if range.min > range.max {
                        return Err(invalid("min_length exceeds max_length"));
                    }
                    object = object.with_constraint(range);
                }
                if *display_string {
                    object = object.with_constraint(DisplayString);
                }
                if min.is_some() || max.is_some() {
                    let range = IntegerRange::new(min.unwrap_or(i32::MIN), max.unwrap_or(i32::MAX));
                    if range.min > range.max {
                        return Err(invalid("min exceeds max"));
                    }
                    object = object.with_constraint(range);
                }
                Ok(object)
            }
            ObjectConfig::TestAndIncr { oid, initial } => {
                if *initial < 0 {
                    return Err(invalid("initial counter value must be non-negative"));
                }
                Ok(ManagedObject::test_and_incr(oid.clone(), *initial))
            }
            ObjectConfig::TimeStamp { oid } => {
                Ok(ManagedObject::time_stamp(oid.clone(), Some(Arc::clone(clock))))
            }
            ObjectConfig::KeyChange {
                oid,
                protocol,
                row_index,
                key,
                own,
                readable,
            } => {
                let key = hex::decode(key).map_err(|source| ConfigError::InvalidHex {
                    oid: oid.clone(),
                    source,
                })?;
                let mut column = KeyChange::new(protocol.protocol(), row_index.clone());
                if key.len() != column.key_length() {
                    return Err(ConfigError::KeyLength {
                        oid: oid.clone(),
                        expected: column.key_length(),
                        actual: key.len(),
                    });
                }
                if !readable {
                    column = column.write_only();
                }
                let kind = if *own {
                    if column.user_name().is_err() {
                        return Err(invalid("row_index must be engineID || userName"));
                    }
                    ObjectKind::OwnKeyChange(column)
                } else {
                    ObjectKind::KeyChange(column)
                };
                Ok(ManagedObject::from_kind(oid.clone(), Value::from(key), kind))
            }
        }
    }
}

impl EngineConfig {
    /// Read and parse a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] or [`ConfigError::Parse`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!("loaded {} objects from {}", config.objects.len(), path.display());
        Ok(config)
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`]
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Build an object store holding every configured object
    ///
    /// # Errors
    /// Returns the first invalid or duplicate entry
    pub fn build_store(&self, clock: Arc<dyn SysUpTime>) -> Result<ObjectStore, ConfigError> {
        let store = ObjectStore::new();
        for entry in &self.objects {
            if store.contains(entry.oid()) {
                return Err(ConfigError::DuplicateOid(entry.oid().clone()));
            }
            store.register(entry.build(&clock)?);
        }
        Ok(store)
    }

    /// Build a ready engine
    ///
    /// # Errors
    /// See [`EngineConfig::build_store`]
    pub fn build_engine(&self, clock: Arc<dyn SysUpTime>) -> Result<SetEngine, ConfigError> {
        let store = self.build_store(clock)?;
        Ok(SetEngine::new(Arc::new(store)).with_max_bindings(self.engine.max_bindings))
    }
}

//! Uptime stamps
//!
//! A stamp records when something last happened. The time source is owned
//! elsewhere and may be attached after construction; using a stamp without
//! one is a wiring bug and surfaces as [`EngineFault::Configuration`].

use crate::error::EngineFault;
use mibtx_core::{Oid, SysUpTime, TableRow, TimeTicks, Value};
use std::sync::Arc;

const MISSING: &str = "time source";

/// Stamp backed by an optional [`SysUpTime`]
#[derive(Debug, Clone, Default)]
pub struct TimeStamp {
    source: Option<Arc<dyn SysUpTime>>,
}

impl TimeStamp {
    #[must_use]
    pub fn new(source: Option<Arc<dyn SysUpTime>>) -> Self {
        Self { source }
    }

    /// Attach or replace the time source
    pub fn attach(&mut self, source: Arc<dyn SysUpTime>) {
        self.source = Some(source);
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.source.is_some()
    }

    /// Current reading, attributed to `oid` on failure
    ///
    /// # Errors
    /// Returns [`EngineFault::Configuration`] when no source is attached
    pub fn now(&self, oid: &Oid) -> Result<TimeTicks, EngineFault> {
        self.source
            .as_ref()
            .map(|source| source.get())
            .ok_or_else(|| {
                tracing::error!("time stamp {} used without a time source", oid);
                EngineFault::Configuration {
                    oid: oid.clone(),
                    missing: MISSING,
                }
            })
    }

    /// Write the current reading into `column` of `row`
    ///
    /// `entry` is the table entry OID, used to name the cell in faults.
    ///
    /// # Errors
    /// Returns [`EngineFault::Configuration`] when no source is attached
    pub fn update_column(
        &self,
        entry: &Oid,
        row: &mut TableRow,
        column: u32,
    ) -> Result<TimeTicks, EngineFault> {
        let ticks = self.now(&row.cell_oid(entry, column))?;
        row.set(column, Value::from(ticks));
        Ok(ticks)
    }
}

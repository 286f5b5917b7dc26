//! Agent uptime source

use crate::value::TimeTicks;
use std::fmt;
use std::time::Instant;

/// Source of sysUpTime readings
///
/// Owned outside the engine and shared by every object that stamps time.
pub trait SysUpTime: Send + Sync + fmt::Debug {
    /// Hundredths of a second since agent start
    fn get(&self) -> TimeTicks;
}

/// Monotonic uptime measured from construction
#[derive(Debug, Clone, Copy)]
pub struct AgentUpTime {
    started: Instant,
}

impl AgentUpTime {
    /// Start counting now
    #[inline]
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for AgentUpTime {
    fn default() -> Self {
        Self::start()
    }
}

impl SysUpTime for AgentUpTime {
    fn get(&self) -> TimeTicks {
        TimeTicks::from_duration(self.started.elapsed())
    }
}

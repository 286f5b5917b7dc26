//! Engine faults
//!
//! Per-request failures are [`mibtx_core::RequestError`]s and end up in the
//! response PDU. The errors here are different: they mean the engine itself
//! was mis-wired or could not keep its consistency guarantee, and they abort
//! the operation instead of being reported as a status code.

use crate::phase::Phase;
use mibtx_core::Oid;

/// Fatal engine error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineFault {
    /// Object used before a required collaborator was attached
    #[error("configuration fault at {oid}: no {missing} attached")]
    Configuration { oid: Oid, missing: &'static str },

    /// Restoring a prior value failed; the batch is no longer atomic
    #[error("undo failed at {oid}: {reason}")]
    UndoFailed { oid: Oid, reason: String },

    /// Phase machine was driven out of order
    #[error("illegal phase transition at {oid}: {from:?} -> {to:?}")]
    IllegalTransition { oid: Oid, from: Phase, to: Phase },
}

impl EngineFault {
    /// Object the fault was raised for
    #[must_use]
    pub fn oid(&self) -> &Oid {
        match self {
            EngineFault::Configuration { oid, .. }
            | EngineFault::UndoFailed { oid, .. }
            | EngineFault::IllegalTransition { oid, .. } => oid,
        }
    }
}

/// Illegal phase transition, before it is tied to an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal transition {from:?} -> {to:?}")]
pub struct PhaseError {
    pub from: Phase,
    pub to: Phase,
}

impl PhaseError {
    /// Attach the object the transition was attempted on
    #[must_use]
    pub fn at(self, oid: &Oid) -> EngineFault {
        EngineFault::IllegalTransition {
            oid: oid.clone(),
            from: self.from,
            to: self.to,
        }
    }
}

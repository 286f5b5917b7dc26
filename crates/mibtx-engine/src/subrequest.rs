//! One object's share of a SET transaction

use crate::error::EngineFault;
use crate::phase::{validate_transition, Phase};
use mibtx_core::{Oid, RequestError, Value};
use std::fmt;

/// Mutation of a single managed object within a batch
///
/// The prior value is captured when the sub-request is created, which the
/// engine does only after the target's lock is held.
#[derive(Clone)]
pub struct SubRequest {
    oid: Oid,
    proposed: Value,
    prior: Value,
    applied: Option<Value>,
    response: Option<Value>,
    phase: Phase,
    error: Option<RequestError>,
    redacted: bool,
}

impl SubRequest {
    /// Create sub-request in [`Phase::Created`]
    #[must_use]
    pub fn new(oid: Oid, proposed: Value, prior: Value) -> Self {
        Self {
            oid,
            proposed,
            prior,
            applied: None,
            response: None,
            phase: Phase::Created,
            error: None,
            redacted: false,
        }
    }

    /// Hide carried values from `Debug` output when `redact` is set
    #[must_use]
    pub fn redact_values(mut self, redact: bool) -> Self {
        self.redacted = redact;
        self
    }

    #[inline]
    #[must_use]
    pub fn oid(&self) -> &Oid {
        &self.oid
    }

    #[inline]
    #[must_use]
    pub fn proposed(&self) -> &Value {
        &self.proposed
    }

    /// Live value before the transaction touched the object
    #[inline]
    #[must_use]
    pub fn prior(&self) -> &Value {
        &self.prior
    }

    /// Value echoed to the requester after commit
    #[inline]
    #[must_use]
    pub fn response(&self) -> Option<&Value> {
        self.response.as_ref()
    }

    /// Value written into the object at commit, until cleanup
    #[inline]
    #[must_use]
    pub fn applied(&self) -> Option<&Value> {
        self.applied.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&RequestError> {
        self.error.as_ref()
    }

    /// Move to `to`
    ///
    /// # Errors
    /// Returns [`EngineFault::IllegalTransition`] when `to` is not reachable
    pub fn advance(&mut self, to: Phase) -> Result<(), EngineFault> {
        validate_transition(self.phase, to).map_err(|e| e.at(&self.oid))?;
        self.phase = to;
        Ok(())
    }

    /// Record `error` and move to [`Phase::Failed`]
    ///
    /// # Errors
    /// Returns [`EngineFault::IllegalTransition`] when already failed or cleaned
    pub fn fail(&mut self, error: RequestError) -> Result<(), EngineFault> {
        self.advance(Phase::Failed)?;
        self.error = Some(error);
        Ok(())
    }

    /// Record the outcome of a successful commit
    ///
    /// # Errors
    /// Returns [`EngineFault::IllegalTransition`] unless the sub-request was checked
    pub fn committed(&mut self, stored: Value, reported: Value) -> Result<(), EngineFault> {
        self.advance(Phase::Committed)?;
        self.applied = Some(stored);
        self.response = Some(reported);
        Ok(())
    }

    /// Release transient state and move to [`Phase::Cleaned`]
    ///
    /// Repeated cleanup is a no-op.
    pub fn cleanup(&mut self) {
        if self.phase == Phase::Cleaned {
            return;
        }
        self.applied = None;
        self.phase = Phase::Cleaned;
    }
}

impl fmt::Debug for SubRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |value: &Value| -> String {
            if self.redacted {
                value.redacted().to_string()
            } else {
                format!("{value:?}")
            }
        };
        f.debug_struct("SubRequest")
            .field("oid", &self.oid)
            .field("proposed", &show(&self.proposed))
            .field("prior", &show(&self.prior))
            .field("applied", &self.applied.as_ref().map(show))
            .field("response", &self.response.as_ref().map(show))
            .field("phase", &self.phase)
            .field("error", &self.error)
            .finish()
    }
}

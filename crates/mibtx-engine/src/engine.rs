//! SET transaction engine
//!
//! A batch of variable bindings is applied all-or-nothing:
//!
//! 1. resolve every target and lock them in ascending OID order
//! 2. Prepare every sub-request, then Check every sub-request
//! 3. Commit in request order; if one commit fails, undo the committed
//!    siblings in reverse order
//! 4. clean up every sub-request and release the locks
//!
//! Per-binding failures become the response's error status and index.
//! Faults that break the engine's own guarantees are returned as `Err`.

use crate::collab::{AccessPolicy, AllowAll, SecurityContext};
use crate::error::EngineFault;
use crate::object::{ManagedObject, ObjectGuard};
use crate::phase::Phase;
use crate::store::ObjectStore;
use crate::subrequest::SubRequest;
use mibtx_core::{ErrorStatus, Oid, RequestError, Value};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Default upper bound on bindings per request
pub const DEFAULT_MAX_BINDINGS: usize = 64;

/// Address and value of one binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VarBind {
    pub oid: Oid,
    pub value: Value,
}

impl VarBind {
    #[must_use]
    pub fn new(oid: Oid, value: impl Into<Value>) -> Self {
        Self {
            oid,
            value: value.into(),
        }
    }
}

/// Who is asking
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    security: Option<Arc<dyn SecurityContext>>,
}

impl RequestContext {
    /// Request without an authenticated principal
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new(security: Arc<dyn SecurityContext>) -> Self {
        Self {
            security: Some(security),
        }
    }

    #[must_use]
    pub fn security(&self) -> Option<&dyn SecurityContext> {
        self.security.as_deref()
    }
}

/// Response to a SET
///
/// `error_index` is 1-based and 0 on success or when no single binding is
/// to blame. On failure `bindings` echoes the request unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetResponse {
    pub status: ErrorStatus,
    pub error_index: usize,
    pub bindings: Vec<VarBind>,
}

impl SetResponse {
    fn success(bindings: Vec<VarBind>) -> Self {
        Self {
            status: ErrorStatus::NoError,
            error_index: 0,
            bindings,
        }
    }

    fn failed(error: &RequestError, error_index: usize, bindings: Vec<VarBind>) -> Self {
        Self {
            status: error.status(),
            error_index,
            bindings,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Applies SET batches against an [`ObjectStore`]
#[derive(Debug)]
pub struct SetEngine {
    store: Arc<ObjectStore>,
    policy: Arc<dyn AccessPolicy>,
    max_bindings: usize,
}

impl SetEngine {
    /// Engine granting every write, with the default binding limit
    #[must_use]
    pub fn new(store: Arc<ObjectStore>) -> Self {
        Self {
            store,
            policy: Arc::new(AllowAll),
            max_bindings: DEFAULT_MAX_BINDINGS,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_max_bindings(mut self, max_bindings: usize) -> Self {
        self.max_bindings = max_bindings;
        self
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<ObjectStore> {
        &self.store
    }

    #[inline]
    #[must_use]
    pub fn max_bindings(&self) -> usize {
        self.max_bindings
    }

    /// Protocol read of one object
    ///
    /// # Errors
    /// Returns [`RequestError::NoAccess`] for unknown OIDs and unreadable
    /// columns
    pub fn get(&self, oid: &Oid) -> Result<Value, RequestError> {
        self.store
            .resolve(oid)
            .ok_or_else(|| RequestError::NoAccess(format!("no such object {oid}")))?
            .read()
    }

    /// Apply `bindings` atomically
    ///
    /// # Errors
    /// Returns [`EngineFault`] when an undo fails or the phase machine is
    /// driven out of order. Rejected bindings are not errors; they are
    /// reported in the [`SetResponse`].
    pub fn set(
        &self,
        context: &RequestContext,
        bindings: Vec<VarBind>,
    ) -> Result<SetResponse, EngineFault> {
        if bindings.is_empty() {
            return Ok(SetResponse::success(bindings));
        }
        if bindings.len() > self.max_bindings {
            let error = RequestError::TooBig {
                count: bindings.len(),
                limit: self.max_bindings,
            };
            tracing::warn!("rejecting SET: {}", error);
            return Ok(SetResponse::failed(&error, 0, bindings));
        }

        let targets = match self.resolve_targets(&bindings) {
            Ok(targets) => targets,
            Err((index, error)) => {
                tracing::warn!("binding {} rejected: {}", index + 1, error);
                return Ok(SetResponse::failed(&error, index + 1, bindings));
            }
        };

        let mut order: Vec<usize> = (0..targets.len()).collect();
        order.sort_by(|a, b| targets[*a].oid().cmp(targets[*b].oid()));
        let mut slots: Vec<Option<ObjectGuard<'_>>> = targets.iter().map(|_| None).collect();
        for i in order {
            slots[i] = Some(targets[i].lock());
        }
        let mut guards: Vec<ObjectGuard<'_>> = slots.into_iter().flatten().collect();

        let mut subs: Vec<SubRequest> = bindings
            .iter()
            .zip(&guards)
            .map(|(b, state)| {
                SubRequest::new(b.oid.clone(), b.value.clone(), state.value().clone())
                    .redact_values(state.kind().holds_secret())
            })
            .collect();

        tracing::debug!("SET with {} bindings locked", subs.len());
        let outcome = self.run(context.security(), &mut subs, &mut guards);
        for sub in &mut subs {
            sub.cleanup();
        }
        drop(guards);

        match outcome? {
            None => {
                let reported = subs
                    .iter()
                    .map(|sub| VarBind {
                        oid: sub.oid().clone(),
                        value: sub.response().unwrap_or(sub.proposed()).clone(),
                    })
                    .collect();
                tracing::debug!("SET committed");
                Ok(SetResponse::success(reported))
            }
            Some((index, error)) => Ok(SetResponse::failed(&error, index + 1, bindings)),
        }
    }

    /// Objects addressed by `bindings`, in request order
    fn resolve_targets(
        &self,
        bindings: &[VarBind],
    ) -> Result<Vec<Arc<ManagedObject>>, (usize, RequestError)> {
        let mut seen = HashSet::with_capacity(bindings.len());
        bindings
            .iter()
            .enumerate()
            .map(|(i, binding)| {
                if !seen.insert(&binding.oid) {
                    return Err((
                        i,
                        RequestError::InconsistentValue(format!(
                            "{} appears more than once",
                            binding.oid
                        )),
                    ));
                }
                self.store
                    .resolve(&binding.oid)
                    .ok_or((i, RequestError::NoCreation))
            })
            .collect()
    }

    /// Drive the phases; `Some((index, error))` names the failed binding
    fn run(
        &self,
        security: Option<&dyn SecurityContext>,
        subs: &mut [SubRequest],
        guards: &mut [ObjectGuard<'_>],
    ) -> Result<Option<(usize, RequestError)>, EngineFault> {
        for (i, (sub, state)) in subs.iter_mut().zip(guards.iter()).enumerate() {
            let verdict = if self.policy.may_write(security, sub.oid()) {
                state.prepare(sub.proposed(), security)
            } else {
                Err(RequestError::NoAccess(format!("write to {} denied", sub.oid())))
            };
            if let Err(error) = verdict {
                return reject(sub, i, error, "prepare").map(Some);
            }
            sub.advance(Phase::Prepared)?;
        }

        for (i, (sub, state)) in subs.iter_mut().zip(guards.iter()).enumerate() {
            if let Err(error) = state.check(sub.proposed()) {
                return reject(sub, i, error, "check").map(Some);
            }
            sub.advance(Phase::Checked)?;
        }

        for i in 0..subs.len() {
            let sub = &mut subs[i];
            match guards[i].commit(sub.oid(), sub.proposed()) {
                Ok(committed) => sub.committed(committed.stored, committed.reported)?,
                Err(error) => {
                    let error = match error {
                        RequestError::CommitFailed(_) => error,
                        other => RequestError::CommitFailed(other.to_string()),
                    };
                    let failed = reject(sub, i, error, "commit")?;
                    undo_committed(&mut subs[..i], &mut guards[..i])?;
                    return Ok(Some(failed));
                }
            }
        }
        Ok(None)
    }
}

fn reject(
    sub: &mut SubRequest,
    index: usize,
    error: RequestError,
    phase: &str,
) -> Result<(usize, RequestError), EngineFault> {
    tracing::warn!("{} failed for {} (binding {}): {}", phase, sub.oid(), index + 1, error);
    sub.fail(error.clone())?;
    Ok((index, error))
}

/// Restore prior values in reverse commit order
///
/// Every committed sibling is attempted; the first failure is returned.
fn undo_committed(
    subs: &mut [SubRequest],
    guards: &mut [ObjectGuard<'_>],
) -> Result<(), EngineFault> {
    let mut first_fault = None;
    for (sub, state) in subs.iter_mut().zip(guards.iter_mut()).rev() {
        if let Err(fault) = undo(sub, state) {
            tracing::error!("{}", fault);
            first_fault.get_or_insert(fault);
        }
    }
    first_fault.map_or(Ok(()), Err)
}

fn undo(sub: &mut SubRequest, state: &mut ObjectGuard<'_>) -> Result<(), EngineFault> {
    if sub.applied() != Some(state.value()) {
        return Err(EngineFault::UndoFailed {
            oid: sub.oid().clone(),
            reason: format!(
                "live value {} is not the committed value",
                state.describe_value()
            ),
        });
    }
    state.apply(sub.oid(), sub.prior().clone());
    sub.advance(Phase::UndoApplied)?;
    tracing::debug!("undid {}", sub.oid());
    Ok(())
}

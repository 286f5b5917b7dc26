//! Sub-request phase state machine

use crate::error::PhaseError;
use serde::{Deserialize, Serialize};

/// Phase of one sub-request within a SET transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Created,
    Prepared,
    Checked,
    Committed,
    Cleaned,
    Failed,
    UndoApplied,
}

impl Phase {
    /// `true` once no further transition is possible
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Cleaned)
    }
}

/// Validates a phase transition.
///
/// Illegal transitions are returned as errors; the engine escalates them to
/// [`crate::EngineFault::IllegalTransition`].
pub fn validate_transition(from: Phase, to: Phase) -> Result<(), PhaseError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(PhaseError { from, to })
    }
}

pub fn allowed_transitions(from: Phase) -> Vec<Phase> {
    use Phase::*;
    match from {
        Created => vec![Prepared, Failed, Cleaned],
        Prepared => vec![Checked, Failed, Cleaned],
        Checked => vec![Committed, Failed, Cleaned],
        Committed => vec![UndoApplied, Failed, Cleaned],
        UndoApplied => vec![Failed, Cleaned],
        Failed => vec![Cleaned],
        Cleaned => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn happy_path_is_allowed() {
        assert!(validate_transition(Phase::Created, Phase::Prepared).is_ok());
        assert!(validate_transition(Phase::Prepared, Phase::Checked).is_ok());
        assert!(validate_transition(Phase::Checked, Phase::Committed).is_ok());
        assert!(validate_transition(Phase::Committed, Phase::Cleaned).is_ok());
    }

    #[test]
    fn phases_cannot_be_skipped() {
        assert!(validate_transition(Phase::Created, Phase::Checked).is_err());
        assert!(validate_transition(Phase::Created, Phase::Committed).is_err());
        assert!(validate_transition(Phase::Prepared, Phase::Committed).is_err());
    }

    #[test]
    fn undo_only_from_committed() {
        assert!(validate_transition(Phase::Committed, Phase::UndoApplied).is_ok());
        for from in [Phase::Created, Phase::Prepared, Phase::Checked, Phase::Failed] {
            assert!(validate_transition(from, Phase::UndoApplied).is_err());
        }
    }

    #[test]
    fn cleaned_is_terminal() {
        assert!(allowed_transitions(Phase::Cleaned).is_empty());
        assert!(Phase::Cleaned.is_terminal());
        assert!(validate_transition(Phase::Cleaned, Phase::Failed).is_err());
    }

    fn any_phase() -> impl Strategy<Value = Phase> {
        prop_oneof![
            Just(Phase::Created),
            Just(Phase::Prepared),
            Just(Phase::Checked),
            Just(Phase::Committed),
            Just(Phase::Cleaned),
            Just(Phase::Failed),
            Just(Phase::UndoApplied),
        ]
    }

    proptest! {
        #[test]
        fn prop_validation_agrees_with_allowed(from in any_phase(), to in any_phase()) {
            let res = validate_transition(from, to);
            prop_assert_eq!(res.is_ok(), allowed_transitions(from).contains(&to));
        }

        #[test]
        fn prop_failed_reachable_from_non_terminal(from in any_phase()) {
            if from != Phase::Cleaned && from != Phase::Failed {
                prop_assert!(validate_transition(from, Phase::Failed).is_ok());
            }
        }
    }
}

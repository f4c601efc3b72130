use crate::CoreError;
use serde::Serialize;
use std::fmt;

/// Per-request activation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationState {
    Created,
    Initialized,
    Activated,
    Detached,
    ShutdownOnly,
}

impl fmt::Display for ActivationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActivationState::Created => "created",
            ActivationState::Initialized => "initialized",
            ActivationState::Activated => "activated",
            ActivationState::Detached => "detached",
            ActivationState::ShutdownOnly => "shutdown_only",
        };
        f.write_str(s)
    }
}

pub fn validate_transition(from: ActivationState, to: ActivationState) -> Result<(), CoreError> {
    use ActivationState::{Activated, Created, Detached, Initialized, ShutdownOnly};

    let valid = matches!(
        (from, to),
        (Created, Initialized)
            | (Initialized | Activated, Activated)
            | (
                Initialized | Activated | Detached | ShutdownOnly,
                Detached | ShutdownOnly
            )
    );

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ActivationState::{Activated, Created, Detached, Initialized, ShutdownOnly};

    #[test]
    fn valid_transitions() {
        assert!(validate_transition(Created, Initialized).is_ok());
        assert!(validate_transition(Initialized, Activated).is_ok());
        assert!(validate_transition(Activated, Activated).is_ok()); // repeated interface query
        assert!(validate_transition(Activated, Detached).is_ok());
        assert!(validate_transition(Initialized, Detached).is_ok());
        assert!(validate_transition(Detached, Detached).is_ok());
        assert!(validate_transition(Activated, ShutdownOnly).is_ok());
        assert!(validate_transition(ShutdownOnly, ShutdownOnly).is_ok());
        assert!(validate_transition(ShutdownOnly, Detached).is_ok());
    }

    #[test]
    fn invalid_transitions() {
        assert!(validate_transition(Created, Activated).is_err());
        assert!(validate_transition(Created, Detached).is_err());
        assert!(validate_transition(Initialized, Initialized).is_err());
        assert!(validate_transition(Detached, Activated).is_err());
        assert!(validate_transition(ShutdownOnly, Initialized).is_err());
    }

    #[test]
    fn invalid_transition_names_both_states() {
        let err = validate_transition(Detached, Activated).unwrap_err();
        assert_eq!(err.to_string(), "invalid state transition: detached -> activated");
    }
}

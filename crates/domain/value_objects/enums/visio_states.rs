use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::domain::errors::{VisioError, VisioResult};

/// States a conversational session moves through. There is no terminal state:
/// `Error` recovers back to `Setup`, `Ready` or `Idle`.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VisioState {
    #[default]
    Setup,
    Ready,
    Idle,
    Recording,
    Processing,
    Talking,
    Error,
}

impl Display for VisioState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self {
            VisioState::Setup => "setup",
            VisioState::Ready => "ready",
            VisioState::Idle => "idle",
            VisioState::Recording => "recording",
            VisioState::Processing => "processing",
            VisioState::Talking => "talking",
            VisioState::Error => "error",
        };
        write!(f, "{}", state)
    }
}

impl VisioState {
    pub const ALL: [VisioState; 7] = [
        VisioState::Setup,
        VisioState::Ready,
        VisioState::Idle,
        VisioState::Recording,
        VisioState::Processing,
        VisioState::Talking,
        VisioState::Error,
    ];

    /// Unknown values come back as `Error` so a corrupted row can still be recovered.
    pub fn from_str(value: &str) -> Self {
        match value {
            "setup" => VisioState::Setup,
            "ready" => VisioState::Ready,
            "idle" => VisioState::Idle,
            "recording" => VisioState::Recording,
            "processing" => VisioState::Processing,
            "talking" => VisioState::Talking,
            _ => VisioState::Error,
        }
    }

    pub fn allowed_transitions(&self) -> &'static [VisioState] {
        use VisioState::*;
        match self {
            Setup => &[Ready, Error],
            Ready => &[Idle, Setup, Error],
            Idle => &[Recording, Ready, Error],
            Recording => &[Processing, Idle, Error],
            Processing => &[Talking, Idle, Error],
            Talking => &[Idle, Error],
            Error => &[Setup, Ready, Idle],
        }
    }

    pub fn can_transition_to(&self, next: VisioState) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Returns the next state, or `InvalidTransition` when the pair is not in the table.
    pub fn transition(self, next: VisioState) -> VisioResult<VisioState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(VisioError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legal_pairs() -> Vec<(VisioState, VisioState)> {
        use VisioState::*;
        vec![
            (Setup, Ready),
            (Setup, Error),
            (Ready, Idle),
            (Ready, Setup),
            (Ready, Error),
            (Idle, Recording),
            (Idle, Ready),
            (Idle, Error),
            (Recording, Processing),
            (Recording, Idle),
            (Recording, Error),
            (Processing, Talking),
            (Processing, Idle),
            (Processing, Error),
            (Talking, Idle),
            (Talking, Error),
            (Error, Setup),
            (Error, Ready),
            (Error, Idle),
        ]
    }

    #[test]
    fn accepts_exactly_the_transition_table() {
        let legal = legal_pairs();
        for from in VisioState::ALL {
            for to in VisioState::ALL {
                let expected = legal.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{from} -> {to} should be {}",
                    if expected { "legal" } else { "rejected" }
                );
            }
        }
    }

    #[test]
    fn idle_cannot_jump_to_talking() {
        let err = VisioState::Idle
            .transition(VisioState::Talking)
            .unwrap_err();
        assert!(matches!(
            err,
            VisioError::InvalidTransition {
                from: VisioState::Idle,
                to: VisioState::Talking
            }
        ));
    }

    #[test]
    fn no_state_transitions_to_itself() {
        for state in VisioState::ALL {
            assert!(!state.can_transition_to(state));
        }
    }

    #[test]
    fn round_trips_through_storage_representation() {
        for state in VisioState::ALL {
            assert_eq!(VisioState::from_str(&state.to_string()), state);
        }
        assert_eq!(VisioState::from_str("garbage"), VisioState::Error);
    }
}

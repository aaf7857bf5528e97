// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-request boundary state machine.
//!
//! ```text
//! Idle ─► Handling ─► Succeeded
//!             │
//!             └─► Classifying ─► Rendering ─► Responded
//! ```
//!
//! `Succeeded` and `Responded` are terminal. There is no edge from
//! `Handling` or `Classifying` to a terminal state that skips rendering, so a
//! failed request always leaves through `Responded`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a request is in the boundary pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryState {
    /// Not yet started.
    Idle,
    /// The wrapped handler is running.
    Handling,
    /// The handler returned a value; it passes through untouched.
    Succeeded,
    /// The handler failed and the failure is being classified.
    Classifying,
    /// The canonical record is being rendered.
    Rendering,
    /// An envelope was produced.
    Responded,
}

impl BoundaryState {
    /// Every state, in pipeline order.
    pub const ALL: [BoundaryState; 6] = [
        Self::Idle,
        Self::Handling,
        Self::Succeeded,
        Self::Classifying,
        Self::Rendering,
        Self::Responded,
    ];

    /// Stable string form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Handling => "handling",
            Self::Succeeded => "succeeded",
            Self::Classifying => "classifying",
            Self::Rendering => "rendering",
            Self::Responded => "responded",
        }
    }

    /// Whether no further transition is possible.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Responded)
    }

    /// Returns `true` if moving from `self` to `next` is a valid edge.
    pub fn can_transition_to(self, next: BoundaryState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Handling)
                | (Self::Handling, Self::Succeeded)
                | (Self::Handling, Self::Classifying)
                | (Self::Classifying, Self::Rendering)
                | (Self::Rendering, Self::Responded)
        )
    }
}

impl fmt::Display for BoundaryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of a single state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    /// State before the transition.
    pub from: BoundaryState,
    /// State after the transition.
    pub to: BoundaryState,
    /// When it happened.
    pub at: DateTime<Utc>,
}

/// Rejected transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// The edge does not exist.
    #[error("invalid boundary transition from {from} to {to}")]
    InvalidTransition {
        /// Current state.
        from: BoundaryState,
        /// Requested state.
        to: BoundaryState,
    },
    /// The pipeline is already in the requested state.
    #[error("already in state {0}")]
    AlreadyInState(BoundaryState),
}

/// Tracks one request through the boundary and enforces valid transitions.
#[derive(Debug, Clone)]
pub struct Pipeline {
    state: BoundaryState,
    history: Vec<StateTransition>,
}

impl Pipeline {
    /// A pipeline in [`BoundaryState::Idle`].
    pub fn new() -> Self {
        Self {
            state: BoundaryState::Idle,
            history: Vec::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> BoundaryState {
        self.state
    }

    /// Move to `to`, or explain why that is not allowed.
    pub fn transition(&mut self, to: BoundaryState) -> Result<(), TransitionError> {
        if self.state == to {
            return Err(TransitionError::AlreadyInState(to));
        }
        if !self.state.can_transition_to(to) {
            return Err(TransitionError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.history.push(StateTransition {
            from: self.state,
            to,
            at: Utc::now(),
        });
        self.state = to;
        Ok(())
    }

    /// Whether the pipeline has finished.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Every transition taken so far.
    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    /// States visited, starting with `Idle`.
    pub fn visited(&self) -> Vec<BoundaryState> {
        std::iter::once(BoundaryState::Idle)
            .chain(self.history.iter().map(|t| t.to))
            .collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BoundaryState::*;

    #[test]
    fn success_path() {
        let mut p = Pipeline::new();
        p.transition(Handling).unwrap();
        p.transition(Succeeded).unwrap();
        assert!(p.is_terminal());
        assert_eq!(p.visited(), vec![Idle, Handling, Succeeded]);
    }

    #[test]
    fn failure_path() {
        let mut p = Pipeline::new();
        for s in [Handling, Classifying, Rendering, Responded] {
            p.transition(s).unwrap();
        }
        assert_eq!(p.history().len(), 4);
        assert_eq!(p.state(), Responded);
    }

    #[test]
    fn cannot_skip_rendering() {
        let mut p = Pipeline::new();
        p.transition(Handling).unwrap();
        p.transition(Classifying).unwrap();
        assert_eq!(
            p.transition(Responded),
            Err(TransitionError::InvalidTransition {
                from: Classifying,
                to: Responded
            })
        );
        assert_eq!(p.state(), Classifying);
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for from in [Succeeded, Responded] {
            for to in BoundaryState::ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn same_state_rejected() {
        let mut p = Pipeline::new();
        assert_eq!(p.transition(Idle), Err(TransitionError::AlreadyInState(Idle)));
    }
}

//! Structural operation lifecycle
//!
//! Every structural call moves through
//! `Validating -> PreHandlers -> Mutating -> PostHandlers -> Done`, with
//! `Failed` reachable from every non-terminal state. A call that finds
//! nothing to do (rename or delete of an absent path) goes straight from
//! `Validating` to `Done`.

use crate::error::{ErrorKind, ProjectError};
use ptm_registry::HandlerEvent;
use ptm_vfs::{TreePath, WorkspaceId};
use std::fmt;
use tracing::span::EnteredSpan;
use uuid::Uuid;

/// State of an in-flight structural operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationState {
    Validating,
    PreHandlers,
    Mutating,
    PostHandlers,
    Done,
    Failed,
}

impl OperationState {
    /// Check if no further transition is possible
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validating => "validating",
            Self::PreHandlers => "pre-handlers",
            Self::Mutating => "mutating",
            Self::PostHandlers => "post-handlers",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Transition outside the lifecycle graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal operation transition {from} -> {to}")]
pub struct IllegalTransition {
    pub from: OperationState,
    pub to: OperationState,
}

/// States reachable from `from`
#[must_use]
pub fn allowed_transitions(from: OperationState) -> Vec<OperationState> {
    use OperationState::*;
    match from {
        Validating => vec![PreHandlers, Done, Failed],
        PreHandlers => vec![Mutating, Failed],
        Mutating => vec![PostHandlers, Failed],
        PostHandlers => vec![Done, Failed],
        Done | Failed => vec![],
    }
}

/// Validates a state transition
///
/// # Errors
/// `IllegalTransition` if `to` is not reachable from `from`
pub fn validate_transition(
    from: OperationState,
    to: OperationState,
) -> Result<(), IllegalTransition> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(IllegalTransition { from, to })
    }
}

/// Post-handler failure attached to a successful result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerWarning {
    pub handler: String,
    pub event: HandlerEvent,
    pub project_type: String,
    pub message: String,
}

impl fmt::Display for HandlerWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} handler '{}' for '{}' failed: {}",
            self.event, self.handler, self.project_type, self.message
        )
    }
}

/// Successful structural result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<HandlerWarning>,
}

impl<T> Outcome<T> {
    /// Result without warnings
    #[inline]
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Drop the warnings
    #[inline]
    pub fn into_value(self) -> T {
        self.value
    }

    /// Map the value, keeping the warnings
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}

/// Tracker of one in-flight structural operation
pub(crate) struct Operation {
    id: Uuid,
    name: &'static str,
    state: OperationState,
    warnings: Vec<HandlerWarning>,
    _span: EnteredSpan,
}

impl Operation {
    /// Enter the operation span in `Validating`
    pub(crate) fn start(name: &'static str, workspace: &WorkspaceId, path: &TreePath) -> Self {
        let id = Uuid::new_v4();
        let span = tracing::info_span!(
            "project_op",
            op = name,
            op_id = %id,
            workspace = %workspace,
            path = %path
        )
        .entered();
        tracing::debug!(state = %OperationState::Validating, "operation started");
        Self {
            id,
            name,
            state: OperationState::Validating,
            warnings: Vec::new(),
            _span: span,
        }
    }

    /// Move to `to`
    ///
    /// Illegal moves are a bug in the manager; they are logged and ignored.
    pub(crate) fn advance(&mut self, to: OperationState) {
        match validate_transition(self.state, to) {
            Ok(()) => {
                tracing::debug!(from = %self.state, to = %to, "transition");
                self.state = to;
            }
            Err(e) => tracing::error!(op = self.name, op_id = %self.id, "{e}"),
        }
    }

    pub(crate) fn warn(&mut self, warning: HandlerWarning) {
        tracing::warn!(
            event = %warning.event,
            handler = %warning.handler,
            project_type = %warning.project_type,
            "post-handler failed: {}",
            warning.message
        );
        self.warnings.push(warning);
    }

    /// Close the operation with the result of its body
    pub(crate) fn finish<T>(mut self, result: Result<T, ProjectError>) -> Result<Outcome<T>, ProjectError> {
        match result {
            Ok(value) => {
                self.advance(OperationState::Done);
                tracing::info!(warnings = self.warnings.len(), "{} done", self.name);
                Ok(Outcome {
                    value,
                    warnings: std::mem::take(&mut self.warnings),
                })
            }
            Err(err) => {
                let failed_in = self.state;
                self.advance(OperationState::Failed);
                if err.kind() == ErrorKind::Storage {
                    tracing::error!(state = %failed_in, "{} failed: {err}", self.name);
                } else {
                    tracing::info!(state = %failed_in, "{} failed: {err}", self.name);
                }
                Err(err)
            }
        }
    }
}

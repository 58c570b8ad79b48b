//! Session state and the reducer every state change goes through.

use shared::domain::{ToolRecord, ToolStatus};

use crate::error::{OperationKind, SessionError};

/// The one remote call a session may have outstanding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PendingOperation {
    #[default]
    None,
    Lookup {
        identifier: String,
    },
    Transition {
        target: ToolStatus,
    },
}

impl PendingOperation {
    pub fn kind(&self) -> Option<OperationKind> {
        match self {
            PendingOperation::None => None,
            PendingOperation::Lookup { .. } => Some(OperationKind::Lookup),
            PendingOperation::Transition { .. } => Some(OperationKind::Transition),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, PendingOperation::None)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub identifier: String,
    pub scanning_active: bool,
    pub record: Option<ToolRecord>,
    pub pending: PendingOperation,
    pub last_error: Option<String>,
    pub last_message: Option<String>,
    deferred_lookup: bool,
    closed: bool,
}

#[derive(Debug, Clone)]
pub enum SessionAction {
    IdentifierEdited(String),
    LookupStarted {
        identifier: String,
    },
    LookupResolved {
        identifier: String,
        record: ToolRecord,
    },
    LookupFailed {
        identifier: String,
        error: SessionError,
    },
    ScanActivated,
    ScanReleased,
    ScanFailed(String),
    CodeDecoded(String),
    TransitionStarted {
        target: ToolStatus,
    },
    TransitionUnchanged {
        status: ToolStatus,
    },
    TransitionSucceeded {
        record: ToolRecord,
    },
    TransitionFailed {
        error: SessionError,
    },
    LocalError(SessionError),
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reduction {
    Applied,
    /// The result no longer matches the live identifier and was dropped.
    Stale,
    /// A lookup came due behind an in-flight transition.
    Deferred,
    /// Nothing changed (unchanged input or a closed session).
    Ignored,
}

impl SessionState {
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether an unchanged identifier should be looked up again.
    pub fn wants_retry(&self) -> bool {
        !self.identifier.is_empty()
            && self.record.is_none()
            && !matches!(self.pending, PendingOperation::Lookup { .. })
    }

    /// Takes the flag set when a lookup was deferred behind a transition.
    pub fn take_deferred_lookup(&mut self) -> Option<String> {
        if !std::mem::take(&mut self.deferred_lookup) || self.identifier.is_empty() {
            return None;
        }
        Some(self.identifier.clone())
    }

    fn clear_feedback(&mut self) {
        self.last_error = None;
        self.last_message = None;
    }

    pub fn reduce(&mut self, action: SessionAction) -> Reduction {
        if self.closed {
            return Reduction::Ignored;
        }

        match action {
            SessionAction::IdentifierEdited(text) => {
                let text = text.trim().to_string();
                if text == self.identifier {
                    return Reduction::Ignored;
                }
                self.identifier = text;
                // A record only ever belongs to the identifier it was fetched for.
                self.record = None;
                if self.identifier.is_empty() {
                    self.clear_feedback();
                    self.deferred_lookup = false;
                    if matches!(self.pending, PendingOperation::Lookup { .. }) {
                        self.pending = PendingOperation::None;
                    }
                }
                Reduction::Applied
            }
            SessionAction::LookupStarted { identifier } => {
                if identifier != self.identifier {
                    return Reduction::Stale;
                }
                if matches!(self.pending, PendingOperation::Transition { .. }) {
                    self.deferred_lookup = true;
                    return Reduction::Deferred;
                }
                self.pending = PendingOperation::Lookup { identifier };
                self.clear_feedback();
                Reduction::Applied
            }
            SessionAction::LookupResolved { identifier, record } => {
                if !self.owns_lookup(&identifier) {
                    return Reduction::Stale;
                }
                self.pending = PendingOperation::None;
                self.last_error = None;
                self.last_message = Some(format!(
                    "Loaded tool {} ({}).",
                    record.id,
                    record.display_name()
                ));
                self.record = Some(record);
                Reduction::Applied
            }
            SessionAction::LookupFailed { identifier, error } => {
                if !self.owns_lookup(&identifier) {
                    return Reduction::Stale;
                }
                self.pending = PendingOperation::None;
                self.record = None;
                self.last_message = None;
                self.last_error = Some(error.user_message());
                Reduction::Applied
            }
            SessionAction::ScanActivated => {
                self.scanning_active = true;
                self.clear_feedback();
                Reduction::Applied
            }
            SessionAction::ScanReleased => {
                if !self.scanning_active {
                    return Reduction::Ignored;
                }
                self.scanning_active = false;
                Reduction::Applied
            }
            SessionAction::ScanFailed(message) => {
                self.scanning_active = false;
                self.last_message = None;
                self.last_error = Some(message);
                Reduction::Applied
            }
            SessionAction::CodeDecoded(text) => {
                self.scanning_active = false;
                self.reduce(SessionAction::IdentifierEdited(text))
            }
            SessionAction::TransitionStarted { target } => {
                self.pending = PendingOperation::Transition { target };
                self.clear_feedback();
                Reduction::Applied
            }
            SessionAction::TransitionUnchanged { status } => {
                let name = self
                    .record
                    .as_ref()
                    .map(|record| record.display_name().to_string())
                    .unwrap_or_default();
                self.last_error = None;
                self.last_message = Some(format!("{name} is already {}.", status.label()));
                Reduction::Applied
            }
            SessionAction::TransitionSucceeded { record } => {
                self.settle_transition();
                if record.id.as_str() != self.identifier {
                    return Reduction::Stale;
                }
                self.last_error = None;
                self.last_message = Some(format!(
                    "{} ({}) is now {}.",
                    record.display_name(),
                    record.id,
                    record.status.label()
                ));
                self.record = Some(record);
                Reduction::Applied
            }
            SessionAction::TransitionFailed { error } => {
                self.settle_transition();
                self.last_message = None;
                self.last_error = Some(error.user_message());
                Reduction::Applied
            }
            SessionAction::LocalError(error) => {
                self.last_message = None;
                self.last_error = Some(error.user_message());
                Reduction::Applied
            }
            SessionAction::Closed => {
                self.closed = true;
                self.scanning_active = false;
                self.pending = PendingOperation::None;
                self.deferred_lookup = false;
                Reduction::Applied
            }
        }
    }

    fn owns_lookup(&self, identifier: &str) -> bool {
        identifier == self.identifier
            && matches!(&self.pending, PendingOperation::Lookup { identifier: pending } if pending == identifier)
    }

    fn settle_transition(&mut self) {
        if matches!(self.pending, PendingOperation::Transition { .. }) {
            self.pending = PendingOperation::None;
        }
    }
}

#[cfg(test)]
#[path = "tests/reducer_tests.rs"]
mod tests;

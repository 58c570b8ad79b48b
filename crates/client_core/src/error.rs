//! Session error taxonomy and the user-facing text each error becomes.

use scanner_integration::{DecoderFault, ScanRegion};
use shared::domain::{ToolId, ToolStatus};
use thiserror::Error;

/// Kind of remote call a session can have outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Lookup,
    Transition,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Lookup => f.write_str("lookup"),
            OperationKind::Transition => f.write_str("status update"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("scan region '{0}' is not mounted")]
    RegionNotFound(ScanRegion),
    #[error("camera could not be started: {0}")]
    Acquisition(DecoderFault),
    #[error("tool {0} was not found")]
    LookupNotFound(ToolId),
    #[error("tool lookup failed: {0}")]
    LookupNetwork(String),
    #[error("cannot change status from {from} to {to}")]
    InvalidTransition { from: ToolStatus, to: ToolStatus },
    #[error("no tool record is loaded")]
    NoRecordLoaded,
    #[error("a {0} is already in progress")]
    OperationInProgress(OperationKind),
    #[error("status change was rejected: {0}")]
    TransitionRejected(String),
    #[error("status update failed: {0}")]
    TransitionNetwork(String),
    #[error("session is closed")]
    SessionClosed,
}

impl SessionError {
    /// Text stored as the session's `last_error`.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::RegionNotFound(region) => format!(
                "Camera display area '{region}' was not found; reload the screen and retry."
            ),
            SessionError::Acquisition(fault) => fault.user_message(),
            SessionError::LookupNotFound(id) => {
                format!("Tool {id} was not found; check the identifier and retry.")
            }
            SessionError::LookupNetwork(detail) => {
                format!("Failed to load tool information: {detail}")
            }
            SessionError::InvalidTransition { from, to } => format!(
                "A tool that is {} cannot be marked {}.",
                from.label(),
                to.label()
            ),
            SessionError::NoRecordLoaded => "No tool information is loaded.".to_string(),
            SessionError::OperationInProgress(kind) => {
                format!("Please wait; a {kind} is still in progress.")
            }
            // Server detail is shown verbatim.
            SessionError::TransitionRejected(detail) => detail.clone(),
            SessionError::TransitionNetwork(detail) => {
                format!("Failed to update the tool status: {detail}")
            }
            SessionError::SessionClosed => "This session has been closed.".to_string(),
        }
    }
}

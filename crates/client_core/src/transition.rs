use std::sync::Arc;

use shared::domain::{ToolId, ToolRecord, ToolStatus};
use tracing::{info, warn};

use crate::{
    api::{ToolApi, ToolApiError},
    error::SessionError,
    reducer::SessionState,
};

/// Status changes a session may request. `UnderMaintenance` and `Disposed`
/// are only ever entered through administration.
pub const ALLOWED_TRANSITIONS: &[(ToolStatus, ToolStatus)] = &[
    (ToolStatus::Available, ToolStatus::Lent),
    (ToolStatus::Lent, ToolStatus::Available),
    (ToolStatus::Broken, ToolStatus::Available),
    (ToolStatus::Available, ToolStatus::Broken),
    (ToolStatus::Lent, ToolStatus::Broken),
];

pub fn is_allowed(from: ToolStatus, to: ToolStatus) -> bool {
    ALLOWED_TRANSITIONS.contains(&(from, to))
}

/// Targets reachable from `from`, in table order.
pub fn allowed_targets(from: ToolStatus) -> Vec<ToolStatus> {
    ALLOWED_TRANSITIONS
        .iter()
        .filter(|(source, _)| *source == from)
        .map(|(_, target)| *target)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionPlan {
    /// Already in the requested status; nothing to send.
    Unchanged(ToolStatus),
    Execute { id: ToolId, target: ToolStatus },
}

pub struct TransitionController {
    api: Arc<dyn ToolApi>,
}

impl TransitionController {
    pub fn new(api: Arc<dyn ToolApi>) -> Self {
        Self { api }
    }

    pub fn validate(
        &self,
        state: &SessionState,
        target: ToolStatus,
    ) -> Result<TransitionPlan, SessionError> {
        if let Some(kind) = state.pending.kind() {
            return Err(SessionError::OperationInProgress(kind));
        }
        let Some(record) = state.record.as_ref() else {
            return Err(SessionError::NoRecordLoaded);
        };

        if record.status == target {
            return Ok(TransitionPlan::Unchanged(target));
        }
        if !is_allowed(record.status, target) {
            return Err(SessionError::InvalidTransition {
                from: record.status,
                to: target,
            });
        }
        Ok(TransitionPlan::Execute {
            id: record.id.clone(),
            target,
        })
    }

    pub async fn execute(
        &self,
        id: &ToolId,
        target: ToolStatus,
    ) -> Result<ToolRecord, SessionError> {
        info!(tool_id = %id, %target, "transition: sending status update");
        match self.api.update_tool_status(id, target).await {
            Ok(record) => {
                info!(tool_id = %id, status = %record.status, "transition: server confirmed");
                Ok(record)
            }
            Err(ToolApiError::Validation(detail)) => {
                warn!(tool_id = %id, %target, "transition: rejected: {detail}");
                Err(SessionError::TransitionRejected(detail))
            }
            Err(ToolApiError::NotFound(missing)) => {
                warn!(tool_id = %id, %target, "transition: tool disappeared");
                Err(SessionError::TransitionRejected(format!(
                    "Tool {missing} no longer exists."
                )))
            }
            Err(ToolApiError::Network(detail)) => {
                warn!(tool_id = %id, %target, "transition: update failed: {detail}");
                Err(SessionError::TransitionNetwork(detail))
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/transition_tests.rs"]
mod tests;

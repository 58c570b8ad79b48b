use serde::{Deserialize, Serialize};

use crate::domain::ToolStatus;

/// Body of `PUT /tools/{id}/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ToolStatus,
}

use std::{future::Future, sync::Arc, sync::Mutex, time::Duration};

use shared::domain::{ToolId, ToolRecord};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    api::{ToolApi, ToolApiError},
    error::SessionError,
};

/// Debounces identifier edits into fetches.
///
/// Only the quiet-period timer is ever cancelled; a fetch that has started
/// runs to completion and its result is judged by identity when applied.
pub struct LookupCoordinator {
    api: Arc<dyn ToolApi>,
    debounce: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl LookupCoordinator {
    pub fn new(api: Arc<dyn ToolApi>, debounce: Duration) -> Self {
        Self {
            api,
            debounce,
            timer: Mutex::new(None),
        }
    }

    /// Restarts the quiet period; `on_due` is spawned once it elapses without
    /// another call to `schedule` or `cancel`.
    pub fn schedule<F>(&self, identifier: &str, on_due: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let debounce = self.debounce;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            tokio::spawn(on_due);
        });
        debug!(identifier, ?debounce, "lookup: debounce scheduled");
        if let Some(previous) = self.timer_slot().replace(timer) {
            previous.abort();
        }
    }

    pub fn cancel(&self) {
        if let Some(previous) = self.timer_slot().take() {
            previous.abort();
            debug!("lookup: pending debounce cancelled");
        }
    }

    pub async fn fetch(&self, identifier: &str) -> Result<ToolRecord, SessionError> {
        let id = ToolId::new(identifier);
        info!(tool_id = %id, "lookup: fetching");
        match self.api.fetch_tool_by_id(&id).await {
            Ok(record) => Ok(record),
            Err(ToolApiError::NotFound(id)) => {
                warn!(tool_id = %id, "lookup: not found");
                Err(SessionError::LookupNotFound(id))
            }
            Err(ToolApiError::Validation(detail) | ToolApiError::Network(detail)) => {
                warn!(tool_id = %id, "lookup: failed: {detail}");
                Err(SessionError::LookupNetwork(detail))
            }
        }
    }

    fn timer_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for LookupCoordinator {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
#[path = "tests/lookup_tests.rs"]
mod tests;

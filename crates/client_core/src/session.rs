use std::sync::{Arc, Mutex, MutexGuard, Weak};

use scanner_integration::{DecoderConfig, DecoderFault, DecoderSurface, ScanRegion};
use shared::domain::{ToolRecord, ToolStatus};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    api::ToolApi,
    config::ClientSettings,
    decoder::{DecodeHandler, DecoderLifecycle, DecoderPhase},
    error::SessionError,
    lookup::LookupCoordinator,
    reducer::{Reduction, SessionAction, SessionState},
    transition::{TransitionController, TransitionPlan},
    SessionEvent,
};

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    Updated(ToolRecord),
    Unchanged,
}

/// One lookup-and-transition session. Owns its decoder and pending-operation
/// bookkeeping exclusively.
pub struct ToolSession {
    region: ScanRegion,
    decoder: DecoderLifecycle,
    lookup: LookupCoordinator,
    transitions: TransitionController,
    state: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl ToolSession {
    pub fn new(
        settings: &ClientSettings,
        api: Arc<dyn ToolApi>,
        surface: Arc<dyn DecoderSurface>,
    ) -> Arc<Self> {
        Self::new_with_dependencies(
            api,
            surface,
            settings.region(),
            settings.decoder.clone(),
            settings.lookup_debounce(),
        )
    }

    pub fn new_with_dependencies(
        api: Arc<dyn ToolApi>,
        surface: Arc<dyn DecoderSurface>,
        region: ScanRegion,
        decoder_config: DecoderConfig,
        debounce: std::time::Duration,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            region,
            decoder: DecoderLifecycle::new(surface, decoder_config),
            lookup: LookupCoordinator::new(Arc::clone(&api), debounce),
            transitions: TransitionController::new(api),
            state: Mutex::new(SessionState::default()),
            events,
        })
    }

    pub fn snapshot(&self) -> SessionState {
        self.state().clone()
    }

    pub fn decoder_phase(&self) -> DecoderPhase {
        self.decoder.phase()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn dispatch(&self, action: SessionAction) -> Reduction {
        self.state().reduce(action)
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    /// Manual entry. Interrupts an active scan before taking the text.
    pub async fn set_identifier(
        self: &Arc<Self>,
        text: impl Into<String>,
    ) -> Result<(), SessionError> {
        if self.state().is_closed() {
            return Err(SessionError::SessionClosed);
        }
        if self.decoder.phase() != DecoderPhase::Released {
            info!("session: manual entry interrupts scan");
            self.decoder.stop().await;
        }
        self.accept_identifier(SessionAction::IdentifierEdited(text.into()));
        Ok(())
    }

    fn accept_identifier(self: &Arc<Self>, action: SessionAction) {
        let (reduction, identifier, retry) = {
            let mut state = self.state();
            if state.is_closed() {
                return;
            }
            let reduction = state.reduce(action);
            (reduction, state.identifier.clone(), state.wants_retry())
        };

        match reduction {
            Reduction::Applied if identifier.is_empty() => self.lookup.cancel(),
            Reduction::Applied => self.schedule_lookup(identifier),
            Reduction::Ignored if retry => {
                debug!(identifier, "session: retrying lookup for unchanged identifier");
                self.schedule_lookup(identifier);
            }
            _ => {}
        }
    }

    fn schedule_lookup(self: &Arc<Self>, identifier: String) {
        let session = Arc::downgrade(self);
        let due = identifier.clone();
        self.lookup.schedule(&identifier, async move {
            if let Some(session) = session.upgrade() {
                session.run_lookup(due).await;
            }
        });
    }

    async fn run_lookup(self: Arc<Self>, identifier: String) {
        match self.dispatch(SessionAction::LookupStarted {
            identifier: identifier.clone(),
        }) {
            Reduction::Applied => {}
            Reduction::Deferred => {
                debug!(identifier, "session: lookup deferred behind status update");
                return;
            }
            Reduction::Stale | Reduction::Ignored => {
                debug!(identifier, "session: lookup no longer wanted");
                return;
            }
        }

        let (action, event) = match self.lookup.fetch(&identifier).await {
            Ok(record) => (
                SessionAction::LookupResolved {
                    identifier: identifier.clone(),
                    record: record.clone(),
                },
                SessionEvent::RecordLoaded(record),
            ),
            Err(error) => (
                SessionAction::LookupFailed {
                    identifier: identifier.clone(),
                    error: error.clone(),
                },
                SessionEvent::LookupFailed {
                    identifier: identifier.clone(),
                    message: error.user_message(),
                },
            ),
        };

        match self.dispatch(action) {
            Reduction::Applied => self.emit(event),
            Reduction::Stale => debug!(identifier, "session: discarding stale lookup result"),
            _ => {}
        }
    }

    fn resume_deferred_lookup(self: &Arc<Self>) {
        let deferred = self.state().take_deferred_lookup();
        if let Some(identifier) = deferred {
            debug!(identifier, "session: issuing deferred lookup");
            tokio::spawn(Arc::clone(self).run_lookup(identifier));
        }
    }

    pub async fn request_transition(
        self: &Arc<Self>,
        target: ToolStatus,
    ) -> Result<TransitionOutcome, SessionError> {
        let planned = {
            let mut state = self.state();
            if state.is_closed() {
                return Err(SessionError::SessionClosed);
            }
            match self.transitions.validate(&state, target) {
                Ok(TransitionPlan::Execute { id, target }) => {
                    state.reduce(SessionAction::TransitionStarted { target });
                    Ok(id)
                }
                Ok(TransitionPlan::Unchanged(status)) => {
                    state.reduce(SessionAction::TransitionUnchanged { status });
                    return Ok(TransitionOutcome::Unchanged);
                }
                Err(err) => {
                    state.reduce(SessionAction::LocalError(err.clone()));
                    Err(err)
                }
            }
        };
        let id = match planned {
            Ok(id) => id,
            Err(err) => {
                warn!(%target, "session: transition refused: {err}");
                self.emit(SessionEvent::Error(err.user_message()));
                return Err(err);
            }
        };

        let result = self.transitions.execute(&id, target).await;
        let outcome = match result {
            Ok(record) => {
                let reduction = self.dispatch(SessionAction::TransitionSucceeded {
                    record: record.clone(),
                });
                if reduction != Reduction::Ignored {
                    self.emit(SessionEvent::ToolsChanged {
                        tool_id: record.id.clone(),
                    });
                }
                if reduction == Reduction::Applied {
                    self.emit(SessionEvent::RecordLoaded(record.clone()));
                }
                Ok(TransitionOutcome::Updated(record))
            }
            Err(err) => {
                if self.dispatch(SessionAction::TransitionFailed { error: err.clone() })
                    == Reduction::Applied
                {
                    self.emit(SessionEvent::Error(err.user_message()));
                }
                Err(err)
            }
        };

        self.resume_deferred_lookup();
        outcome
    }

    pub async fn start_scanning(self: &Arc<Self>) -> Result<(), SessionError> {
        if self.state().is_closed() {
            return Err(SessionError::SessionClosed);
        }
        let handler: Arc<dyn DecodeHandler> = Arc::new(SessionDecodeHandler {
            session: Arc::downgrade(self),
        });
        if let Err(err) = self.decoder.start(&self.region, handler).await {
            self.dispatch(SessionAction::ScanFailed(err.user_message()));
            self.emit(SessionEvent::Error(err.user_message()));
            return Err(err);
        }
        Ok(())
    }

    pub async fn stop_scanning(&self) {
        self.decoder.stop().await;
    }

    /// Returns whether scanning is active afterwards. A camera still starting
    /// up counts as on.
    pub async fn toggle_scanning(self: &Arc<Self>) -> Result<bool, SessionError> {
        if self.decoder.phase() != DecoderPhase::Released {
            self.stop_scanning().await;
            Ok(false)
        } else {
            self.start_scanning().await.map(|()| true)
        }
    }

    /// Teardown: later lookup, transition and decoder results are not applied.
    pub async fn close(&self) {
        self.dispatch(SessionAction::Closed);
        self.lookup.cancel();
        self.decoder.shutdown().await;
        info!("session: closed");
    }
}

struct SessionDecodeHandler {
    session: Weak<ToolSession>,
}

impl DecodeHandler for SessionDecodeHandler {
    fn on_active(&self, region: &ScanRegion) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        debug!(%region, "session: scanning");
        if session.dispatch(SessionAction::ScanActivated) == Reduction::Applied {
            session.emit(SessionEvent::ScanningChanged(true));
        }
    }

    fn on_result(&self, text: String) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        info!(code = %text, "session: code decoded");
        session.accept_identifier(SessionAction::CodeDecoded(text));
    }

    fn on_error(&self, fault: DecoderFault) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        let message = fault.user_message();
        if session.dispatch(SessionAction::ScanFailed(message.clone())) == Reduction::Applied {
            session.emit(SessionEvent::Error(message));
        }
    }

    fn on_released(&self) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        if session.dispatch(SessionAction::ScanReleased) == Reduction::Applied {
            session.emit(SessionEvent::ScanningChanged(false));
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;

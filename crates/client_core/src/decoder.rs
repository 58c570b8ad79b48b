//! Scoped acquisition of a camera decoder bound to a screen region.
//!
//! `Released -> Acquiring -> Active -> Released`. Every transition happens
//! under one async lock, so a start never overlaps a stop and hooks on the
//! [`DecodeHandler`] fire in a strict order: `on_active`, then `on_released`,
//! then at most one of `on_result` / `on_error`.

use std::sync::{Arc, Weak};

use scanner_integration::{
    CameraDecoder, DecodeSink, DecoderConfig, DecoderFault, DecoderSignal, DecoderSurface,
    ScanRegion,
};
use tokio::{
    sync::{mpsc, watch, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, trace, warn};

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderPhase {
    Released,
    Acquiring,
    Active,
}

/// Receiver of decoder outcomes. `on_result`/`on_error` are only called after
/// the device has been released.
pub trait DecodeHandler: Send + Sync {
    fn on_active(&self, _region: &ScanRegion) {}
    fn on_result(&self, text: String);
    fn on_error(&self, fault: DecoderFault);
    fn on_released(&self) {}
}

/// Owns a started decoder until it is explicitly released. Dropping an
/// unreleased lease schedules the stop on the current runtime.
struct DecoderLease {
    decoder: Option<Arc<dyn CameraDecoder>>,
    region: ScanRegion,
}

impl DecoderLease {
    fn new(decoder: Arc<dyn CameraDecoder>, region: ScanRegion) -> Self {
        Self {
            decoder: Some(decoder),
            region,
        }
    }

    async fn release(mut self) {
        if let Some(decoder) = self.decoder.take() {
            if let Err(err) = decoder.stop().await {
                warn!(region = %self.region, "decoder: stop failed: {err}");
            }
        }
    }
}

impl Drop for DecoderLease {
    fn drop(&mut self) {
        let Some(decoder) = self.decoder.take() else {
            return;
        };
        let region = self.region.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = decoder.stop().await {
                        warn!(%region, "decoder: stop on drop failed: {err}");
                    }
                });
            }
            Err(_) => warn!(%region, "decoder: dropped outside a runtime, device not stopped"),
        }
    }
}

/// Signal pump for one decoder run; aborted on drop unless disarmed.
struct PumpTask(Option<JoinHandle<()>>);

impl PumpTask {
    fn disarm(mut self) {
        self.0.take();
    }
}

impl Drop for PumpTask {
    fn drop(&mut self) {
        if let Some(task) = self.0.take() {
            task.abort();
        }
    }
}

struct ActiveDecoder {
    generation: u64,
    region: ScanRegion,
    lease: DecoderLease,
    handler: Arc<dyn DecodeHandler>,
    pump: PumpTask,
}

#[derive(Default)]
struct Slot {
    next_generation: u64,
    shut_down: bool,
    active: Option<ActiveDecoder>,
}

enum Finish {
    Decoded(String),
    Fault(DecoderFault),
}

struct Shared {
    surface: Arc<dyn DecoderSurface>,
    config: DecoderConfig,
    slot: Mutex<Slot>,
    phase: watch::Sender<DecoderPhase>,
}

impl Shared {
    fn publish(&self, phase: DecoderPhase) {
        self.phase.send_replace(phase);
    }

    async fn release(&self, active: ActiveDecoder, pump_finishing: bool) {
        let ActiveDecoder {
            generation,
            region,
            lease,
            handler,
            pump,
        } = active;
        if pump_finishing {
            pump.disarm();
        } else {
            drop(pump);
        }
        lease.release().await;
        self.publish(DecoderPhase::Released);
        info!(%region, generation, "decoder: released");
        handler.on_released();
    }

    async fn finish(&self, generation: u64, finish: Finish) {
        let mut slot = self.slot.lock().await;
        let current = slot.active.as_ref().map(|active| active.generation);
        if current != Some(generation) {
            debug!(generation, "decoder: outcome for a released run ignored");
            return;
        }
        let Some(active) = slot.active.take() else {
            return;
        };
        let handler = Arc::clone(&active.handler);
        self.release(active, true).await;

        match finish {
            Finish::Decoded(text) => handler.on_result(text),
            Finish::Fault(fault) => handler.on_error(fault),
        }
    }
}

async fn pump_signals(
    shared: Weak<Shared>,
    generation: u64,
    mut signals: mpsc::UnboundedReceiver<DecoderSignal>,
) {
    while let Some(signal) = signals.recv().await {
        let finish = match signal {
            DecoderSignal::Decoded(text) => {
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                Finish::Decoded(text.to_string())
            }
            DecoderSignal::Failed(message) => {
                let fault = DecoderFault::classify(&message);
                if fault.is_noise() {
                    trace!(generation, "decoder: frame without code");
                    continue;
                }
                warn!(generation, "decoder: hard error: {message}");
                Finish::Fault(fault)
            }
        };

        let Some(shared) = shared.upgrade() else {
            return;
        };
        shared.finish(generation, finish).await;
        return;
    }
}

pub struct DecoderLifecycle {
    shared: Arc<Shared>,
}

impl DecoderLifecycle {
    pub fn new(surface: Arc<dyn DecoderSurface>, config: DecoderConfig) -> Self {
        let (phase, _) = watch::channel(DecoderPhase::Released);
        Self {
            shared: Arc::new(Shared {
                surface,
                config,
                slot: Mutex::new(Slot::default()),
                phase,
            }),
        }
    }

    pub fn phase(&self) -> DecoderPhase {
        *self.shared.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<DecoderPhase> {
        self.shared.phase.subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.phase() == DecoderPhase::Active
    }

    /// Acquires a fresh decoder for `region`. A decoder already active is
    /// fully released first.
    pub async fn start(
        &self,
        region: &ScanRegion,
        handler: Arc<dyn DecodeHandler>,
    ) -> Result<(), SessionError> {
        let mut slot = self.shared.slot.lock().await;
        if slot.shut_down {
            return Err(SessionError::SessionClosed);
        }
        if let Some(previous) = slot.active.take() {
            info!(region = %previous.region, "decoder: releasing previous run before restart");
            self.shared.release(previous, false).await;
        }
        if !self.shared.surface.is_mounted(region) {
            warn!(%region, "decoder: region not mounted");
            return Err(SessionError::RegionNotFound(region.clone()));
        }

        slot.next_generation += 1;
        let generation = slot.next_generation;
        self.shared.publish(DecoderPhase::Acquiring);

        let decoder = self.shared.surface.create_decoder(region);
        let lease = DecoderLease::new(Arc::clone(&decoder), region.clone());
        let (sink, signals) = DecodeSink::channel();

        if let Err(err) = decoder.start(&self.shared.config, sink).await {
            let message = err.to_string();
            lease.release().await;
            self.shared.publish(DecoderPhase::Released);
            warn!(%region, generation, "decoder: acquisition failed: {message}");
            let fault = match DecoderFault::classify(&message) {
                DecoderFault::Noise if message.trim().is_empty() => {
                    DecoderFault::Other("camera failed to start".to_string())
                }
                DecoderFault::Noise => DecoderFault::Other(message),
                fault => fault,
            };
            return Err(SessionError::Acquisition(fault));
        }

        handler.on_active(region);
        let pump = tokio::spawn(pump_signals(
            Arc::downgrade(&self.shared),
            generation,
            signals,
        ));
        slot.active = Some(ActiveDecoder {
            generation,
            region: region.clone(),
            lease,
            handler,
            pump: PumpTask(Some(pump)),
        });
        self.shared.publish(DecoderPhase::Active);
        info!(%region, generation, "decoder: active");
        Ok(())
    }

    /// Releases the active decoder, if any. Safe to call repeatedly.
    pub async fn stop(&self) {
        let mut slot = self.shared.slot.lock().await;
        match slot.active.take() {
            Some(active) => self.shared.release(active, false).await,
            None => debug!("decoder: stop while released"),
        }
    }

    /// Releases unconditionally and refuses further starts.
    pub async fn shutdown(&self) {
        let mut slot = self.shared.slot.lock().await;
        slot.shut_down = true;
        if let Some(active) = slot.active.take() {
            self.shared.release(active, false).await;
        }
    }
}

#[cfg(test)]
#[path = "tests/decoder_tests.rs"]
mod tests;

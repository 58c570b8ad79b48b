use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use scanner_integration::{CameraDecoder, DecodeSink, DecoderConfig, DecoderSurface, ScanRegion};
use shared::domain::{ToolId, ToolRecord};

pub mod api;
pub mod config;
pub mod decoder;
pub mod error;
pub mod lookup;
pub mod reducer;
pub mod session;
pub mod transition;

pub use api::{HttpToolApi, ToolApi, ToolApiError};
pub use config::{load_settings, ClientSettings};
pub use decoder::{DecodeHandler, DecoderLifecycle, DecoderPhase};
pub use error::{OperationKind, SessionError};
pub use reducer::{PendingOperation, SessionState};
pub use session::{ToolSession, TransitionOutcome};

/// Notifications a session broadcasts to its host.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    ScanningChanged(bool),
    RecordLoaded(ToolRecord),
    LookupFailed { identifier: String, message: String },
    /// A status change was confirmed; tool lists shown elsewhere are stale.
    ToolsChanged { tool_id: ToolId },
    Error(String),
}

/// Surface for hosts without a camera view; no region is ever mounted.
pub struct MissingDecoderSurface;

impl DecoderSurface for MissingDecoderSurface {
    fn is_mounted(&self, _region: &ScanRegion) -> bool {
        false
    }

    fn create_decoder(&self, _region: &ScanRegion) -> Arc<dyn CameraDecoder> {
        Arc::new(MissingCameraDecoder)
    }
}

pub struct MissingCameraDecoder;

#[async_trait]
impl CameraDecoder for MissingCameraDecoder {
    async fn start(&self, _config: &DecoderConfig, _sink: DecodeSink) -> Result<()> {
        Err(anyhow!("camera decoder is unavailable"))
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    fn is_active(&self) -> bool {
        false
    }
}

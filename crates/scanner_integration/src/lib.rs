use std::{fmt, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::trace;

/// Named screen region a camera decoder renders into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanRegion(pub String);

impl ScanRegion {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScanRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeFormat {
    QrCode,
    Code128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    Environment,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrBox {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    pub fps: u32,
    pub qrbox: QrBox,
    pub formats: Vec<CodeFormat>,
    pub facing_mode: FacingMode,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            fps: 10,
            qrbox: QrBox {
                width: 250,
                height: 250,
            },
            formats: vec![CodeFormat::QrCode],
            facing_mode: FacingMode::Environment,
        }
    }
}

/// Raw signal emitted by a running decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderSignal {
    Decoded(String),
    Failed(String),
}

/// Callback pair handed to a decoder on start.
///
/// Sends never fail from the decoder's point of view: once the consumer has
/// finished with this decoder run, further signals are dropped.
#[derive(Debug, Clone)]
pub struct DecodeSink {
    tx: mpsc::UnboundedSender<DecoderSignal>,
}

impl DecodeSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DecoderSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn on_result(&self, text: impl Into<String>) {
        if self.tx.send(DecoderSignal::Decoded(text.into())).is_err() {
            trace!("decoder: result dropped after consumer finished");
        }
    }

    pub fn on_error(&self, message: impl Into<String>) {
        if self.tx.send(DecoderSignal::Failed(message.into())).is_err() {
            trace!("decoder: error dropped after consumer finished");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Classified decoder failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecoderFault {
    /// No code in the current frame. Never surfaced to the user.
    #[error("no code in frame")]
    Noise,
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("camera device is not readable")]
    DeviceUnreadable,
    #[error("{0}")]
    Other(String),
}

const NOISE_MARKERS: &[&str] = &[
    "no multiformat readers",
    "notfoundexception",
    "no barcode or qr code detected",
];

impl DecoderFault {
    pub fn classify(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("notreadableerror") {
            DecoderFault::DeviceUnreadable
        } else if lower.contains("notallowederror") || lower.contains("permission") {
            DecoderFault::PermissionDenied
        } else if message.trim().is_empty()
            || NOISE_MARKERS.iter().any(|marker| lower.contains(marker))
        {
            DecoderFault::Noise
        } else {
            DecoderFault::Other(message.trim().to_string())
        }
    }

    pub fn is_noise(&self) -> bool {
        matches!(self, DecoderFault::Noise)
    }

    pub fn user_message(&self) -> String {
        match self {
            DecoderFault::Noise => String::new(),
            DecoderFault::PermissionDenied => {
                "Camera permission was denied; allow camera access and retry.".to_string()
            }
            DecoderFault::DeviceUnreadable => {
                "Camera is unavailable; another application may be using it.".to_string()
            }
            DecoderFault::Other(message) => format!("Camera error: {message}"),
        }
    }
}

/// One logical decoder bound to a region. A new handle is minted per start.
#[async_trait]
pub trait CameraDecoder: Send + Sync {
    async fn start(&self, config: &DecoderConfig, sink: DecodeSink) -> anyhow::Result<()>;
    async fn stop(&self) -> anyhow::Result<()>;
    fn is_active(&self) -> bool;
}

/// Screen surface owning the regions decoders can bind to.
pub trait DecoderSurface: Send + Sync {
    fn is_mounted(&self, region: &ScanRegion) -> bool;
    fn create_decoder(&self, region: &ScanRegion) -> Arc<dyn CameraDecoder>;
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

use std::{collections::HashMap, fs, path::Path, time::Duration};

use scanner_integration::{DecoderConfig, QrBox, ScanRegion};
use tracing::warn;

pub const DEFAULT_SETTINGS_FILE: &str = "tool_client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub lookup_debounce_ms: u64,
    pub scan_region: String,
    pub decoder: DecoderConfig,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".into(),
            request_timeout_secs: 10,
            lookup_debounce_ms: 300,
            scan_region: "reader".into(),
            decoder: DecoderConfig::default(),
        }
    }
}

impl ClientSettings {
    pub fn lookup_debounce(&self) -> Duration {
        Duration::from_millis(self.lookup_debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn region(&self) -> ScanRegion {
        ScanRegion::new(self.scan_region.clone())
    }
}

pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the flat key/value file at `path` if present, then the
/// environment as read through `env`.
pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            Ok(file_cfg) => {
                apply_overrides(&mut settings, |key| file_cfg.get(key).map(file_value))
            }
            Err(err) => warn!("config: ignoring unreadable {}: {err}", path.display()),
        }
    }

    apply_env_overrides(&mut settings, env);
    settings
}

/// Quoted and bare values are read the same way (`300` and `"300"`).
fn file_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn apply_overrides(settings: &mut ClientSettings, get: impl Fn(&str) -> Option<String>) {
    if let Some(v) = get("api_base_url") {
        settings.api_base_url = v;
    }
    if let Some(v) = get("scan_region") {
        settings.scan_region = v;
    }
    if let Some(v) = get("lookup_debounce_ms").and_then(|v| v.trim().parse().ok()) {
        settings.lookup_debounce_ms = v;
    }
    if let Some(v) = get("request_timeout_secs").and_then(|v| v.trim().parse().ok()) {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = get("decoder_fps").and_then(|v| v.trim().parse().ok()) {
        settings.decoder.fps = v;
    }
    if let Some(v) = get("decoder_qrbox").and_then(|v| parse_qrbox(&v)) {
        settings.decoder.qrbox = v;
    }
}

pub fn apply_env_overrides(settings: &mut ClientSettings, env: impl Fn(&str) -> Option<String>) {
    if let Some(v) = env("TOOL_API_BASE_URL") {
        settings.api_base_url = v;
    }
    apply_overrides(settings, |key| env(&format!("APP__{}", key.to_ascii_uppercase())));
}

/// Accepts `250` (square) or `300x200`.
fn parse_qrbox(raw: &str) -> Option<QrBox> {
    let raw = raw.trim();
    match raw.split_once(|c: char| c.eq_ignore_ascii_case(&'x')) {
        Some((width, height)) => Some(QrBox {
            width: width.trim().parse().ok()?,
            height: height.trim().parse().ok()?,
        }),
        None => {
            let side = raw.parse().ok()?;
            Some(QrBox {
                width: side,
                height: side,
            })
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;

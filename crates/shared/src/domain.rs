use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Printed/scanned code naming a tool record. Assigned at registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolId(pub String);

impl ToolId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ToolId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolStatus {
    #[serde(alias = "貸出可能", alias = "在庫")]
    Available,
    #[serde(alias = "貸出中")]
    Lent,
    Broken,
    UnderMaintenance,
    Disposed,
}

impl ToolStatus {
    pub const ALL: [ToolStatus; 5] = [
        ToolStatus::Available,
        ToolStatus::Lent,
        ToolStatus::Broken,
        ToolStatus::UnderMaintenance,
        ToolStatus::Disposed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ToolStatus::Available => "available",
            ToolStatus::Lent => "lent out",
            ToolStatus::Broken => "broken",
            ToolStatus::UnderMaintenance => "under maintenance",
            ToolStatus::Disposed => "disposed",
        }
    }

    fn wire_name(self) -> &'static str {
        match self {
            ToolStatus::Available => "Available",
            ToolStatus::Lent => "Lent",
            ToolStatus::Broken => "Broken",
            ToolStatus::UnderMaintenance => "UnderMaintenance",
            ToolStatus::Disposed => "Disposed",
        }
    }
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown tool status: {0}")]
pub struct ParseToolStatusError(pub String);

impl FromStr for ToolStatus {
    type Err = ParseToolStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "available" => Ok(ToolStatus::Available),
            "lent" => Ok(ToolStatus::Lent),
            "broken" => Ok(ToolStatus::Broken),
            "undermaintenance" | "maintenance" => Ok(ToolStatus::UnderMaintenance),
            "disposed" => Ok(ToolStatus::Disposed),
            _ => Err(ParseToolStatusError(value.to_string())),
        }
    }
}

/// A registered tool or fixture as returned by the backend.
///
/// Only `status` is ever changed from the client side, and only through a
/// status update call; everything else is descriptive and read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRecord {
    #[serde(alias = "ID", alias = "工具治具ID")]
    pub id: ToolId,
    #[serde(default, alias = "名称")]
    pub name: String,
    #[serde(default)]
    pub model_number: String,
    #[serde(default, rename = "type")]
    pub tool_type: String,
    #[serde(default)]
    pub storage_location: String,
    #[serde(alias = "状態")]
    pub status: ToolStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_replacement: Option<String>,
    #[serde(default)]
    pub remarks: String,
    #[serde(default, rename = "imageUrl")]
    pub image_reference: String,
    #[serde(
        default,
        rename = "qr_code_base64",
        skip_serializing_if = "Option::is_none"
    )]
    pub qr_image: Option<String>,
}

impl ToolRecord {
    /// Name for user-facing messages; falls back to the id for unnamed records.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }
}

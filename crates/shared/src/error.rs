use serde::{Deserialize, Serialize};

/// Error body returned by the tool backend: `{"detail": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Fields(Vec<FieldError>),
}

/// One per-field validation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub loc: Vec<serde_json::Value>,
    pub msg: String,
}

impl FieldError {
    fn location(&self) -> String {
        self.loc
            .iter()
            .map(|part| match part {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl ErrorDetail {
    /// Single line shown verbatim to the user.
    pub fn render(&self) -> String {
        match self {
            ErrorDetail::Message(message) => message.clone(),
            ErrorDetail::Fields(fields) => fields
                .iter()
                .map(|field| {
                    let location = field.location();
                    if location.is_empty() {
                        field.msg.clone()
                    } else {
                        format!("{location} - {}", field.msg)
                    }
                })
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

impl ErrorBody {
    /// Renders a raw response body, falling back to the trimmed text when it
    /// is not a recognizable `detail` payload.
    pub fn render_raw(raw: &str) -> String {
        match serde_json::from_str::<ErrorBody>(raw) {
            Ok(body) => body.detail.render(),
            Err(_) => raw.trim().to_string(),
        }
    }
}

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{ErrorCode, Result, SqlmError};

/// Robot output encoding, from `robot.format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RobotFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// One compact JSON document per line
    Jsonl,
}

impl RobotFormat {
    #[must_use]
    pub fn from_config(value: &str) -> Self {
        if value.eq_ignore_ascii_case("jsonl") {
            Self::Jsonl
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
pub struct RobotResponse<T> {
    pub status: RobotStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub data: T,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotStatus {
    Ok,
    Error {
        code: ErrorCode,
        numeric_code: u16,
        message: String,
        suggestion: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        context: Option<serde_json::Value>,
        recoverable: bool,
        category: String,
    },
}

impl From<&SqlmError> for RobotStatus {
    fn from(err: &SqlmError) -> Self {
        let structured = err.to_structured();
        RobotStatus::Error {
            code: structured.code,
            numeric_code: structured.numeric_code,
            message: structured.message,
            suggestion: structured.suggestion,
            context: structured.context,
            recoverable: structured.recoverable,
            category: structured.category,
        }
    }
}

pub fn robot_ok<T: Serialize>(data: T) -> RobotResponse<T> {
    RobotResponse {
        status: RobotStatus::Ok,
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data,
    }
}

/// Robot error response carrying code, suggestion and context.
pub fn robot_error(err: &SqlmError) -> RobotResponse<serde_json::Value> {
    RobotResponse {
        status: RobotStatus::from(err),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data: serde_json::Value::Null,
    }
}

pub fn emit_robot<T: Serialize>(response: &RobotResponse<T>, format: RobotFormat) -> Result<()> {
    emit_json(response, format)
}

pub fn emit_json<T: Serialize>(value: &T, format: RobotFormat) -> Result<()> {
    let payload = match format {
        RobotFormat::Json => serde_json::to_string_pretty(value)?,
        RobotFormat::Jsonl => serde_json::to_string(value)?,
    };
    println!("{payload}");
    Ok(())
}

/// Clip `text` to `width` characters, marking the cut.
#[must_use]
pub fn truncate(text: &str, width: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= width {
        return single_line;
    }
    let kept: String = single_line.chars().take(width.saturating_sub(1)).collect();
    format!("{kept}…")
}

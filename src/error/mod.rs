//! Error handling for sqlm.
//!
//! This module provides:
//! - [`SqlmError`]: The main error enum for all sqlm operations
//! - [`ErrorCode`]: Standardized error codes for machine parsing
//! - [`StructuredError`]: Rich error type with suggestions and context
//! - [`ResultExt`]: Context wrapping for store failures

mod codes;
mod context;

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use codes::ErrorCode;
pub use context::{ResultExt, StorageOp};

/// Main error type for sqlm operations.
#[derive(Error, Debug)]
pub enum SqlmError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {context}: {source}")]
    Storage {
        op: StorageOp,
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Managed SQL item not found: {0}")]
    ItemNotFound(i64),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Query parse error: {0}")]
    QueryParse(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing required config: {0}")]
    MissingConfig(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error(
        "Ingest stopped after {committed_batches} committed batch(es) \
         ({committed_occurrences} findings): {source}"
    )]
    IngestIncomplete {
        committed_batches: usize,
        committed_occurrences: u64,
        #[source]
        source: Box<SqlmError>,
    },
}

impl SqlmError {
    pub(crate) fn storage(op: StorageOp, context: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::Storage {
            op,
            context: context.into(),
            source,
        }
    }

    /// Get the error code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Storage { op, .. } => match op {
                StorageOp::Read => ErrorCode::StorageReadError,
                StorageOp::Write => ErrorCode::StorageWriteError,
            },
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::SerializationError,
            Self::ItemNotFound(_) => ErrorCode::ItemNotFound,
            Self::ProjectNotFound(_) => ErrorCode::ProjectNotFound,
            Self::UserNotFound(_) => ErrorCode::UserNotFound,
            Self::ValidationFailed(_) => ErrorCode::ValidationFailed,
            Self::QueryParse(_) => ErrorCode::QueryInvalid,
            Self::Config(_) => ErrorCode::ConfigInvalid,
            Self::MissingConfig(_) => ErrorCode::ConfigMissingRequired,
            Self::TransactionFailed(_) => ErrorCode::TransactionFailed,
            Self::IngestIncomplete { source, .. } => source.code(),
        }
    }

    /// Get context information for this error as JSON.
    #[must_use]
    pub fn context(&self) -> Option<Value> {
        match self {
            Self::Storage { op, context, .. } => {
                Some(serde_json::json!({ "operation": context, "op": op }))
            }
            Self::ItemNotFound(id) => Some(serde_json::json!({ "id": id })),
            Self::ProjectNotFound(name) => Some(serde_json::json!({ "project_name": name })),
            Self::UserNotFound(login) => Some(serde_json::json!({ "login_name": login })),
            Self::MissingConfig(key) => Some(serde_json::json!({ "config_key": key })),
            Self::IngestIncomplete {
                committed_batches,
                committed_occurrences,
                source,
            } => Some(serde_json::json!({
                "committed_batches": committed_batches,
                "committed_occurrences": committed_occurrences,
                "cause": source.context(),
            })),
            _ => None,
        }
    }

    /// Convert this error to a structured error.
    #[must_use]
    pub fn to_structured(&self) -> StructuredError {
        StructuredError::from_sqlm_error(self)
    }
}

/// A structured error with machine-readable code, suggestion, and context.
///
/// Emitted on stdout in robot mode so scripts can branch on `code`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// The error code (e.g., "STORAGE_WRITE_ERROR")
    pub code: ErrorCode,

    /// The numeric error code (e.g., 602)
    pub numeric_code: u16,

    /// Human-readable error message
    pub message: String,

    /// Actionable suggestion for recovery
    pub suggestion: String,

    /// Additional context for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// Whether this error is potentially recoverable by the user
    pub recoverable: bool,

    /// Error category (e.g., "storage", "query")
    pub category: String,
}

impl StructuredError {
    /// Create a new structured error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            numeric_code: code.numeric(),
            suggestion: code.suggestion().to_string(),
            context: None,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
            code,
            message: message.into(),
        }
    }

    /// Create a structured error from an SqlmError.
    #[must_use]
    pub fn from_sqlm_error(err: &SqlmError) -> Self {
        let mut structured = Self::new(err.code(), err.to_string());
        structured.context = err.context();
        structured
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<&SqlmError> for StructuredError {
    fn from(err: &SqlmError) -> Self {
        Self::from_sqlm_error(err)
    }
}

/// Result type alias using SqlmError.
pub type Result<T> = std::result::Result<T, SqlmError>;

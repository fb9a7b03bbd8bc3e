//! Standardized error codes for machine-parseable output.
//!
//! Error codes follow a numeric taxonomy:
//! - 1xx: Managed SQL item errors
//! - 3xx: Config errors
//! - 4xx: Query errors
//! - 6xx: Storage errors
//! - 8xx: Validation errors
//! - 9xx: Internal errors

use serde::{Deserialize, Serialize};

/// Standardized error codes for robot mode output.
///
/// Each variant maps to a numeric code (e.g., `ItemNotFound` -> E101).
/// Codes are grouped by category for easy identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================
    // Item errors (1xx)
    // ========================================
    /// E101: Managed SQL item was not found in the project
    ItemNotFound,
    /// E102: Project referenced by a finding or query does not exist
    ProjectNotFound,
    /// E103: Assignee login does not exist
    UserNotFound,

    // ========================================
    // Config errors (3xx)
    // ========================================
    /// E302: Config file has invalid syntax or values
    ConfigInvalid,
    /// E304: Required config value is missing
    ConfigMissingRequired,

    // ========================================
    // Query errors (4xx)
    // ========================================
    /// E401: Filter parameters could not be parsed
    QueryInvalid,

    // ========================================
    // Storage errors (6xx)
    // ========================================
    /// E601: Reading the worklist failed
    StorageReadError,
    /// E602: Writing a merge batch or workflow update failed
    StorageWriteError,
    /// E604: Database operation failed
    DatabaseError,
    /// E605: Serialization/deserialization failed
    SerializationError,

    // ========================================
    // Validation errors (8xx)
    // ========================================
    /// E801: Input failed validation before reaching the store
    ValidationFailed,
    /// E853: Schema migration or transaction failed and was rolled back
    TransactionFailed,

    // ========================================
    // Internal errors (9xx)
    // ========================================
    /// E906: File operation failed
    IoError,
}

impl ErrorCode {
    /// Get the numeric code.
    #[must_use]
    pub const fn numeric(&self) -> u16 {
        match self {
            Self::ItemNotFound => 101,
            Self::ProjectNotFound => 102,
            Self::UserNotFound => 103,

            Self::ConfigInvalid => 302,
            Self::ConfigMissingRequired => 304,

            Self::QueryInvalid => 401,

            Self::StorageReadError => 601,
            Self::StorageWriteError => 602,
            Self::DatabaseError => 604,
            Self::SerializationError => 605,

            Self::ValidationFailed => 801,
            Self::TransactionFailed => 853,

            Self::IoError => 906,
        }
    }

    /// Get the code string (e.g., "E101").
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("E{}", self.numeric())
    }

    /// Default recovery hint for this code.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::ItemNotFound => "Run `sqlm list --project <name>` to see the live worklist ids",
            Self::ProjectNotFound => "Register the project first with `sqlm register project <name>`",
            Self::UserNotFound => "Register the user first with `sqlm register user <login>`",

            Self::ConfigInvalid => "Check TOML syntax in the config file and the SQLM_* environment variables",
            Self::ConfigMissingRequired => "Set the required value in config.toml or pass it on the command line",

            Self::QueryInvalid => "Check filter names and values. Times accept RFC 3339 or `YYYY-MM-DD HH:MM:SS`",

            Self::StorageReadError => "Check the database path is readable and not locked by another writer",
            Self::StorageWriteError => "The batch was rolled back. Check disk space and retry the whole batch",
            Self::DatabaseError => "Check the database file for corruption with `sqlite3 <db> 'PRAGMA integrity_check'`",
            Self::SerializationError => "The data format may be corrupted. Check input data for validity",

            Self::ValidationFailed => "Fix the reported field and resubmit",
            Self::TransactionFailed => "The operation was rolled back. Check error details and retry",

            Self::IoError => "File operation failed. Check path exists and permissions are correct",
        }
    }

    /// Check if this error is recoverable by the user.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::ItemNotFound
            | Self::ProjectNotFound
            | Self::UserNotFound
            | Self::ConfigInvalid
            | Self::ConfigMissingRequired
            | Self::QueryInvalid
            | Self::StorageReadError
            | Self::StorageWriteError
            | Self::ValidationFailed
            | Self::TransactionFailed
            | Self::IoError => true,

            Self::DatabaseError | Self::SerializationError => false,
        }
    }

    /// Get the category name for this error.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self.numeric() / 100 {
            1 => "item",
            3 => "config",
            4 => "query",
            6 => "storage",
            8 => "validation",
            9 => "internal",
            _ => "unknown",
        }
    }

    /// Iterate over all error codes.
    pub fn all() -> impl Iterator<Item = Self> {
        [
            Self::ItemNotFound,
            Self::ProjectNotFound,
            Self::UserNotFound,
            Self::ConfigInvalid,
            Self::ConfigMissingRequired,
            Self::QueryInvalid,
            Self::StorageReadError,
            Self::StorageWriteError,
            Self::DatabaseError,
            Self::SerializationError,
            Self::ValidationFailed,
            Self::TransactionFailed,
            Self::IoError,
        ]
        .into_iter()
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code_string())
    }
}

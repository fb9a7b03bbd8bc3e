//! Context extension trait for store errors.
//!
//! Every rusqlite failure on the merge and query paths is wrapped with a
//! short description of what the engine was doing, so callers see
//! "merge batch: insert-or-merge sql_manages: UNIQUE constraint failed"
//! rather than a bare driver message. The caller also states whether the
//! failing step belonged to a read or a write.

use serde::{Deserialize, Serialize};

use super::SqlmError;

/// Which side of the store a wrapped failure happened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageOp {
    /// A read outside any write transaction
    Read,
    /// Any step of a write transaction, including lookups inside it
    Write,
}

/// Extension trait for attaching context to rusqlite results.
pub trait ResultExt<T> {
    /// Wrap a read failure with additional context.
    ///
    /// # Errors
    ///
    /// Returns [`SqlmError::Storage`] if the result was `Err`.
    fn read_context(self, ctx: impl Into<String>) -> Result<T, SqlmError>;

    /// Wrap a write failure with additional context.
    ///
    /// # Errors
    ///
    /// Returns [`SqlmError::Storage`] if the result was `Err`.
    fn write_context(self, ctx: impl Into<String>) -> Result<T, SqlmError>;

    /// Wrap a read failure with lazily-evaluated context.
    ///
    /// # Errors
    ///
    /// Returns [`SqlmError::Storage`] if the result was `Err`.
    fn with_read_context<F, S>(self, f: F) -> Result<T, SqlmError>
    where
        F: FnOnce() -> S,
        S: Into<String>;

    /// Wrap a write failure with lazily-evaluated context.
    ///
    /// # Errors
    ///
    /// Returns [`SqlmError::Storage`] if the result was `Err`.
    fn with_write_context<F, S>(self, f: F) -> Result<T, SqlmError>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T, rusqlite::Error> {
    fn read_context(self, ctx: impl Into<String>) -> Result<T, SqlmError> {
        self.map_err(|source| SqlmError::storage(StorageOp::Read, ctx, source))
    }

    fn write_context(self, ctx: impl Into<String>) -> Result<T, SqlmError> {
        self.map_err(|source| SqlmError::storage(StorageOp::Write, ctx, source))
    }

    fn with_read_context<F, S>(self, f: F) -> Result<T, SqlmError>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| SqlmError::storage(StorageOp::Read, f(), source))
    }

    fn with_write_context<F, S>(self, f: F) -> Result<T, SqlmError>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| SqlmError::storage(StorageOp::Write, f(), source))
    }
}

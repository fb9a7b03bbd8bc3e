//! Dedup key: identity of "the same statement" within a project.

use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::types::SqlManageSource;
use crate::error::{Result, SqlmError};

/// Hex SHA-256 over (project, fingerprint, source, instance, schema).
///
/// Each text component is length-prefixed before hashing, so
/// `("ab", "c")` and `("a", "bc")` never collide by concatenation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupKey(String);

impl DedupKey {
    pub const HEX_LEN: usize = 64;

    #[must_use]
    pub fn build(
        project_id: i64,
        fingerprint: &str,
        source: SqlManageSource,
        instance_name: &str,
        schema_name: &str,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(project_id.to_be_bytes());
        for part in [fingerprint, source.as_str(), instance_name, schema_name] {
            hasher.update((part.len() as u64).to_be_bytes());
            hasher.update(part.as_bytes());
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// Accept a key previously produced by [`DedupKey::build`].
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim().to_ascii_lowercase();
        if value.len() != Self::HEX_LEN || hex::decode(&value).is_err() {
            return Err(SqlmError::ValidationFailed(format!(
                "dedup key must be {} hex characters",
                Self::HEX_LEN
            )));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl ToSql for DedupKey {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.as_str()))
    }
}

impl FromSql for DedupKey {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        Self::parse(raw).map_err(|err| FromSqlError::Other(Box::new(err)))
    }
}

//! Storage layer for sqlm
//!
//! SQLite holds the registry (projects, users, audit plans, audit records)
//! and the managed SQL worklist.

pub mod migrations;
pub mod sqlite;

pub use sqlite::Database;

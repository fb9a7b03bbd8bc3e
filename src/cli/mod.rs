//! CLI module - Command-line interface definitions and handlers
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod commands;
pub mod output;

/// sqlm - Deduplicate audit findings into a managed SQL worklist
#[derive(Parser, Debug)]
#[command(name = "sqlm")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable JSON output for machine consumption
    #[arg(long, global = true, env = "SQLM_ROBOT")]
    pub robot: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: ~/.config/sqlm/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file (default: <root>/sqlm.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register projects, users, audit plans and audit records
    Register(commands::register::RegisterArgs),

    /// Merge raw findings (JSON array or JSON lines) into the worklist
    Ingest(commands::ingest::IngestArgs),

    /// List a project's worklist with filters and summary counts
    List(commands::list::ListArgs),

    /// Set status, remark or assignees on worklist items
    Triage(commands::triage::TriageArgs),

    /// Soft-delete worklist items
    Delete(commands::delete::DeleteArgs),

    /// Dump every live item as JSON lines
    Export(commands::export::ExportArgs),
}

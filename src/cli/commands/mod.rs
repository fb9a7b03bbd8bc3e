//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - `run()` function to execute the command

use crate::app::AppContext;
use crate::cli::Commands;
use crate::error::Result;

pub mod delete;
pub mod export;
pub mod ingest;
pub mod list;
pub mod register;
pub mod triage;

/// Dispatch a command to its handler
pub fn run(ctx: &mut AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Register(args) => register::run(ctx, args),
        Commands::Ingest(args) => ingest::run(ctx, args),
        Commands::List(args) => list::run(ctx, args),
        Commands::Triage(args) => triage::run(ctx, args),
        Commands::Delete(args) => delete::run(ctx, args),
        Commands::Export(args) => export::run(ctx, args),
    }
}

//! Shared state for one CLI invocation.

use std::path::PathBuf;

use tracing::debug;

use crate::cli::output::RobotFormat;
use crate::cli::Cli;
use crate::config::Config;
use crate::error::Result;
use crate::storage::Database;

/// Root directory used when `SQLM_ROOT` is unset.
pub const DEFAULT_ROOT: &str = ".sqlm";

pub struct AppContext {
    pub config: Config,
    pub db: Database,
    pub robot_mode: bool,
    pub robot_format: RobotFormat,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let sqlm_root = resolve_root();
        let config = Config::load(cli.config.as_deref(), &sqlm_root)?;

        let db_path = cli
            .db
            .clone()
            .unwrap_or_else(|| config.database_path(&sqlm_root));
        debug!(path = %db_path.display(), "opening worklist database");
        let db = Database::open_with_timeout(&db_path, config.database.busy_timeout())?;

        let robot_format = RobotFormat::from_config(&config.robot.format);
        Ok(Self {
            config,
            db,
            robot_mode: cli.robot,
            robot_format,
        })
    }
}

fn resolve_root() -> PathBuf {
    std::env::var("SQLM_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_ROOT))
}

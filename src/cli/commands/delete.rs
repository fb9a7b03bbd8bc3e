//! sqlm delete - Soft-delete worklist items

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_robot, robot_ok};
use crate::error::Result;
use crate::manage::soft_delete;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    #[arg(long, short)]
    pub project: String,

    /// Item ids to delete
    #[arg(required = true)]
    pub ids: Vec<i64>,
}

pub fn run(ctx: &mut AppContext, args: &DeleteArgs) -> Result<()> {
    let deleted = soft_delete(&mut ctx.db, &args.project, &args.ids)?;

    if ctx.robot_mode {
        let data = serde_json::json!({ "deleted": deleted, "requested": args.ids.len() });
        emit_robot(&robot_ok(data), ctx.robot_format)
    } else {
        println!("{} {deleted} of {} item(s)", "Deleted".red(), args.ids.len());
        Ok(())
    }
}

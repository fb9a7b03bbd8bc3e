//! sqlm triage - Human workflow updates

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_robot, robot_ok};
use crate::error::{Result, SqlmError};
use crate::manage::{update_items, SqlManageStatus, SqlManageUpdate};

#[derive(Args, Debug)]
pub struct TriageArgs {
    #[arg(long, short)]
    pub project: String,

    /// Item ids to update
    #[arg(required = true)]
    pub ids: Vec<i64>,

    /// unhandled, solved or ignored
    #[arg(long, value_parser = parse_status)]
    pub status: Option<SqlManageStatus>,

    #[arg(long)]
    pub remark: Option<String>,

    /// Replace assignees with these logins (repeatable)
    #[arg(long = "assign", value_name = "LOGIN")]
    pub assignees: Vec<String>,

    /// Remove every assignee
    #[arg(long, conflicts_with = "assignees")]
    pub clear_assignees: bool,
}

fn parse_status(value: &str) -> std::result::Result<SqlManageStatus, String> {
    value.parse().map_err(|err: SqlmError| err.to_string())
}

impl TriageArgs {
    fn update(&self) -> SqlManageUpdate {
        let assignees = if self.clear_assignees {
            Some(Vec::new())
        } else if self.assignees.is_empty() {
            None
        } else {
            Some(self.assignees.clone())
        };
        SqlManageUpdate {
            status: self.status,
            remark: self.remark.clone(),
            assignees,
        }
    }
}

pub fn run(ctx: &mut AppContext, args: &TriageArgs) -> Result<()> {
    let update = args.update();
    if update.is_empty() {
        return Err(SqlmError::ValidationFailed(
            "nothing to change: pass --status, --remark, --assign or --clear-assignees"
                .to_string(),
        ));
    }

    let updated = update_items(&mut ctx.db, &args.project, &args.ids, &update)?;

    if ctx.robot_mode {
        let data = serde_json::json!({ "updated": updated, "ids": args.ids, "update": update });
        emit_robot(&robot_ok(data), ctx.robot_format)
    } else {
        println!("{} {updated} item(s)", "Updated".green());
        Ok(())
    }
}

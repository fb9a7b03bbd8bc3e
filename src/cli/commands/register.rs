//! sqlm register - Registry entries findings refer to

use clap::{Args, Subcommand};
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_robot, robot_ok};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[command(subcommand)]
    pub target: RegisterTarget,
}

#[derive(Subcommand, Debug)]
pub enum RegisterTarget {
    /// Register a project
    Project {
        name: String,
    },
    /// Register a user who can be assigned items
    User {
        login_name: String,
    },
    /// Register an audit plan under a project
    Plan {
        #[arg(long, short)]
        project: String,
        name: String,
        /// Database instance the plan scans
        #[arg(long, default_value = "")]
        instance: String,
        /// Soft-delete the plan instead; its items stay listed
        #[arg(long, conflicts_with = "instance")]
        delete: bool,
    },
    /// Register an audit record by its external id
    Record {
        #[arg(long, short)]
        project: String,
        audit_record_id: String,
    },
}

pub fn run(ctx: &mut AppContext, args: &RegisterArgs) -> Result<()> {
    if let RegisterTarget::Plan {
        project,
        name,
        delete: true,
        ..
    } = &args.target
    {
        let project_id = ctx.db.require_project(project)?;
        let deleted = ctx.db.delete_audit_plan(project_id, name)?;
        return if ctx.robot_mode {
            let data = serde_json::json!({ "kind": "audit_plan", "name": name, "deleted": deleted });
            emit_robot(&robot_ok(data), ctx.robot_format)
        } else if deleted {
            println!("{} audit_plan {}", "Deleted".green(), name.bold());
            Ok(())
        } else {
            println!("{}", format!("No live audit plan named {name}").dimmed());
            Ok(())
        };
    }

    let (kind, name, id) = match &args.target {
        RegisterTarget::Project { name } => ("project", name, ctx.db.ensure_project(name)?),
        RegisterTarget::User { login_name } => ("user", login_name, ctx.db.ensure_user(login_name)?),
        RegisterTarget::Plan {
            project,
            name,
            instance,
            ..
        } => {
            let project_id = ctx.db.require_project(project)?;
            ("audit_plan", name, ctx.db.create_audit_plan(project_id, name, instance)?)
        }
        RegisterTarget::Record {
            project,
            audit_record_id,
        } => {
            let project_id = ctx.db.require_project(project)?;
            (
                "sql_audit_record",
                audit_record_id,
                ctx.db.create_sql_audit_record(project_id, audit_record_id)?,
            )
        }
    };

    if ctx.robot_mode {
        let data = serde_json::json!({ "kind": kind, "name": name, "id": id });
        emit_robot(&robot_ok(data), ctx.robot_format)
    } else {
        println!("{} {kind} {} (id {id})", "Registered".green(), name.bold());
        Ok(())
    }
}

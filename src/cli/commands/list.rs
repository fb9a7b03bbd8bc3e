//! sqlm list - Filtered view of a project's worklist

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_robot, robot_ok, truncate};
use crate::error::Result;
use crate::manage::filter::{
    PARAM_ASSIGNEE, PARAM_AUDIT_LEVEL, PARAM_FINGERPRINT, PARAM_INSTANCE_NAME,
    PARAM_LAST_SEEN_FROM, PARAM_LAST_SEEN_TO, PARAM_SOURCE, PARAM_STATUS,
};
use crate::manage::{query, Pagination, SqlManageFilter, SqlManageList, SqlManageStatus};

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long, short)]
    pub project: String,

    /// Case-sensitive substring of the fingerprint
    #[arg(long)]
    pub fingerprint: Option<String>,

    /// Only items assigned to this login
    #[arg(long)]
    pub assignee: Option<String>,

    #[arg(long)]
    pub instance: Option<String>,

    /// audit_plan or sql_audit_record
    #[arg(long)]
    pub source: Option<String>,

    #[arg(long)]
    pub audit_level: Option<String>,

    /// Last seen at or after (RFC 3339 or "YYYY-MM-DD HH:MM:SS")
    #[arg(long)]
    pub from: Option<String>,

    /// Last seen at or before
    #[arg(long)]
    pub to: Option<String>,

    /// unhandled, solved or ignored
    #[arg(long)]
    pub status: Option<String>,

    /// 1-based page number
    #[arg(long, default_value = "1")]
    pub page: u32,

    /// Items per page (default: query.default_page_size)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Return every matching item
    #[arg(long, conflicts_with_all = ["page", "page_size"])]
    pub all: bool,
}

impl ListArgs {
    fn filter(&self) -> Result<SqlManageFilter> {
        let pairs = [
            (PARAM_FINGERPRINT, &self.fingerprint),
            (PARAM_ASSIGNEE, &self.assignee),
            (PARAM_INSTANCE_NAME, &self.instance),
            (PARAM_SOURCE, &self.source),
            (PARAM_AUDIT_LEVEL, &self.audit_level),
            (PARAM_LAST_SEEN_FROM, &self.from),
            (PARAM_LAST_SEEN_TO, &self.to),
            (PARAM_STATUS, &self.status),
        ];
        SqlManageFilter::from_params(
            pairs
                .iter()
                .filter_map(|(name, value)| value.as_deref().map(|v| (*name, v))),
        )
    }
}

pub fn run(ctx: &mut AppContext, args: &ListArgs) -> Result<()> {
    let filter = args.filter()?;
    let page = if args.all {
        None
    } else {
        let size = args.page_size.unwrap_or(ctx.config.query.default_page_size);
        Some(Pagination::new(args.page, size)?.within(ctx.config.query.max_page_size)?)
    };

    let list = query(&ctx.db, &args.project, &filter, page)?;

    if ctx.robot_mode {
        emit_robot(&robot_ok(&list), ctx.robot_format)
    } else {
        list_human(&list, page);
        Ok(())
    }
}

fn list_human(list: &SqlManageList, page: Option<Pagination>) {
    if list.items.is_empty() {
        println!("{}", "No managed SQL found".dimmed());
    } else {
        println!(
            "{:>6} {:10} {:8} {:>6} {:20} {}",
            "ID".bold(),
            "STATUS".bold(),
            "LEVEL".bold(),
            "COUNT".bold(),
            "LAST SEEN".bold(),
            "FINGERPRINT".bold()
        );
        println!("{}", "─".repeat(96).dimmed());

        for item in &list.items {
            let status = match item.status {
                SqlManageStatus::Unhandled => item.status.as_str().yellow(),
                SqlManageStatus::Solved => item.status.as_str().green(),
                SqlManageStatus::Ignored => item.status.as_str().dimmed(),
            };
            let level = match item.audit_level.as_str() {
                "error" => item.audit_level.red(),
                "warn" => item.audit_level.yellow(),
                "" => "-".normal(),
                other => other.normal(),
            };
            println!(
                "{:>6} {:10} {:8} {:>6} {:20} {}",
                item.id,
                status,
                level,
                item.fp_count,
                item.last_receive_at.format("%Y-%m-%d %H:%M:%S"),
                truncate(&item.fingerprint, 40)
            );
            if !item.assignees.is_empty() {
                println!("{:>6} {} {}", "", "assignees:".dimmed(), item.assignees.join(", "));
            }
        }
    }

    println!();
    let mut footer = format!(
        "{} {}  {} {} ({:.0}%)  {} {}",
        "Total:".dimmed(),
        list.summary.total,
        "Bad:".dimmed(),
        list.summary.bad.to_string().red(),
        list.summary.bad_ratio() * 100.0,
        "Solved:".dimmed(),
        list.summary.solved.to_string().green()
    );
    if let Some(page) = page {
        footer.push_str(&format!("  (page {}, size {})", page.page_index(), page.limit()));
    }
    println!("{footer}");
}

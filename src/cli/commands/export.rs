//! sqlm export - Dump live items for backup or offline analysis

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::error::Result;
use crate::manage::{list_all, ManagedSqlItem};

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Write to this file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

pub fn run(ctx: &mut AppContext, args: &ExportArgs) -> Result<()> {
    let items = list_all(&ctx.db)?;

    match &args.output {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            write_jsonl(&mut out, &items)?;
            out.flush()?;
            if !ctx.robot_mode {
                eprintln!(
                    "{} {} item(s) to {}",
                    "Exported".green(),
                    items.len(),
                    path.display()
                );
            }
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            write_jsonl(&mut out, &items)?;
        }
    }
    Ok(())
}

fn write_jsonl<W: Write>(out: &mut W, items: &[ManagedSqlItem]) -> Result<()> {
    for item in items {
        serde_json::to_writer(&mut *out, item)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

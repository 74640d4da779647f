//! Summary commands.

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;
use tasksense_core::SummaryService;

use super::AppContext;
use crate::output;

#[derive(Subcommand)]
pub enum SummaryCommands {
    /// Create or incrementally update a task's summary
    Generate {
        /// Task ID
        task_id: i64,
    },

    /// Show the stored summary
    Show {
        /// Task ID
        task_id: i64,
    },

    /// Delete the stored summary
    Delete {
        /// Task ID
        task_id: i64,
    },

    /// Score the stored summary and suggest improvements
    Quality {
        /// Task ID
        task_id: i64,
    },
}

pub async fn execute(cmd: SummaryCommands, ctx: &AppContext) -> Result<()> {
    let service = SummaryService::from_config(&ctx.config, &ctx.repositories())?;

    match cmd {
        SummaryCommands::Generate { task_id } => {
            let spinner = output::spinner(format!("Summarizing task {}...", task_id));
            let summary = service.create_or_update_summary(task_id).await;
            spinner.finish_and_clear();
            output::print_summary(&summary?);
        }

        SummaryCommands::Show { task_id } => match service.get_summary(task_id).await? {
            Some(summary) => output::print_summary(&summary),
            None => println!("{}", format!("No summary for task {}.", task_id).dimmed()),
        },

        SummaryCommands::Delete { task_id } => {
            if !service.delete_summary(task_id).await? {
                bail!("Summary for task {} not found", task_id);
            }
            println!("{} Deleted summary of task {}", "✓".green().bold(), task_id);
        }

        SummaryCommands::Quality { task_id } => {
            let quality = service.analyze_summary_quality(task_id).await?;
            let suggestions = service.suggest_improvements(task_id).await?;
            output::print_quality(&quality, &suggestions);
        }
    }

    Ok(())
}

//! One-shot estimation and parsing commands.

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use tasksense_core::{EstimationService, ParserService, TaskRepository};

use super::AppContext;
use crate::output;

#[derive(Args)]
pub struct EstimateArgs {
    /// Task ID
    pub task_id: i64,

    /// Store the estimated hours on the task
    #[arg(long)]
    pub save: bool,

    /// Print the raw JSON result
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CompareArgs {
    /// Task IDs to compare
    #[arg(required = true, num_args = 1..)]
    pub task_ids: Vec<i64>,
}

#[derive(Args)]
pub struct ParseArgs {
    /// Free-text task description
    pub text: String,

    /// Print the raw JSON result
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CreateArgs {
    /// Free-text task description
    pub text: String,

    /// Reporter user ID (defaults to the first user)
    #[arg(long)]
    pub reporter: Option<i64>,
}

pub async fn estimate(args: EstimateArgs, ctx: &AppContext) -> Result<()> {
    let repositories = ctx.repositories();
    let service = EstimationService::from_config(&ctx.config, &repositories)?;

    let metadata = service.get_estimation_metadata(args.task_id).await;
    if !metadata.task_exists {
        bail!("Task {} not found", args.task_id);
    }
    for warning in &metadata.validation_warnings {
        println!("{} {}", "!".yellow().bold(), warning);
    }

    let spinner = output::spinner(format!("Estimating task {}...", args.task_id));
    let result = service.estimate_task(args.task_id).await;
    spinner.finish_and_clear();
    let result = result?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        output::print_estimation(args.task_id, &result);
    }

    if args.save {
        let task = repositories
            .task_repository()
            .set_estimate(args.task_id, result.estimated_hours)
            .await?;
        println!(
            "{} Saved estimate on task {}",
            "✓".green().bold(),
            task.id.to_string().dimmed()
        );
    }
    Ok(())
}

pub async fn compare(args: CompareArgs, ctx: &AppContext) -> Result<()> {
    let service = EstimationService::from_config(&ctx.config, &ctx.repositories())?;

    let spinner = output::spinner(format!("Estimating {} task(s)...", args.task_ids.len()));
    let comparison = service.compare_estimations(&args.task_ids).await;
    spinner.finish_and_clear();

    output::print_comparison(&comparison);
    let skipped = args.task_ids.len() - comparison.tasks.len();
    if skipped > 0 {
        println!("{}", format!("{} task(s) could not be estimated", skipped).yellow());
    }
    Ok(())
}

pub async fn parse(args: ParseArgs, ctx: &AppContext) -> Result<()> {
    let service = ParserService::from_config(&ctx.config, &ctx.repositories())?;

    let report = ParserService::validate_request(&args.text);
    for warning in &report.warnings {
        println!("{} {}", "!".yellow().bold(), warning);
    }

    let spinner = output::spinner("Parsing text...");
    let parsed = service.parse_text_to_task_data(&args.text).await;
    spinner.finish_and_clear();
    let parsed = parsed?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
    } else {
        output::print_parse_result(&parsed);
    }
    Ok(())
}

pub async fn create(args: CreateArgs, ctx: &AppContext) -> Result<()> {
    let service = ParserService::from_config(&ctx.config, &ctx.repositories())?;

    let spinner = output::spinner("Creating task from text...");
    let created = service.create_task_from_text(&args.text, args.reporter).await;
    spinner.finish_and_clear();
    let (task, parsed) = created?;

    println!(
        "{} Created task: {} ({})",
        "✓".green().bold(),
        task.title.cyan(),
        task.id.to_string().dimmed()
    );
    println!(
        "  {} {}  {} {}  {} {:.2}",
        "type".dimmed(),
        parsed.task_type,
        "priority".dimmed(),
        task.priority.as_str(),
        "confidence".dimmed(),
        parsed.confidence_score
    );
    Ok(())
}

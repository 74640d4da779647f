//! Task and user seeding commands.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use tasksense_core::task::{
    self,
    model::{NewTask, TaskChanges, TaskPriority, TaskStatus},
};

use super::AppContext;
use crate::output;

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Create a new task
    Add(AddTaskArgs),

    /// Comment on a task
    Comment(CommentArgs),

    /// Change a task's status
    Status(StatusArgs),

    /// List tasks
    List,
}

#[derive(Args)]
pub struct AddTaskArgs {
    /// Task title
    pub title: String,

    /// Task description
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Priority (low, medium, high, critical)
    #[arg(long, default_value = "medium")]
    pub priority: String,

    /// Reporter user ID
    #[arg(long)]
    pub reporter: i64,

    /// Assignee user ID
    #[arg(long)]
    pub assignee: Option<i64>,
}

#[derive(Args)]
pub struct CommentArgs {
    /// Task ID
    pub task_id: i64,

    /// Comment text
    pub text: String,

    /// Commenting user ID
    #[arg(long)]
    pub user: Option<i64>,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Task ID
    pub task_id: i64,

    /// Target status (todo, in_progress, in_review, done, blocked)
    pub status: String,

    /// Acting user ID
    #[arg(long)]
    pub user: Option<i64>,
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user
    Add {
        /// Unique username
        username: String,
    },

    /// List users
    List,
}

pub fn execute(cmd: TaskCommands, ctx: &AppContext) -> Result<()> {
    let pool = &ctx.pool;

    match cmd {
        TaskCommands::Add(args) => {
            let priority = TaskPriority::parse(&args.priority)
                .ok_or_else(|| anyhow!("Unknown priority '{}'", args.priority))?;
            let mut new = NewTask::new(args.title, args.description, args.reporter);
            new.priority = priority;
            new.assignee_id = args.assignee;

            let task = task::create_task(pool, &new)?;
            println!(
                "{} Created task: {} ({})",
                "✓".green().bold(),
                task.title.cyan(),
                task.id.to_string().dimmed()
            );
        }

        TaskCommands::Comment(args) => {
            task::add_comment(pool, args.task_id, args.user, &args.text)?;
            println!("{} Comment added to task {}", "✓".green().bold(), args.task_id);
        }

        TaskCommands::Status(args) => {
            let status = TaskStatus::parse(&args.status)
                .ok_or_else(|| anyhow!("Unknown status '{}'", args.status))?;
            let changes = TaskChanges {
                status: Some(status),
                ..Default::default()
            };
            let task = task::update_task(pool, args.task_id, &changes, args.user)?;
            println!(
                "{} Moved task {} to {}",
                "✓".green().bold(),
                task.id.to_string().dimmed(),
                task.status.as_str().cyan()
            );
        }

        TaskCommands::List => {
            output::print_tasks_table(&task::list_tasks(pool)?);
        }
    }

    Ok(())
}

pub fn execute_user(cmd: UserCommands, ctx: &AppContext) -> Result<()> {
    match cmd {
        UserCommands::Add { username } => {
            let user = task::create_user(&ctx.pool, &username)?;
            println!(
                "{} Created user: {} ({})",
                "✓".green().bold(),
                user.username.cyan(),
                user.id.to_string().dimmed()
            );
        }
        UserCommands::List => {
            for user in task::list_users(&ctx.pool)? {
                println!("{:>4}  {}", user.id.to_string().dimmed(), user.username);
            }
        }
    }
    Ok(())
}

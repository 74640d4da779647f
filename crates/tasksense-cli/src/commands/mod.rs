//! CLI command definitions and handlers.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tasksense_core::{AiConfig, RepositoryFactory};
use tasksense_db::DbPool;

pub mod ai;
pub mod provider;
pub mod serve;
pub mod summary;
pub mod task;

/// TaskSense - AI estimation, summaries and parsing for a task tracker
#[derive(Parser)]
#[command(name = "tasksense")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "TASKSENSE_DB", default_value = "tasksense.db")]
    pub db: PathBuf,

    /// TOML file with AI provider settings
    #[arg(long, global = true, env = "TASKSENSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Use the mock providers even when an API key is configured
    #[arg(long, global = true)]
    pub mock: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP and WebSocket server
    Serve(serve::ServeArgs),

    /// Estimate a task's effort in hours
    Estimate(ai::EstimateArgs),

    /// Estimate several tasks and compare them
    Compare(ai::CompareArgs),

    /// Manage task summaries
    #[command(subcommand)]
    Summary(summary::SummaryCommands),

    /// Parse free text into task fields without saving
    Parse(ai::ParseArgs),

    /// Parse free text and create a task from it
    Create(ai::CreateArgs),

    /// Seed and edit tasks
    #[command(subcommand)]
    Task(task::TaskCommands),

    /// Manage users
    #[command(subcommand)]
    User(task::UserCommands),

    /// Show the configured AI provider
    Provider(provider::ProviderArgs),
}

/// Database and configuration shared by every command.
pub struct AppContext {
    pub pool: DbPool,
    pub config: AiConfig,
}

impl AppContext {
    pub fn repositories(&self) -> RepositoryFactory {
        RepositoryFactory::new(self.pool.clone())
    }
}

impl Cli {
    fn context(&self) -> Result<AppContext> {
        let pool = tasksense_db::init_pool(&self.db)
            .with_context(|| format!("opening database {}", self.db.display()))?;
        let mut config = AiConfig::load(self.config.as_deref())?;
        if self.mock {
            config = config.force_mock();
        }
        tracing::debug!(db = %self.db.display(), use_mock = config.use_mock, "configuration loaded");
        Ok(AppContext { pool, config })
    }

    pub async fn execute(self) -> Result<()> {
        let ctx = self.context()?;

        match self.command {
            Commands::Serve(args) => serve::execute(args, ctx).await,
            Commands::Estimate(args) => ai::estimate(args, &ctx).await,
            Commands::Compare(args) => ai::compare(args, &ctx).await,
            Commands::Summary(cmd) => summary::execute(cmd, &ctx).await,
            Commands::Parse(args) => ai::parse(args, &ctx).await,
            Commands::Create(args) => ai::create(args, &ctx).await,
            Commands::Task(cmd) => task::execute(cmd, &ctx),
            Commands::User(cmd) => task::execute_user(cmd, &ctx),
            Commands::Provider(args) => provider::execute(args, &ctx),
        }
    }
}

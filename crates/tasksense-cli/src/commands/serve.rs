//! Web server command.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tasksense_core::provider::provider_info;
use tasksense_web::AppState;

use super::AppContext;

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long, default_value = "3030")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Also write logs to a file
    #[arg(long)]
    pub log: bool,

    /// Log file path (defaults to tasksense-serve.log)
    #[arg(long, requires = "log")]
    pub log_file: Option<PathBuf>,
}

pub async fn execute(args: ServeArgs, ctx: AppContext) -> Result<()> {
    let info = provider_info(&ctx.config);
    let state = AppState::new(ctx.pool, ctx.config)?;

    println!();
    println!("  {} {}", "TaskSense".cyan().bold(), "AI Server".bold());
    println!();
    println!("  {}       http://{}:{}/api", "API".green(), args.host, args.port);
    println!("  {}  ws://{}:{}/ws", "WebSocket".green(), args.host, args.port);
    println!(
        "  {}   {} ({})",
        "Provider".green(),
        info.provider,
        info.model.dimmed()
    );
    println!();
    println!("  {}", "Ctrl+C to stop".dimmed());
    println!();

    tasksense_web::run_server(state, &args.host, args.port).await
}

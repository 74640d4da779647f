//! Provider information command.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tasksense_core::prompt::build_parsing_prompt;
use tasksense_core::provider::{estimate_cost, provider_info};
use tasksense_core::Operation;

use super::AppContext;

#[derive(Args)]
pub struct ProviderArgs {
    /// Price the parsing prompt built for this text
    #[arg(long)]
    pub cost_of: Option<String>,
}

pub fn execute(args: ProviderArgs, ctx: &AppContext) -> Result<()> {
    let info = provider_info(&ctx.config);

    println!("{}: {}", "Provider".bold(), info.provider.cyan());
    println!("{}: {}", "Model".bold(), info.model);
    println!(
        "{}: {}",
        "Available".bold(),
        if info.available { "yes".green() } else { "no".red() }
    );
    if !info.is_mock && !info.available {
        println!("{}", "Set OPENAI_API_KEY to enable the hosted provider.".dimmed());
    }

    if let Some(text) = args.cost_of {
        let cost = estimate_cost(&ctx.config, Operation::Parsing, &build_parsing_prompt(&text))?;
        println!();
        println!(
            "{}: {} input + {} max output tokens",
            "Tokens".bold(),
            cost.input_tokens,
            cost.max_output_tokens
        );
        println!("{}: ${:.6}", "Estimated cost".bold(), cost.estimated_cost_usd);
        if !cost.pricing_known {
            println!(
                "{}",
                format!("No price listed for {}; used the default rate.", cost.model).yellow()
            );
        }
    }
    Ok(())
}

//! Terminal output formatting.

use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use std::borrow::Cow;
use std::time::Duration;
use tasksense_core::estimation::model::EstimationComparison;
use tasksense_core::summary::analyzer::SummaryQuality;
use tasksense_core::task::model::{format_estimate, Task, TaskPriority, TaskStatus};
use tasksense_core::{EstimationResult, ParseResult, TaskSummary};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Spinner shown while a provider call is in flight.
pub fn spinner(message: impl Into<Cow<'static, str>>) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn status_colored(status: TaskStatus) -> ColoredString {
    let name = status.as_str();
    match status {
        TaskStatus::InProgress => name.yellow(),
        TaskStatus::InReview => name.cyan(),
        TaskStatus::Done => name.green(),
        TaskStatus::Blocked => name.red(),
        TaskStatus::Todo => name.normal(),
    }
}

fn priority_colored(priority: TaskPriority) -> ColoredString {
    let name = priority.as_str();
    match priority {
        TaskPriority::Critical => name.red().bold(),
        TaskPriority::High => name.red(),
        TaskPriority::Medium => name.yellow(),
        TaskPriority::Low => name.dimmed(),
    }
}

fn confidence_colored(score: f64) -> ColoredString {
    let text = format!("{:.0}%", score * 100.0);
    if score >= 0.7 {
        text.green()
    } else if score >= 0.4 {
        text.yellow()
    } else {
        text.red()
    }
}

/// Print tasks as a table.
pub fn print_tasks_table(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("{}", "No tasks found.".dimmed());
        return;
    }

    let title_width = term_width().saturating_sub(44).clamp(20, 60);
    println!(
        "{:<6} {} {:<12} {:<10} {:>8}",
        "ID",
        pad_right("Title", title_width),
        "Status",
        "Priority",
        "Estimate"
    );
    println!("{}", "─".repeat(title_width + 40));

    for task in tasks {
        let estimate = task.estimate.map(format_estimate).unwrap_or_else(|| "-".into());
        println!(
            "{:<6} {} {:<12} {:<10} {:>8}",
            task.id,
            pad_right(&truncate_visual(&task.title, title_width), title_width),
            status_colored(task.status),
            priority_colored(task.priority),
            estimate
        );
    }

    println!();
    println!("{} task(s) total", tasks.len());
}

pub fn print_estimation(task_id: i64, result: &EstimationResult) {
    println!(
        "{} {}",
        format!("Task {}", task_id).cyan().bold(),
        format!("{:.1} hours", result.estimated_hours).bold()
    );
    println!("{}: {}", "Confidence".bold(), confidence_colored(result.confidence_score));
    println!();
    println!("{}", result.reasoning);

    if !result.similar_tasks.is_empty() {
        println!();
        println!("{}", "Similar tasks".bold());
        for similar in &result.similar_tasks {
            println!(
                "  {:<6} {} {:>6}h  {}",
                similar.id,
                pad_right(&truncate_visual(&similar.title, 40), 40),
                format_estimate(similar.estimate),
                format!("{:.2}", similar.similarity_score).dimmed()
            );
        }
    }
}

pub fn print_comparison(comparison: &EstimationComparison) {
    if comparison.tasks.is_empty() {
        println!("{}", "No tasks could be estimated.".dimmed());
        return;
    }

    println!("{:<8} {:>8} {:>11}", "Task", "Hours", "Confidence");
    println!("{}", "─".repeat(29));
    for entry in &comparison.tasks {
        println!(
            "{:<8} {:>8.1} {:>11}",
            entry.task_id,
            entry.estimated_hours,
            confidence_colored(entry.confidence_score)
        );
    }
    println!();
    println!("{}: {:.1} hours", "Average".bold(), comparison.average_hours);
    println!(
        "{}: {:.2} - {:.2}",
        "Confidence range".bold(),
        comparison.confidence_range.min,
        comparison.confidence_range.max
    );
    if !comparison.common_factors.is_empty() {
        println!("{}: {}", "Common factors".bold(), comparison.common_factors.join(", "));
    }
}

pub fn print_parse_result(parsed: &ParseResult) {
    println!("{}", parsed.title.cyan().bold());
    println!();
    println!("{}", parsed.description);
    println!();
    println!("{}: {}", "Type".bold(), parsed.task_type);
    println!("{}: {}", "Priority".bold(), parsed.priority);
    if let Some(points) = parsed.estimate {
        println!("{}: {} story points", "Estimate".bold(), points);
    }
    if let Some(due) = &parsed.due_date {
        println!("{}: {}", "Due".bold(), due);
    }
    if !parsed.tags.is_empty() {
        let tags: Vec<String> = parsed.tags.iter().map(|t| format!("#{}", t)).collect();
        println!("{}: {}", "Tags".bold(), tags.join(" ").dimmed());
    }
    println!("{}: {}", "Confidence".bold(), confidence_colored(parsed.confidence_score));
}

pub fn print_summary(summary: &TaskSummary) {
    println!("{}", format!("Task {} summary", summary.task_id).cyan().bold());
    println!();
    println!("{}", summary.summary_text);
    println!();
    println!(
        "{}",
        format!(
            "{} tokens · updated {}",
            summary.token_usage,
            summary.updated_at.format("%Y-%m-%d %H:%M UTC")
        )
        .dimmed()
    );
}

pub fn print_quality(quality: &SummaryQuality, suggestions: &[String]) {
    let score = quality.quality_score.to_string();
    let score = match quality.quality_score {
        80.. => score.green(),
        50..=79 => score.yellow(),
        _ => score.red(),
    };
    println!("{}: {}/100", "Quality".bold(), score);

    for issue in &quality.issues {
        println!("  {} {}", "✗".red(), issue);
    }
    if !suggestions.is_empty() {
        println!();
        println!("{}", "Suggestions".bold());
        for suggestion in suggestions {
            println!("  {} {}", "→".cyan(), suggestion);
        }
    }
}

/// Get terminal width, defaulting to 80.
fn term_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80)
}

/// Pad a plain string to a given visual width (right-padded).
fn pad_right(s: &str, width: usize) -> String {
    let visual = UnicodeWidthStr::width(s);
    if visual >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - visual))
    }
}

/// Truncate a string respecting visual width.
fn truncate_visual(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    if max_width <= 3 {
        return ".".repeat(max_width);
    }
    let mut result = String::new();
    let mut current_width = 0;
    for ch in s.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if current_width + ch_width > max_width - 2 {
            break;
        }
        result.push(ch);
        current_width += ch_width;
    }
    result.push_str("..");
    result
}

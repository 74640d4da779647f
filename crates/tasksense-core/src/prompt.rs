//! Prompt construction for the hosted backends.
//!
//! Each builder is a value threaded through chained calls and consumed by
//! `build()`. Nothing is shared between prompts.

use crate::repository::SimilarTask;
use crate::task::model::{format_estimate, Activity, Task};

const ANALYSIS_FACTORS: [&str; 5] = [
    "Task complexity and technical requirements",
    "Similar functionality or features",
    "Priority level and urgency",
    "Scope and deliverables",
    "Potential risks and unknowns",
];

/// Similar-task descriptions are cut to this many characters.
const SIMILAR_DESCRIPTION_LIMIT: usize = 150;

/// System instruction for the hosted summary backend.
pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a project management assistant that creates concise, professional \
summaries of task activities. Your summaries should:\n\
- Be clear and easy to understand\n\
- Highlight key changes and progress\n\
- Include relevant dates when significant\n\
- Focus on the most important updates\n\
The output should be no more than 200 words.";

/// System instruction for the hosted text parser.
pub const PARSER_SYSTEM_PROMPT: &str = "You are an expert project management assistant that parses natural language \
text into structured task data. Your job is to extract key information from \
user input and format it as a JSON object.\n\n\
Guidelines:\n\
- Extract a clear, concise title (max 100 characters)\n\
- Create a detailed description based on the input\n\
- Identify priority: low, medium, high, urgent\n\
- Extract time estimates if mentioned (convert to story points: 1-2h=1, 3-6h=2, 1day=3, etc.)\n\
- Identify task type: task, bug, feature, story, epic\n\
- Extract due dates if mentioned (format: YYYY-MM-DD)\n\
- Extract relevant tags/keywords\n\
- Provide confidence score (0.0-1.0) for parsing accuracy\n\n\
Always respond with valid JSON format as requested.";

/// Builds the user prompt for similarity-based estimation.
#[derive(Debug, Clone)]
pub struct EstimationPromptBuilder<'a> {
    task: &'a Task,
    similar_tasks: &'a [SimilarTask],
    instructions: Vec<String>,
}

impl<'a> EstimationPromptBuilder<'a> {
    pub fn new(task: &'a Task) -> Self {
        Self {
            task,
            similar_tasks: &[],
            instructions: Vec::new(),
        }
    }

    pub fn similar_tasks(mut self, similar: &'a [SimilarTask]) -> Self {
        self.similar_tasks = similar;
        self
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instructions.push(instruction.into());
        self
    }

    fn similar_section(&self, lines: &mut Vec<String>) {
        if self.similar_tasks.is_empty() {
            lines.push("No historical similar tasks available.".into());
            return;
        }

        lines.push("HISTORICAL SIMILAR TASKS:".into());
        for (i, similar) in self.similar_tasks.iter().enumerate() {
            let description = if similar.description.chars().count() > SIMILAR_DESCRIPTION_LIMIT {
                let cut: String = similar.description.chars().take(SIMILAR_DESCRIPTION_LIMIT).collect();
                format!("{}...", cut)
            } else {
                similar.description.clone()
            };
            lines.push(format!("{}. Title: {}", i + 1, similar.title));
            lines.push(format!("   Description: {}", description));
            lines.push(format!("   Priority: {}", similar.priority));
            lines.push(format!("   Actual Effort: {} hours", format_estimate(similar.estimate)));
            lines.push(String::new());
        }
    }

    fn task_section(&self, lines: &mut Vec<String>) {
        lines.push("NEW TASK TO ESTIMATE:".into());
        lines.push(format!("Title: {}", self.task.title));
        lines.push(format!("Description: {}", self.task.description));
        lines.push(format!("Priority: {}", self.task.priority.as_str()));
        lines.push(format!(
            "Assignee: {}",
            self.task.assignee.as_deref().unwrap_or("Unassigned")
        ));
        lines.push(String::new());
    }

    fn analysis_section(&self, lines: &mut Vec<String>) {
        lines.push("ANALYSIS INSTRUCTIONS:".into());
        lines.push("1. Analyze the new task's complexity, scope, and requirements".into());
        lines.push("2. Compare it with the historical tasks to find patterns and similarities".into());
        lines.push("3. Consider factors like:".into());

        for factor in ANALYSIS_FACTORS {
            lines.push(format!("   - {}", factor));
        }
        lines.push(String::new());
    }

    pub fn build(self) -> String {
        let mut lines: Vec<String> = vec![
            "You are an expert software project manager specializing in task estimation.".into(),
            "Your job is to estimate the effort required for a new task by analyzing its similarity to historical tasks.".into(),
            String::new(),
        ];

        self.similar_section(&mut lines);
        lines.push(String::new());
        self.task_section(&mut lines);
        self.analysis_section(&mut lines);

        if !self.instructions.is_empty() {
            lines.push("ADDITIONAL INSTRUCTIONS:".into());
            lines.extend(self.instructions.iter().cloned());
            lines.push(String::new());
        }

        lines.extend(
            [
                "Please provide your estimation in the following JSON format:",
                "{",
                "    \"estimated_hours\": <number>,",
                "    \"confidence_score\": <number between 0 and 1>,",
                "    \"reasoning\": \"<detailed explanation of your estimation process>\",",
                "    \"similar_task_analysis\": [",
                "        {",
                "            \"task_id\": <id>,",
                "            \"similarity_score\": <number between 0 and 1>,",
                "            \"similarity_factors\": [\"<factor1>\", \"<factor2>\"]",
                "        }",
                "    ],",
                "    \"risk_factors\": [\"<factor1>\", \"<factor2>\"],",
                "    \"assumptions\": [\"<assumption1>\", \"<assumption2>\"]",
                "}",
                "",
                "Be thorough in your analysis and provide a realistic estimate. \
                 The confidence score should reflect how certain you are based on \
                 the available similar tasks and task clarity.",
            ]
            .into_iter()
            .map(String::from),
        );

        lines.join("\n")
    }
}

/// Builds the user prompt for creating or updating a task summary.
#[derive(Debug, Clone)]
pub struct SummaryPromptBuilder<'a> {
    task: &'a Task,
    activities: &'a [Activity],
    previous_summary: Option<&'a str>,
    focus_areas: Vec<String>,
}

impl<'a> SummaryPromptBuilder<'a> {
    pub fn new(task: &'a Task) -> Self {
        Self {
            task,
            activities: &[],
            previous_summary: None,
            focus_areas: Vec::new(),
        }
    }

    pub fn activities(mut self, activities: &'a [Activity]) -> Self {
        self.activities = activities;
        self
    }

    /// Frame the prompt as an update of `summary`. Blank text is ignored.
    pub fn previous_summary(mut self, summary: Option<&'a str>) -> Self {
        self.previous_summary = summary.filter(|s| !s.is_empty());
        self
    }

    pub fn focus_area(mut self, area: impl Into<String>) -> Self {
        self.focus_areas.push(area.into());
        self
    }

    fn context_section(&self, lines: &mut Vec<String>) {
        let task = self.task;
        lines.push(format!("Task: {}", task.title));
        lines.push(format!(
            "Description: {}",
            if task.description.is_empty() {
                "No description provided"
            } else {
                task.description.as_str()
            }
        ));
        lines.push(format!("Current Status: {}", task.status.display_name()));
        lines.push(format!("Priority: {}", task.priority.display_name()));

        if let Some(assignee) = &task.assignee {
            lines.push(format!("Assignee: {}", assignee));
        }
        lines.push(format!("Reporter: {}", task.reporter));
        if let Some(estimate) = task.estimate.filter(|e| *e != 0.0) {
            lines.push(format!("Estimate: {} story points", format_estimate(estimate)));
        }
        if let Some(due) = task.due_date {
            lines.push(format!("Due Date: {}", due.format("%Y-%m-%d")));
        }
        lines.push(String::new());
    }

    fn activities_section(&self, lines: &mut Vec<String>) {
        if self.activities.is_empty() {
            lines.push("No recent activities to summarize.".into());
            return;
        }

        lines.push("RECENT ACTIVITIES:".into());
        for activity in self.activities {
            lines.push(format!(
                "- {}: {}",
                activity.timestamp.format("%Y-%m-%d %H:%M"),
                activity.description
            ));
        }
        lines.push(String::new());
    }

    fn instructions_section(&self, lines: &mut Vec<String>) {
        lines.extend(
            [
                "Please provide a concise but comprehensive summary of the task's current state.",
                "Focus on:",
                "- Current progress and status",
                "- Key activities and changes",
                "- Important decisions or blockers",
                "- Overall trajectory and next steps",
            ]
            .into_iter()
            .map(String::from),
        );

        if !self.focus_areas.is_empty() {
            lines.push(String::new());
            lines.push("Additionally, pay special attention to:".into());
            for area in &self.focus_areas {
                lines.push(format!("- {}", area));
            }
        }

        if self.previous_summary.is_some() {
            lines.push(String::new());
            lines.push(
                "Update the previous summary with the new activities, maintaining continuity while highlighting recent changes."
                    .into(),
            );
        }
    }

    pub fn build(self) -> String {
        let mut lines = Vec::new();
        self.context_section(&mut lines);

        if let Some(previous) = self.previous_summary {
            lines.push("PREVIOUS SUMMARY:".into());
            lines.push(previous.to_string());
            lines.push(String::new());
            lines.push("NEW ACTIVITIES TO INCORPORATE:".into());
            lines.push(String::new());
        }

        self.activities_section(&mut lines);
        self.instructions_section(&mut lines);
        lines.join("\n")
    }
}

/// Builds a system instruction from a role, capabilities, constraints and
/// a response format.
#[derive(Debug, Clone)]
pub struct SystemPromptBuilder {
    role: String,
    capabilities: Vec<String>,
    constraints: Vec<String>,
    response_format: Option<String>,
}

impl SystemPromptBuilder {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            capabilities: Vec::new(),
            constraints: Vec::new(),
            response_format: None,
        }
    }

    pub fn capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    pub fn constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints.push(constraint.into());
        self
    }

    pub fn response_format(mut self, format: impl Into<String>) -> Self {
        self.response_format = Some(format.into());
        self
    }

    pub fn build(self) -> String {
        let mut parts = vec![format!("You are {}.", self.role)];

        if !self.capabilities.is_empty() {
            parts.push(
                self.capabilities
                    .iter()
                    .map(|c| format!("You excel at {}.", c))
                    .collect::<Vec<_>>()
                    .join(" "),
            );
        }
        parts.extend(self.constraints);
        if let Some(format) = self.response_format {
            parts.push(format);
        }

        parts.join(" ")
    }
}

/// System instruction for the hosted estimator.
pub fn estimation_system_prompt() -> String {
    SystemPromptBuilder::new("an expert project manager specializing in software task estimation")
        .capability("analyzing task similarity and providing accurate effort estimates")
        .response_format("Always respond with valid JSON format as requested.")
        .build()
}

/// User prompt asking the hosted parser to structure `text`.
pub fn build_parsing_prompt(text: &str) -> String {
    format!(
        r#"
Please parse the following task description into structured data:

"{text}"

Respond with a JSON object containing:
{{
    "title": "Clear, concise task title",
    "description": "Detailed task description",
    "priority": "low|medium|high|urgent",
    "estimate": null or number (story points),
    "due_date": null or "YYYY-MM-DD",
    "task_type": "task|bug|feature|story|epic",
    "tags": ["tag1", "tag2"],
    "confidence_score": 0.0-1.0,
    "reasoning": "Brief explanation of parsing decisions"
}}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::model::{ActivityKind, TaskPriority, TaskStatus};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn sample_task() -> Task {
        Task {
            id: 7,
            title: "Add export button".into(),
            description: "Export the board as CSV".into(),
            status: TaskStatus::InProgress,
            priority: TaskPriority::High,
            estimate: Some(3.0),
            assignee_id: Some(2),
            assignee: Some("bob".into()),
            reporter_id: 1,
            reporter: "alice".into(),
            due_date: NaiveDate::from_ymd_opt(2030, 5, 1),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn similar(id: i64, description: &str) -> SimilarTask {
        SimilarTask {
            id,
            title: format!("Old task {}", id),
            description: description.into(),
            priority: "medium".into(),
            estimate: 4.5,
            status: "done".into(),
        }
    }

    #[test]
    fn test_estimation_prompt_without_history() {
        let task = sample_task();
        let prompt = EstimationPromptBuilder::new(&task).build();

        assert!(prompt.starts_with("You are an expert software project manager"));
        assert!(prompt.contains("No historical similar tasks available."));
        assert!(prompt.contains("NEW TASK TO ESTIMATE:\nTitle: Add export button"));
        assert!(prompt.contains("Priority: high\nAssignee: bob"));
        assert!(prompt.contains("   - Potential risks and unknowns"));
        assert!(!prompt.contains("ADDITIONAL INSTRUCTIONS:"));
        assert!(prompt.contains("\"estimated_hours\": <number>,"));
    }

    #[test]
    fn test_estimation_prompt_truncates_history() {
        let task = sample_task();
        let long = "x".repeat(200);
        let history = vec![similar(1, &long), similar(2, "short")];
        let prompt = EstimationPromptBuilder::new(&task)
            .similar_tasks(&history)
            .instruction("Prefer round numbers.")
            .build();

        assert!(prompt.contains("HISTORICAL SIMILAR TASKS:\n1. Title: Old task 1"));
        assert!(prompt.contains(&format!("   Description: {}...", "x".repeat(150))));
        assert!(prompt.contains("   Actual Effort: 4.5 hours"));
        assert!(prompt.contains("2. Title: Old task 2\n   Description: short"));
        assert!(prompt.contains("   - Scope and deliverables"));
        assert!(prompt.contains("ADDITIONAL INSTRUCTIONS:\nPrefer round numbers.\n"));
    }

    #[test]
    fn test_summary_prompt_create() {
        let task = sample_task();
        let activities = vec![Activity {
            id: 1,
            task_id: 7,
            kind: ActivityKind::Created,
            description: "Task 'Add export button' was created".into(),
            user_id: Some(1),
            username: Some("alice".into()),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, 0).unwrap(),
        }];
        let prompt = SummaryPromptBuilder::new(&task).activities(&activities).build();

        assert!(prompt.starts_with("Task: Add export button\nDescription: Export the board as CSV"));
        assert!(prompt.contains("Current Status: In Progress\nPriority: High"));
        assert!(prompt.contains("Assignee: bob\nReporter: alice\nEstimate: 3 story points\nDue Date: 2030-05-01"));
        assert!(prompt.contains("RECENT ACTIVITIES:\n- 2024-03-04 09:30: Task 'Add export button' was created"));
        assert!(!prompt.contains("PREVIOUS SUMMARY:"));
        assert!(!prompt.contains("Update the previous summary"));
    }

    #[test]
    fn test_summary_prompt_update() {
        let mut task = sample_task();
        task.description.clear();
        task.estimate = None;
        let prompt = SummaryPromptBuilder::new(&task)
            .previous_summary(Some("Earlier text."))
            .focus_area("Blockers")
            .build();

        assert!(prompt.contains("Description: No description provided"));
        assert!(!prompt.contains("Estimate:"));
        assert!(prompt.contains("PREVIOUS SUMMARY:\nEarlier text.\n\nNEW ACTIVITIES TO INCORPORATE:\n"));
        assert!(prompt.contains("No recent activities to summarize."));
        assert!(prompt.contains("Additionally, pay special attention to:\n- Blockers"));
        assert!(prompt.ends_with("maintaining continuity while highlighting recent changes."));
    }

    #[test]
    fn test_system_prompt_joins_parts() {
        let prompt = SystemPromptBuilder::new("a reviewer")
            .capability("reading")
            .capability("writing")
            .constraint("Be brief.")
            .response_format("Answer in JSON.")
            .build();
        assert_eq!(
            prompt,
            "You are a reviewer. You excel at reading. You excel at writing. Be brief. Answer in JSON."
        );
        assert_eq!(
            estimation_system_prompt(),
            "You are an expert project manager specializing in software task estimation. \
             You excel at analyzing task similarity and providing accurate effort estimates. \
             Always respond with valid JSON format as requested."
        );
    }

    #[test]
    fn test_parsing_prompt_embeds_text() {
        let prompt = build_parsing_prompt("fix the login page");
        assert!(prompt.contains("\"fix the login page\""));
        assert!(prompt.contains("\"priority\": \"low|medium|high|urgent\","));
        assert!(prompt.starts_with('\n'));
    }
}

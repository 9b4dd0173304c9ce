//! Console output formatter for catalogs, selections, invocations and sessions

use colored::Colorize;
use sciquorum_application::{RunWorkflowOutput, SessionSummary};
use sciquorum_domain::{
    CatalogStats, ConsensusReport, ExecutionResult, ExecutionStatus, SelectionDecision, Session,
    SessionStatus, StepStatus, ToolDescriptor,
};
use serde::Serialize;

/// Formats results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format any serializable value as pretty JSON
    pub fn format_json<T: Serialize + ?Sized>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }

    // ==================== Catalog ====================

    /// One line per tool: name, mode, category, summary
    pub fn format_tool_list<T: AsRef<ToolDescriptor>>(tools: &[T]) -> String {
        if tools.is_empty() {
            return format!("{}\n", "No matching tools.".dimmed());
        }
        let width = tools
            .iter()
            .map(|t| t.as_ref().name.len())
            .max()
            .unwrap_or(0);

        let mut output = String::new();
        for tool in tools {
            let tool = tool.as_ref();
            output.push_str(&format!(
                "{}  {} {:<14} {}\n",
                format!("{:<width$}", tool.name, width = width).bold(),
                format!("{:<8}", tool.invocation_mode.as_str()).cyan(),
                tool.category,
                tool.summary().dimmed(),
            ));
        }
        output
    }

    pub fn format_tool(tool: &ToolDescriptor) -> String {
        let mut output = String::new();
        output.push_str(&Self::header(&tool.name));
        output.push('\n');

        output.push_str(&format!("{} {}\n", "Mode:".cyan().bold(), tool.invocation_mode));
        output.push_str(&format!("{} {}\n", "Entry point:".cyan().bold(), tool.entry_point));
        if !tool.category.is_empty() {
            output.push_str(&format!("{} {}\n", "Category:".cyan().bold(), tool.category));
        }
        if !tool.keywords.is_empty() {
            let keywords: Vec<&str> = tool.keywords.iter().map(String::as_str).collect();
            output.push_str(&format!(
                "{} {}\n",
                "Keywords:".cyan().bold(),
                keywords.join(", ")
            ));
        }
        if !tool.source_path.as_os_str().is_empty() {
            output.push_str(&format!(
                "{} {}\n",
                "Source:".cyan().bold(),
                tool.source_path.display()
            ));
        }

        if !tool.declared_parameters.is_empty() {
            output.push_str(&Self::section_header("Parameters"));
            for param in &tool.declared_parameters {
                let required = if param.required {
                    "required".yellow().to_string()
                } else {
                    "optional".dimmed().to_string()
                };
                output.push_str(&format!(
                    "  {} ({}, {})",
                    param.name.bold(),
                    required,
                    param.param_type
                ));
                if !param.description.is_empty() {
                    output.push_str(&format!("  {}", param.description));
                }
                output.push('\n');
            }
        }

        if !tool.capabilities_text.trim().is_empty() {
            output.push_str(&Self::section_header("Capabilities"));
            output.push_str(&Self::indent(tool.capabilities_text.trim(), "  "));
            output.push('\n');
        }
        output
    }

    /// Scan summary plus every file that was skipped
    pub fn format_scan(stats: &CatalogStats, skipped: &[String]) -> String {
        let mut output = format!(
            "{} {} tool(s)\n",
            "Catalog:".cyan().bold(),
            stats.total_tools
        );
        for (label, counts) in [
            ("By mode:", &stats.tools_per_mode),
            ("By category:", &stats.tools_per_category),
        ] {
            if counts.is_empty() {
                continue;
            }
            let parts: Vec<String> = counts.iter().map(|(k, n)| format!("{} {}", k, n)).collect();
            output.push_str(&format!("  {} {}\n", label.bold(), parts.join(", ")));
        }

        if !skipped.is_empty() {
            output.push_str(&format!(
                "\n{} {} file(s)\n",
                "Skipped:".yellow().bold(),
                skipped.len()
            ));
            for reason in skipped {
                output.push_str(&format!("  {} {}\n", "x".red(), reason));
            }
        }
        output
    }

    // ==================== Selection / invocation ====================

    pub fn format_selection(decision: &SelectionDecision) -> String {
        let mut output = String::new();
        if decision.used_fallback {
            output.push_str(&format!(
                "{}\n",
                "(completion unavailable, ranked by keyword overlap)".dimmed()
            ));
        }
        if decision.is_empty() {
            output.push_str(&format!("{}\n", "No tools chosen.".dimmed()));
            return output;
        }
        for (i, name) in decision.chosen_tools.iter().enumerate() {
            output.push_str(&format!("{}. {}\n", i + 1, name.bold()));
            if let Some(rationale) = decision.rationale(name) {
                output.push_str(&format!("   {}\n", rationale.dimmed()));
            }
            if let Some(params) = decision.suggested_parameters.get(name)
                && !params.is_empty()
            {
                output.push_str(&format!(
                    "   {} {}\n",
                    "params:".cyan(),
                    serde_json::Value::Object(params.clone())
                ));
            }
        }
        output
    }

    pub fn format_execution(result: &ExecutionResult) -> String {
        let mut output = format!(
            "{} {} {}\n",
            Self::status_mark(result.status()),
            result.tool_name.bold(),
            format!("({} ms)", result.duration_ms).dimmed()
        );
        match result.payload() {
            Some(payload) => {
                output.push_str(&Self::format_json(payload));
                output.push('\n');
            }
            None => {
                output.push_str(&format!("{} {}\n", "Status:".red().bold(), result.status()));
                if let Some(code) = result.exit_code {
                    output.push_str(&format!("{} {}\n", "Exit code:".red().bold(), code));
                }
                if let Some(summary) = result.error_summary() {
                    output.push_str(&format!("{} {}\n", "Error:".red().bold(), summary));
                }
            }
        }
        output
    }

    // ==================== Sessions ====================

    pub fn format_run(run: &RunWorkflowOutput) -> String {
        let mut output = Self::format_session(&run.session);
        if let Some(id) = &run.published_id {
            output.push_str(&format!("\n{} {}\n", "Published:".green().bold(), id));
        }
        if let Some(error) = &run.publish_error {
            output.push_str(&format!("\n{} {}\n", "Publication failed:".red().bold(), error));
        }
        output.push_str(&format!(
            "{}\n",
            format!("Elapsed: {:.1}s", run.elapsed.as_secs_f64()).dimmed()
        ));
        output
    }

    pub fn format_session(session: &Session) -> String {
        let mut output = String::new();
        output.push_str(&Self::header("Session"));
        output.push('\n');
        output.push_str(&format!("{} {}\n", "Id:".cyan().bold(), session.id()));
        output.push_str(&format!("{} {}\n", "Topic:".cyan().bold(), session.topic()));
        output.push_str(&format!(
            "{} {}\n",
            "Pattern:".cyan().bold(),
            session.pattern().kind()
        ));
        output.push_str(&format!(
            "{} {}\n",
            "Status:".cyan().bold(),
            Self::session_status(session.status())
        ));
        if let Some(reason) = session.abandon_reason() {
            output.push_str(&format!("{} {}\n", "Reason:".red().bold(), reason));
        }

        output.push_str(&Self::section_header("Steps"));
        for step in session.steps() {
            output.push_str(&format!(
                "  {} {} {}\n",
                Self::step_mark(step.status),
                step.id.bold(),
                format!("[{}]", step.role).dimmed()
            ));
            if let Some(outcome) = &step.outcome {
                for tool in &outcome.tools {
                    output.push_str(&format!(
                        "      {} {} {}\n",
                        Self::status_mark(tool.status),
                        tool.tool_name,
                        format!("({} ms, {} attempt(s))", tool.duration_ms, tool.attempts).dimmed()
                    ));
                    if let Some(error) = &tool.error {
                        output.push_str(&format!("        {}\n", error.red()));
                    }
                }
                if let Some(error) = &outcome.error {
                    output.push_str(&format!("      {}\n", error.red()));
                }
            }
        }

        if !session.findings().is_empty() {
            output.push_str(&Self::section_header("Findings"));
            for finding in session.findings() {
                let tally = finding.tally();
                output.push_str(&format!(
                    "\n{} {}\n",
                    format!("── {} ──", finding.step_id()).yellow().bold(),
                    format!(
                        "score {:.2} (+{} -{} ~{})",
                        finding.consensus_score(),
                        tally.agree,
                        tally.disagree,
                        tally.abstain
                    )
                    .dimmed()
                ));
                output.push_str(&Self::indent(&finding.content().claim, "  "));
                output.push('\n');
            }
        }

        if let Some(report) = session.consensus() {
            output.push_str(&Self::format_consensus(report));
        }

        output.push_str(&Self::footer());
        output
    }

    fn format_consensus(report: &ConsensusReport) -> String {
        let mut output = Self::section_header("Consensus");
        let outcome = report.outcome.to_string();
        let outcome = if report.outcome.is_reached() {
            outcome.green().bold()
        } else {
            outcome.red().bold()
        };
        output.push_str(&format!(
            "  {} (threshold {:.2})\n",
            outcome, report.threshold
        ));
        for entry in &report.findings {
            let mark = if entry.meets_threshold {
                "v".green()
            } else {
                "x".red()
            };
            output.push_str(&format!(
                "  {} {} {:.2}\n",
                mark, entry.step_id, entry.score
            ));
        }
        output
    }

    pub fn format_session_list(sessions: &[SessionSummary]) -> String {
        if sessions.is_empty() {
            return format!("{}\n", "No stored sessions.".dimmed());
        }
        let mut output = String::new();
        for s in sessions {
            output.push_str(&format!(
                "{}  {} {:>3} finding(s)  {}  {}\n",
                s.id.as_str().bold(),
                Self::session_status(s.status),
                s.findings,
                s.updated_at.format("%Y-%m-%d %H:%M"),
                s.topic
            ));
        }
        output
    }

    // ==================== Helpers ====================

    fn status_mark(status: ExecutionStatus) -> String {
        if status.is_ok() {
            "v".green().to_string()
        } else {
            "x".red().to_string()
        }
    }

    fn step_mark(status: StepStatus) -> String {
        match status {
            StepStatus::Done => "v".green().to_string(),
            StepStatus::Failed => "x".red().to_string(),
            StepStatus::Skipped => "-".dimmed().to_string(),
            _ => "?".yellow().to_string(),
        }
    }

    fn session_status(status: SessionStatus) -> String {
        match status {
            SessionStatus::Finalized => status.to_string().green().bold().to_string(),
            SessionStatus::Abandoned => status.to_string().red().bold().to_string(),
            _ => status.to_string().yellow().to_string(),
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

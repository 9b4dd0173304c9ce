//! Progress reporting for workflow sessions

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use sciquorum_application::ports::progress::WorkflowProgressNotifier;
use sciquorum_domain::{
    ConsensusReport, SessionId, SessionStatus, StepStatus, ToolRunSummary, Vote, WorkflowStep,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Reports progress with one overall bar plus a spinner per running step
pub struct ProgressReporter {
    multi: MultiProgress,
    overall: Mutex<Option<ProgressBar>>,
    steps: Mutex<HashMap<String, ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            overall: Mutex::new(None),
            steps: Mutex::new(HashMap::new()),
        }
    }

    fn overall_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("  {spinner:.green} {prefix:.bold} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn overall_bar(&self, total_steps: usize) -> Option<ProgressBar> {
        let Ok(mut overall) = self.overall.lock() else {
            return None;
        };
        let pb = overall.get_or_insert_with(|| {
            let pb = self.multi.add(ProgressBar::new(total_steps as u64));
            pb.set_style(Self::overall_style());
            pb.set_prefix("Workflow");
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        });
        Some(pb.clone())
    }

    fn advance_overall(&self, message: String) {
        if let Ok(overall) = self.overall.lock()
            && let Some(pb) = overall.as_ref()
        {
            pb.inc(1);
            pb.set_message(message);
        }
    }

    fn step_mark(status: StepStatus) -> colored::ColoredString {
        match status {
            StepStatus::Done => "v".green(),
            StepStatus::Skipped => "-".dimmed(),
            _ => "x".red(),
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowProgressNotifier for ProgressReporter {
    fn on_step_start(&self, step: &WorkflowStep, total_steps: usize) {
        let _ = self.overall_bar(total_steps);

        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(Self::spinner_style());
        pb.set_prefix(step.id.clone());
        pb.set_message(format!("{}", step.role).dimmed().to_string());
        pb.enable_steady_tick(Duration::from_millis(120));

        if let Ok(mut steps) = self.steps.lock() {
            steps.insert(step.id.clone(), pb);
        }
    }

    fn on_tool_result(&self, step_id: &str, summary: &ToolRunSummary) {
        if let Ok(steps) = self.steps.lock()
            && let Some(pb) = steps.get(step_id)
        {
            let mark = if summary.status.is_ok() {
                "v".green()
            } else {
                "x".red()
            };
            pb.set_message(format!("{} {}", mark, summary.tool_name));
        }
    }

    fn on_tool_retry(&self, step_id: &str, tool_name: &str, attempt: u32, max_attempts: u32) {
        if let Ok(steps) = self.steps.lock()
            && let Some(pb) = steps.get(step_id)
        {
            pb.set_message(format!(
                "{} retry {}/{}",
                tool_name,
                attempt,
                max_attempts
            ));
        }
    }

    fn on_step_complete(&self, step_id: &str, status: StepStatus) {
        if let Ok(mut steps) = self.steps.lock()
            && let Some(pb) = steps.remove(step_id)
        {
            pb.finish_with_message(format!("{} {}", Self::step_mark(status), status));
        }
        self.advance_overall(format!("{} {}", Self::step_mark(status), step_id));
    }

    fn on_step_skipped(&self, step_id: &str) {
        self.advance_overall(format!("{} {} skipped", "-".dimmed(), step_id));
    }

    fn on_consensus(&self, report: &ConsensusReport) {
        if let Ok(mut overall) = self.overall.lock()
            && let Some(pb) = overall.take()
        {
            let outcome = if report.outcome.is_reached() {
                report.outcome.to_string().green()
            } else {
                report.outcome.to_string().red()
            };
            pb.finish_with_message(format!("consensus {}", outcome));
        }
    }

    fn on_session_status(&self, _session_id: &SessionId, status: SessionStatus) {
        if status.is_terminal()
            && let Ok(mut overall) = self.overall.lock()
            && let Some(pb) = overall.take()
        {
            pb.finish_with_message(status.to_string());
        }
    }
}

/// Simple line-based progress (no fancy UI), for non-terminal output
pub struct SimpleProgress;

impl WorkflowProgressNotifier for SimpleProgress {
    fn on_step_start(&self, step: &WorkflowStep, total_steps: usize) {
        eprintln!(
            "{} {} [{}] ({} steps)",
            "->".cyan(),
            step.id.bold(),
            step.role,
            total_steps
        );
    }

    fn on_step_complete(&self, step_id: &str, status: StepStatus) {
        eprintln!("  {} {} {}", ProgressReporter::step_mark(status), step_id, status);
    }

    fn on_step_skipped(&self, step_id: &str) {
        eprintln!("  {} {} skipped", "-".dimmed(), step_id);
    }

    fn on_tool_retry(&self, step_id: &str, tool_name: &str, attempt: u32, max_attempts: u32) {
        eprintln!(
            "  {} {}: retrying {} ({}/{})",
            "!".yellow(),
            step_id,
            tool_name,
            attempt,
            max_attempts
        );
    }

    fn on_vote(&self, finding_id: &str, participant: &str, vote: Vote) {
        eprintln!("  {} {} on {}: {}", "*".cyan(), participant, finding_id, vote);
    }

    fn on_consensus(&self, report: &ConsensusReport) {
        eprintln!("{} consensus {}", "->".cyan(), report.outcome);
    }
}

//! Output formatting for CLI commands.

use std::fmt::Write;

use serde::Serialize;

use crate::agent::strategy::{StrategyId, StrategyResult};
use crate::agent::transcript::Step;
use crate::search::truncate_graphemes;

/// Width of the answer column in comparison tables.
const ANSWER_PREVIEW_CHARS: usize = 60;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name, defaulting to text for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes `value` as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if `value` cannot be represented.
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> serde_json::Result<String> {
        serde_json::to_string_pretty(value)
    }
}

/// Formats a single run for the terminal.
///
/// With `verbose`, the transcript steps are listed before the answer.
#[must_use]
pub fn format_result(result: &StrategyResult, verbose: bool) -> String {
    let mut output = String::new();

    if verbose {
        output.push_str("Transcript:\n");
        for (i, step) in result.transcript.steps().iter().enumerate() {
            let _ = writeln!(output, "  {:>2}. {}", i + 1, describe_step(step));
        }
        output.push('\n');
    }

    if result.answer.is_empty() {
        output.push_str("(no answer)");
    } else {
        output.push_str(&result.answer);
    }

    let _ = write!(
        output,
        "\n\n---\nStrategy: {} | Model: {} | Status: {} | Turns: {} | Prompts: {} | Time: {:.1}s",
        result.strategy,
        result.model,
        result.status.label(),
        result.transcript.turn_count(),
        result.prompt_version,
        ms_to_secs(result.elapsed_ms),
    );
    output
}

/// Formats a comparison table, one row per run.
#[must_use]
pub fn format_comparison(results: &[StrategyResult]) -> String {
    let model_width = results
        .iter()
        .map(|r| r.model.len())
        .max()
        .unwrap_or(5)
        .max(5);

    let mut output = format!(
        "{:<22} {:<model_width$} {:<26} {:>5} {:>7}  ANSWER\n",
        "STRATEGY", "MODEL", "STATUS", "TURNS", "TIME"
    );
    for r in results {
        let answer = truncate_graphemes(&r.answer.replace('\n', " "), ANSWER_PREVIEW_CHARS);
        let _ = writeln!(
            output,
            "{:<22} {:<model_width$} {:<26} {:>5} {:>6.1}s  {}",
            r.strategy.as_str(),
            r.model,
            r.status.label(),
            r.transcript.turn_count(),
            ms_to_secs(r.elapsed_ms),
            answer,
        );
    }
    output
}

/// Lists the available strategies.
#[must_use]
pub fn format_strategies() -> String {
    let mut output = String::new();
    for id in StrategyId::ALL {
        let _ = writeln!(output, "{:<22} {}", id.as_str(), id.description());
    }
    output
}

fn describe_step(step: &Step) -> String {
    match step {
        Step::Thought { text } => format!("Thought: {}", single_line(text)),
        Step::Action { tool, input } => format!("Action: {tool}({input})"),
        Step::Observation { content, is_error } => {
            let label = if *is_error { "Observation [error]" } else { "Observation" };
            format!("{label}: {}", single_line(content))
        }
        Step::FinalAnswer { text } => format!("Final Answer: {}", single_line(text)),
    }
}

fn single_line(text: &str) -> String {
    truncate_graphemes(&text.replace('\n', " "), 120)
}

#[allow(clippy::cast_precision_loss)]
fn ms_to_secs(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::strategy::{AbortReason, StrategyStatus};
    use crate::agent::transcript::Transcript;

    fn result(answer: &str, status: StrategyStatus) -> StrategyResult {
        let mut transcript = Transcript::new("sys", "q", Vec::new());
        transcript.append(Step::action("search", "q"));
        transcript.append(Step::observation("France won\nthe cup"));
        StrategyResult {
            answer: answer.to_string(),
            transcript,
            status,
            strategy: StrategyId::SearchAgent,
            model: "gpt-4o-mini".to_string(),
            prompt_version: "builtin-1".to_string(),
            elapsed_ms: 1500,
        }
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("yaml"), OutputFormat::Text);
    }

    #[test]
    fn test_format_result() {
        let text = format_result(&result("Paris", StrategyStatus::Completed), false);
        assert!(text.starts_with("Paris\n\n---\n"));
        assert!(text.contains("Status: completed"));
        assert!(text.contains("Turns: 1"));
        assert!(text.contains("Time: 1.5s"));
        assert!(!text.contains("Transcript:"));
    }

    #[test]
    fn test_format_result_verbose() {
        let text = format_result(
            &result("", StrategyStatus::Failed(AbortReason::ToolUnavailable)),
            true,
        );
        assert!(text.contains("1. Action: search(q)"));
        assert!(text.contains("2. Observation: France won the cup"));
        assert!(text.contains("(no answer)"));
        assert!(text.contains("failed (search tool unavailable)"));
    }

    #[test]
    fn test_format_comparison() {
        let rows = vec![
            result("Paris", StrategyStatus::Completed),
            result("x".repeat(100).as_str(), StrategyStatus::BudgetExhausted),
        ];
        let table = format_comparison(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("STRATEGY"));
        assert!(lines[1].contains("search_agent"));
        assert!(lines[2].ends_with("..."));
    }

    #[test]
    fn test_format_strategies_lists_all() {
        let text = format_strategies();
        for id in StrategyId::ALL {
            assert!(text.contains(id.as_str()));
        }
    }
}

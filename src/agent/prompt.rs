//! Versioned prompt templates for the reasoning strategies.
//!
//! Prompts are configuration data: the reasoning loop renders against a
//! [`PromptSet`] instead of carrying literal strings. A set is loaded from
//! template files when available, each falling back to the compiled-in
//! default, and carries a version label that ends up in every
//! [`StrategyResult`](crate::agent::strategy::StrategyResult).

use std::fmt::Write;
use std::path::{Path, PathBuf};

use crate::search::Snippet;

/// Version label of the compiled-in prompt set.
pub const DEFAULT_PROMPT_VERSION: &str = "builtin-1";

/// System prompt for the Reason-Act loop.
pub const REACT_SYSTEM_PROMPT: &str = r"You are an expert researcher who answers questions by searching the web.
You solve the task in a cycle of 'Thought:', 'Action:', 'Action Input:' and 'Observation:' steps, and finish with 'Final Answer:'.

Strictly use the following format:

Task: the question you must answer
Thought: summarize the previous observation in no more than 30 words, keep what is useful, then plan the next step
Action: search
Action Input: the query to put into the search engine; use clear and specific keywords
Observation: the search results (provided to you, never write this yourself)
... (this Thought/Action/Action Input/Observation cycle can repeat)
Thought: I now know the final answer
Final Answer: a detailed answer to the original question that summarizes what the observations showed

The only available action is `search`. Emit exactly one Action per reply and stop after 'Action Input:'.

Example:
Task: What is the capital of the country that won the 2018 World Cup?
Thought: I need to find out which country won the 2018 World Cup.
Action: search
Action Input: 2018 World Cup winner
Observation: [1] France won the 2018 FIFA World Cup. (source: https://example.org/wc2018)
Thought: France won. The capital of France is Paris.
Final Answer: Paris

Begin!";

/// Prompt that rewrites a raw query into a search-engine query.
pub const REWRITE_PROMPT: &str = r"Your task is to rephrase the complicated question into a better and concise question that still contains all the key information, suitable for direct input into a search engine to obtain high-quality results.
Follow the format below:
Query: the original question
Rephrased Question: the rephrased question

The rephrased question must be in the same language as the original question.
Examples:
Query: As a game enthusiast, a good monitor is essential. I want to change to a 34-inch monitor with a screen resolution of 3440x1440. Can you find a suitable Dell monitor for my requirements?
Rephrased Question: 34-inch 3440x1440 monitor Dell
Query: I have a spinal disease and want to buy a mattress for home use. Is a spring mattress or a latex mattress better?
Rephrased Question: Should people with spinal diseases use a spring mattress or a latex mattress?
Query: {query}
";

/// System prompt for the simple search strategy.
pub const ANSWER_SYSTEM_PROMPT: &str = "You are an expert assistant who answers questions using web search results. The conversation shows the search that was run and what it returned; the last message tells you how to answer.";

/// Prompt that answers a question from search context in one call.
pub const ANSWER_PROMPT: &str = r#"You are given a user question. Write a clean, concise and accurate answer to it.
Your answer must be correct and written by an expert in an unbiased and professional tone.
Do not give information unrelated to the question and do not repeat yourself. Say "information is missing on" followed by the topic if the context does not provide sufficient information.

Context for reference:
{context}

Answer the question based on the reference context and your own knowledge. If the context is useless, answer from your own knowledge without remarking on the search results.
Answer in the same language as the question and do not repeat the context verbatim.

Question: {question}
Answer:
"#;

/// Prompt appended when the turn budget runs out and a summary is requested.
pub const BUDGET_SUMMARY_PROMPT: &str = "You have run out of search steps. Based only on the observations above, reply with 'Final Answer:' followed by your best answer to the task. Do not request any further action.";

/// Marker given to the model when search produced nothing usable.
pub const NO_SEARCH_RESULTS: &str = "No search results available.";

/// Default prompt directory under user config.
const DEFAULT_PROMPT_DIR: &str = ".config/search-agent/prompts";

/// Filename for the version label.
const VERSION_FILENAME: &str = "VERSION";
/// Filename for the Reason-Act system prompt template.
const REACT_FILENAME: &str = "react_system.md";
/// Filename for the rewrite prompt template.
const REWRITE_FILENAME: &str = "rewrite.md";
/// Filename for the simple search system prompt.
const ANSWER_SYSTEM_FILENAME: &str = "answer_system.md";
/// Filename for the answer prompt template.
const ANSWER_FILENAME: &str = "answer.md";
/// Filename for the budget summary prompt template.
const BUDGET_SUMMARY_FILENAME: &str = "budget_summary.md";

/// A versioned set of prompt templates for all strategies.
///
/// Use [`PromptSet::load`] to resolve the prompt directory from CLI flags,
/// environment variables, or the default path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    /// Version label, recorded in every result.
    pub version: String,
    /// System prompt for the Reason-Act loop.
    pub react_system: String,
    /// Query rewrite template (`{query}`).
    pub rewrite: String,
    /// System prompt for the simple search strategy.
    pub answer_system: String,
    /// Single-shot answer template (`{question}`, `{context}`).
    pub answer: String,
    /// Instruction used for the budget summary call.
    pub budget_summary: String,
}

impl PromptSet {
    /// Loads prompts from the given directory, falling back to compiled-in defaults.
    ///
    /// Resolution order for `prompt_dir`:
    /// 1. Explicit `prompt_dir` argument (from `--prompt-dir` CLI flag)
    /// 2. `SEARCH_AGENT_PROMPT_DIR` environment variable
    /// 3. `~/.config/search-agent/prompts/`
    ///
    /// Each file is loaded independently: a missing file uses its default,
    /// and a file lacking a required placeholder is ignored with a warning.
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir
            .map(PathBuf::from)
            .or_else(|| std::env::var("SEARCH_AGENT_PROMPT_DIR").ok().map(PathBuf::from))
            .or_else(Self::default_dir);

        let Some(dir) = resolved_dir else {
            return Self::defaults();
        };

        let load_file = |filename: &str, default: &str, placeholders: &[&str]| -> String {
            let path = dir.join(filename);
            let Ok(content) = std::fs::read_to_string(&path) else {
                return default.to_string();
            };
            match validate_template(&content, placeholders) {
                Ok(()) => content,
                Err(missing) => {
                    tracing::warn!(
                        path = %path.display(),
                        missing = %missing,
                        "ignoring invalid prompt template"
                    );
                    default.to_string()
                }
            }
        };

        let version = std::fs::read_to_string(dir.join(VERSION_FILENAME))
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_PROMPT_VERSION.to_string());

        Self {
            version,
            react_system: load_file(REACT_FILENAME, REACT_SYSTEM_PROMPT, &[]),
            rewrite: load_file(REWRITE_FILENAME, REWRITE_PROMPT, &["{query}"]),
            answer_system: load_file(ANSWER_SYSTEM_FILENAME, ANSWER_SYSTEM_PROMPT, &[]),
            answer: load_file(ANSWER_FILENAME, ANSWER_PROMPT, &["{question}", "{context}"]),
            budget_summary: load_file(BUDGET_SUMMARY_FILENAME, BUDGET_SUMMARY_PROMPT, &[]),
        }
    }

    /// Returns compiled-in defaults without checking the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            version: DEFAULT_PROMPT_VERSION.to_string(),
            react_system: REACT_SYSTEM_PROMPT.to_string(),
            rewrite: REWRITE_PROMPT.to_string(),
            answer_system: ANSWER_SYSTEM_PROMPT.to_string(),
            answer: ANSWER_PROMPT.to_string(),
            budget_summary: BUDGET_SUMMARY_PROMPT.to_string(),
        }
    }

    /// Writes the compiled-in default prompts to the given directory.
    ///
    /// Creates the directory if it does not exist. Existing files are
    /// **not** overwritten; use this for initial scaffolding only.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let version_line = format!("{DEFAULT_PROMPT_VERSION}\n");
        let templates = [
            (VERSION_FILENAME, version_line.as_str()),
            (REACT_FILENAME, REACT_SYSTEM_PROMPT),
            (REWRITE_FILENAME, REWRITE_PROMPT),
            (ANSWER_SYSTEM_FILENAME, ANSWER_SYSTEM_PROMPT),
            (ANSWER_FILENAME, ANSWER_PROMPT),
            (BUDGET_SUMMARY_FILENAME, BUDGET_SUMMARY_PROMPT),
        ];

        let mut written = Vec::new();
        for (filename, content) in &templates {
            let path = dir.join(filename);
            if !path.exists() {
                std::fs::write(&path, content)?;
                written.push(path);
            }
        }

        Ok(written)
    }

    /// Returns the default prompt directory under the user's home.
    ///
    /// Returns `None` if the home directory cannot be determined.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }

    /// Renders the rewrite prompt for `query`.
    #[must_use]
    pub fn render_rewrite(&self, query: &str) -> String {
        fill_template(&self.rewrite, &[("{query}", query)])
    }

    /// Renders the answer prompt for `question` with prepared `context`.
    #[must_use]
    pub fn render_answer(&self, question: &str, context: &str) -> String {
        fill_template(
            &self.answer,
            &[("{question}", question), ("{context}", context)],
        )
    }
}

impl Default for PromptSet {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Substitutes placeholders in one pass over `template`.
///
/// Inserted values are never scanned again, so a search snippet that
/// happens to contain `{question}` stays literal.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    loop {
        let next = values
            .iter()
            .filter_map(|(key, value)| rest.find(key).map(|at| (at, *key, *value)))
            .min_by_key(|(at, _, _)| *at);
        let Some((at, key, value)) = next else {
            out.push_str(rest);
            return out;
        };
        out.push_str(&rest[..at]);
        out.push_str(value);
        rest = &rest[at + key.len()..];
    }
}

/// Checks that `template` contains every placeholder.
///
/// Returns the first missing placeholder on failure. An empty template is
/// reported as missing `"<content>"`.
fn validate_template(template: &str, placeholders: &[&str]) -> Result<(), String> {
    if template.trim().is_empty() {
        return Err("<content>".to_string());
    }
    placeholders
        .iter()
        .find(|p| !template.contains(*p))
        .map_or(Ok(()), |p| Err((*p).to_string()))
}

/// Formats snippets as a numbered reference list.
///
/// Returns [`NO_SEARCH_RESULTS`] when `snippets` is empty.
#[must_use]
pub fn format_snippets(snippets: &[Snippet]) -> String {
    if snippets.is_empty() {
        return NO_SEARCH_RESULTS.to_string();
    }
    let mut out = String::new();
    for (i, snippet) in snippets.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(out, "[{}] {} (source: {})", i + 1, snippet.text, snippet.source);
    }
    out
}

/// Builds the answer-prompt context: the search query used and its results.
#[must_use]
pub fn build_answer_context(search_query: &str, results: &str) -> String {
    format!("Search query: {search_query}\n{results}")
}

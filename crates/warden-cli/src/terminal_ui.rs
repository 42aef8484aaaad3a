//! Interactive approval prompts on the controlling terminal.

use console::{style, Term};
use dialoguer::{Input, Select};
use warden_core::approval::workflow::DENY;
use warden_core::approval::{ApprovalUi, PromptOptions, UiError};

/// Prompts on stderr so stdout stays free for results.
pub struct TerminalUi {
    term: Term,
}

impl TerminalUi {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    /// Whether prompts can actually reach a human.
    pub fn is_interactive(&self) -> bool {
        self.term.is_term()
    }
}

impl ApprovalUi for TerminalUi {
    fn choose(&mut self, prompt: &str, options: &[String]) -> Result<String, UiError> {
        let default = default_index(options);
        let picked = Select::new()
            .with_prompt(prompt)
            .items(options)
            .default(default)
            .interact_on_opt(&self.term)
            .map_err(|e| UiError::Failed(e.to_string()))?;

        match picked {
            Some(index) => options
                .get(index)
                .cloned()
                .ok_or_else(|| UiError::UnexpectedChoice(index.to_string())),
            None => Err(UiError::Cancelled),
        }
    }

    fn prompt_text(&mut self, message: &str, opts: &PromptOptions) -> Result<String, UiError> {
        let mut input = Input::<String>::new()
            .with_prompt(message)
            .allow_empty(opts.optional);
        if let Some(default) = &opts.default {
            input = input.default(default.clone());
        }
        input
            .interact_text_on(&self.term)
            .map_err(|e| UiError::Failed(e.to_string()))
    }

    fn notify(&mut self, message: &str) {
        let line = format!("{} {}", style("!").yellow().bold(), message);
        if self.term.write_line(&line).is_err() {
            log::warn!("{message}");
        }
    }
}

/// Pre-selected menu entry: "Deny" when offered, else the first option.
fn default_index(options: &[String]) -> usize {
    options.iter().position(|o| o == DENY).unwrap_or(0)
}

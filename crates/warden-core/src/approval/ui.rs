//! UI capability used by the approval workflow.
//!
//! The workflow never renders anything itself. Terminal front-ends,
//! editors and tests each provide an [`ApprovalUi`].

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UiError {
    #[error("Prompt was cancelled")]
    Cancelled,

    #[error("Unexpected choice '{0}'")]
    UnexpectedChoice(String),

    #[error("UI failure: {0}")]
    Failed(String),
}

/// Options for free-text prompts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptOptions {
    /// Whether an empty answer is acceptable.
    pub optional: bool,
    /// Value offered to the human as the pre-filled answer.
    pub default: Option<String>,
}

pub trait ApprovalUi {
    /// Single-select. Must return one of `options` verbatim.
    fn choose(&mut self, prompt: &str, options: &[String]) -> Result<String, UiError>;

    /// Free-text input.
    fn prompt_text(&mut self, message: &str, opts: &PromptOptions) -> Result<String, UiError>;

    /// Surface a non-fatal problem (e.g. a rejected regex) to the human.
    fn notify(&mut self, message: &str) {
        log::warn!("{message}");
    }
}

/// UI for unattended runs: denies anything that needs a human.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractiveUi;

impl ApprovalUi for NonInteractiveUi {
    fn choose(&mut self, _prompt: &str, options: &[String]) -> Result<String, UiError> {
        options
            .iter()
            .find(|o| o.as_str() == super::workflow::DENY)
            .cloned()
            .ok_or(UiError::Cancelled)
    }

    fn prompt_text(&mut self, _message: &str, _opts: &PromptOptions) -> Result<String, UiError> {
        Err(UiError::Cancelled)
    }
}

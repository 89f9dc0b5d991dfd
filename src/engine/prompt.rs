//! Prompt construction for each request mode.

use super::Mode;

/// Shared system preamble for every mode.
const SYSTEM_PREAMBLE: &str = "You are huginn, a concise command-line assistant. \
Answer in plain text suitable for a terminal. Do not use Markdown headings. \
Keep answers short and precise.";

/// A prompt ready to send to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// System instructions, if the backend supports them.
    pub system: Option<String>,
    /// The user turn.
    pub user: String,
}

impl Prompt {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            system: None,
            user: user.into(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Build the prompt for `mode` over `text`.
pub fn build_prompt(mode: Mode, text: &str) -> Prompt {
    let instruction = match mode {
        Mode::Explain => {
            "Explain what the following shell command does. Break it into its parts \
             and describe each flag and argument. Mention anything destructive."
        }
        Mode::Suggest => {
            "Suggest shell commands that accomplish the following task. Give the \
             command first, then one line describing it. Prefer common POSIX tools."
        }
        Mode::Examples => {
            "Give practical usage examples for the following command. Show each \
             example as a command line followed by a one-line description."
        }
        Mode::Summarize => {
            "Summarize the following documentation. Keep the most useful options \
             and usage patterns and leave out boilerplate."
        }
    };

    Prompt::new(format!("{instruction}\n\n{}", text.trim())).with_system(SYSTEM_PREAMBLE)
}

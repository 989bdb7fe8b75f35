//! Prompt matching strategies.

use memchr::memmem;
use serde::{Deserialize, Serialize};

use super::buffer::OutputBuffer;

/// How the primed prompt is recognized in command output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptMatch {
    /// The prompt must be the last thing in the output, ignoring trailing
    /// spaces and tabs. Prompt text that appears inside command output
    /// followed by more output does not match.
    #[default]
    LineEnd,

    /// The prompt may appear anywhere in the output. Compatible with
    /// simple scrapers but ends early if the output echoes the prompt.
    Contains,
}

impl PromptMatch {
    /// Check whether `buffer` shows the prompt after its latest chunk.
    pub fn is_match(self, buffer: &OutputBuffer, prompt: &str) -> bool {
        if prompt.is_empty() {
            return false;
        }
        match self {
            PromptMatch::LineEnd => ends_with_prompt(buffer.as_str(), prompt),
            PromptMatch::Contains => {
                let region = buffer.search_region(prompt.len().saturating_sub(1));
                memmem::find(region.as_bytes(), prompt.as_bytes()).is_some()
            }
        }
    }
}

/// Whether `text` ends with `prompt`, ignoring trailing spaces and tabs.
pub fn ends_with_prompt(text: &str, prompt: &str) -> bool {
    text.trim_end_matches([' ', '\t']).ends_with(prompt)
}

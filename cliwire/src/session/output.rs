//! Captured command output.

use std::time::Duration;

use crate::channel::strip_control_sequences;

/// Output of one command.
///
/// `raw` is the verbatim capture: the echoed command line, the command's
/// output and the trailing prompt, exactly as decoded from the device.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// The command that was executed.
    pub command: String,

    /// Everything read until the prompt reappeared.
    pub raw: String,

    /// The prompt that ended the capture.
    pub prompt: String,

    /// Time taken to execute the command.
    pub elapsed: Duration,
}

impl CommandOutput {
    /// Create a new command output.
    pub fn new(
        command: impl Into<String>,
        raw: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            raw: raw.into(),
            prompt: prompt.into(),
            elapsed,
        }
    }

    /// Output without the command echo, trailing prompt or terminal
    /// control sequences, with `\r\n` turned into `\n`.
    pub fn normalized(&self) -> String {
        let plain = strip_control_sequences(&self.raw).replace("\r\n", "\n");
        let body = plain.trim_start_matches(['\r', '\n']);

        // Strip the echoed command line
        let body = match body.split_once('\n') {
            Some((first, rest)) if first.trim_end().ends_with(self.command.trim()) => rest,
            None if body.trim_end().ends_with(self.command.trim()) => "",
            _ => body,
        };

        // Strip the trailing prompt
        let body = body.trim_end_matches([' ', '\t']);
        let body = body.strip_suffix(self.prompt.as_str()).unwrap_or(body);

        body.trim_end_matches(['\r', '\n']).to_string()
    }

    /// Get the normalized output lines.
    pub fn lines(&self) -> Vec<String> {
        self.normalized().lines().map(str::to_string).collect()
    }

    /// Check if the raw output contains a substring.
    pub fn contains(&self, pattern: &str) -> bool {
        self.raw.contains(pattern)
    }
}

impl std::fmt::Display for CommandOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

//! Device profile definition.

use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::channel::Backoff;
use crate::error::ProfileError;

/// Everything the privilege escalator needs to know about a device family.
///
/// Marker patterns are matched against the last non-empty line of output,
/// so they should be anchored at the end (`>\s*$`).
///
/// Profiles can be loaded from any serde format; patterns are written as
/// regex strings:
///
/// ```rust
/// let profile: cliwire::DeviceProfile = serde_json::from_str(r##"{
///     "name": "lab_switch",
///     "unprivileged_prompt": ">\\s*$",
///     "privileged_prompt": "#\\s*$",
///     "secret_prompt": "(?i)password:\\s*$",
///     "escalate_command": "enable",
///     "disable_paging": "terminal length 0"
/// }"##).unwrap();
/// assert_eq!(profile.escalation_attempts, 10);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Profile name (e.g., "cisco_ios", "arista_eos").
    pub name: String,

    /// Prompt of the unprivileged mode.
    #[serde(with = "pattern")]
    pub unprivileged_prompt: Regex,

    /// Prompt of the privileged mode.
    #[serde(with = "pattern")]
    pub privileged_prompt: Regex,

    /// Device asking for the escalation secret.
    #[serde(with = "pattern")]
    pub secret_prompt: Regex,

    /// Command that starts escalation.
    pub escalate_command: String,

    /// Command that disables output paging, sent once the shell is ready.
    #[serde(default)]
    pub disable_paging: Option<String>,

    /// How many reads to wait for the secret prompt.
    #[serde(default = "default_attempts")]
    pub escalation_attempts: u32,

    /// Waits between those reads.
    #[serde(default = "default_poll")]
    pub escalation_poll: Backoff,
}

fn default_attempts() -> u32 {
    10
}

fn default_poll() -> Backoff {
    Backoff::new(Duration::from_millis(250), Duration::from_secs(1))
}

impl DeviceProfile {
    /// Create a profile from marker patterns.
    pub fn new(
        name: impl Into<String>,
        unprivileged_prompt: &str,
        privileged_prompt: &str,
        secret_prompt: &str,
    ) -> Result<Self, ProfileError> {
        Ok(Self {
            name: name.into(),
            unprivileged_prompt: Regex::new(unprivileged_prompt)?,
            privileged_prompt: Regex::new(privileged_prompt)?,
            secret_prompt: Regex::new(secret_prompt)?,
            escalate_command: "enable".to_string(),
            disable_paging: None,
            escalation_attempts: default_attempts(),
            escalation_poll: default_poll(),
        })
    }

    /// Set the escalation command.
    pub fn with_escalate(mut self, command: impl Into<String>) -> Self {
        self.escalate_command = command.into();
        self
    }

    /// Set the paging-disable command.
    pub fn with_disable_paging(mut self, command: impl Into<String>) -> Self {
        self.disable_paging = Some(command.into());
        self
    }

    /// Set the secret prompt polling budget.
    pub fn with_escalation_budget(mut self, attempts: u32, poll: Backoff) -> Self {
        self.escalation_attempts = attempts;
        self.escalation_poll = poll;
        self
    }

    /// Look up a built-in profile by name.
    pub fn builtin(name: &str) -> Result<Self, ProfileError> {
        super::vendors::by_name(name)
    }

    /// Whether the last line of `text` is a privileged prompt.
    pub fn is_privileged(&self, text: &str) -> bool {
        self.privileged_prompt.is_match(last_line(text))
    }

    /// Whether the last line of `text` is an unprivileged prompt.
    pub fn is_unprivileged(&self, text: &str) -> bool {
        self.unprivileged_prompt.is_match(last_line(text))
    }

    /// Whether the last line of `text` asks for the escalation secret.
    pub fn is_secret_prompt(&self, text: &str) -> bool {
        self.secret_prompt.is_match(last_line(text))
    }
}

/// Last line of `text` that has visible content.
pub fn last_line(text: &str) -> &str {
    text.lines()
        .map(|line| line.trim_matches(|c: char| c.is_whitespace() || c.is_control()))
        .rfind(|line| !line.is_empty())
        .unwrap_or("")
}

/// Serde support for regex fields.
mod pattern {
    use regex::Regex;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(regex: &Regex, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(regex.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Regex, D::Error> {
        let source = String::deserialize(deserializer)?;
        Regex::new(&source).map_err(D::Error::custom)
    }
}

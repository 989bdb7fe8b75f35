//! Privilege escalation dialogue.
//!
//! ```text
//!            banner ends in privileged marker
//! Initial ─────────────────────────────────────────────────► Privileged
//!    │ banner ends in unprivileged marker                        ▲
//!    ▼                                                           │
//! Unprivileged ── secret prompt seen ──► AwaitingSecret ── secret accepted
//!    │                                        │
//!    │ polling budget exhausted               │ still unprivileged
//!    ▼                                        ▼
//!  Failed ◄───────────────────────────────────┘
//! ```
//!
//! After the dialogue the prompt has changed (`>` to `#`), so the caller
//! must re-prime the [`PromptSynchronizer`](super::PromptSynchronizer).

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::logging::SessionLog;
use super::prompt::SyncOptions;
use crate::channel::{ShellChannel, Utf8Decoder};
use crate::error::EscalationError;
use crate::profile::{DeviceProfile, last_line};
use crate::transport::ShellStream;

/// Whether `connect` escalates automatically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationPolicy {
    /// Escalate when the device starts unprivileged.
    #[default]
    Auto,

    /// Stay at whatever level the device starts in.
    Never,
}

/// Escalator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationState {
    Initial,
    Unprivileged,
    AwaitingSecret,
    Privileged,
    Failed,
}

/// Result of an escalation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationOutcome {
    /// The device was already privileged, or escalation was not requested.
    NotRequired,

    /// The device moved to the privileged mode.
    Succeeded,

    /// Escalation failed.
    Failed(String),
}

impl From<&EscalationError> for EscalationOutcome {
    fn from(err: &EscalationError) -> Self {
        EscalationOutcome::Failed(err.to_string())
    }
}

impl fmt::Display for EscalationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EscalationOutcome::NotRequired => write!(f, "not required"),
            EscalationOutcome::Succeeded => write!(f, "succeeded"),
            EscalationOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Drives the unprivileged → privileged sub-dialogue.
pub struct PrivilegeEscalator<'a> {
    profile: &'a DeviceProfile,
    options: &'a SyncOptions,
    log: &'a SessionLog,
    state: EscalationState,
}

impl<'a> PrivilegeEscalator<'a> {
    /// Create an escalator in the `Initial` state.
    pub fn new(profile: &'a DeviceProfile, options: &'a SyncOptions, log: &'a SessionLog) -> Self {
        Self {
            profile,
            options,
            log,
            state: EscalationState::Initial,
        }
    }

    /// Current state.
    pub fn state(&self) -> EscalationState {
        self.state
    }

    /// Run the dialogue on a freshly opened shell, starting from its banner.
    pub async fn run<S: ShellStream>(
        &mut self,
        channel: &mut ShellChannel<S>,
        secret: &SecretString,
        policy: EscalationPolicy,
    ) -> Result<EscalationOutcome, EscalationError> {
        let banner = self.read(channel).await?;
        self.escalate_from(channel, banner, secret, policy).await
    }

    /// Run the dialogue on a shell that is already at a prompt.
    ///
    /// Sends an empty line to learn the current level first.
    pub async fn run_at_prompt<S: ShellStream>(
        &mut self,
        channel: &mut ShellChannel<S>,
        secret: &SecretString,
    ) -> Result<EscalationOutcome, EscalationError> {
        channel.send(b"\n").await?;
        let current = self.read(channel).await?;
        self.escalate_from(channel, current, secret, EscalationPolicy::Auto)
            .await
    }

    async fn escalate_from<S: ShellStream>(
        &mut self,
        channel: &mut ShellChannel<S>,
        mut banner: String,
        secret: &SecretString,
        policy: EscalationPolicy,
    ) -> Result<EscalationOutcome, EscalationError> {
        let mut finished = false;
        if !self.profile.is_privileged(&banner) && !self.profile.is_unprivileged(&banner) {
            // Some devices only print the prompt after the first keypress.
            banner = self.finish(channel).await?;
            finished = true;
        }

        if self.profile.is_privileged(&banner) {
            self.log.debug(format_args!("already privileged"));
            self.state = EscalationState::Privileged;
            if !finished {
                self.finish(channel).await?;
            }
            return Ok(EscalationOutcome::NotRequired);
        }

        if !self.profile.is_unprivileged(&banner) {
            self.log.warn(format_args!(
                "unrecognized prompt {:?}, skipping escalation",
                last_line(&banner)
            ));
            return Ok(EscalationOutcome::NotRequired);
        }

        self.state = EscalationState::Unprivileged;
        if policy == EscalationPolicy::Never {
            if !finished {
                self.finish(channel).await?;
            }
            return Ok(EscalationOutcome::NotRequired);
        }

        self.log.debug(format_args!(
            "escalating with {:?}",
            self.profile.escalate_command
        ));
        channel.send_line(&self.profile.escalate_command).await?;

        match self.await_secret_prompt(channel).await {
            Ok(SecretPrompt::Requested) => {}
            Ok(SecretPrompt::NotNeeded) => {
                self.log.debug(format_args!("escalated without a secret"));
                self.state = EscalationState::Privileged;
                self.finish(channel).await?;
                return Ok(EscalationOutcome::Succeeded);
            }
            Err(e) => {
                self.state = EscalationState::Failed;
                return Err(e);
            }
        }

        self.state = EscalationState::AwaitingSecret;
        self.log.debug(format_args!("sending escalation secret"));
        channel.send(secret.expose_secret().as_bytes()).await?;

        let after = self.finish(channel).await?;
        if self.profile.is_unprivileged(&after) || self.profile.is_secret_prompt(&after) {
            self.state = EscalationState::Failed;
            return Err(EscalationError::Rejected {
                prompt: last_line(&after).to_string(),
            });
        }

        self.state = EscalationState::Privileged;
        self.log.info(format_args!("privileged mode acquired"));
        Ok(EscalationOutcome::Succeeded)
    }

    /// Poll for the secret request within the profile's budget.
    async fn await_secret_prompt<S: ShellStream>(
        &self,
        channel: &mut ShellChannel<S>,
    ) -> Result<SecretPrompt, EscalationError> {
        let attempts = self.profile.escalation_attempts;
        let mut backoff = self.profile.escalation_poll.start();
        let mut decoder = Utf8Decoder::new();
        let mut text = String::new();

        for _ in 0..attempts {
            let chunk = channel
                .receive(self.options.read_size, backoff.current())
                .await?;
            if chunk.is_empty() {
                backoff.grow();
                continue;
            }
            backoff.reset();
            text.push_str(&decoder.decode(&chunk));

            if self.profile.is_secret_prompt(&text) {
                return Ok(SecretPrompt::Requested);
            }
            if self.profile.is_privileged(&text) {
                return Ok(SecretPrompt::NotNeeded);
            }
        }

        Err(EscalationError::Timeout { attempts })
    }

    /// Send the trailing newline and paging command, then let output settle.
    ///
    /// Returns whatever the device printed meanwhile.
    async fn finish<S: ShellStream>(
        &self,
        channel: &mut ShellChannel<S>,
    ) -> Result<String, EscalationError> {
        channel.send(b"\n").await?;
        if let Some(paging) = &self.profile.disable_paging {
            channel.send_line(paging).await?;
        }
        self.read(channel).await
    }

    async fn read<S: ShellStream>(
        &self,
        channel: &mut ShellChannel<S>,
    ) -> Result<String, EscalationError> {
        let data = channel
            .read_until_quiet(
                self.options.banner_timeout,
                self.options.settle,
                self.options.banner_timeout,
            )
            .await?;
        let mut decoder = Utf8Decoder::new();
        let mut text = decoder.decode(&data);
        text.push_str(&decoder.finish());
        Ok(text)
    }
}

enum SecretPrompt {
    Requested,
    NotNeeded,
}

//! Prompt synchronization.
//!
//! The shell gives no framing: the only sign that a command has finished
//! is the prompt showing up again. The synchronizer samples the prompt
//! once per privilege level ("priming") by sending an empty line, then
//! reads each command's output until that exact prompt comes back.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::logging::SessionLog;
use crate::channel::{Backoff, OutputBuffer, PromptMatch, ShellChannel, Utf8Decoder};
use crate::error::{ChannelError, SessionError};
use crate::profile::last_line;
use crate::transport::ShellStream;

/// Prompt synchronizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// Quiet period that ends a priming or drain read.
    pub settle: Duration,

    /// Upper bound for one priming sample.
    pub prime_timeout: Duration,

    /// How long to wait for the login banner and escalation replies.
    pub banner_timeout: Duration,

    /// Shortest prompt accepted by priming.
    pub min_prompt_len: usize,

    /// Default deadline for a command.
    pub command_timeout: Duration,

    /// Silence required after a prompt match before the command is
    /// considered complete. Zero accepts the first match.
    pub confirm_quiet: Duration,

    /// Maximum bytes taken per read.
    pub read_size: usize,

    /// Per-read wait while a command runs.
    pub poll: Backoff,

    /// How the prompt is recognized.
    pub match_mode: PromptMatch,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(200),
            prime_timeout: Duration::from_secs(1),
            banner_timeout: Duration::from_secs(5),
            min_prompt_len: 2,
            command_timeout: Duration::from_secs(30),
            confirm_quiet: Duration::from_millis(20),
            read_size: 1000,
            poll: Backoff::default(),
            match_mode: PromptMatch::default(),
        }
    }
}

/// Detects the prompt and waits for it to reappear.
#[derive(Debug)]
pub struct PromptSynchronizer {
    options: SyncOptions,

    /// Prompt sampled by the last successful priming.
    prompt: Option<String>,
}

impl PromptSynchronizer {
    /// Create an unprimed synchronizer.
    pub fn new(options: SyncOptions) -> Self {
        Self {
            options,
            prompt: None,
        }
    }

    /// The primed prompt, if any.
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    /// Synchronizer settings.
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Forget the primed prompt.
    pub fn reset(&mut self) {
        self.prompt = None;
    }

    /// Sample the current prompt.
    ///
    /// A weak sample (see [`is_weak_prompt`]) is retried once. If the
    /// retry is weak too, the previous prompt is kept and
    /// [`SessionError::WeakPromptDetected`] is returned.
    pub async fn prime<S: ShellStream>(
        &mut self,
        channel: &mut ShellChannel<S>,
        log: &SessionLog,
    ) -> Result<&str, SessionError> {
        let mut sample = self.sample(channel).await?;
        if is_weak_prompt(&sample, self.options.min_prompt_len) {
            log.debug(format_args!("weak prompt sample {:?}, retrying", sample));
            sample = self.sample(channel).await?;
            if is_weak_prompt(&sample, self.options.min_prompt_len) {
                return Err(SessionError::WeakPromptDetected { prompt: sample });
            }
        }

        log.debug(format_args!("primed prompt {:?}", sample));
        Ok(self.prompt.insert(sample).as_str())
    }

    /// Send a bare newline and extract the prompt from the reply.
    async fn sample<S: ShellStream>(
        &self,
        channel: &mut ShellChannel<S>,
    ) -> Result<String, SessionError> {
        channel.send(b"\n").await?;
        let data = channel
            .read_until_quiet(
                self.options.prime_timeout,
                self.options.settle,
                self.options.prime_timeout,
            )
            .await?;

        let mut decoder = Utf8Decoder::new();
        let mut text = decoder.decode(&data);
        text.push_str(&decoder.finish());
        Ok(extract_prompt(&text))
    }

    /// Send `command` and capture everything up to and including the
    /// reappearing prompt.
    ///
    /// On timeout the captured text is returned inside
    /// [`SessionError::PromptTimeout`].
    pub async fn run_command<S: ShellStream>(
        &self,
        channel: &mut ShellChannel<S>,
        command: &str,
        timeout: Duration,
    ) -> Result<String, SessionError> {
        let prompt = self.prompt.as_deref().ok_or(SessionError::NotPrimed)?;

        channel.send_line(command).await?;

        let deadline = Instant::now() + timeout;
        let mut buffer = OutputBuffer::new();
        let mut backoff = self.options.poll.start();

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(SessionError::PromptTimeout {
                    timeout,
                    partial: buffer.take(),
                });
            }

            let chunk = match channel
                .receive(self.options.read_size, backoff.current().min(deadline - now))
                .await
            {
                Ok(chunk) => chunk,
                Err(ChannelError::Closed) => {
                    return Err(SessionError::ChannelClosed {
                        partial: buffer.take(),
                    });
                }
                Err(e) => return Err(e.into()),
            };

            if chunk.is_empty() {
                backoff.grow();
                continue;
            }
            backoff.reset();
            buffer.extend(&chunk);

            while self.options.match_mode.is_match(&buffer, prompt) {
                if self.confirm(channel, &mut buffer, deadline).await? {
                    return Ok(buffer.take());
                }
            }
        }
    }

    /// Check that nothing follows a prompt match.
    ///
    /// Returns `false` (with the new data appended) if more output arrives
    /// within `confirm_quiet`.
    async fn confirm<S: ShellStream>(
        &self,
        channel: &mut ShellChannel<S>,
        buffer: &mut OutputBuffer,
        deadline: Instant,
    ) -> Result<bool, SessionError> {
        let quiet = self.options.confirm_quiet;
        if quiet.is_zero() {
            return Ok(true);
        }

        let wait = quiet.min(deadline.saturating_duration_since(Instant::now()));
        match channel.receive(self.options.read_size, wait).await {
            Ok(chunk) if chunk.is_empty() => Ok(true),
            Ok(chunk) => {
                buffer.extend(&chunk);
                Ok(false)
            }
            // The prompt is already in the buffer; report the close next time.
            Err(ChannelError::Closed) => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    /// Discard pending output until the channel goes quiet.
    ///
    /// Used to resynchronize after a cancelled or timed-out command.
    pub async fn drain<S: ShellStream>(
        &self,
        channel: &mut ShellChannel<S>,
    ) -> Result<usize, ChannelError> {
        let stale = channel
            .read_until_quiet(
                self.options.settle,
                self.options.settle,
                self.options.command_timeout,
            )
            .await?;
        Ok(stale.len())
    }
}

/// Extract a prompt from the reply to an empty line.
///
/// Leading and trailing whitespace and control characters are removed and
/// the last non-empty line is kept.
pub fn extract_prompt(text: &str) -> String {
    last_line(text).to_string()
}

/// Whether a prompt is too short to synchronize on reliably.
///
/// A prompt shorter than `min_len` characters, or one without any
/// alphanumeric character (a bare `#` or `$`), would match ordinary output.
pub fn is_weak_prompt(prompt: &str, min_len: usize) -> bool {
    prompt.chars().count() < min_len.max(1) || !prompt.chars().any(char::is_alphanumeric)
}

/// Derive a device hostname from a prompt (`router1#` → `router1`).
pub fn hostname_from_prompt(prompt: &str) -> String {
    prompt
        .chars()
        .filter(|c| !matches!(c, '\r' | '\n' | '#' | '>' | ' '))
        .collect()
}

//! The session client façade.

use std::future::Future;
use std::time::Duration;

use secrecy::SecretString;
use tokio::time::Instant;

use super::escalation::{EscalationOutcome, EscalationPolicy, PrivilegeEscalator};
use super::logging::SessionLog;
use super::output::CommandOutput;
use super::prompt::{PromptSynchronizer, SyncOptions, hostname_from_prompt};
use crate::channel::ShellChannel;
use crate::error::{ConnectError, ConnectFailure, EscalationError, SessionError, TransportError};
use crate::profile::DeviceProfile;
use crate::transport::{Connector, HostKeyPolicy, SshConfig, SshConnector, Transport};

type ShellOf<C> = <<C as Connector>::Transport as Transport>::Shell;

/// Everything a session needs to connect and synchronize.
#[derive(Debug)]
pub struct SessionConfig {
    /// Transport settings, including the login secret.
    pub ssh: SshConfig,

    /// Secret for privilege escalation. Falls back to the login secret.
    pub enable_secret: Option<SecretString>,

    /// Prompt markers and escalation commands for the device family.
    pub profile: DeviceProfile,

    /// Whether to escalate while connecting.
    pub escalation: EscalationPolicy,

    /// Prompt synchronization timings.
    pub sync: SyncOptions,
}

/// Lifecycle of a [`SessionClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Never connected, or disconnected by the caller.
    Disconnected,
    /// Authenticated, escalated as configured and primed.
    Connected,
    /// The last connect attempt failed. All resources were released.
    Failed,
}

/// Interactive CLI session with one network device.
///
/// Owns the transport and the shell channel. Commands run strictly one at
/// a time; every method that touches the shell takes `&mut self`.
///
/// # Example
///
/// ```rust,no_run
/// use cliwire::SessionBuilder;
///
/// # async fn example() -> Result<(), cliwire::Error> {
/// let mut session = SessionBuilder::new("192.168.1.1")
///     .username("admin")
///     .password("secret")
///     .profile("cisco_ios")
///     .build()?;
///
/// session.connect().await?;
/// let output = session.execute("show running-config").await?;
/// println!("{}", output.normalized());
/// session.disconnect().await;
/// # Ok(())
/// # }
/// ```
pub struct SessionClient<C: Connector = SshConnector> {
    config: SessionConfig,
    connector: C,
    log: SessionLog,

    /// SSH transport (None when disconnected).
    transport: Option<C::Transport>,
    channel: Option<ShellChannel<ShellOf<C>>>,

    sync: PromptSynchronizer,
    state: SessionState,
    escalation: Option<EscalationOutcome>,

    /// Set while a command is in flight. Still set on the next call means
    /// the previous command was cancelled or timed out and its output may
    /// still arrive.
    dirty: bool,
}

impl<C: Connector> SessionClient<C> {
    /// Create a disconnected session.
    pub fn new(config: SessionConfig, connector: C, log: SessionLog) -> Self {
        let sync = PromptSynchronizer::new(config.sync.clone());
        Self {
            config,
            connector,
            log,
            transport: None,
            channel: None,
            sync,
            state: SessionState::Disconnected,
            escalation: None,
            dirty: false,
        }
    }

    /// Connect, authenticate, escalate and prime the prompt.
    ///
    /// On failure every resource opened so far is released and the session
    /// ends up in [`SessionState::Failed`].
    pub async fn connect(&mut self) -> Result<(), ConnectError> {
        let host = self.config.ssh.host.clone();
        if self.transport.is_some() {
            return Err(ConnectError::new(host, ConnectFailure::AlreadyConnected));
        }

        self.log.info(format_args!(
            "connecting to {} as {} (profile {})",
            self.config.ssh.socket_addr(),
            self.config.ssh.username,
            self.config.profile.name
        ));
        let start = Instant::now();
        self.escalation = None;

        match self.establish().await {
            Ok(()) => {
                self.state = SessionState::Connected;
                self.log.info(format_args!(
                    "connected in {:?}, prompt {:?}",
                    start.elapsed(),
                    self.sync.prompt().unwrap_or_default()
                ));
                Ok(())
            }
            Err(kind) => {
                self.log.warn(format_args!("connect failed: {}", kind));
                self.release().await;
                self.state = SessionState::Failed;
                Err(ConnectError::new(host, kind))
            }
        }
    }

    async fn establish(&mut self) -> Result<(), ConnectFailure> {
        let timeout = self.config.ssh.timeout;

        if matches!(self.config.ssh.host_key_policy, HostKeyPolicy::AcceptAny) {
            self.log.warn(format_args!(
                "host key verification disabled (AcceptAny policy)"
            ));
        }
        let transport = bounded(timeout, self.connector.open(&self.config.ssh))
            .await
            .map_err(TransportError::classify)?;
        let transport = self.transport.insert(transport);
        self.log.debug(format_args!("transport established"));

        bounded(
            timeout,
            transport.authenticate(&self.config.ssh.username, &self.config.ssh.secret),
        )
        .await
        .map_err(TransportError::classify)?;
        self.log.debug(format_args!("authenticated"));

        let shell = bounded(timeout, transport.open_shell())
            .await
            .map_err(TransportError::classify)?;
        let channel = self.channel.insert(ShellChannel::new(shell));

        let secret = self
            .config
            .enable_secret
            .as_ref()
            .unwrap_or(&self.config.ssh.secret);
        let mut escalator =
            PrivilegeEscalator::new(&self.config.profile, self.sync.options(), &self.log);
        match escalator.run(channel, secret, self.config.escalation).await {
            Ok(outcome) => {
                self.log.debug(format_args!("escalation {}", outcome));
                self.escalation = Some(outcome);
            }
            Err(e) => {
                self.escalation = Some(EscalationOutcome::from(&e));
                return Err(ConnectFailure::Escalation(e));
            }
        }

        self.sync
            .prime(channel, &self.log)
            .await
            .map_err(|e| match e {
                SessionError::WeakPromptDetected { prompt } => ConnectFailure::WeakPrompt { prompt },
                other => ConnectFailure::Protocol {
                    source: Box::new(other),
                },
            })?;
        Ok(())
    }

    /// Execute a command with the configured command timeout.
    pub async fn execute(&mut self, command: &str) -> Result<CommandOutput, SessionError> {
        let timeout = self.sync.options().command_timeout;
        self.execute_with_timeout(command, timeout).await
    }

    /// Execute a command and capture its output up to the next prompt.
    ///
    /// A previous command that was cancelled or timed out leaves output
    /// behind; it is drained before `command` is sent.
    pub async fn execute_with_timeout(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput, SessionError> {
        if self.state != SessionState::Connected {
            return Err(SessionError::NotConnected);
        }
        let channel = self.channel.as_mut().ok_or(SessionError::NotConnected)?;

        if self.dirty {
            let stale = self.sync.drain(channel).await?;
            self.log
                .debug(format_args!("drained {} stale bytes before {:?}", stale, command));
        }

        self.log.debug(format_args!("execute {:?}", command));
        self.dirty = true;
        let start = Instant::now();

        match self.sync.run_command(channel, command, timeout).await {
            Ok(raw) => {
                self.dirty = false;
                let elapsed = start.elapsed();
                self.log.trace(format_args!(
                    "{:?} returned {} bytes in {:?}",
                    command,
                    raw.len(),
                    elapsed
                ));
                let prompt = self.sync.prompt().unwrap_or_default();
                Ok(CommandOutput::new(command, raw, prompt, elapsed))
            }
            Err(e) => {
                self.log.warn(format_args!("{:?} failed: {}", command, e));
                Err(e)
            }
        }
    }

    /// Execute several commands in order, stopping at the first failure.
    pub async fn execute_all(
        &mut self,
        commands: &[&str],
    ) -> Result<Vec<CommandOutput>, SessionError> {
        let mut outputs = Vec::with_capacity(commands.len());
        for command in commands {
            outputs.push(self.execute(command).await?);
        }
        Ok(outputs)
    }

    /// Escalate an established session that connected without escalating.
    ///
    /// The prompt changes on success, so it is primed again afterwards.
    pub async fn escalate(&mut self) -> Result<EscalationOutcome, SessionError> {
        if self.state != SessionState::Connected {
            return Err(SessionError::NotConnected);
        }
        let channel = self.channel.as_mut().ok_or(SessionError::NotConnected)?;

        let secret = self
            .config
            .enable_secret
            .as_ref()
            .unwrap_or(&self.config.ssh.secret);
        let mut escalator =
            PrivilegeEscalator::new(&self.config.profile, self.sync.options(), &self.log);
        let outcome = match escalator.run_at_prompt(channel, secret).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.escalation = Some(EscalationOutcome::from(&e));
                if matches!(e, EscalationError::Timeout { .. }) {
                    // A late secret prompt would take the next command as the secret.
                    if let Err(send_err) = channel.send(b"\n").await {
                        self.log
                            .debug(format_args!("abandoning secret prompt: {}", send_err));
                    }
                }
                self.dirty = true;
                return Err(e.into());
            }
        };
        self.escalation = Some(outcome.clone());

        self.sync.prime(channel, &self.log).await?;
        Ok(outcome)
    }

    /// Sample the prompt again, e.g. after a command that changes it.
    pub async fn reprime(&mut self) -> Result<String, SessionError> {
        if self.state != SessionState::Connected {
            return Err(SessionError::NotConnected);
        }
        let channel = self.channel.as_mut().ok_or(SessionError::NotConnected)?;
        let prompt = self.sync.prime(channel, &self.log).await?;
        Ok(prompt.to_string())
    }

    /// Whether the transport reports an active session.
    pub fn is_connected(&self) -> bool {
        self.transport.as_ref().is_some_and(|t| t.is_active())
    }

    /// Close the shell channel, then the transport.
    ///
    /// Safe to call any number of times. Close errors are logged, not
    /// returned.
    pub async fn disconnect(&mut self) {
        if self.transport.is_none() && self.channel.is_none() {
            return;
        }
        self.release().await;
        self.state = SessionState::Disconnected;
        self.log.info(format_args!("disconnected"));
    }

    async fn release(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            if let Err(e) = channel.close().await {
                self.log.debug(format_args!("closing shell: {}", e));
            }
        }
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                self.log.debug(format_args!("closing transport: {}", e));
            }
        }
        self.sync.reset();
        self.dirty = false;
    }

    /// The primed prompt.
    pub fn prompt(&self) -> Option<&str> {
        self.sync.prompt()
    }

    /// Hostname derived from the primed prompt.
    pub fn hostname(&self) -> Option<String> {
        self.sync.prompt().map(hostname_from_prompt)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Result of the most recent escalation attempt.
    pub fn escalation(&self) -> Option<&EscalationOutcome> {
        self.escalation.as_ref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

impl<C: Connector> Drop for SessionClient<C> {
    fn drop(&mut self) {
        if self.transport.is_some() {
            self.log
                .warn(format_args!("session dropped without disconnect()"));
        }
    }
}

async fn bounded<T, F>(timeout: Duration, fut: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| TransportError::Timeout(timeout))?
}

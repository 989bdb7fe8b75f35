//! Builder for creating sessions.

use std::sync::Arc;
use std::time::Duration;

use log::Log;
use secrecy::SecretString;

use super::client::{SessionClient, SessionConfig};
use super::escalation::EscalationPolicy;
use super::logging::SessionLog;
use super::prompt::SyncOptions;
use crate::channel::PromptMatch;
use crate::error::{Error, Result};
use crate::profile::{DeviceProfile, vendors};
use crate::transport::{Connector, HostKeyPolicy, SshConfig, SshConnector};

/// Builder for constructing sessions.
///
/// # Example
///
/// ```rust,no_run
/// use cliwire::SessionBuilder;
///
/// # async fn example() -> Result<(), cliwire::Error> {
/// let session = SessionBuilder::new("192.168.1.1")
///     .username("admin")
///     .password("secret")
///     .enable_secret("enable-secret")
///     .profile("cisco_ios")
///     .connect()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<SecretString>,
    enable_secret: Option<SecretString>,
    profile_name: Option<String>,
    custom_profile: Option<DeviceProfile>,
    escalation: EscalationPolicy,
    timeout: Duration,
    terminal_width: u32,
    terminal_height: u32,
    host_key_policy: HostKeyPolicy,
    sync: SyncOptions,
    logger: Option<Arc<dyn Log>>,
}

impl SessionBuilder {
    /// Create a new session builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: None,
            password: None,
            enable_secret: None,
            profile_name: None,
            custom_profile: None,
            escalation: EscalationPolicy::default(),
            timeout: Duration::from_secs(10),
            terminal_width: 511,
            terminal_height: 24,
            host_key_policy: HostKeyPolicy::default(),
            sync: SyncOptions::default(),
            logger: None,
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the login password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Set a separate secret for privilege escalation.
    ///
    /// Without one, the login password is sent to the escalation prompt.
    pub fn enable_secret(mut self, secret: impl Into<String>) -> Self {
        self.enable_secret = Some(SecretString::from(secret.into()));
        self
    }

    /// Use a built-in device profile (e.g. "cisco_ios", "arista_eos").
    ///
    /// Defaults to "cisco_ios" when no profile is set.
    pub fn profile(mut self, name: impl Into<String>) -> Self {
        self.profile_name = Some(name.into());
        self
    }

    /// Use a custom device profile.
    pub fn custom_profile(mut self, profile: DeviceProfile) -> Self {
        self.custom_profile = Some(profile);
        self
    }

    /// Set whether to escalate while connecting (default: auto).
    pub fn escalation(mut self, policy: EscalationPolicy) -> Self {
        self.escalation = policy;
        self
    }

    /// Set the timeout for each connect step.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the default command timeout.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.sync.command_timeout = timeout;
        self
    }

    /// Set terminal dimensions.
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// Set how the server host key is verified.
    pub fn host_key_policy(mut self, policy: HostKeyPolicy) -> Self {
        self.host_key_policy = policy;
        self
    }

    /// Replace all prompt synchronization options.
    ///
    /// Call before [`command_timeout`](Self::command_timeout) or
    /// [`match_mode`](Self::match_mode), which edit these options.
    pub fn sync_options(mut self, options: SyncOptions) -> Self {
        self.sync = options;
        self
    }

    /// Set how the prompt is recognized in command output.
    pub fn match_mode(mut self, mode: PromptMatch) -> Self {
        self.sync.match_mode = mode;
        self
    }

    /// Send this session's log records to `logger` instead of the global
    /// logger.
    pub fn logger(mut self, logger: Arc<dyn Log>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Build a session on the russh transport.
    ///
    /// This creates the session but does not connect. Call `connect()` on
    /// the returned session to establish the connection.
    pub fn build(self) -> Result<SessionClient> {
        self.build_with(SshConnector)
    }

    /// Build a session on a custom transport.
    pub fn build_with<C: Connector>(self, connector: C) -> Result<SessionClient<C>> {
        let username = self.username.ok_or_else(|| Error::InvalidConfig {
            message: "Username is required".to_string(),
        })?;
        let password = self.password.ok_or_else(|| Error::InvalidConfig {
            message: "Password is required".to_string(),
        })?;

        let profile = match (self.custom_profile, self.profile_name) {
            (Some(custom), _) => custom,
            (None, Some(name)) => DeviceProfile::builtin(&name)?,
            (None, None) => vendors::cisco_ios()?,
        };

        let mut ssh = SshConfig::new(self.host, username, password);
        ssh.port = self.port;
        ssh.timeout = self.timeout;
        ssh.terminal_width = self.terminal_width;
        ssh.terminal_height = self.terminal_height;
        ssh.host_key_policy = self.host_key_policy;

        let log = match self.logger {
            Some(sink) => SessionLog::with_sink(ssh.host.clone(), sink),
            None => SessionLog::global(ssh.host.clone()),
        };

        let config = SessionConfig {
            ssh,
            enable_secret: self.enable_secret,
            profile,
            escalation: self.escalation,
            sync: self.sync,
        };

        Ok(SessionClient::new(config, connector, log))
    }

    /// Build a session on the russh transport and connect it.
    pub async fn connect(self) -> Result<SessionClient> {
        let mut session = self.build()?;
        session.connect().await?;
        Ok(session)
    }
}

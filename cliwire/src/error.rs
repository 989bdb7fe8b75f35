//! Error types for cliwire.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Boxed error used to carry transport causes without exposing their types.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for cliwire operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Establishing the session failed
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Session-level errors (command execution, prompt detection)
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Device profile errors
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    /// Invalid configuration in the session builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Failure of [`SessionClient::connect`](crate::SessionClient::connect).
///
/// Every failure while connecting is classified into one of the
/// [`ConnectFailure`] kinds. Transport-library error types never cross
/// this boundary; the original cause is kept as a boxed source.
#[derive(Error, Debug)]
#[error("Failed to connect to {host}: {kind}")]
pub struct ConnectError {
    /// Host the connection was attempted against.
    pub host: String,

    /// What went wrong.
    #[source]
    pub kind: ConnectFailure,
}

impl ConnectError {
    pub(crate) fn new(host: impl Into<String>, kind: ConnectFailure) -> Self {
        Self {
            host: host.into(),
            kind,
        }
    }

    /// Whether retrying the same connection could succeed.
    ///
    /// Only network failures are retryable; bad credentials, protocol
    /// errors and unusable prompts will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ConnectFailure::Network { .. })
    }
}

/// Classified cause of a connect failure.
#[derive(Error, Debug)]
pub enum ConnectFailure {
    /// Credentials were rejected
    #[error("Authentication failed for user '{user}'")]
    Auth { user: String },

    /// Host unreachable, connection reset or timed out
    #[error("Network failure: {source}")]
    Network {
        #[source]
        source: BoxError,
    },

    /// Key exchange, host key or channel negotiation failed
    #[error("Protocol failure: {source}")]
    Protocol {
        #[source]
        source: BoxError,
    },

    /// The privilege escalation dialogue failed
    #[error("Privilege escalation failed: {0}")]
    Escalation(#[source] EscalationError),

    /// The sampled prompt is too short to synchronize on
    #[error("Weak prompt detected: {prompt:?}")]
    WeakPrompt { prompt: String },

    /// `connect` was called on a session that is already connected
    #[error("Session already connected")]
    AlreadyConnected,
}

/// Errors raised by a transport adapter.
///
/// These are converted into [`ConnectFailure`] by [`TransportError::classify`]
/// before they reach a caller of `connect`.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Server host key did not satisfy the host key policy
    #[error("Host key for {host}:{port} rejected: {reason}")]
    HostKeyRejected {
        host: String,
        port: u16,
        reason: String,
    },

    /// Reading the known_hosts file failed
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,
}

impl TransportError {
    /// Classify this error into the public connect taxonomy.
    pub fn classify(self) -> ConnectFailure {
        match self {
            TransportError::AuthenticationFailed { user } => ConnectFailure::Auth { user },
            TransportError::ConnectionFailed { .. }
            | TransportError::Timeout(_)
            | TransportError::Disconnected => ConnectFailure::Network {
                source: Box::new(self),
            },
            TransportError::Ssh(ref e) if is_network_ssh_error(e) => ConnectFailure::Network {
                source: Box::new(self),
            },
            TransportError::Ssh(_)
            | TransportError::HostKeyRejected { .. }
            | TransportError::KnownHosts(_) => ConnectFailure::Protocol {
                source: Box::new(self),
            },
        }
    }
}

fn is_network_ssh_error(e: &russh::Error) -> bool {
    matches!(
        e,
        russh::Error::IO(_)
            | russh::Error::Disconnect
            | russh::Error::ConnectionTimeout
            | russh::Error::KeepaliveTimeout
            | russh::Error::InactivityTimeout
    )
}

/// Shell channel errors.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The remote side closed the channel
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(String),
}

/// Privilege escalation errors.
#[derive(Error, Debug)]
pub enum EscalationError {
    /// The device never asked for the escalation secret
    #[error("No secret prompt after {attempts} polling attempts")]
    Timeout { attempts: u32 },

    /// The device stayed unprivileged after the secret was sent
    #[error("Escalation secret rejected, prompt still {prompt:?}")]
    Rejected { prompt: String },

    /// The channel failed during the dialogue
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Session errors (command execution, prompt synchronization).
#[derive(Error, Debug)]
pub enum SessionError {
    /// Session not connected
    #[error("Session not connected - call connect() first")]
    NotConnected,

    /// No prompt has been primed for this session
    #[error("Prompt not primed")]
    NotPrimed,

    /// The prompt did not reappear before the deadline
    #[error("Prompt not seen within {timeout:?} ({} bytes captured)", partial.len())]
    PromptTimeout { timeout: Duration, partial: String },

    /// The remote side closed the channel mid-command
    #[error("Channel closed before prompt ({} bytes captured)", partial.len())]
    ChannelClosed { partial: String },

    /// The sampled prompt is too short to synchronize on
    #[error("Weak prompt detected: {prompt:?}")]
    WeakPromptDetected { prompt: String },

    /// Privilege escalation failed
    #[error("Privilege escalation failed: {0}")]
    Escalation(#[from] EscalationError),

    /// Channel failure
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl SessionError {
    /// Output captured before the failure, if any.
    pub fn partial_output(&self) -> Option<&str> {
        match self {
            SessionError::PromptTimeout { partial, .. }
            | SessionError::ChannelClosed { partial } => Some(partial),
            _ => None,
        }
    }
}

/// Device profile errors.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// No built-in profile with this name
    #[error("Unknown device profile '{name}'")]
    Unknown { name: String },

    /// A marker pattern failed to compile
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Result type alias using cliwire's Error.
pub type Result<T> = std::result::Result<T, Error>;

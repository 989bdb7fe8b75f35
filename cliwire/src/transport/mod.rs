//! Secure transport layer.
//!
//! The session client never speaks SSH itself. It consumes the three
//! traits below, which together describe an encrypted, authenticated,
//! ordered byte stream to a device:
//!
//! - [`Connector`] opens a [`Transport`] to a host
//! - [`Transport`] authenticates and opens an interactive shell
//! - [`ShellStream`] moves raw bytes to and from that shell
//!
//! [`SshConnector`] is the production implementation on top of russh.

pub mod config;
mod ssh;

use std::future::Future;

use bytes::Bytes;
use secrecy::SecretString;

pub use config::{HostKeyPolicy, SshConfig};
pub use ssh::{SshConnector, SshShell, SshTransport};

use crate::error::{ChannelError, TransportError};

/// Opens transports to remote hosts.
pub trait Connector: Send + Sync {
    /// The transport type produced by this connector.
    type Transport: Transport;

    /// Connect to `config.host:config.port`, completing key exchange and
    /// host key verification but not authentication.
    fn open(
        &self,
        config: &SshConfig,
    ) -> impl Future<Output = Result<Self::Transport, TransportError>> + Send;
}

/// An established, not necessarily authenticated, secure connection.
pub trait Transport: Send {
    /// The shell stream type opened on this transport.
    type Shell: ShellStream;

    /// Authenticate with a username and secret.
    ///
    /// Fails with [`TransportError::AuthenticationFailed`] when the server
    /// rejects the credentials.
    fn authenticate(
        &mut self,
        username: &str,
        secret: &SecretString,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Open an interactive shell on a PTY.
    ///
    /// Fails with [`TransportError::Disconnected`] when the server has
    /// already dropped the session.
    fn open_shell(&mut self) -> impl Future<Output = Result<Self::Shell, TransportError>> + Send;

    /// Whether the transport still has a live session.
    fn is_active(&self) -> bool;

    /// Close the transport.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Raw duplex byte stream of an interactive shell.
pub trait ShellStream: Send {
    /// Write bytes to the shell.
    fn write(&mut self, data: &[u8]) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Wait for the next chunk of output.
    ///
    /// Returns `Ok(None)` once the remote side has closed the stream.
    /// Implementations must be cancel safe: dropping the future before it
    /// completes must not lose data.
    fn read(&mut self) -> impl Future<Output = Result<Option<Bytes>, ChannelError>> + Send;

    /// Close the stream.
    fn close(&mut self) -> impl Future<Output = Result<(), ChannelError>> + Send;
}

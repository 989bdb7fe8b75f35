//! SSH transport implementation using russh.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use russh::client::{self, Handle, Msg};
use russh::keys::{HashAlg, PublicKey};
use russh::{Channel, ChannelMsg};
use secrecy::{ExposeSecret, SecretString};

use super::config::{HostKeyPolicy, SshConfig};
use super::{Connector, ShellStream, Transport};
use crate::error::{ChannelError, TransportError};

/// Connector producing russh-backed transports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SshConnector;

impl Connector for SshConnector {
    type Transport = SshTransport;

    async fn open(&self, config: &SshConfig) -> Result<SshTransport, TransportError> {
        SshTransport::connect(config).await
    }
}

/// SSH transport wrapping a russh client session.
pub struct SshTransport {
    /// The russh session handle.
    session: Handle<SshHandler>,

    terminal_width: u32,
    terminal_height: u32,

    /// Set once `close` has run.
    closed: bool,
}

impl SshTransport {
    /// Connect to the SSH server and verify its host key.
    pub async fn connect(config: &SshConfig) -> Result<Self, TransportError> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: None,
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: config.host.clone(),
            port: config.port,
            policy: config.host_key_policy.clone(),
            host_key_error: host_key_error.clone(),
        };

        let session = tokio::time::timeout(
            config.timeout,
            client::connect(ssh_config, (config.host.as_str(), config.port), handler),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.timeout))?
        .map_err(|e| {
            // Prefer the detailed host key error over russh's generic UnknownKey
            let stored = host_key_error.lock().ok().and_then(|mut slot| slot.take());
            match (stored, e) {
                (Some(hk_err), _) => hk_err,
                (None, russh::Error::IO(source)) => TransportError::ConnectionFailed {
                    host: config.host.clone(),
                    port: config.port,
                    source,
                },
                (None, e) => TransportError::Ssh(e),
            }
        })?;

        Ok(Self {
            session,
            terminal_width: config.terminal_width,
            terminal_height: config.terminal_height,
            closed: false,
        })
    }
}

impl Transport for SshTransport {
    type Shell = SshShell;

    async fn authenticate(
        &mut self,
        username: &str,
        secret: &SecretString,
    ) -> Result<(), TransportError> {
        let result = self
            .session
            .authenticate_password(username, secret.expose_secret())
            .await?;
        if !result.success() {
            return Err(TransportError::AuthenticationFailed {
                user: username.to_string(),
            });
        }
        Ok(())
    }

    async fn open_shell(&mut self) -> Result<SshShell, TransportError> {
        if self.session.is_closed() {
            return Err(TransportError::Disconnected);
        }
        let channel = self.session.channel_open_session().await?;

        channel
            .request_pty(
                true,
                "xterm",
                self.terminal_width,
                self.terminal_height,
                0,
                0,
                &[],
            )
            .await?;

        channel.request_shell(true).await?;

        Ok(SshShell { channel })
    }

    fn is_active(&self) -> bool {
        !self.closed && !self.session.is_closed()
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}

/// Interactive shell on a russh session channel.
pub struct SshShell {
    channel: Channel<Msg>,
}

impl ShellStream for SshShell {
    async fn write(&mut self, data: &[u8]) -> Result<(), ChannelError> {
        self.channel
            .data(data)
            .await
            .map_err(|e| ChannelError::Ssh(e.to_string()))
    }

    async fn read(&mut self) -> Result<Option<Bytes>, ChannelError> {
        // `Channel::wait` is a channel receive, so this loop is cancel safe.
        loop {
            match self.channel.wait().await {
                Some(ChannelMsg::Data { data }) => return Ok(Some(Bytes::copy_from_slice(&data))),
                Some(ChannelMsg::ExtendedData { data, .. }) => {
                    return Ok(Some(Bytes::copy_from_slice(&data)));
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => return Ok(None),
                Some(_) => continue,
            }
        }
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        self.channel
            .close()
            .await
            .map_err(|e| ChannelError::Ssh(e.to_string()))
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
    /// Stores a detailed host-key error so connect() can surface it
    /// instead of the generic russh::Error::UnknownKey.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    fn check(&self, pubkey: &PublicKey) -> Result<(), TransportError> {
        match &self.policy {
            HostKeyPolicy::AcceptAny => Ok(()),
            HostKeyPolicy::Pinned { fingerprints } => {
                let fingerprint = pubkey.fingerprint(HashAlg::Sha256).to_string();
                if fingerprints.iter().any(|f| f == &fingerprint) {
                    Ok(())
                } else {
                    Err(TransportError::HostKeyRejected {
                        host: self.host.clone(),
                        port: self.port,
                        reason: format!("fingerprint {} is not pinned", fingerprint),
                    })
                }
            }
            HostKeyPolicy::KnownHosts { path } => {
                let result = match path {
                    Some(path) => {
                        russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path)
                    }
                    None => russh::keys::check_known_hosts(&self.host, self.port, pubkey),
                };
                match result {
                    Ok(true) => Ok(()),
                    Ok(false) => Err(TransportError::HostKeyRejected {
                        host: self.host.clone(),
                        port: self.port,
                        reason: "host not in known_hosts".to_string(),
                    }),
                    Err(russh::keys::Error::KeyChanged { line }) => {
                        Err(TransportError::HostKeyRejected {
                            host: self.host.clone(),
                            port: self.port,
                            reason: format!("key changed (known_hosts line {})", line),
                        })
                    }
                    Err(e) => Err(TransportError::KnownHosts(e.to_string())),
                }
            }
        }
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        match self.check(server_public_key) {
            Ok(()) => Ok(true),
            Err(e) => {
                if let Ok(mut slot) = self.host_key_error.lock() {
                    *slot = Some(e);
                }
                Ok(false)
            }
        }
    }
}

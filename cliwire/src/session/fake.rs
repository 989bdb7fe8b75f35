//! Simulated network device for session tests.
//!
//! Speaks just enough of a Cisco-style CLI: echoes typed lines, prints a
//! `name>` or `name#` prompt, runs the `en` dialogue and answers commands
//! from a canned table. Resource counters let tests check that nothing is
//! left open.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use secrecy::{ExposeSecret, SecretString};
use tokio::time::Instant;

use crate::error::{ChannelError, TransportError};
use crate::transport::{Connector, ShellStream, SshConfig, Transport};

/// What a device command prints.
#[derive(Clone)]
pub(crate) enum Reply {
    /// Output chunks, each released `delay` after the previous one.
    Chunks(Vec<(Duration, String)>),
    /// Never answers.
    Silent,
}

/// Device behavior shared by every connection to it.
#[derive(Clone)]
pub(crate) struct DeviceSpec {
    pub(crate) hostname: String,
    pub(crate) password: String,
    pub(crate) enable_secret: Option<String>,
    pub(crate) starts_privileged: bool,
    pub(crate) banner: String,
    pub(crate) commands: HashMap<String, Reply>,
    pub(crate) unreachable: bool,
    pub(crate) drops_after_login: bool,
    pub(crate) split_banner: bool,
    pub(crate) enable_delay: Duration,
}

impl DeviceSpec {
    pub(crate) fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            password: "cisco.123".to_string(),
            enable_secret: None,
            starts_privileged: true,
            banner: "\r\nUser Access Verification\r\n\r\n".to_string(),
            commands: HashMap::new(),
            unreachable: false,
            drops_after_login: false,
            split_banner: false,
            enable_delay: Duration::from_millis(5),
        }
    }

    pub(crate) fn unprivileged(mut self, enable_secret: &str) -> Self {
        self.starts_privileged = false;
        self.enable_secret = Some(enable_secret.to_string());
        self
    }

    pub(crate) fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Close the session right after authentication.
    pub(crate) fn drops_after_login(mut self) -> Self {
        self.drops_after_login = true;
        self
    }

    /// Print the login banner but hold the prompt back until a key is
    /// pressed.
    pub(crate) fn split_banner(mut self) -> Self {
        self.split_banner = true;
        self
    }

    /// Delay before the secret prompt appears.
    pub(crate) fn slow_enable(mut self, ms: u64) -> Self {
        self.enable_delay = Duration::from_millis(ms);
        self
    }

    pub(crate) fn command(mut self, command: &str, output: &str) -> Self {
        self.commands.insert(
            command.to_string(),
            Reply::Chunks(vec![(Duration::from_millis(5), output.to_string())]),
        );
        self
    }

    pub(crate) fn chunked(mut self, command: &str, chunks: &[(u64, &str)]) -> Self {
        let chunks = chunks
            .iter()
            .map(|(ms, text)| (Duration::from_millis(*ms), text.to_string()))
            .collect();
        self.commands
            .insert(command.to_string(), Reply::Chunks(chunks));
        self
    }

    pub(crate) fn silent(mut self, command: &str) -> Self {
        self.commands.insert(command.to_string(), Reply::Silent);
        self
    }
}

/// Open resource counters.
#[derive(Default)]
pub(crate) struct Resources {
    pub(crate) transports_open: AtomicUsize,
    pub(crate) shells_open: AtomicUsize,
}

impl Resources {
    pub(crate) fn open_count(&self) -> usize {
        self.transports_open.load(Ordering::SeqCst) + self.shells_open.load(Ordering::SeqCst)
    }
}

pub(crate) struct FakeConnector {
    spec: DeviceSpec,
    pub(crate) resources: Arc<Resources>,
}

impl FakeConnector {
    pub(crate) fn new(spec: DeviceSpec) -> Self {
        Self {
            spec,
            resources: Arc::new(Resources::default()),
        }
    }
}

impl Connector for FakeConnector {
    type Transport = FakeTransport;

    async fn open(&self, config: &SshConfig) -> Result<FakeTransport, TransportError> {
        if self.spec.unreachable {
            return Err(TransportError::ConnectionFailed {
                host: config.host.clone(),
                port: config.port,
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
            });
        }
        self.resources.transports_open.fetch_add(1, Ordering::SeqCst);
        Ok(FakeTransport {
            spec: self.spec.clone(),
            resources: self.resources.clone(),
            closed: false,
        })
    }
}

pub(crate) struct FakeTransport {
    spec: DeviceSpec,
    resources: Arc<Resources>,
    closed: bool,
}

impl Transport for FakeTransport {
    type Shell = FakeShell;

    async fn authenticate(
        &mut self,
        username: &str,
        secret: &SecretString,
    ) -> Result<(), TransportError> {
        if secret.expose_secret() != self.spec.password {
            return Err(TransportError::AuthenticationFailed {
                user: username.to_string(),
            });
        }
        Ok(())
    }

    async fn open_shell(&mut self) -> Result<FakeShell, TransportError> {
        if self.spec.drops_after_login {
            return Err(TransportError::Disconnected);
        }
        self.resources.shells_open.fetch_add(1, Ordering::SeqCst);
        let mut shell = FakeShell {
            privileged: self.spec.starts_privileged,
            awaiting_secret: false,
            line: String::new(),
            queue: VecDeque::new(),
            spec: self.spec.clone(),
            resources: self.resources.clone(),
            closed: false,
        };
        let banner = if self.spec.split_banner {
            self.spec.banner.clone()
        } else {
            format!("{}{}", self.spec.banner, shell.prompt())
        };
        shell.emit(Duration::from_millis(10), banner);
        Ok(shell)
    }

    fn is_active(&self) -> bool {
        !self.closed
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !self.closed {
            self.closed = true;
            self.resources.transports_open.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

pub(crate) struct FakeShell {
    spec: DeviceSpec,
    resources: Arc<Resources>,
    privileged: bool,
    awaiting_secret: bool,
    line: String,
    queue: VecDeque<(Instant, Bytes)>,
    closed: bool,
}

impl FakeShell {
    fn prompt(&self) -> String {
        let marker = if self.privileged { '#' } else { '>' };
        format!("{}{}", self.spec.hostname, marker)
    }

    /// Queue output `delay` after the last queued chunk.
    fn emit(&mut self, delay: Duration, text: String) {
        let after = self
            .queue
            .back()
            .map_or_else(Instant::now, |(at, _)| *at)
            .max(Instant::now());
        self.queue.push_back((after + delay, Bytes::from(text)));
    }

    fn handle_line(&mut self, line: &str) {
        if self.awaiting_secret {
            self.awaiting_secret = false;
            if Some(line) == self.spec.enable_secret.as_deref() {
                self.privileged = true;
                let out = format!("\r\n{}", self.prompt());
                self.emit(Duration::from_millis(5), out);
            } else {
                let out = format!("\r\n% Access denied\r\n\r\n{}", self.prompt());
                self.emit(Duration::from_millis(5), out);
            }
            return;
        }

        self.emit(Duration::ZERO, format!("{}\r\n", line));
        let prompt = self.prompt();

        match line {
            "" | "term len 0" | "terminal length 0" => {
                self.emit(Duration::from_millis(1), prompt);
            }
            "en" | "enable" if !self.privileged => {
                self.awaiting_secret = true;
                self.emit(self.spec.enable_delay, "Password: ".to_string());
            }
            "en" | "enable" => self.emit(Duration::from_millis(1), prompt),
            _ => match self.spec.commands.get(line).cloned() {
                Some(Reply::Chunks(chunks)) => {
                    for (delay, text) in chunks {
                        self.emit(delay, text.replace('\n', "\r\n"));
                    }
                    self.emit(Duration::from_millis(1), prompt);
                }
                Some(Reply::Silent) => {}
                None => {
                    let out = format!("% Invalid input detected at '^' marker.\r\n\r\n{}", prompt);
                    self.emit(Duration::from_millis(1), out);
                }
            },
        }
    }
}

impl ShellStream for FakeShell {
    async fn write(&mut self, data: &[u8]) -> Result<(), ChannelError> {
        if self.closed {
            return Err(ChannelError::Closed);
        }
        for ch in String::from_utf8_lossy(data).chars() {
            match ch {
                '\n' => {
                    let line = std::mem::take(&mut self.line);
                    self.handle_line(line.trim_end_matches('\r'));
                }
                c => self.line.push(c),
            }
        }
        Ok(())
    }

    async fn read(&mut self) -> Result<Option<Bytes>, ChannelError> {
        if self.closed {
            return Ok(None);
        }
        let Some(at) = self.queue.front().map(|(at, _)| *at) else {
            return std::future::pending().await;
        };
        tokio::time::sleep_until(at).await;
        Ok(self.queue.pop_front().map(|(_, chunk)| chunk))
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        if !self.closed {
            self.closed = true;
            self.resources.shells_open.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

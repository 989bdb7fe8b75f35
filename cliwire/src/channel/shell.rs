//! Shell channel: timed reads and writes over an interactive shell stream.

use std::time::Duration;

use bytes::BytesMut;
use tokio::time::Instant;

use crate::error::ChannelError;
use crate::transport::ShellStream;

/// Default maximum number of bytes returned by a single receive.
pub const DEFAULT_READ_SIZE: usize = 4096;

/// Duplex wrapper around a [`ShellStream`].
///
/// Reads are always bounded by a timeout. A timeout is not an error here:
/// `receive` simply returns no bytes and the caller decides whether to
/// retry. Bytes beyond the requested maximum are kept for the next read.
pub struct ShellChannel<S> {
    stream: S,

    /// Data already read from the stream but not yet handed out.
    pending: BytesMut,

    /// Whether the stream is still open.
    open: bool,
}

impl<S: ShellStream> ShellChannel<S> {
    /// Wrap an opened shell stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            pending: BytesMut::with_capacity(DEFAULT_READ_SIZE),
            open: true,
        }
    }

    /// Whether the remote side has not closed the stream.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Send raw bytes.
    pub async fn send(&mut self, data: &[u8]) -> Result<(), ChannelError> {
        if !self.open {
            return Err(ChannelError::Closed);
        }
        self.stream.write(data).await
    }

    /// Send a line of text terminated by a newline.
    pub async fn send_line(&mut self, line: &str) -> Result<(), ChannelError> {
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
        self.send(&data).await
    }

    /// Receive up to `max_bytes`, waiting at most `timeout` for data.
    ///
    /// Returns an empty vector when nothing arrived in time, and
    /// [`ChannelError::Closed`] once the stream has ended and all buffered
    /// data has been handed out.
    pub async fn receive(
        &mut self,
        max_bytes: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>, ChannelError> {
        if self.pending.is_empty() {
            if !self.open {
                return Err(ChannelError::Closed);
            }
            match tokio::time::timeout(timeout, self.stream.read()).await {
                Err(_) => return Ok(Vec::new()),
                Ok(Ok(Some(chunk))) => self.pending.extend_from_slice(&chunk),
                Ok(Ok(None)) => {
                    self.open = false;
                    return Err(ChannelError::Closed);
                }
                Ok(Err(e)) => return Err(e),
            }
        }

        let n = self.pending.len().min(max_bytes.max(1));
        Ok(self.pending.split_to(n).to_vec())
    }

    /// Collect output until the stream goes quiet.
    ///
    /// Waits up to `first_wait` for the first bytes, then keeps reading
    /// until no data arrives for `quiet`. Never runs longer than `max_total`.
    pub async fn read_until_quiet(
        &mut self,
        first_wait: Duration,
        quiet: Duration,
        max_total: Duration,
    ) -> Result<Vec<u8>, ChannelError> {
        let deadline = Instant::now() + max_total;
        let mut collected = Vec::new();
        let mut wait = first_wait;

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match self.receive(DEFAULT_READ_SIZE, wait.min(deadline - now)).await {
                Ok(chunk) if chunk.is_empty() => break,
                Ok(chunk) => {
                    collected.extend_from_slice(&chunk);
                    wait = quiet;
                }
                Err(ChannelError::Closed) if !collected.is_empty() => break,
                Err(e) => return Err(e),
            }
        }

        Ok(collected)
    }

    /// Close the stream. Safe to call more than once.
    pub async fn close(&mut self) -> Result<(), ChannelError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.pending.clear();
        self.stream.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::mock::ScriptedStream;

    #[tokio::test(start_paused = true)]
    async fn test_receive_times_out_empty() {
        let mut channel = ShellChannel::new(ScriptedStream::silent());
        let data = channel
            .receive(100, Duration::from_millis(200))
            .await
            .unwrap();
        assert!(data.is_empty());
        assert!(channel.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_keeps_excess_bytes() {
        let mut channel = ShellChannel::new(ScriptedStream::new(vec![b"abcdef".to_vec()]));
        assert_eq!(channel.receive(4, Duration::from_secs(1)).await.unwrap(), b"abcd");
        assert_eq!(channel.receive(4, Duration::from_secs(1)).await.unwrap(), b"ef");
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_after_eof() {
        let mut channel = ShellChannel::new(ScriptedStream::new(vec![b"bye".to_vec()]).then_close());
        assert_eq!(channel.receive(100, Duration::from_secs(1)).await.unwrap(), b"bye");
        let err = channel.receive(100, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ChannelError::Closed));
        assert!(!channel.is_open());
        assert!(channel.send(b"x").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_until_quiet_collects_all_chunks() {
        let stream = ScriptedStream::new(vec![b"\r\n".to_vec(), b"router1#".to_vec()]);
        let mut channel = ShellChannel::new(stream);
        let data = channel
            .read_until_quiet(
                Duration::from_secs(1),
                Duration::from_millis(100),
                Duration::from_secs(1),
            )
            .await
            .unwrap();
        assert_eq!(data, b"\r\nrouter1#");
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_line_appends_newline() {
        let stream = ScriptedStream::silent();
        let written = stream.written();
        let mut channel = ShellChannel::new(stream);
        channel.send_line("show version").await.unwrap();
        assert_eq!(written.lock().unwrap().as_slice(), b"show version\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_is_idempotent() {
        let mut channel = ShellChannel::new(ScriptedStream::silent());
        channel.close().await.unwrap();
        channel.close().await.unwrap();
        assert!(!channel.is_open());
    }
}

//! Scripted shell stream for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::error::ChannelError;
use crate::transport::ShellStream;

/// A shell stream that plays back canned output.
///
/// Output queued with [`ScriptedStream::new`] is readable immediately.
/// Output queued with [`ScriptedStream::reply`] is released when the next
/// write equals its trigger, in order. When nothing is queued, reads wait
/// forever (or report EOF after [`ScriptedStream::then_close`]).
pub(crate) struct ScriptedStream {
    ready: VecDeque<Vec<u8>>,
    replies: VecDeque<(Vec<u8>, Vec<Vec<u8>>)>,
    written: Arc<Mutex<Vec<u8>>>,
    close_when_drained: bool,
}

impl ScriptedStream {
    pub(crate) fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            ready: chunks.into(),
            replies: VecDeque::new(),
            written: Arc::new(Mutex::new(Vec::new())),
            close_when_drained: false,
        }
    }

    pub(crate) fn silent() -> Self {
        Self::new(Vec::new())
    }

    pub(crate) fn then_close(mut self) -> Self {
        self.close_when_drained = true;
        self
    }

    pub(crate) fn reply(mut self, trigger: &[u8], chunks: &[&[u8]]) -> Self {
        self.replies.push_back((
            trigger.to_vec(),
            chunks.iter().map(|c| c.to_vec()).collect(),
        ));
        self
    }

    pub(crate) fn written(&self) -> Arc<Mutex<Vec<u8>>> {
        self.written.clone()
    }
}

impl ShellStream for ScriptedStream {
    async fn write(&mut self, data: &[u8]) -> Result<(), ChannelError> {
        self.written.lock().unwrap().extend_from_slice(data);
        if self.replies.front().is_some_and(|(trigger, _)| trigger == data) {
            if let Some((_, chunks)) = self.replies.pop_front() {
                self.ready.extend(chunks);
            }
        }
        Ok(())
    }

    async fn read(&mut self) -> Result<Option<Bytes>, ChannelError> {
        if let Some(chunk) = self.ready.pop_front() {
            return Ok(Some(Bytes::from(chunk)));
        }
        if self.close_when_drained {
            return Ok(None);
        }
        std::future::pending().await
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }
}

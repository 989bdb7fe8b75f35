//! Channel layer for shell I/O and prompt matching.
//!
//! This module handles the raw side of an interactive session: bounded
//! reads, incremental decoding, prompt search and control sequence
//! stripping.

mod ansi;
mod backoff;
mod buffer;
mod decoder;
mod patterns;
mod shell;

#[cfg(test)]
pub(crate) mod mock;

pub use ansi::strip_control_sequences;
pub use backoff::{Backoff, BackoffState};
pub use buffer::OutputBuffer;
pub use decoder::Utf8Decoder;
pub use patterns::{PromptMatch, ends_with_prompt};
pub use shell::{DEFAULT_READ_SIZE, ShellChannel};

//! Interactive session with a network device.
//!
//! The session layer provides the main API: connect, execute commands
//! one at a time against the device prompt, and disconnect.
//!
//! ```text
//! connect ─► authenticate ─► open shell ─► escalate ─► prime prompt
//!                                                          │
//!                      execute ◄──────────────────────────┘
//! ```

mod builder;
mod client;
pub mod escalation;
mod logging;
mod output;
pub mod prompt;

#[cfg(test)]
pub(crate) mod fake;

pub use builder::SessionBuilder;
pub use client::{SessionClient, SessionConfig, SessionState};
pub use escalation::{
    EscalationOutcome, EscalationPolicy, EscalationState, PrivilegeEscalator,
};
pub use logging::SessionLog;
pub use output::CommandOutput;
pub use prompt::{PromptSynchronizer, SyncOptions};

//! # Cliwire
//!
//! Async interactive CLI sessions for network devices over SSH.
//!
//! Cliwire logs into a router or switch, escalates to the privileged mode
//! when the device lands in an unprivileged one, learns the device prompt
//! and then runs commands one at a time, returning everything the device
//! printed up to the prompt's reappearance.
//!
//! ## Features
//!
//! - Async SSH connections via russh, behind swappable transport traits
//! - Prompt detection that tolerates prompt text inside command output
//! - Automatic `enable` dialogue with a bounded, backed-off wait
//! - Device profiles for Cisco IOS, Cisco NX-OS and Arista EOS
//! - Per-session log sink; secrets never reach the logs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cliwire::SessionBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), cliwire::Error> {
//!     let mut session = SessionBuilder::new("192.168.1.1")
//!         .username("admin")
//!         .password("secret")
//!         .profile("cisco_ios")
//!         .build()?;
//!
//!     session.connect().await?;
//!
//!     let output = session.execute("show version").await?;
//!     println!("{}", output.normalized());
//!
//!     session.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod error;
pub mod profile;
pub mod session;
pub mod transport;

// Re-export main types for convenience
pub use channel::PromptMatch;
pub use error::{
    ConnectError, ConnectFailure, EscalationError, Error, ProfileError, SessionError,
};
pub use profile::DeviceProfile;
pub use session::{
    CommandOutput, EscalationOutcome, EscalationPolicy, SessionBuilder, SessionClient,
    SessionConfig, SessionState, SyncOptions,
};
pub use transport::{HostKeyPolicy, SshConfig, SshConnector};

//! Device profiles for multi-vendor support.
//!
//! A profile describes how a device family shows its privilege level in
//! the prompt and how to move from the unprivileged to the privileged
//! mode.

mod definition;
pub mod vendors;

pub use definition::{DeviceProfile, last_line};

//! SSH connection configuration.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

/// Host key verification policy.
#[derive(Debug, Clone, Default)]
pub enum HostKeyPolicy {
    /// Accept any host key without checking.
    ///
    /// Kept as the default for compatibility with existing collection
    /// jobs. A warning is logged on every connect that uses it; prefer
    /// [`HostKeyPolicy::Pinned`] for new deployments.
    #[default]
    AcceptAny,

    /// Accept only keys whose SHA-256 fingerprint (`SHA256:...`) is listed.
    Pinned { fingerprints: Vec<String> },

    /// Accept only keys present in an OpenSSH known_hosts file.
    /// Uses the user's default known_hosts when `path` is `None`.
    KnownHosts { path: Option<PathBuf> },
}

/// SSH connection configuration.
#[derive(Debug)]
pub struct SshConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port (default: 22).
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Password used for authentication.
    pub secret: SecretString,

    /// Timeout for connecting, authenticating and opening the shell.
    pub timeout: Duration,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,

    /// Host key verification policy.
    pub host_key_policy: HostKeyPolicy,
}

impl SshConfig {
    /// Create a configuration with default port, timeout and terminal size.
    pub fn new(host: impl Into<String>, username: impl Into<String>, secret: SecretString) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: username.into(),
            secret,
            timeout: Duration::from_secs(10),
            terminal_width: 511,
            terminal_height: 24,
            host_key_policy: HostKeyPolicy::default(),
        }
    }

    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SshConfig::new("10.192.255.11", "admin", SecretString::from("cisco.123".to_string()));
        assert_eq!(config.port, 22);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(matches!(config.host_key_policy, HostKeyPolicy::AcceptAny));
        assert_eq!(config.socket_addr(), "10.192.255.11:22");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = SshConfig::new("r1", "admin", SecretString::from("hunter2".to_string()));
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
    }
}

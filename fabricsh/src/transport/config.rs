//! SSH connection configuration.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default)]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys. Connection fails if the host
    /// is not already in known_hosts.
    Strict,

    /// Accept and auto-learn unknown keys, but reject changed keys.
    #[default]
    AcceptNew,

    /// Accept all keys without checking. For lab switches only.
    Disabled,
}

/// SSH connection configuration for one switch.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Switch management address (hostname or IP).
    pub host: String,

    /// SSH port (default: 22).
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Authentication method.
    pub auth: AuthMethod,

    /// Connection timeout.
    pub timeout: Duration,

    /// Terminal width requested for interactive commands.
    pub terminal_width: u32,

    /// Terminal height requested for interactive commands.
    pub terminal_height: u32,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file.
    pub known_hosts_path: Option<PathBuf>,
}

impl SshConfig {
    pub fn new(host: impl Into<String>, username: impl Into<String>, auth: AuthMethod) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: username.into(),
            auth,
            timeout: Duration::from_secs(30),
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Authentication method for SSH connections.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// No authentication.
    None,

    /// Password authentication.
    Password(SecretString),

    /// Private key authentication.
    PrivateKey {
        /// Path to the private key file.
        path: PathBuf,
        /// Optional passphrase for encrypted keys.
        passphrase: Option<SecretString>,
    },
}

impl AuthMethod {
    pub fn password(password: impl Into<String>) -> Self {
        let password: String = password.into();
        Self::Password(SecretString::from(password))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_defaults() {
        let config = SshConfig::new("10.0.0.1", "admin", AuthMethod::None);
        assert_eq!(config.port, 22);
        assert_eq!(config.socket_addr(), "10.0.0.1:22");
        assert!(matches!(config.host_key_verification, HostKeyVerification::AcceptNew));
    }

    #[test]
    fn test_password_is_redacted() {
        let auth = AuthMethod::password("hunter2");
        assert!(!format!("{auth:?}").contains("hunter2"));
        let AuthMethod::Password(secret) = auth else {
            panic!("expected password auth");
        };
        assert_eq!(secret.expose_secret(), "hunter2");
    }
}

//! Builder for switch clients and provisioning agents over SSH.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use super::switch::Switch;
use crate::error::{Result, TransportError};
use crate::provisioning::Agent;
use crate::session::{DeviceConfig, Mode};
use crate::transport::{AuthMethod, HostKeyVerification, SshConfig, SshTransport};

/// Builder for [`Switch`] and [`Agent`] clients.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use fabricsh::fabric::SwitchBuilder;
///
/// # async fn example() -> Result<(), fabricsh::Error> {
/// let mut agent = SwitchBuilder::new("192.168.1.10")
///     .username("zoneadmin")
///     .password("secret")
///     .command_timeout(Duration::from_secs(120))
///     .agent()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SwitchBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    auth: AuthMethod,
    timeout: Duration,
    terminal_width: u32,
    terminal_height: u32,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    device: DeviceConfig,
    fid: Option<u32>,
}

impl SwitchBuilder {
    /// Create a new builder for the switch at `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: None,
            auth: AuthMethod::None,
            timeout: Duration::from_secs(30),
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            device: DeviceConfig::default(),
            fid: None,
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set password authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.auth = AuthMethod::password(password);
        self
    }

    /// Set private key authentication.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: None,
        };
        self
    }

    /// Set private key authentication with passphrase.
    pub fn private_key_with_passphrase(
        mut self,
        key_path: impl Into<PathBuf>,
        passphrase: impl Into<String>,
    ) -> Self {
        let passphrase: String = passphrase.into();
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: Some(SecretString::from(passphrase)),
        };
        self
    }

    /// Set the connection timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set terminal dimensions used for interactive commands.
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// Set host key verification mode (default: `AcceptNew`).
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Use a known_hosts file other than `~/.ssh/known_hosts`.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Replace the whole device configuration.
    pub fn device_config(mut self, config: DeviceConfig) -> Self {
        self.device = config;
        self
    }

    /// Set the deadline for a single command.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.device.command_timeout = timeout;
        self
    }

    /// Set the default command mode.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.device.mode = mode;
        self
    }

    /// Query this logical switch on virtual fabric chassis.
    pub fn fid(mut self, fid: u32) -> Self {
        self.fid = Some(fid);
        self
    }

    /// Build the SSH transport and device settings without connecting.
    pub fn build(self) -> Result<(SshTransport, DeviceConfig)> {
        let username = self
            .username
            .ok_or_else(|| TransportError::InvalidConfig("username is required".to_string()))?;

        let ssh_config = SshConfig {
            host: self.host,
            port: self.port,
            username,
            auth: self.auth,
            timeout: self.timeout,
            terminal_width: self.terminal_width,
            terminal_height: self.terminal_height,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path,
        };

        Ok((SshTransport::new(ssh_config), self.device))
    }

    /// Connect a read-only [`Switch`] client.
    pub async fn connect(self) -> Result<Switch<SshTransport>> {
        let fid = self.fid;
        let (transport, device) = self.build()?;
        let mut switch = Switch::connect(transport, device).await?;
        if let Some(fid) = fid {
            switch.set_context(fid);
        }
        Ok(switch)
    }

    /// Connect a provisioning [`Agent`], checking the account may change zoning.
    pub async fn agent(self) -> Result<Agent<SshTransport>> {
        let fid = self.fid;
        let (transport, device) = self.build()?;
        let mut agent = Agent::connect(transport, device).await?;
        if let Some(fid) = fid {
            agent.switch_mut().set_context(fid);
        }
        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_required() {
        let err = SwitchBuilder::new("sw1").password("x").build().unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Transport(TransportError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_build_applies_settings() {
        let (transport, device) = SwitchBuilder::new("sw1")
            .port(2222)
            .username("admin")
            .password("x")
            .command_timeout(Duration::from_secs(5))
            .mode(Mode::Interactive)
            .build()
            .unwrap();
        assert_eq!(transport.config().socket_addr(), "sw1:2222");
        assert_eq!(transport.config().username, "admin");
        assert_eq!(device.command_timeout, Duration::from_secs(5));
        assert_eq!(device.mode, Mode::Interactive);
        assert_eq!(device.prompt, "> ");
    }
}

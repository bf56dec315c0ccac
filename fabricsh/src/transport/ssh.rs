//! SSH transport implementation using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use log::{debug, trace, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use russh::{Channel, ChannelMsg};
use secrecy::ExposeSecret;

use super::config::{AuthMethod, HostKeyVerification, SshConfig};
use crate::error::{ChannelError, Result, TransportError};
use crate::session::{ChannelEvent, Shell, ShellChannel};

/// SSH connection to a switch.
///
/// Created disconnected; [`Device`](crate::session::Device) connects it when
/// the outermost session opens.
pub struct SshTransport {
    /// The russh session handle while connected.
    session: Option<Handle<SshHandler>>,

    /// Configuration used for this connection.
    config: SshConfig,
}

impl std::fmt::Debug for SshTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshTransport")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("connected", &self.session.is_some())
            .finish()
    }
}

impl SshTransport {
    pub fn new(config: SshConfig) -> Self {
        Self {
            session: None,
            config,
        }
    }

    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    /// Connect to the SSH server and authenticate.
    async fn establish(config: &SshConfig) -> Result<Handle<SshHandler>> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(config.timeout),
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: config.host.clone(),
            port: config.port,
            host_key_verification: config.host_key_verification.clone(),
            known_hosts_path: config.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };

        debug!("Connecting to {}", config.socket_addr());
        let mut session = tokio::time::timeout(
            config.timeout,
            client::connect(ssh_config, (config.host.as_str(), config.port), handler),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.timeout))?
        .map_err(|e| {
            // Prefer the detailed host key error over russh's UnknownKey
            let stored = host_key_error
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            stored.unwrap_or(TransportError::Ssh(e))
        })?;

        Self::authenticate(&mut session, config).await?;
        Ok(session)
    }

    /// Authenticate with the server.
    async fn authenticate(session: &mut Handle<SshHandler>, config: &SshConfig) -> Result<()> {
        let success = match &config.auth {
            AuthMethod::None => session
                .authenticate_none(&config.username)
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            AuthMethod::Password(password) => session
                .authenticate_password(&config.username, password.expose_secret())
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            AuthMethod::PrivateKey { path, passphrase } => {
                let key = load_secret_key(path, passphrase.as_ref().map(|p| p.expose_secret()))
                    .map_err(|e| TransportError::Key(e.to_string()))?;

                // Get the best RSA hash algorithm supported by the server
                let hash_alg = session
                    .best_supported_rsa_hash()
                    .await
                    .map_err(TransportError::Ssh)?
                    .flatten();

                session
                    .authenticate_publickey(
                        &config.username,
                        PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                    )
                    .await
                    .map_err(TransportError::Ssh)?
                    .success()
            }
        };

        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }

        Ok(())
    }
}

impl Shell for SshTransport {
    type Channel = SshChannel;

    async fn connect(&mut self) -> Result<()> {
        if self.session.is_none() {
            self.session = Some(Self::establish(&self.config).await?);
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(session) = self.session.take() {
            debug!("Disconnecting from {}", self.config.socket_addr());
            session
                .disconnect(russh::Disconnect::ByApplication, "", "en")
                .await
                .map_err(TransportError::Ssh)?;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.is_closed())
    }

    async fn open_exec(&mut self, command: &str, pty: bool) -> Result<SshChannel> {
        let session = self.session.as_ref().ok_or(TransportError::NotConnected)?;
        let exec_failed = |e: russh::Error| ChannelError::ExecFailed {
            command: command.to_string(),
            message: e.to_string(),
        };

        let channel = session.channel_open_session().await.map_err(exec_failed)?;
        if pty {
            channel
                .request_pty(
                    true,
                    "xterm",
                    self.config.terminal_width,
                    self.config.terminal_height,
                    0,
                    0,
                    &[],
                )
                .await
                .map_err(exec_failed)?;
        }
        channel.exec(true, command).await.map_err(exec_failed)?;
        trace!("exec '{}' (pty: {})", command, pty);

        Ok(SshChannel {
            channel,
            command: command.to_string(),
            done: false,
        })
    }
}

/// Exec channel on an [`SshTransport`].
pub struct SshChannel {
    channel: Channel<Msg>,
    command: String,
    done: bool,
}

impl ShellChannel for SshChannel {
    async fn next_event(&mut self) -> Result<Option<ChannelEvent>> {
        while !self.done {
            match self.channel.wait().await {
                Some(ChannelMsg::Data { data }) => {
                    return Ok(Some(ChannelEvent::Data(Bytes::copy_from_slice(&data))));
                }
                Some(ChannelMsg::ExtendedData { data, .. }) => {
                    return Ok(Some(ChannelEvent::ExtendedData(Bytes::copy_from_slice(&data))));
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    trace!("'{}' exited with {}", self.command, exit_status);
                }
                Some(ChannelMsg::Failure) => {
                    self.done = true;
                    return Err(ChannelError::ExecFailed {
                        command: self.command.clone(),
                        message: "request refused by switch".to_string(),
                    }
                    .into());
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => self.done = true,
                Some(_) => {}
            }
        }
        Ok(None)
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.channel
            .data(data)
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.done = true;
        self.channel.close().await.map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Stores a detailed host-key error so connect() can surface it
    /// instead of the generic russh::Error::UnknownKey.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// Check the host key against known_hosts.
    ///
    /// Returns `Ok(true)` if matched, `Ok(false)` if host not found,
    /// `Err(TransportError::HostKeyChanged)` if key changed.
    fn check_known_hosts(
        &self,
        pubkey: &PublicKey,
    ) -> std::result::Result<bool, TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::check_known_hosts(&self.host, self.port, pubkey)
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => {
                Err(TransportError::HostKeyChanged {
                    host: self.host.clone(),
                    port: self.port,
                    line,
                })
            }
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    /// Save a new host key to known_hosts.
    fn learn_host_key(&self, pubkey: &PublicKey) -> std::result::Result<(), TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::known_hosts::learn_known_hosts_path(
                &self.host, self.port, pubkey, path,
            )
        } else {
            russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey)
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.host_key_verification {
            HostKeyVerification::Disabled => Ok(true),

            HostKeyVerification::AcceptNew => {
                match self.check_known_hosts(server_public_key) {
                    Ok(true) => Ok(true),
                    Ok(false) => {
                        if let Err(e) = self.learn_host_key(server_public_key) {
                            warn!("Failed to save host key: {}", e);
                        }
                        Ok(true)
                    }
                    Err(e) => {
                        *self.host_key_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(e);
                        Ok(false)
                    }
                }
            }

            HostKeyVerification::Strict => {
                match self.check_known_hosts(server_public_key) {
                    Ok(true) => Ok(true),
                    Ok(false) => {
                        *self.host_key_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(
                            TransportError::HostKeyUnknown {
                                host: self.host.clone(),
                                port: self.port,
                            },
                        );
                        Ok(false)
                    }
                    Err(e) => {
                        *self.host_key_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(e);
                        Ok(false)
                    }
                }
            }
        }
    }
}

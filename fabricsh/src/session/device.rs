//! Reference-counted command sessions on top of a [`Shell`].

use std::time::Duration;

use bytes::BytesMut;
use log::{debug, trace, warn};
use serde::Deserialize;

use super::{ChannelEvent, Mode, Shell, ShellChannel, ansi};
use crate::error::{Result, TransportError};
use crate::parser::Response;

/// Settings for command execution on a device.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Literal written before each command in the response data.
    pub prompt: String,

    /// Mode used by [`Device::run`] unless overridden.
    pub mode: Mode,

    /// Deadline for a single command, including all its prompts.
    pub command_timeout: Duration,

    /// Number of bare newlines sent to unanswered prompts before the
    /// channel is closed.
    pub interactive_limit: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            prompt: "> ".to_string(),
            mode: Mode::Script,
            command_timeout: Duration::from_secs(60),
            interactive_limit: 100,
        }
    }
}

/// A switch CLI reached through a [`Shell`].
///
/// Sessions nest: the connection is opened on the first [`open`](Self::open)
/// and closed when the matching outermost [`close`](Self::close) runs.
/// [`run`](Self::run) wraps itself in a session, so a lone call connects and
/// disconnects around the command.
///
/// # Example
///
/// ```rust,no_run
/// use fabricsh::session::{Device, DeviceConfig, Mode, ScriptedShell};
///
/// # async fn example() -> Result<(), fabricsh::Error> {
/// let shell = ScriptedShell::new();
/// shell.expect("switchshow", "switchName: sw1\n");
/// let mut device = Device::new(shell, DeviceConfig::default());
///
/// let response = device
///     .session(async |dev: &mut Device<ScriptedShell>| dev.run(&["switchshow"]).await)
///     .await?;
/// assert_eq!(response.output(), "switchName: sw1");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Device<S: Shell> {
    shell: S,
    config: DeviceConfig,
    mode: Mode,
    session_depth: usize,
    retries: usize,
}

impl<S: Shell> Device<S> {
    pub fn new(shell: S, config: DeviceConfig) -> Self {
        let mode = config.mode;
        Self {
            shell,
            config,
            mode,
            session_depth: 0,
            retries: 0,
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn shell(&self) -> &S {
        &self.shell
    }

    pub fn shell_mut(&mut self) -> &mut S {
        &mut self.shell
    }

    /// Prompt literal used in response data.
    pub fn prompt(&self) -> &str {
        &self.config.prompt
    }

    /// Current nesting depth of sessions.
    pub fn session_depth(&self) -> usize {
        self.session_depth
    }

    /// Bare newlines sent during the last interactive command.
    pub fn last_retries(&self) -> usize {
        self.retries
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch the command mode, returning the previous one.
    pub fn set_mode(&mut self, mode: Mode) -> Mode {
        std::mem::replace(&mut self.mode, mode)
    }

    /// Enter a session, connecting if this is the outermost one.
    pub async fn open(&mut self) -> Result<()> {
        if self.session_depth == 0 && !self.shell.is_connected() {
            debug!("Opening connection");
            self.shell.connect().await?;
        }
        self.session_depth += 1;
        trace!("Session depth {}", self.session_depth);
        Ok(())
    }

    /// Leave a session, disconnecting when the outermost one ends.
    pub async fn close(&mut self) -> Result<()> {
        self.session_depth = self.session_depth.saturating_sub(1);
        trace!("Session depth {}", self.session_depth);
        if self.session_depth == 0 && self.shell.is_connected() {
            debug!("Closing connection");
            self.shell.disconnect().await?;
        }
        Ok(())
    }

    /// Run `f` inside a session.
    ///
    /// The session is left even when `f` fails; the error from `f` wins over
    /// an error from disconnecting.
    pub async fn session<T, F>(&mut self, f: F) -> Result<T>
    where
        F: AsyncFnOnce(&mut Self) -> Result<T>,
    {
        self.open().await?;
        let result = f(self).await;
        let closed = self.close().await;
        let value = result?;
        closed?;
        Ok(value)
    }

    /// Run `f` with `mode` in force, restoring the previous mode afterwards.
    pub async fn with_mode<T, F>(&mut self, mode: Mode, f: F) -> Result<T>
    where
        F: AsyncFnOnce(&mut Self) -> Result<T>,
    {
        let previous = self.set_mode(mode);
        let result = f(self).await;
        self.set_mode(previous);
        result
    }

    /// Run `commands` in the given mode without changing the device's mode.
    pub async fn run_in(&mut self, mode: Mode, commands: &[&str]) -> Result<Response> {
        let previous = self.set_mode(mode);
        let result = self.run(commands).await;
        self.set_mode(previous);
        result
    }

    /// Run commands and collect their output into a [`Response`].
    ///
    /// In [`Mode::Script`] every element is a command. In
    /// [`Mode::Interactive`] the first element is the command and the rest
    /// are answers to its prompts, in order.
    pub async fn run(&mut self, commands: &[&str]) -> Result<Response> {
        self.open().await?;
        let result = match self.mode {
            Mode::Script => self.run_script(commands).await,
            Mode::Interactive => self.run_interactive(commands).await,
        };
        let closed = self.close().await;
        let response = result?;
        closed?;
        Ok(response)
    }

    async fn run_script(&mut self, commands: &[&str]) -> Result<Response> {
        let mut response = Response::new(self.config.prompt.clone());
        let mut errors = Vec::new();
        let deadline = self.config.command_timeout;

        for command in commands {
            debug!("Running '{}'", command);
            let mut channel = self.shell.open_exec(command, false).await?;
            let mut stdout = BytesMut::new();
            let mut stderr = BytesMut::new();

            tokio::time::timeout(deadline, async {
                while let Some(event) = channel.next_event().await? {
                    match event {
                        ChannelEvent::Data(chunk) => stdout.extend_from_slice(&chunk),
                        ChannelEvent::ExtendedData(chunk) => stderr.extend_from_slice(&chunk),
                    }
                }
                Ok::<_, crate::Error>(())
            })
            .await
            .map_err(|_| TransportError::Timeout(deadline))??;

            trace!("'{}' returned {} bytes", command, stdout.len());
            response.data.push_str(&self.config.prompt);
            response.data.push_str(command);
            response.data.push('\n');
            response.data.push_str(&String::from_utf8_lossy(&stdout));
            response.data.push('\n');

            let stderr = String::from_utf8_lossy(&stderr);
            let stderr = stderr.trim();
            if !stderr.is_empty() {
                warn!("'{}' wrote to stderr: {}", command, stderr);
                errors.push(stderr.to_string());
            }
        }

        if !errors.is_empty() {
            let message = errors.join("\n");
            return Err(TransportError::CommandStderr { message }.into());
        }
        Ok(response)
    }

    async fn run_interactive(&mut self, commands: &[&str]) -> Result<Response> {
        let mut response = Response::new(self.config.prompt.clone());
        let Some((command, answers)) = commands.split_first() else {
            return Ok(response);
        };
        let deadline = self.config.command_timeout;

        debug!("Running '{}' interactively", command);
        let mut channel = self.shell.open_exec(command, true).await?;
        let mut output = BytesMut::new();
        let mut errors = BytesMut::new();
        self.retries = 0;

        tokio::time::timeout(
            deadline,
            self.interact(&mut channel, answers, &mut output, &mut errors),
        )
        .await
        .map_err(|_| TransportError::Timeout(deadline))??;

        response.data.push_str(&self.config.prompt);
        response.data.push_str(command);
        response.data.push('\n');
        response.data.push_str(&String::from_utf8_lossy(&output));
        response.errors = String::from_utf8_lossy(&errors).into_owned();
        Ok(response)
    }

    /// Feed answers to prompts until the channel closes.
    ///
    /// A chunk that does not end in a newline is a prompt. Prompts beyond
    /// the supplied answers get a bare newline, up to the retry limit; the
    /// next one closes the channel.
    async fn interact(
        &mut self,
        channel: &mut S::Channel,
        answers: &[&str],
        output: &mut BytesMut,
        errors: &mut BytesMut,
    ) -> Result<()> {
        let mut answers = answers.iter();
        let limit = self.config.interactive_limit;

        while let Some(event) = channel.next_event().await? {
            let chunk = match event {
                ChannelEvent::Data(chunk) => ansi::strip(&chunk),
                ChannelEvent::ExtendedData(chunk) => {
                    errors.extend_from_slice(&chunk);
                    continue;
                }
            };
            output.extend_from_slice(&chunk);
            if chunk.last().is_none_or(|&b| b == b'\n') {
                continue;
            }

            trace!("Prompt: {:?}", String::from_utf8_lossy(&chunk));
            if let Some(answer) = answers.next() {
                let line = format!("{answer}\n");
                channel.send(line.as_bytes()).await?;
                output.extend_from_slice(line.as_bytes());
            } else if self.retries < limit {
                channel.send(b"\n").await?;
                output.extend_from_slice(b"\n");
                self.retries += 1;
            } else {
                warn!("Giving up after {} unanswered prompts", self.retries);
                channel.close().await?;
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ScriptedShell;

    fn device(shell: &ScriptedShell) -> Device<ScriptedShell> {
        Device::new(shell.clone(), DeviceConfig::default())
    }

    #[tokio::test]
    async fn test_script_mode_layout() {
        let shell = ScriptedShell::new();
        shell.expect("switchshow", "switchName: sw1");
        shell.expect("version", "Kernel: 2.6.14\n");
        let mut dev = device(&shell);

        let response = dev.run(&["switchshow", "version"]).await.unwrap();
        assert_eq!(
            response.data,
            "> switchshow\nswitchName: sw1\n> version\nKernel: 2.6.14\n\n"
        );
        assert_eq!(shell.log().connects(), 1);
        assert_eq!(shell.log().disconnects(), 1);
    }

    #[tokio::test]
    async fn test_script_mode_stderr_is_error() {
        let shell = ScriptedShell::new();
        shell.expect_stderr("cfgshow \"nope\"", "", "does not exist\n");
        let mut dev = device(&shell);

        let err = dev.run(&["cfgshow \"nope\""]).await.unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Transport(TransportError::CommandStderr { ref message }) if message == "does not exist"
        ));
        assert_eq!(dev.session_depth(), 0);
    }

    #[tokio::test]
    async fn test_nested_sessions_connect_once() {
        let shell = ScriptedShell::new();
        shell.expect("switchshow", "");
        shell.expect("version", "");
        let mut dev = device(&shell);

        dev.session(async |dev: &mut Device<ScriptedShell>| {
            dev.session(async |dev: &mut Device<ScriptedShell>| {
                assert_eq!(dev.session_depth(), 2);
                dev.run(&["switchshow"]).await
            })
            .await?;
            dev.run(&["version"]).await
        })
        .await
        .unwrap();

        assert_eq!(shell.log().connects(), 1);
        assert_eq!(shell.log().disconnects(), 1);
        assert_eq!(dev.session_depth(), 0);
    }

    #[tokio::test]
    async fn test_session_closes_on_error() {
        let shell = ScriptedShell::new();
        let mut dev = device(&shell);

        let result: Result<()> = dev
            .session(async |dev: &mut Device<ScriptedShell>| {
                dev.run(&["unexpected"]).await?;
                Ok(())
            })
            .await;
        assert!(result.is_err());
        assert_eq!(dev.session_depth(), 0);
        assert_eq!(shell.log().disconnects(), 1);
    }

    #[tokio::test]
    async fn test_interactive_answers_in_order() {
        let shell = ScriptedShell::new();
        shell.expect_interactive(
            "cfgsave",
            &["Do you want to save the Defined zoning configuration? (yes, y, no, n): [no] ", "Updating flash ...\n"],
        );
        let mut dev = device(&shell);

        let response = dev.run_in(Mode::Interactive, &["cfgsave", "y"]).await.unwrap();
        assert_eq!(shell.log().sent(), vec!["y\n".to_string()]);
        assert!(response.contains("Updating flash"));
        assert!(response.data.starts_with("> cfgsave\n"));
        assert_eq!(dev.mode(), Mode::Script);
        assert_eq!(dev.last_retries(), 0);
    }

    #[tokio::test]
    async fn test_interactive_retry_cap() {
        let shell = ScriptedShell::new();
        let prompts = vec!["Continue? "; 150];
        shell.expect_interactive("cfgenable \"c1\"", &prompts);
        let mut dev = device(&shell);

        dev.run_in(Mode::Interactive, &["cfgenable \"c1\""]).await.unwrap();
        assert_eq!(dev.last_retries(), 100);
        assert_eq!(shell.log().sent().len(), 100);
        assert_eq!(shell.log().closes(), 1);
    }

    #[tokio::test]
    async fn test_interactive_stderr_collected() {
        let shell = ScriptedShell::new();
        shell.expect_interactive_stderr("cfgsave", &["done\n"], "warning\n");
        let mut dev = device(&shell);

        let response = dev.run_in(Mode::Interactive, &["cfgsave"]).await.unwrap();
        assert_eq!(response.errors, "warning\n");
    }

    #[tokio::test]
    async fn test_with_mode_restores() {
        let shell = ScriptedShell::new();
        shell.expect_interactive("cfgsave", &["Nothing changed: nothing to save\n"]);
        let mut dev = device(&shell);

        let result: Result<Response> = dev
            .with_mode(Mode::Interactive, async |dev: &mut Device<ScriptedShell>| {
                assert_eq!(dev.mode(), Mode::Interactive);
                dev.run(&["cfgsave"]).await
            })
            .await;
        assert!(result.unwrap().contains("nothing to save"));
        assert_eq!(dev.mode(), Mode::Script);
    }

    #[test]
    fn test_config_defaults() {
        let config = DeviceConfig::default();
        assert_eq!(config.prompt, "> ");
        assert_eq!(config.mode, Mode::Script);
        assert_eq!(config.command_timeout, Duration::from_secs(60));
        assert_eq!(config.interactive_limit, 100);
    }
}

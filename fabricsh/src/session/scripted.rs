//! An in-memory [`Shell`] that replays canned switch output.
//!
//! Used to exercise the read and write paths without a switch. Each expected
//! command is queued with the chunks it produces; commands must arrive in
//! the queued order.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use log::trace;

use super::{ChannelEvent, Shell, ShellChannel};
use crate::error::{ChannelError, Result, TransportError};

#[derive(Debug)]
struct Expectation {
    command: String,
    events: VecDeque<ChannelEvent>,
}

#[derive(Debug, Default)]
struct LogState {
    connects: usize,
    disconnects: usize,
    commands: Vec<String>,
    sent: Vec<String>,
    closes: usize,
}

/// Record of everything a [`ScriptedShell`] saw.
#[derive(Debug, Clone, Default)]
pub struct ScriptLog {
    state: Arc<Mutex<LogState>>,
}

impl ScriptLog {
    fn state(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn connects(&self) -> usize {
        self.state().connects
    }

    pub fn disconnects(&self) -> usize {
        self.state().disconnects
    }

    /// Commands exec'd, in order.
    pub fn commands(&self) -> Vec<String> {
        self.state().commands.clone()
    }

    /// Data written to channels, one entry per write.
    pub fn sent(&self) -> Vec<String> {
        self.state().sent.clone()
    }

    /// Channels closed from the client side.
    pub fn closes(&self) -> usize {
        self.state().closes
    }

    /// How many times `command` was exec'd.
    pub fn count(&self, command: &str) -> usize {
        self.state().commands.iter().filter(|c| *c == command).count()
    }
}

/// Replaying shell. Clones share the same queue and log.
#[derive(Debug, Clone, Default)]
pub struct ScriptedShell {
    queue: Arc<Mutex<VecDeque<Expectation>>>,
    log: ScriptLog,
    connected: bool,
}

impl ScriptedShell {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, command: &str, events: VecDeque<ChannelEvent>) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Expectation {
                command: command.to_string(),
                events,
            });
    }

    /// Expect `command` and reply with `stdout`.
    pub fn expect(&self, command: &str, stdout: &str) -> &Self {
        self.expect_stderr(command, stdout, "")
    }

    /// Expect `command` and reply with `stdout` and `stderr`.
    pub fn expect_stderr(&self, command: &str, stdout: &str, stderr: &str) -> &Self {
        let mut events = VecDeque::new();
        if !stdout.is_empty() {
            events.push_back(ChannelEvent::Data(Bytes::copy_from_slice(stdout.as_bytes())));
        }
        if !stderr.is_empty() {
            events.push_back(ChannelEvent::ExtendedData(Bytes::copy_from_slice(stderr.as_bytes())));
        }
        self.push(command, events);
        self
    }

    /// Expect `command` and emit `chunks` one event at a time.
    ///
    /// A chunk without a trailing newline reads as a prompt.
    pub fn expect_interactive(&self, command: &str, chunks: &[&str]) -> &Self {
        self.expect_interactive_stderr(command, chunks, "")
    }

    /// Like [`expect_interactive`](Self::expect_interactive) with stderr after the chunks.
    pub fn expect_interactive_stderr(&self, command: &str, chunks: &[&str], stderr: &str) -> &Self {
        let mut events: VecDeque<ChannelEvent> = chunks
            .iter()
            .map(|c| ChannelEvent::Data(Bytes::copy_from_slice(c.as_bytes())))
            .collect();
        if !stderr.is_empty() {
            events.push_back(ChannelEvent::ExtendedData(Bytes::copy_from_slice(stderr.as_bytes())));
        }
        self.push(command, events);
        self
    }

    pub fn log(&self) -> &ScriptLog {
        &self.log
    }

    /// Expectations not yet consumed.
    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Shell for ScriptedShell {
    type Channel = ScriptedChannel;

    async fn connect(&mut self) -> Result<()> {
        self.log.state().connects += 1;
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.log.state().disconnects += 1;
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn open_exec(&mut self, command: &str, _pty: bool) -> Result<ScriptedChannel> {
        if !self.connected {
            return Err(TransportError::NotConnected.into());
        }
        self.log.state().commands.push(command.to_string());
        trace!("scripted exec '{}'", command);

        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        match queue.front() {
            Some(next) if next.command == command => {}
            Some(next) => {
                return Err(ChannelError::UnexpectedCommand {
                    expected: format!("'{}'", next.command),
                    actual: command.to_string(),
                }
                .into());
            }
            None => {
                return Err(ChannelError::UnexpectedCommand {
                    expected: "no more commands".to_string(),
                    actual: command.to_string(),
                }
                .into());
            }
        }
        let expectation = queue.pop_front().ok_or_else(|| ChannelError::ExecFailed {
            command: command.to_string(),
            message: "script exhausted".to_string(),
        })?;
        Ok(ScriptedChannel {
            events: expectation.events,
            log: self.log.clone(),
            closed: false,
        })
    }
}

/// Channel handed out by [`ScriptedShell`].
#[derive(Debug)]
pub struct ScriptedChannel {
    events: VecDeque<ChannelEvent>,
    log: ScriptLog,
    closed: bool,
}

impl ShellChannel for ScriptedChannel {
    async fn next_event(&mut self) -> Result<Option<ChannelEvent>> {
        if self.closed {
            return Ok(None);
        }
        Ok(self.events.pop_front())
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if self.closed {
            return Err(ChannelError::SendFailed("channel closed".to_string()).into());
        }
        self.log
            .state()
            .sent
            .push(String::from_utf8_lossy(data).into_owned());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.log.state().closes += 1;
        Ok(())
    }
}

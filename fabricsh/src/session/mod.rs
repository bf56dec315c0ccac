//! Command sessions over a remote shell.
//!
//! The [`Shell`] trait is the boundary to the physical connection: connect,
//! exec one command on a fresh channel (optionally PTY-backed), stream its
//! output, disconnect. [`Device`] builds on it with reference-counted
//! sessions and the two command styles the switch CLI needs.

mod ansi;
mod device;
mod scripted;

pub use device::{Device, DeviceConfig};
pub use scripted::{ScriptLog, ScriptedShell};

use std::future::Future;

use bytes::Bytes;
use serde::Deserialize;

use crate::error::Result;

/// How [`Device::run`] drives commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Each argument is a command; stdout and stderr are collected.
    #[default]
    Script,
    /// The first argument is a command, the rest answer its prompts.
    Interactive,
}

/// A chunk received on an exec channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Standard output.
    Data(Bytes),
    /// Standard error.
    ExtendedData(Bytes),
}

/// One exec channel.
pub trait ShellChannel: Send {
    /// Next chunk of output, or `None` once the remote side closed.
    fn next_event(&mut self) -> impl Future<Output = Result<Option<ChannelEvent>>> + Send;

    /// Write to the command's stdin.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Close the channel from our side.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// A physical connection able to exec commands.
pub trait Shell: Send {
    type Channel: ShellChannel;

    /// Open the connection and authenticate.
    fn connect(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Close the connection.
    fn disconnect(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Check if the connection is open.
    fn is_connected(&self) -> bool;

    /// Exec `command` on a new channel, requesting a PTY first when `pty` is set.
    fn open_exec(
        &mut self,
        command: &str,
        pty: bool,
    ) -> impl Future<Output = Result<Self::Channel>> + Send;
}

//! SSH transport layer wrapping russh.
//!
//! [`SshTransport`] implements [`Shell`](crate::session::Shell): one SSH
//! connection per session, one exec channel per command.

pub mod config;
mod ssh;

pub use config::{AuthMethod, HostKeyVerification, SshConfig};
pub use ssh::{SshChannel, SshTransport};

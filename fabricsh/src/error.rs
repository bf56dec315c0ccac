//! Error types for fabricsh.

use std::io;
use thiserror::Error;

/// Main error type for fabricsh operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Exec channel errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Naming rule violations caught before any command is sent
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Read-path errors
    #[error("Fabric error: {0}")]
    Fabric(#[from] FabricError),

    /// Write-path and transaction protocol errors
    #[error("Provisioning error: {0}")]
    Provisioning(#[from] ProvisioningError),
}

/// Transport layer errors (SSH connection, authentication, command output).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host key does not match the known_hosts entry
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Host is missing from known_hosts in strict mode
    #[error("Host key for {host}:{port} is not in known_hosts")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Builder was given incomplete connection settings
    #[error("Invalid connection settings: {0}")]
    InvalidConfig(String),

    /// Command was run while no connection is open
    #[error("Not connected")]
    NotConnected,

    /// A script-mode command wrote to stderr
    #[error("{message}")]
    CommandStderr { message: String },

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Exec channel errors.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Failed to open a session channel or request exec on it
    #[error("Failed to set up exec channel for '{command}': {message}")]
    ExecFailed { command: String, message: String },

    /// Failed to send data on the channel
    #[error("Failed to send data: {0}")]
    SendFailed(String),

    /// A replay shell received a command it did not expect
    #[error("Unexpected command '{actual}', expected {expected}")]
    UnexpectedCommand { expected: String, actual: String },
}

/// Naming rule violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Object name does not match the zoning naming rule
    #[error("Incorrect name format \"{0}\"")]
    InvalidName(String),

    /// Member does not match the member rule of its object kind
    #[error("Incorrect member format \"{0}\"")]
    InvalidMember(String),

    /// WWN value is not 8 colon separated hex bytes
    #[error("Incorrect value format \"{0}\"")]
    InvalidWwn(String),
}

/// Read-path errors.
#[derive(Error, Debug)]
pub enum FabricError {
    /// Attribute name is not in the attribute table
    #[error("Unknown attribute '{0}'")]
    UnknownAttribute(String),

    /// A parsed value had an unexpected shape
    #[error("Unexpected value for '{key}'")]
    UnexpectedValue { key: String },
}

/// Write-path and transaction protocol errors.
///
/// The messages match the text operators see from the switch tooling.
#[derive(Error, Debug)]
pub enum ProvisioningError {
    /// Account lacks the RBAC rights to change zoning
    #[error("User has insufficient rights to do provisioning")]
    InsufficientRights,

    /// A transaction owned by someone else is open on the fabric
    #[error("Another zoning transaction is already in progress")]
    TransactionInProgress,

    /// The transaction lock could not be acquired
    #[error("Transaction could not be locked")]
    TransactionUnlockable,

    /// cfgtransshow output was not recognized
    #[error("Unexpected transaction state")]
    UnexpectedTransactionState,

    /// Abort was attempted on a transaction owned by someone else
    #[error("Cannot abort transaction you are not owner of")]
    NotOwner,

    /// The save prompt was answered but the switch cancelled
    #[error("cfgsave was cancelled")]
    SaveCancelled,

    /// The save found nothing to commit after a mutation
    #[error("cfgsave: nothing changed, nothing to save")]
    NothingToSave,

    /// Create was called on an object with no members
    #[error("Members of the object cannot be empty")]
    MembersEmpty,

    /// Referenced object is missing on the fabric
    #[error("{kind} {name} does not exist")]
    DoesNotExist { kind: String, name: String },

    /// The switch rejected a mutating command
    #[error("{0}")]
    Rejected(String),

    /// The switch answered a save or enable with unrecognized text
    #[error("Unrecognized response: {0}")]
    Unrecognized(String),
}

/// Result type alias using fabricsh's Error.
pub type Result<T> = std::result::Result<T, Error>;

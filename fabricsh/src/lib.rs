//! # fabricsh
//!
//! Async SSH client for Brocade Fibre Channel switches: read the fabric and
//! manage zoning through the switch CLI.
//!
//! ## Features
//!
//! - Async SSH exec channels via russh, with script and interactive modes
//! - Parsers for `switchshow`, `cfgshow`, `nsshow` and friends into records
//! - Validated zoning objects: aliases, zones and zone configurations
//! - Provisioning that follows the fabric's zoning transaction protocol
//! - A replay shell for testing without a switch
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fabricsh::fabric::SwitchBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fabricsh::Error> {
//!     let mut switch = SwitchBuilder::new("192.168.1.10")
//!         .username("admin")
//!         .password("secret")
//!         .connect()
//!         .await?;
//!
//!     println!("{:?} runs {:?}", switch.name(false).await?, switch.firmware(false).await?);
//!     for zone in switch.zones(false).await? {
//!         println!("{} {:?}", zone.name(), zone.members());
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod fabric;
pub mod model;
pub mod parser;
pub mod provisioning;
pub mod session;
pub mod transport;

// Re-export main types for convenience
pub use error::{
    ChannelError, Error, FabricError, ProvisioningError, Result, TransportError, ValidationError,
};
pub use fabric::{Switch, SwitchBuilder};
pub use provisioning::Agent;
pub use session::{Device, DeviceConfig, Mode, ScriptedShell, Shell};
pub use transport::{AuthMethod, SshConfig};

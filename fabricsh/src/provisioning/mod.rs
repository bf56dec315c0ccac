//! Zoning changes: aliases, zones and configurations created, changed and
//! removed under the fabric's zoning transaction.
//!
//! The switch keeps a single pending-change buffer per fabric. Nothing a
//! command changes is visible to the fabric until `cfgsave` commits it, and
//! only one session may hold the buffer at a time. [`Agent`] wraps a
//! [`Switch`](crate::fabric::Switch) and follows that protocol for every
//! change.
//!
//! ```rust,no_run
//! use fabricsh::fabric::SwitchBuilder;
//! use fabricsh::model::{Alias, Zone};
//!
//! # async fn example() -> Result<(), fabricsh::Error> {
//! let mut agent = SwitchBuilder::new("san-sw1")
//!     .username("zoneadmin")
//!     .password("secret")
//!     .agent()
//!     .await?;
//!
//! let host = Alias::new("host_a", ["50:00:10:20:30:40:50:60"])?;
//! let zone = Zone::new("z_host_a", ["host_a", "50:00:10:20:30:40:50:61"])?;
//! agent
//!     .transaction(async |agent| {
//!         agent.alias_create(&host).await?;
//!         agent.zone_create(&zone).await
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod agent;
mod lock;

pub use agent::Agent;
pub use lock::{LOCK_ALIAS, LOCK_MEMBER, LockResult};

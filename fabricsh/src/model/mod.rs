//! Zoning value types.
//!
//! Aliases, zones and zone configurations validate their name and every
//! member on construction. They are immutable once built: changing an
//! object on the fabric means deleting and recreating it, or using the
//! add/remove member operations of the provisioning agent.

mod alias;
pub mod naming;
mod transaction;
mod wwn;
mod zone;
mod zone_configuration;

pub use alias::Alias;
pub use transaction::{Transaction, TransactionId};
pub use wwn::Wwn;
pub use zone::{Zone, ZoneMember};
pub use zone_configuration::ZoneConfiguration;

use std::fmt;

use serde::Serialize;

use crate::error::ValidationError;

/// The three kinds of zoning objects the switch stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Cfg,
    Zone,
    Alias,
}

impl ObjectKind {
    /// Probe order used when the kind of a name is unknown.
    pub const ALL: [ObjectKind; 3] = [ObjectKind::Cfg, ObjectKind::Zone, ObjectKind::Alias];

    /// Command prefix, also the key used by `cfgshow` and `configshow`.
    pub fn key(self) -> &'static str {
        match self {
            ObjectKind::Cfg => "cfg",
            ObjectKind::Zone => "zone",
            ObjectKind::Alias => "alias",
        }
    }

    /// Human label used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            ObjectKind::Cfg => "Config",
            ObjectKind::Zone => "Zone",
            ObjectKind::Alias => "Alias",
        }
    }

    fn verb_prefix(self) -> &'static str {
        match self {
            ObjectKind::Cfg => "cfg",
            ObjectKind::Zone => "zone",
            ObjectKind::Alias => "ali",
        }
    }

    pub fn create_command(self) -> String {
        format!("{}create", self.verb_prefix())
    }

    pub fn delete_command(self) -> String {
        format!("{}delete", self.verb_prefix())
    }

    pub fn add_command(self) -> String {
        format!("{}add", self.verb_prefix())
    }

    pub fn remove_command(self) -> String {
        format!("{}remove", self.verb_prefix())
    }

    /// Command printing one object of this kind.
    pub fn show_command(self) -> String {
        format!("{}show", self.verb_prefix())
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Behavior shared by aliases, zones and zone configurations.
pub trait ZoningObject: Sized + Clone + Send + Sync {
    /// Kind of this object on the switch.
    const KIND: ObjectKind;

    fn name(&self) -> &str;

    fn members(&self) -> &[String];

    /// Build from a parsed `name -> members` entry, validating both.
    fn from_entry(name: &str, members: &[String]) -> Result<Self, ValidationError>;

    /// Check a single member against this kind's member rule.
    fn verify_member(member: &str) -> Result<(), ValidationError>;
}

/// Any zoning object, as returned by searches spanning several kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ZoningEntity {
    Cfg(ZoneConfiguration),
    Zone(Zone),
    Alias(Alias),
}

impl ZoningEntity {
    pub fn kind(&self) -> ObjectKind {
        match self {
            ZoningEntity::Cfg(_) => ObjectKind::Cfg,
            ZoningEntity::Zone(_) => ObjectKind::Zone,
            ZoningEntity::Alias(_) => ObjectKind::Alias,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ZoningEntity::Cfg(c) => c.name(),
            ZoningEntity::Zone(z) => z.name(),
            ZoningEntity::Alias(a) => a.name(),
        }
    }

    pub fn members(&self) -> &[String] {
        match self {
            ZoningEntity::Cfg(c) => c.members(),
            ZoningEntity::Zone(z) => z.members(),
            ZoningEntity::Alias(a) => a.members(),
        }
    }

    /// Build an entity of the given kind from a parsed entry.
    pub fn from_entry(
        kind: ObjectKind,
        name: &str,
        members: &[String],
    ) -> Result<Self, ValidationError> {
        Ok(match kind {
            ObjectKind::Cfg => ZoningEntity::Cfg(ZoneConfiguration::from_entry(name, members)?),
            ObjectKind::Zone => ZoningEntity::Zone(Zone::from_entry(name, members)?),
            ObjectKind::Alias => ZoningEntity::Alias(Alias::from_entry(name, members)?),
        })
    }
}

impl From<Alias> for ZoningEntity {
    fn from(value: Alias) -> Self {
        ZoningEntity::Alias(value)
    }
}

impl From<Zone> for ZoningEntity {
    fn from(value: Zone) -> Self {
        ZoningEntity::Zone(value)
    }
}

impl From<ZoneConfiguration> for ZoningEntity {
    fn from(value: ZoneConfiguration) -> Self {
        ZoningEntity::Cfg(value)
    }
}

impl fmt::Display for ZoningEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_commands() {
        assert_eq!(ObjectKind::Alias.create_command(), "alicreate");
        assert_eq!(ObjectKind::Zone.remove_command(), "zoneremove");
        assert_eq!(ObjectKind::Cfg.add_command(), "cfgadd");
        assert_eq!(ObjectKind::Alias.show_command(), "alishow");
        assert_eq!(ObjectKind::Alias.key(), "alias");
    }

    #[test]
    fn test_entity_from_entry() {
        let members = vec!["zone1".to_string(), "zone2".to_string()];
        let entity = ZoningEntity::from_entry(ObjectKind::Cfg, "cfgtest", &members).unwrap();
        assert_eq!(entity.kind(), ObjectKind::Cfg);
        assert_eq!(entity.name(), "cfgtest");
        assert_eq!(entity.members(), members.as_slice());

        assert!(ZoningEntity::from_entry(ObjectKind::Alias, "a1", &members).is_err());
    }
}

use std::fmt;

use serde::Serialize;

use super::naming::{verify_cfg_member, verify_name};
use super::{ObjectKind, ZoningObject};
use crate::error::ValidationError;

/// A named set of zones. At most one configuration per fabric is effective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneConfiguration {
    name: String,
    effective: bool,
    members: Vec<String>,
}

impl ZoneConfiguration {
    pub fn new<I, M>(name: impl Into<String>, members: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        let name = name.into();
        verify_name(&name)?;
        let members = members
            .into_iter()
            .map(|m| {
                let m = m.into();
                verify_cfg_member(&m).map(|_| m)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name,
            effective: false,
            members,
        })
    }

    pub fn named(name: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(name, Vec::<String>::new())
    }

    pub fn with_effective(mut self, effective: bool) -> Self {
        self.effective = effective;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when this is the configuration the fabric enforces.
    pub fn effective(&self) -> bool {
        self.effective
    }

    /// Zone names, in order.
    pub fn members(&self) -> &[String] {
        &self.members
    }
}

impl ZoningObject for ZoneConfiguration {
    const KIND: ObjectKind = ObjectKind::Cfg;

    fn name(&self) -> &str {
        &self.name
    }

    fn members(&self) -> &[String] {
        &self.members
    }

    fn from_entry(name: &str, members: &[String]) -> Result<Self, ValidationError> {
        Self::new(name, members.iter().cloned())
    }

    fn verify_member(member: &str) -> Result<(), ValidationError> {
        verify_cfg_member(member)
    }
}

impl fmt::Display for ZoneConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_members_keep_order() {
        let cfg = ZoneConfiguration::new("cfg_prod", ["zone_b", "zone_a"]).unwrap();
        assert_eq!(cfg.name(), "cfg_prod");
        assert_eq!(cfg.members(), ["zone_b", "zone_a"]);
        assert_eq!(cfg.to_string(), "cfg_prod");
    }

    #[test]
    fn test_effective_flag() {
        let cfg = ZoneConfiguration::named("cfg_prod").unwrap();
        assert!(!cfg.effective());
        assert!(cfg.with_effective(true).effective());
    }

    #[test]
    fn test_invalid_name_and_members() {
        assert_eq!(
            ZoneConfiguration::named("1cfg"),
            Err(ValidationError::InvalidName("1cfg".into()))
        );
        // zones only, never hardware members
        assert_eq!(
            ZoneConfiguration::new("cfg1", ["50:00:10:20:30:40:50:60"]),
            Err(ValidationError::InvalidMember("50:00:10:20:30:40:50:60".into()))
        );
        assert!(ZoneConfiguration::new("cfg1", ["zone-1"]).is_err());
    }
}

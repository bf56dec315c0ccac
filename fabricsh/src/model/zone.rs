use std::fmt;

use serde::Serialize;

use super::naming::{verify_name, verify_zone_member};
use super::{Alias, ObjectKind, Wwn, ZoningObject};
use crate::error::ValidationError;

/// A member given to a zone: literal text, or an alias or WWN object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneMember {
    /// Alias name, WWN or `domain,index` written out as text.
    Text(String),
    Alias(Alias),
    Wwn(Wwn),
}

impl ZoneMember {
    /// The text the switch sees for this member.
    pub fn as_str(&self) -> &str {
        match self {
            ZoneMember::Text(s) => s,
            ZoneMember::Alias(a) => a.name(),
            ZoneMember::Wwn(w) => w.value(),
        }
    }
}

impl From<&str> for ZoneMember {
    fn from(value: &str) -> Self {
        ZoneMember::Text(value.to_string())
    }
}

impl From<String> for ZoneMember {
    fn from(value: String) -> Self {
        ZoneMember::Text(value)
    }
}

impl From<&String> for ZoneMember {
    fn from(value: &String) -> Self {
        ZoneMember::Text(value.clone())
    }
}

impl From<Alias> for ZoneMember {
    fn from(value: Alias) -> Self {
        ZoneMember::Alias(value)
    }
}

impl From<Wwn> for ZoneMember {
    fn from(value: Wwn) -> Self {
        ZoneMember::Wwn(value)
    }
}

impl fmt::Display for ZoneMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A zone: an ordered list of aliases, WWNs and ports allowed to talk.
///
/// Member order is kept as given; it is what the switch receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Zone {
    name: String,
    active: bool,
    members: Vec<String>,
}

impl Zone {
    pub fn new<I, M>(name: impl Into<String>, members: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = M>,
        M: Into<ZoneMember>,
    {
        let name = name.into();
        verify_name(&name)?;
        let members = members
            .into_iter()
            .map(|m| {
                let m = m.into();
                verify_zone_member(m.as_str()).map(|_| m.as_str().to_string())
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name,
            active: false,
            members,
        })
    }

    /// A zone with no members, used to address an existing zone by name.
    pub fn named(name: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(name, Vec::<String>::new())
    }

    /// Mark whether the effective configuration includes this zone.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when the zone is a member of the effective configuration.
    pub fn active(&self) -> bool {
        self.active
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }
}

impl ZoningObject for Zone {
    const KIND: ObjectKind = ObjectKind::Zone;

    fn name(&self) -> &str {
        &self.name
    }

    fn members(&self) -> &[String] {
        &self.members
    }

    fn from_entry(name: &str, members: &[String]) -> Result<Self, ValidationError> {
        Self::new(name, members)
    }

    fn verify_member(member: &str) -> Result<(), ValidationError> {
        verify_zone_member(member)
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

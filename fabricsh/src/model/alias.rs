use std::fmt;

use serde::Serialize;

use super::naming::{verify_alias_member, verify_name};
use super::{ObjectKind, ZoningObject};
use crate::error::ValidationError;

/// A named list of hardware identifiers (WWNs or `domain,index` ports).
///
/// ```rust
/// use fabricsh::model::Alias;
///
/// let alias = Alias::new("host_a", ["50:00:10:20:30:40:50:60", "1,4"]).unwrap();
/// assert_eq!(alias.members().len(), 2);
/// assert!(Alias::new("host_a", ["host_b"]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alias {
    name: String,
    members: Vec<String>,
}

impl Alias {
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
                verify_alias_member(&m).map(|_| m)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { name, members })
    }

    /// An alias with no members, used to address an existing alias by name.
    pub fn named(name: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(name, Vec::<String>::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }
}

impl ZoningObject for Alias {
    const KIND: ObjectKind = ObjectKind::Alias;

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
        verify_alias_member(member)
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_alias() {
        let alias = Alias::new("test", ["50:00:10:20:30:40:50:60", "2,61"]).unwrap();
        assert_eq!(alias.name(), "test");
        assert_eq!(alias.members(), ["50:00:10:20:30:40:50:60", "2,61"]);
        assert_eq!(alias.to_string(), "test");
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(
            Alias::named("1test"),
            Err(ValidationError::InvalidName("1test".into()))
        );
        assert_eq!(
            Alias::new("test", ["50:00"]),
            Err(ValidationError::InvalidMember("50:00".into()))
        );
    }
}

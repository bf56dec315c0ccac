//! Naming and member rules shared by all zoning objects.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ValidationError;

/// Leading letter, then letters, digits or underscores.
static NAME_RULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z][a-z_\d]*$").expect("valid name rule"));

static WWN_RULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([\da-f]{2}:){7}[\da-f]{2}$").expect("valid wwn rule"));

static PORT_RULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,3},\d{1,3}$").expect("valid port rule"));

/// Check an alias, zone or configuration name.
pub fn verify_name(name: &str) -> Result<(), ValidationError> {
    if NAME_RULE.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::InvalidName(name.to_string()))
    }
}

/// True for a colon separated 8-byte hex WWN.
pub fn is_wwn(value: &str) -> bool {
    WWN_RULE.is_match(value)
}

/// True for `domain,index` port notation.
pub fn is_port(value: &str) -> bool {
    PORT_RULE.is_match(value)
}

/// True for anything an alias may hold: a WWN or a `domain,index` pair.
pub fn is_hardware_member(value: &str) -> bool {
    is_wwn(value) || is_port(value)
}

/// Alias members are hardware identifiers only.
pub fn verify_alias_member(member: &str) -> Result<(), ValidationError> {
    if is_hardware_member(member) {
        Ok(())
    } else {
        Err(ValidationError::InvalidMember(member.to_string()))
    }
}

/// Zone members are hardware identifiers or alias names.
pub fn verify_zone_member(member: &str) -> Result<(), ValidationError> {
    if is_hardware_member(member) || NAME_RULE.is_match(member) {
        Ok(())
    } else {
        Err(ValidationError::InvalidMember(member.to_string()))
    }
}

/// Configuration members are zone names.
pub fn verify_cfg_member(member: &str) -> Result<(), ValidationError> {
    if NAME_RULE.is_match(member) {
        Ok(())
    } else {
        Err(ValidationError::InvalidMember(member.to_string()))
    }
}

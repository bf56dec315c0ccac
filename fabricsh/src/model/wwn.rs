use std::fmt;

use serde::Serialize;

use super::naming::is_wwn;
use crate::error::ValidationError;

/// A device port as seen by the name server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wwn {
    value: String,
    dev_type: String,
    domain_id: u32,
    port_index: u32,
    symbol: String,
}

impl Wwn {
    /// Domain 0 means the entry carries no domain; the fabric client
    /// replaces it with the local switch's domain.
    pub fn new(
        value: impl Into<String>,
        dev_type: impl Into<String>,
        domain_id: u32,
        port_index: u32,
    ) -> Result<Self, ValidationError> {
        let value = value.into();
        if !is_wwn(&value) {
            return Err(ValidationError::InvalidWwn(value));
        }
        Ok(Self {
            value,
            dev_type: dev_type.into(),
            domain_id,
            port_index,
            symbol: String::new(),
        })
    }

    /// Attach the symbolic name reported by the device.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Same as `value`; lets a WWN stand where a named object is expected.
    pub fn name(&self) -> &str {
        &self.value
    }

    pub fn dev_type(&self) -> &str {
        &self.dev_type
    }

    pub fn domain_id(&self) -> u32 {
        self.domain_id
    }

    pub fn port_index(&self) -> u32 {
        self.port_index
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

impl fmt::Display for Wwn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

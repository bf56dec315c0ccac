//! Typed views over the table rows the parser stores as records.

use serde::Serialize;

use crate::parser::{Record, Value};

fn text(record: &Record, key: &str) -> String {
    record
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn int(record: &Record, key: &str) -> i64 {
    record.get(key).and_then(Value::as_int).unwrap_or_default()
}

fn flag(record: &Record, key: &str) -> bool {
    record.get(key).and_then(Value::as_bool).unwrap_or_default()
}

/// Read every map in a list value with `f`.
pub(crate) fn rows<T>(value: &Value, f: impl Fn(&Record) -> T) -> Vec<T> {
    value
        .as_list()
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_map)
        .map(f)
        .collect()
}

/// One row of the `switchshow` port table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Port {
    pub index: i64,
    /// Blade slot; `None` on fixed-port switches.
    pub slot: Option<i64>,
    pub port: i64,
    pub address: String,
    pub media: String,
    pub speed: String,
    pub state: String,
    pub proto: String,
    pub comment: String,
}

impl Port {
    pub(crate) fn from_record(record: &Record) -> Self {
        Self {
            index: int(record, "index"),
            slot: record.get("slot").and_then(Value::as_int),
            port: int(record, "port"),
            address: text(record, "address"),
            media: text(record, "media"),
            speed: text(record, "speed"),
            state: text(record, "state"),
            proto: text(record, "proto"),
            comment: text(record, "comment"),
        }
    }

    pub fn is_online(&self) -> bool {
        self.state.eq_ignore_ascii_case("online")
    }
}

/// One switch listed by `fabricshow`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FabricMember {
    pub domain_id: i64,
    pub sid: String,
    pub wwn: String,
    pub eth_ip: String,
    pub fc_ip: String,
    pub name: String,
    /// The switch we are connected to.
    pub local: bool,
}

impl FabricMember {
    pub(crate) fn from_record(record: &Record) -> Self {
        Self {
            domain_id: int(record, "domain_id"),
            sid: text(record, "sid"),
            wwn: text(record, "wwn"),
            eth_ip: text(record, "eth_ip"),
            fc_ip: text(record, "fc_ip"),
            name: text(record, "name"),
            local: flag(record, "local"),
        }
    }
}

/// One inter-switch link from `islshow`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IslLink {
    pub id: i64,
    pub source_port: i64,
    pub destination_port: i64,
    pub destination_wwn: String,
    pub destination_domain: i64,
    pub destination_name: String,
    pub speed: String,
    pub bandwidth: String,
    pub flags: String,
}

impl IslLink {
    pub(crate) fn from_record(record: &Record) -> Self {
        Self {
            id: int(record, "id"),
            source_port: int(record, "source_port"),
            destination_port: int(record, "destination_port"),
            destination_wwn: text(record, "destination_wwn"),
            destination_domain: int(record, "destination_domain"),
            destination_name: text(record, "destination_name"),
            speed: text(record, "speed"),
            bandwidth: text(record, "bandwidth"),
            flags: text(record, "flags"),
        }
    }
}

/// One member link of a trunk group from `trunkshow`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrunkLink {
    pub group: i64,
    pub source_port: i64,
    pub destination_port: i64,
    pub destination_wwn: String,
    pub destination_domain: i64,
    pub deskew: i64,
    pub master: bool,
}

impl TrunkLink {
    pub(crate) fn from_record(record: &Record) -> Self {
        Self {
            group: int(record, "group"),
            source_port: int(record, "source_port"),
            destination_port: int(record, "destination_port"),
            destination_wwn: text(record, "destination_wwn"),
            destination_domain: int(record, "destination_domain"),
            deskew: int(record, "deskew"),
            master: flag(record, "master"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Response;

    #[test]
    fn test_ports_from_switchshow() {
        let mut response = Response::with_data(
            "> ",
            "> switchshow\n\
Index Port Address Media Speed State     Proto\n\
==================================================\n\
  0   0   010000   id    N8   Online      FC  F-Port  10:00:00:05:1e:0a:0b:0c\n\
  1   1   010100   --    N8   No_Module   FC\n",
        );
        response.parse();
        let ports = rows(&response.parsed["ports"], Port::from_record);
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0].address, "010000");
        assert_eq!(ports[0].slot, None);
        assert!(ports[0].is_online());
        assert_eq!(ports[0].comment, "F-Port 10:00:00:05:1e:0a:0b:0c");
        assert!(!ports[1].is_online());
    }

    #[test]
    fn test_fabric_members() {
        let mut response = Response::with_data(
            "> ",
            "> fabricshow\n\
  1: fffc01 10:00:00:05:1e:0a:0b:01 10.0.0.1        0.0.0.0         >\"sw_core\"\n\
  2: fffc02 10:00:00:05:1e:0a:0b:02 10.0.0.2        0.0.0.0         \"sw_edge\"\n",
        );
        response.parse();
        let members = rows(&response.parsed["fabric"], FabricMember::from_record);
        assert_eq!(members[0].domain_id, 1);
        assert_eq!(members[0].name, "sw_core");
        assert!(members[0].local);
        assert!(!members[1].local);
        assert_eq!(members[1].eth_ip, "10.0.0.2");
    }

    #[test]
    fn test_missing_list_is_empty() {
        assert!(rows(&Value::Null, Port::from_record).is_empty());
    }
}

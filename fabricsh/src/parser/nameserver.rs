//! Parser for the name server tables printed by `nsshow -t` and `nscamshow -t`.

use once_cell::sync::Lazy;
use regex::Regex;

use super::value::{Record, Value, list_entry};

static ENTRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s+[NU] ").expect("valid entry pattern"));

/// Local entries have no domain context and land under `wwn_local`; entries
/// listed after a "Switch entry for N" line land under `wwn_remote`.
#[derive(Debug, Default)]
pub(crate) struct NameServerParser {
    domain: i64,
    current: Option<&'static str>,
}

impl NameServerParser {
    pub(crate) fn parse_line(&mut self, record: &mut Record, line: &str) {
        if line.contains("Switch entry for") {
            self.domain = line
                .split_whitespace()
                .last()
                .and_then(|d| d.parse().ok())
                .unwrap_or_default();
        } else if ENTRY.is_match(line) {
            let key = if self.domain == 0 { "wwn_local" } else { "wwn_remote" };
            let mut entry = Record::new();
            entry.insert(
                "value".into(),
                Value::text(line.split(';').nth(2).unwrap_or_default().trim()),
            );
            entry.insert("domain_id".into(), Value::Int(self.domain));
            entry.insert("symbol".into(), Value::text(""));
            list_entry(record, key).push(Value::Map(entry));
            self.current = Some(key);
        } else if line.contains("PortSymb") || line.contains("NodeSymb") {
            if let Some(entry) = self.current_entry(record) {
                let symbol = line.split_once(':').map(|(_, s)| s.trim()).unwrap_or_default();
                entry.insert("symbol".into(), Value::text(symbol));
            }
        } else if line.contains("Device type") {
            if let Some(entry) = self.current_entry(record) {
                let dev_type = line.split(':').nth(1).unwrap_or_default().trim();
                entry.insert("dev_type".into(), Value::text(dev_type));
            }
        } else if line.contains("Port Index") {
            if let Some(entry) = self.current_entry(record) {
                let index = line
                    .split(':')
                    .nth(1)
                    .and_then(|i| i.trim().parse().ok())
                    .unwrap_or_default();
                entry.insert("port_index".into(), Value::Int(index));
            }
        }
    }

    fn current_entry<'a>(&self, record: &'a mut Record) -> Option<&'a mut Record> {
        match record.get_mut(self.current?)? {
            Value::List(entries) => match entries.last_mut()? {
                Value::Map(entry) => Some(entry),
                _ => None,
            },
            _ => None,
        }
    }
}

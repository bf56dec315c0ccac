//! Parser for the nested zoning dump printed by `cfgshow`, `zoneshow` and `alishow`.
//!
//! ```text
//! Defined configuration:
//!  cfg:   cfg_prod
//!                 zone_a; zone_b
//!  zone:  zone_a  alias1; alias2
//!  alias: alias1  50:00:10:20:30:40:50:60
//!
//! Effective configuration:
//!  cfg:   cfg_prod
//!  zone:  zone_a  50:00:10:20:30:40:50:60
//! ```
//!
//! `Key:` with nothing after the colon opens a superkey. `Key: name members`
//! opens a named entry inside the current superkey (or the record root when
//! none is open). An entry stays open while its line ends in `;` or has no
//! members, and tab-led lines append to it. Entries land in the record as
//! `record[superkey][kind][name] = [members]`.
//!
//! Parsing stops once the effective configuration's `cfg` entry is complete;
//! the remainder of that section repeats the defined zones and is the slowest
//! part of the dump on large fabrics.

use once_cell::sync::Lazy;
use regex::Regex;

use super::value::{Record, Value, list_entry, map_entry};
use super::{split_members, str_to_key};

static HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^ *([a-z]+\s*[a-z]+):(.*)$").expect("valid header pattern"));

const EFFECTIVE: &str = "effective_configuration";

/// An entry whose member list may continue on the next line.
#[derive(Debug, Clone)]
struct OpenEntry {
    kind: String,
    name: String,
}

#[derive(Debug, Default)]
pub(crate) struct CfgShowParser {
    /// Superkeys from the root to the container being appended to.
    containers: Vec<String>,
    /// Named entries awaiting continuation lines.
    open: Vec<OpenEntry>,
    effective_seen: bool,
    done: bool,
}

impl CfgShowParser {
    pub(crate) fn parse_line(&mut self, record: &mut Record, line: &str) {
        if self.done {
            return;
        }
        let continuation = line.starts_with('\t');
        if self.effective_seen && !(continuation && !self.open.is_empty()) {
            self.done = true;
            self.open.clear();
            return;
        }

        if continuation {
            self.continue_entry(record, line);
        } else if let Some(caps) = HEADER.captures(line) {
            let key = str_to_key(&caps[1]);
            let rest = caps[2].trim();
            if rest.is_empty() {
                self.open_superkey(record, key);
            } else {
                self.open_entry(record, key, rest, line);
            }
        }
    }

    fn open_superkey(&mut self, record: &mut Record, key: String) {
        self.open.clear();
        self.containers.clear();
        map_entry(record, &key);
        self.containers.push(key);
    }

    fn open_entry(&mut self, record: &mut Record, kind: String, rest: &str, line: &str) {
        self.open.clear();

        let mut tokens = rest.split_whitespace();
        let name = tokens.next().unwrap_or_default().to_string();
        let members_text = tokens.collect::<Vec<_>>().join(" ");

        let entries = map_entry(self.container(record), &kind);
        let members = list_entry(entries, &name);
        members.extend(split_members(&members_text).map(Value::Text));

        if kind == "cfg" && self.containers.last().is_some_and(|c| c == EFFECTIVE) {
            self.effective_seen = true;
        }
        if members_text.trim().is_empty() || line.trim_end().ends_with(';') {
            self.open.push(OpenEntry { kind, name });
        }
    }

    fn continue_entry(&mut self, record: &mut Record, line: &str) {
        let Some(entry) = self.open.last().cloned() else {
            return;
        };
        let entries = map_entry(self.container(record), &entry.kind);
        list_entry(entries, &entry.name).extend(split_members(line).map(Value::Text));
        if !line.trim_end().ends_with(';') {
            self.open.pop();
        }
    }

    fn container<'a>(&self, record: &'a mut Record) -> &'a mut Record {
        self.containers
            .iter()
            .fold(record, |map, key| map_entry(map, key))
    }
}

//! Response parsing.
//!
//! One physical call may batch several commands. Every command's output is
//! preceded by a prompt line (`"> "` followed by the command text), which
//! tells the parser whose output the following lines are. Each command is
//! routed to one of five strategies through a static table:
//!
//! | strategy    | commands |
//! |-------------|----------|
//! | `Simple`    | independent `key: value` lines plus table rows (ports, fabric members, ISLs) |
//! | `OneLine`   | the line itself is the value |
//! | `MultiLine` | lines accumulate until a `key: value` line starts a new field |
//! | `CfgShow`   | nested zoning dump: superkeys, named entries, tab continuations |
//! | `NameServer`| WWN records grouped by switch domain |
//!
//! Commands missing from the table are kept in [`Response::data`] but not parsed.

mod cfgshow;
mod nameserver;
mod response;
mod simple;
mod value;

pub use response::{ParsePosition, Response};
pub use value::{Record, Value};

use once_cell::sync::Lazy;
use regex::Regex;

/// Parsing strategy for one command's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Simple,
    OneLine,
    MultiLine,
    CfgShow,
    NameServer,
}

static STRATEGIES: &[(&str, Strategy)] = &[
    ("switchshow", Strategy::Simple),
    ("fosconfig", Strategy::Simple),
    ("lscfg", Strategy::Simple),
    ("fabricshow", Strategy::Simple),
    ("configshow", Strategy::Simple),
    ("islshow", Strategy::Simple),
    ("trunkshow", Strategy::Simple),
    ("cfgtransshow", Strategy::Simple),
    ("fabricprincipal", Strategy::Simple),
    ("ipaddrshow", Strategy::Simple),
    ("aptpolicy", Strategy::Simple),
    ("chassisname", Strategy::OneLine),
    ("version", Strategy::MultiLine),
    ("dlsshow", Strategy::MultiLine),
    ("iodshow", Strategy::MultiLine),
    ("switchstatusshow", Strategy::MultiLine),
    ("supportshow", Strategy::MultiLine),
    ("cfgshow", Strategy::CfgShow),
    ("zoneshow", Strategy::CfgShow),
    ("alishow", Strategy::CfgShow),
    ("nsshow", Strategy::NameServer),
    ("nscamshow", Strategy::NameServer),
];

/// Look up the strategy for a command name (first word of the command line).
pub fn strategy_for(command: &str) -> Option<Strategy> {
    STRATEGIES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(command))
        .map(|(_, s)| *s)
}

/// Generic `Key: value` line shape shared by several strategies.
pub(crate) static KEY_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*[a-z]+.*:").expect("valid key/value pattern"));

/// Normalize a field label into a record key.
///
/// Whitespace runs become `_`, camelCase is split, everything is lowercased:
/// `"switchName"` becomes `switch_name`, `"Defined configuration"` becomes
/// `defined_configuration`.
pub fn str_to_key(label: &str) -> String {
    let mut out = String::with_capacity(label.len() + 4);
    let mut prev: Option<char> = None;
    let mut in_space = false;
    for c in label.trim().chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
            prev = Some('_');
            continue;
        }
        in_space = false;
        if c.is_ascii_uppercase() && prev.is_some_and(|p| p.is_ascii_lowercase()) {
            out.push('_');
        }
        out.push(c.to_ascii_lowercase());
        prev = Some(c);
    }
    out
}

/// Split `key: value` at the first colon; the value keeps any later colons.
pub(crate) fn split_key_value(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once(':')?;
    Some((str_to_key(key), value.trim().to_string()))
}

/// Split a `;` separated member list, dropping empty fragments.
pub(crate) fn split_members(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(';')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

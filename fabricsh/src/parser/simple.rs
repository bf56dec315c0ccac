//! Line-at-a-time strategies: simple, oneline and multiline.

use once_cell::sync::Lazy;
use regex::Regex;

use super::value::{Record, Value, list_entry, map_entry};
use super::{KEY_VALUE, split_key_value, split_members};

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid line pattern")
}

static ZONING: Lazy<Regex> = Lazy::new(|| re(r"^zoning"));
static ZONING_ON: Lazy<Regex> = Lazy::new(|| re(r":\s+ON"));
static PARENS: Lazy<Regex> = Lazy::new(|| re(r"\(([^)]*)\)"));
static LS_ATTRIBUTES: Lazy<Regex> = Lazy::new(|| re(r"^LS Attributes"));
static BRACKETS: Lazy<Regex> = Lazy::new(|| re(r"\[([^\]]*)\]"));
static DIRECTOR_PORT: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)\s?\d{1,3}\s+\d{1,2}\s+\d{1,2}\s+[\da-f-]{6}"));
static BLADE_PORT: Lazy<Regex> = Lazy::new(|| re(r"(?i)\s?\d{1,3}\s+\d{1,2}\s+[\da-f]{6}"));
static TABLE_HEADER: Lazy<Regex> = Lazy::new(|| re(r"^Index|^="));
static CREATED_SWITCHES: Lazy<Regex> = Lazy::new(|| re(r"Created switches:"));
static FABRIC_MEMBER: Lazy<Regex> = Lazy::new(|| re(r"(?i)^\s*\d+:\s[a-f0-9]{6}"));
static CONFIG_OBJECT: Lazy<Regex> = Lazy::new(|| re(r"^(zone|alias|cfg)\.([^:]*):(.*)$"));
static TRANSACTION_TOKEN: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)^\s*Current transaction token is\s+(\S+)"));
static TRANSACTION_ABORTABLE: Lazy<Regex> = Lazy::new(|| re(r"(?i)^\s*It is (not )?abortable"));
static NO_TRANSACTION: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)There is no outstanding zoning transaction"));
static ISL: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)^\s*(\d+):\s*(\d+)\s*->\s*(\d+)\s+((?:[\da-f]{2}:){7}[\da-f]{2})\s+(\d+)\s+(\S+)\s+sp:\s*(\S+)\s+bw:\s*(\S+)\s*(.*)$")
});
static TRUNK: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)^\s*(?:(\d+):)?\s*(\d+)\s*->\s*(\d+)\s+((?:[\da-f]{2}:){7}[\da-f]{2})\s+(\d+)\s+deskew\s+(\d+)\s*(MASTER)?")
});

fn field(fields: &[&str], i: usize) -> Value {
    Value::text(fields.get(i).copied().unwrap_or_default())
}

fn int_field(fields: &[&str], i: usize) -> Value {
    Value::Int(
        fields
            .get(i)
            .and_then(|f| f.parse().ok())
            .unwrap_or_default(),
    )
}

fn rest(fields: &[&str], from: usize) -> Value {
    Value::text(fields.get(from..).map(|r| r.join(" ")).unwrap_or_default())
}

fn captured_int(caps: &regex::Captures<'_>, i: usize) -> Value {
    Value::Int(
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or_default(),
    )
}

fn captured_text(caps: &regex::Captures<'_>, i: usize) -> Value {
    Value::text(caps.get(i).map(|m| m.as_str().trim()).unwrap_or_default())
}

/// Independent-line records: each shape has its own key.
pub(crate) fn parse_simple(record: &mut Record, command: &str, line: &str) {
    if ZONING.is_match(line) {
        let enabled = ZONING_ON.is_match(line);
        record.insert("zoning_enabled".into(), Value::Bool(enabled));
        let active = match PARENS.captures(line) {
            Some(c) if enabled => Value::text(c[1].trim()),
            _ => Value::Null,
        };
        record.insert("active_config".into(), active);
    } else if LS_ATTRIBUTES.is_match(line) {
        parse_ls_attributes(record, line);
    } else if command.eq_ignore_ascii_case("islshow") && ISL.is_match(line) {
        parse_isl(record, line);
    } else if command.eq_ignore_ascii_case("trunkshow") && TRUNK.is_match(line) {
        parse_trunk(record, line);
    } else if DIRECTOR_PORT.is_match(line) {
        let l: Vec<&str> = line.split_whitespace().collect();
        let mut port = Record::new();
        port.insert("index".into(), int_field(&l, 0));
        port.insert("slot".into(), int_field(&l, 1));
        port.insert("port".into(), int_field(&l, 2));
        port.insert("address".into(), field(&l, 3));
        port.insert("media".into(), field(&l, 4));
        port.insert("speed".into(), field(&l, 5));
        port.insert("state".into(), field(&l, 6));
        port.insert("proto".into(), field(&l, 7));
        port.insert("comment".into(), rest(&l, 8));
        list_entry(record, "ports").push(Value::Map(port));
    } else if BLADE_PORT.is_match(line) {
        let l: Vec<&str> = line.split_whitespace().collect();
        let mut port = Record::new();
        port.insert("index".into(), int_field(&l, 0));
        port.insert("port".into(), int_field(&l, 1));
        port.insert("address".into(), field(&l, 2));
        port.insert("media".into(), field(&l, 3));
        port.insert("speed".into(), field(&l, 4));
        port.insert("state".into(), field(&l, 5));
        port.insert("proto".into(), field(&l, 6));
        port.insert("comment".into(), rest(&l, 7));
        list_entry(record, "ports").push(Value::Map(port));
    } else if TABLE_HEADER.is_match(line) {
        // column headers and separators
    } else if CREATED_SWITCHES.is_match(line) {
        let ids = line
            .split_once(':')
            .map(|(_, ids)| ids)
            .unwrap_or_default()
            .split_whitespace()
            .filter_map(|id| {
                // "128(ds)" marks the default switch
                let digits: String = id.chars().take_while(char::is_ascii_digit).collect();
                digits.parse().ok()
            })
            .map(Value::Int)
            .collect();
        record.insert("created_switches".into(), Value::List(ids));
    } else if FABRIC_MEMBER.is_match(line) {
        let l: Vec<&str> = line.split_whitespace().collect();
        let name = l.get(5).copied().unwrap_or_default();
        let mut member = Record::new();
        member.insert(
            "domain_id".into(),
            Value::text(l.first().copied().unwrap_or_default().trim_end_matches(':')),
        );
        member.insert("sid".into(), field(&l, 1));
        member.insert("wwn".into(), field(&l, 2));
        member.insert("eth_ip".into(), field(&l, 3));
        member.insert("fc_ip".into(), field(&l, 4));
        member.insert("name".into(), Value::text(name.replace(['"', '>'], "")));
        member.insert("local".into(), Value::Bool(name.starts_with('>')));
        list_entry(record, "fabric").push(Value::Map(member));
    } else if let Some(caps) = CONFIG_OBJECT.captures(line) {
        let mut found = Record::new();
        found.insert("kind".into(), Value::text(&caps[1]));
        found.insert("obj".into(), Value::text(&caps[2]));
        found.insert(
            "members".into(),
            Value::List(split_members(&caps[3]).map(Value::Text).collect()),
        );
        list_entry(record, "find_results").push(Value::Map(found));
    } else if let Some(caps) = TRANSACTION_TOKEN.captures(line) {
        map_entry(record, "cfg_transaction").insert("id".into(), Value::text(&caps[1]));
    } else if let Some(caps) = TRANSACTION_ABORTABLE.captures(line) {
        map_entry(record, "cfg_transaction")
            .insert("abortable".into(), Value::Bool(caps.get(1).is_none()));
    } else if NO_TRANSACTION.is_match(line) {
        let trans = map_entry(record, "cfg_transaction");
        trans.insert("id".into(), Value::text("-1"));
        trans.insert("abortable".into(), Value::Bool(false));
    } else if KEY_VALUE.is_match(line) {
        if let Some((key, value)) = split_key_value(line) {
            record.insert(key, Value::Text(value));
        }
    }
}

fn parse_ls_attributes(record: &mut Record, line: &str) {
    let attrs = map_entry(record, "ls_attributes");
    let inner = BRACKETS
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or_default();
    for attr in inner.split(',') {
        if attr.contains("Address Mode") {
            attrs.insert(
                "address_mode".into(),
                Value::text(attr.replace("Address Mode", "").trim()),
            );
        } else if let Some((key, value)) = attr.split_once(':') {
            let key = key.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join("_");
            attrs.insert(key, Value::text(value.trim().to_lowercase()));
        }
    }
}

fn parse_isl(record: &mut Record, line: &str) {
    let Some(caps) = ISL.captures(line) else {
        return;
    };
    let mut isl = Record::new();
    isl.insert("id".into(), captured_int(&caps, 1));
    isl.insert("source_port".into(), captured_int(&caps, 2));
    isl.insert("destination_port".into(), captured_int(&caps, 3));
    isl.insert("destination_wwn".into(), captured_text(&caps, 4));
    isl.insert("destination_domain".into(), captured_int(&caps, 5));
    isl.insert("destination_name".into(), captured_text(&caps, 6));
    isl.insert("speed".into(), captured_text(&caps, 7));
    isl.insert("bandwidth".into(), captured_text(&caps, 8));
    isl.insert("flags".into(), captured_text(&caps, 9));
    list_entry(record, "isl_links").push(Value::Map(isl));
}

fn parse_trunk(record: &mut Record, line: &str) {
    let Some(caps) = TRUNK.captures(line) else {
        return;
    };
    let links = list_entry(record, "trunk_links");
    // continuation rows belong to the group of the previous row
    let group = match caps.get(1) {
        Some(g) => Value::Int(g.as_str().parse().unwrap_or_default()),
        None => links
            .last()
            .and_then(Value::as_map)
            .and_then(|t| t.get("group"))
            .cloned()
            .unwrap_or(Value::Int(0)),
    };
    let mut trunk = Record::new();
    trunk.insert("group".into(), group);
    trunk.insert("source_port".into(), captured_int(&caps, 2));
    trunk.insert("destination_port".into(), captured_int(&caps, 3));
    trunk.insert("destination_wwn".into(), captured_text(&caps, 4));
    trunk.insert("destination_domain".into(), captured_int(&caps, 5));
    trunk.insert("deskew".into(), captured_int(&caps, 6));
    trunk.insert("master".into(), Value::Bool(caps.get(7).is_some()));
    links.push(Value::Map(trunk));
}

/// The whole line is the value of the command's key.
pub(crate) fn parse_oneline(record: &mut Record, command: &str, line: &str) {
    record.insert(command.to_string(), Value::text(line));
}

/// `key: value` lines start fields; other lines accumulate under the command key.
pub(crate) fn parse_multiline(record: &mut Record, command: &str, line: &str) {
    if KEY_VALUE.is_match(line) {
        if let Some((key, value)) = split_key_value(line) {
            record.insert(key, Value::Text(value));
        }
        return;
    }
    let slot = record
        .entry(command.to_string())
        .or_insert_with(|| Value::text(""));
    if let Value::Text(text) = slot {
        text.push_str(line);
        text.push('\n');
    } else {
        *slot = Value::text(format!("{line}\n"));
    }
}

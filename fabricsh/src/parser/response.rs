//! Raw command output and its parsed record.

use log::trace;
use once_cell::sync::Lazy;
use regex::Regex;

use super::cfgshow::CfgShowParser;
use super::nameserver::NameServerParser;
use super::simple::{parse_multiline, parse_oneline, parse_simple};
use super::value::{Record, Value};
use super::{Strategy, strategy_for};

static FOSEXEC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^fosexec --fid \d+ '").expect("valid fosexec pattern"));

/// Which command's output the parser is reading.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParsePosition {
    /// No prompt line seen yet.
    #[default]
    Start,
    /// Inside the output of this command.
    Command(String),
    /// The whole response has been parsed.
    End,
}

/// Output of one [`Device::run`](crate::session::Device::run) call.
///
/// `data` holds, for every command, the prompt plus the command text on its
/// own line followed by the command's output. `errors` holds stderr.
#[derive(Debug, Clone, Default)]
pub struct Response {
    /// Accumulated stdout, with prompt lines marking each command.
    pub data: String,

    /// Accumulated stderr.
    pub errors: String,

    /// Prompt literal that starts each command line in `data`.
    pub prompt: String,

    /// Structured record filled by [`Response::parse`].
    pub parsed: Record,

    /// Parser cursor; [`ParsePosition::End`] after a parse.
    pub parsing_position: ParsePosition,
}

impl Response {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Build a response around existing output.
    pub fn with_data(prompt: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            ..Self::new(prompt)
        }
    }

    /// Drop all parsed state.
    pub fn reset(&mut self) {
        self.parsed.clear();
        self.parsing_position = ParsePosition::Start;
    }

    /// Parse `data` into `parsed`.
    ///
    /// Starts from a clean record every time, so parsing twice yields the
    /// same result.
    pub fn parse(&mut self) {
        self.reset();

        let mut cfgshow = CfgShowParser::default();
        let mut nameserver = NameServerParser::default();
        let mut position = ParsePosition::Start;
        let mut record = Record::new();

        for line in self.data.split('\n') {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            if let Some(command) = self.command_of(line) {
                trace!("parsing output of '{}'", command);
                // stateful parsers start over for every command
                cfgshow = CfgShowParser::default();
                nameserver = NameServerParser::default();
                position = ParsePosition::Command(command);
                continue;
            }
            let ParsePosition::Command(command) = &position else {
                continue;
            };
            match strategy_for(command) {
                Some(Strategy::Simple) => parse_simple(&mut record, command, line),
                Some(Strategy::OneLine) => parse_oneline(&mut record, command, line),
                Some(Strategy::MultiLine) => parse_multiline(&mut record, command, line),
                Some(Strategy::CfgShow) => cfgshow.parse_line(&mut record, line),
                Some(Strategy::NameServer) => nameserver.parse_line(&mut record, line),
                None => {}
            }
        }

        post_process(&mut record);
        self.parsed = record;
        self.parsing_position = ParsePosition::End;
    }

    /// Command name of a prompt line, or `None` for output lines.
    fn command_of(&self, line: &str) -> Option<String> {
        if self.prompt.is_empty() {
            return None;
        }
        let text = line.strip_prefix(self.prompt.as_str())?;
        let text = FOSEXEC.replace(text.trim_start(), "");
        text.split(|c: char| c.is_whitespace() || c == '|' || c == '\'')
            .find(|t| !t.is_empty())
            .map(str::to_string)
    }

    /// True if `line` is a command echo rather than output.
    pub fn is_prompt_line(&self, line: &str) -> bool {
        !self.prompt.is_empty() && line.starts_with(self.prompt.as_str())
    }

    /// Lines of `data`, ignoring trailing empty lines.
    pub fn lines(&self) -> Vec<&str> {
        let mut lines: Vec<&str> = self.data.split('\n').map(|l| l.trim_end_matches('\r')).collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines
    }

    /// Number of lines in `data`; a bare command echo counts as one.
    pub fn line_count(&self) -> usize {
        self.lines().len()
    }

    /// Output with command echo lines removed, joined by newlines.
    pub fn output(&self) -> String {
        self.lines()
            .into_iter()
            .filter(|l| !self.is_prompt_line(l))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// True if the raw output contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.data.contains(needle)
    }

    /// Parsed value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.parsed.get(key)
    }
}

fn post_process(record: &mut Record) {
    if let Some(Value::List(ports)) = record.get_mut("ports") {
        let mut unique: Vec<Value> = Vec::with_capacity(ports.len());
        for port in ports.drain(..) {
            if !unique.contains(&port) {
                unique.push(port);
            }
        }
        *ports = unique;
    }
    if record
        .get("find_results")
        .and_then(Value::as_list)
        .is_some_and(|l| l.is_empty())
    {
        record.shift_remove("find_results");
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.data)
    }
}

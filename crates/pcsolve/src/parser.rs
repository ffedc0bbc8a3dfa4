//! Parsing of `.pc` descriptor text.
//!
//! A descriptor file consists of:
//!
//! - **Variable definitions**: `name=value`
//! - **Field declarations**: `Keyword: value`
//! - **Comments**: lines starting with `#`
//!
//! Lines ending in `\` continue on the next line. Values are kept raw here;
//! `${name}` expansion belongs to [`crate::variables`].

use std::collections::HashMap;

/// Keyword fields the resolver cares about.
///
/// Other keywords (`Conflicts`, `Provides`, `License`, ...) are accepted by
/// the parser and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Name,
    Description,
    Version,
    URL,
    Requires,
    RequiresPrivate,
    Cflags,
    CflagsPrivate,
    Libs,
    LibsPrivate,
}

impl Keyword {
    /// Look up a keyword by its exact (case-sensitive) spelling.
    pub fn from_name(s: &str) -> Option<Self> {
        Some(match s {
            "Name" => Self::Name,
            "Description" => Self::Description,
            "Version" => Self::Version,
            "URL" => Self::URL,
            "Requires" => Self::Requires,
            "Requires.private" => Self::RequiresPrivate,
            "Cflags" | "CFlags" => Self::Cflags,
            "Cflags.private" | "CFlags.private" => Self::CflagsPrivate,
            "Libs" => Self::Libs,
            "Libs.private" => Self::LibsPrivate,
            _ => return None,
        })
    }

    /// The canonical spelling of this keyword.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Description => "Description",
            Self::Version => "Version",
            Self::URL => "URL",
            Self::Requires => "Requires",
            Self::RequiresPrivate => "Requires.private",
            Self::Cflags => "Cflags",
            Self::CflagsPrivate => "Cflags.private",
            Self::Libs => "Libs",
            Self::LibsPrivate => "Libs.private",
        }
    }
}

/// Descriptor text split into variables and fields, nothing expanded yet.
#[derive(Debug, Clone, Default)]
pub struct RawDescriptor {
    /// Variable definitions in file order. A key may repeat; the last wins.
    pub variables: Vec<(String, String)>,

    /// Field values keyed by keyword. A repeated field keeps its last value.
    pub fields: HashMap<Keyword, String>,
}

impl RawDescriptor {
    /// Parse descriptor text.
    ///
    /// Malformed lines are skipped, matching the tolerance of pkg-config.
    pub fn parse(content: &str) -> Self {
        let mut raw = Self::default();

        for line in LogicalLines::new(content) {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match parse_line(line) {
                Some(Line::Variable(key, value)) => raw.variables.push((key, value)),
                Some(Line::Field(keyword, value)) => {
                    raw.fields.insert(keyword, value);
                }
                None => log::trace!("skipping unrecognized line: {line}"),
            }
        }

        raw
    }

    /// Look up a field value.
    pub fn field(&self, keyword: Keyword) -> Option<&str> {
        self.fields.get(&keyword).map(String::as_str)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Line {
    Variable(String, String),
    Field(Keyword, String),
}

/// Classify a line by whichever of `:` or `=` comes first outside `${...}`.
fn parse_line(line: &str) -> Option<Line> {
    let colon = find_delimiter(line, b':');
    let eq = find_delimiter(line, b'=');

    match (colon, eq) {
        (Some(c), Some(e)) if e < c => parse_variable(line, e),
        (Some(c), _) => parse_field(line, c).or_else(|| eq.and_then(|e| parse_variable(line, e))),
        (None, Some(e)) => parse_variable(line, e),
        (None, None) => None,
    }
}

/// Byte offset of the first `delim` not inside a `${...}` reference.
fn find_delimiter(line: &str, delim: u8) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'{') {
            i += 2;
            while i < bytes.len() && bytes[i] != b'}' {
                i += 1;
            }
            i += 1;
        } else if bytes[i] == delim {
            return Some(i);
        } else {
            i += 1;
        }
    }
    None
}

fn parse_variable(line: &str, eq: usize) -> Option<Line> {
    let key = line[..eq].trim();
    if !is_valid_variable_name(key) {
        return None;
    }
    Some(Line::Variable(
        key.to_string(),
        line[eq + 1..].trim().to_string(),
    ))
}

fn parse_field(line: &str, colon: usize) -> Option<Line> {
    let keyword = Keyword::from_name(line[..colon].trim())?;
    Some(Line::Field(keyword, line[colon + 1..].trim().to_string()))
}

/// Variable names start with a letter, `_` or `.` and continue with
/// alphanumerics, `_`, `.` or `-`.
pub fn is_valid_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '.' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Joins backslash-continued physical lines into logical lines.
struct LogicalLines<'a> {
    lines: std::str::Lines<'a>,
}

impl<'a> LogicalLines<'a> {
    fn new(content: &'a str) -> Self {
        Self {
            lines: content.lines(),
        }
    }
}

impl Iterator for LogicalLines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let mut buf = String::new();
        let mut line = self.lines.next()?;
        while let Some(head) = line.strip_suffix('\\') {
            buf.push_str(head);
            match self.lines.next() {
                Some(next) => line = next,
                None => return Some(buf),
            }
        }
        buf.push_str(line);
        Some(buf)
    }
}

/// Split an expanded flags string into tokens.
///
/// Handles single quotes, double quotes (where `\` escapes `"`, `\`, `$` and
/// `` ` ``), and backslash escapes outside quotes.
pub fn split_flags(input: &str) -> Vec<String> {
    #[derive(PartialEq)]
    enum Quote {
        None,
        Single,
        Double,
    }

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted_token = false;
    let mut quote = Quote::None;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Quote::Single => match c {
                '\'' => quote = Quote::None,
                _ => current.push(c),
            },
            Quote::Double => match c {
                '"' => quote = Quote::None,
                '\\' => match chars.next_if(|n| matches!(n, '"' | '\\' | '$' | '`')) {
                    Some(escaped) => current.push(escaped),
                    None => current.push('\\'),
                },
                _ => current.push(c),
            },
            Quote::None => match c {
                '\'' => {
                    quote = Quote::Single;
                    quoted_token = true;
                }
                '"' => {
                    quote = Quote::Double;
                    quoted_token = true;
                }
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                }
                c if c.is_ascii_whitespace() => {
                    if !current.is_empty() || quoted_token {
                        tokens.push(std::mem::take(&mut current));
                    }
                    quoted_token = false;
                }
                _ => current.push(c),
            },
        }
    }

    if !current.is_empty() || quoted_token {
        tokens.push(current);
    }

    tokens
}

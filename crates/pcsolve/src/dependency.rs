//! Dependency edges and `Requires:` list parsing.
//!
//! A requirement list is a sequence of component names separated by commas
//! and/or whitespace, each optionally followed by a comparator and a version:
//!
//! ```text
//! Requires: glib-2.0 >= 2.50, gio-2.0 zlib>=1.2
//! ```

use std::fmt;

use crate::error::Result;
use crate::version::{self, Comparator};

/// A reference from one descriptor to a required component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    /// The required component name.
    pub name: String,

    /// The comparator applied to the resolved version.
    pub comparator: Comparator,

    /// The version the comparator is checked against, if any.
    pub version: Option<String>,
}

impl Dependency {
    /// A dependency with no version constraint.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comparator: Comparator::Any,
            version: None,
        }
    }

    /// A dependency with a version constraint.
    pub fn with_version(
        name: impl Into<String>,
        comparator: Comparator,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            comparator,
            version: Some(version.into()),
        }
    }

    /// Whether a descriptor with version `found` satisfies this edge.
    ///
    /// A constrained edge against a descriptor without a version never matches.
    pub fn is_satisfied_by(&self, found: Option<&str>) -> bool {
        match (&self.version, found) {
            (None, _) => true,
            (Some(_), _) if self.comparator == Comparator::Any => true,
            (Some(required), Some(found)) => self.comparator.eval(found, required),
            (Some(_), None) => false,
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{} {} {}", self.name, self.comparator, v),
            None => f.write_str(&self.name),
        }
    }
}

fn is_separator(c: char) -> bool {
    c == ',' || c.is_ascii_whitespace()
}

/// Parse a requirement list into ordered dependency edges.
///
/// Duplicates are preserved; the order of the list is significant to the
/// resolver.
///
/// # Examples
///
/// ```
/// use pcsolve::dependency::parse_list;
///
/// let deps = parse_list("glib-2.0 >= 2.50, gio-2.0").unwrap();
/// assert_eq!(deps.len(), 2);
/// assert_eq!(deps[0].version.as_deref(), Some("2.50"));
/// assert_eq!(deps[1].name, "gio-2.0");
/// ```
pub fn parse_list(input: &str) -> Result<Vec<Dependency>> {
    let mut deps = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|&c| is_separator(c)).is_some() {}

        let mut name = String::new();
        while let Some(c) = chars.next_if(|&c| !is_separator(c) && !version::is_operator_char(c)) {
            name.push(c);
        }

        if name.is_empty() {
            match chars.peek() {
                // Stray operator with no name in front of it
                Some(_) => {
                    chars.next();
                    continue;
                }
                None => break,
            }
        }

        while chars.next_if(|c| c.is_ascii_whitespace()).is_some() {}

        let mut op = String::new();
        while let Some(c) = chars.next_if(|&c| version::is_operator_char(c)) {
            op.push(c);
        }

        if op.is_empty() {
            deps.push(Dependency::new(name));
            continue;
        }

        while chars.next_if(|c| c.is_ascii_whitespace()).is_some() {}

        let mut ver = String::new();
        while let Some(c) = chars.next_if(|&c| !is_separator(c)) {
            ver.push(c);
        }

        let comparator: Comparator = op.parse()?;
        if ver.is_empty() {
            log::warn!("comparator '{op}' for '{name}' has no version; ignoring constraint");
            deps.push(Dependency::new(name));
        } else {
            deps.push(Dependency::with_version(name, comparator, ver));
        }
    }

    Ok(deps)
}

//! Version comparison using the RPM algorithm, as pkg-config does.
//!
//! Version strings are split into runs of digits or letters; separators are
//! ignored. Runs are compared pairwise: digit runs numerically, letter runs
//! lexically, and a digit run always beats a letter run. A `~` marks a
//! pre-release and sorts before everything, including the end of the string.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Compare two version strings.
///
/// # Examples
///
/// ```
/// use pcsolve::version::compare;
///
/// assert!(compare("1.2.3", "1.2.2").is_gt());
/// assert!(compare("1.2.3", "1.2.3").is_eq());
/// assert!(compare("1.0", "1.0.0").is_lt());
/// assert!(compare("1.0~rc1", "1.0").is_lt());
/// ```
pub fn compare(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let mut left = Segments::new(a);
    let mut right = Segments::new(b);

    loop {
        left.skip_separators();
        right.skip_separators();

        match (left.take_tilde(), right.take_tilde()) {
            (true, true) => continue,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }

        match (left.is_done(), right.is_done()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }

        let numeric = left.peek_is_digit();
        let a_seg = left.take_run(numeric);
        let b_seg = right.take_run(numeric);

        // `b` has a run of the other class here
        if b_seg.is_empty() {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let ord = if numeric {
            let a_num = trim_leading_zeros(a_seg);
            let b_num = trim_leading_zeros(b_seg);
            a_num.len().cmp(&b_num.len()).then_with(|| a_num.cmp(b_num))
        } else {
            a_seg.cmp(b_seg)
        };

        if ord != Ordering::Equal {
            return ord;
        }
    }
}

struct Segments<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Segments<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            bytes: s.as_bytes(),
            pos: 0,
        }
    }

    fn skip_separators(&mut self) {
        while let Some(&c) = self.bytes.get(self.pos) {
            if c.is_ascii_alphanumeric() || c == b'~' {
                break;
            }
            self.pos += 1;
        }
    }

    fn take_tilde(&mut self) -> bool {
        if self.bytes.get(self.pos) == Some(&b'~') {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn is_done(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek_is_digit(&self) -> bool {
        self.bytes.get(self.pos).is_some_and(u8::is_ascii_digit)
    }

    fn take_run(&mut self, numeric: bool) -> &'a [u8] {
        let start = self.pos;
        while let Some(c) = self.bytes.get(self.pos) {
            let matches = if numeric {
                c.is_ascii_digit()
            } else {
                c.is_ascii_alphabetic()
            };
            if !matches {
                break;
            }
            self.pos += 1;
        }
        &self.bytes[start..self.pos]
    }
}

/// Trim leading ASCII zeros, leaving at least one byte.
fn trim_leading_zeros(s: &[u8]) -> &[u8] {
    let zeros = s.iter().take_while(|&&c| c == b'0').count();
    &s[zeros.min(s.len().saturating_sub(1))..]
}

/// Version comparison operators usable on a dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Comparator {
    /// No constraint.
    #[default]
    Any,
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanEqual,
}

impl Comparator {
    /// Get the operator text of this comparator.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Any => "(any)",
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::LessThanEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanEqual => ">=",
        }
    }

    /// Whether `actual <op> target` holds.
    pub fn eval(self, actual: &str, target: &str) -> bool {
        let ord = compare(actual, target);
        match self {
            Self::Any => true,
            Self::Equal => ord.is_eq(),
            Self::NotEqual => ord.is_ne(),
            Self::LessThan => ord.is_lt(),
            Self::LessThanEqual => ord.is_le(),
            Self::GreaterThan => ord.is_gt(),
            Self::GreaterThanEqual => ord.is_ge(),
        }
    }
}

impl FromStr for Comparator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" => Ok(Self::Any),
            "=" | "==" => Ok(Self::Equal),
            "!=" => Ok(Self::NotEqual),
            "<" => Ok(Self::LessThan),
            "<=" => Ok(Self::LessThanEqual),
            ">" => Ok(Self::GreaterThan),
            ">=" => Ok(Self::GreaterThanEqual),
            _ => Err(Error::InvalidComparator {
                operator: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check whether a character can be part of a comparator operator.
pub fn is_operator_char(c: char) -> bool {
    matches!(c, '<' | '>' | '!' | '=')
}

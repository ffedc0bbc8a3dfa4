//! Compiler and linker flag fragments.
//!
//! A fragment is one flag: a one-character **type** (`I`, `L`, `l`, `D`, ...)
//! plus a payload, or an untyped "other" flag such as `-pthread`. This module
//! covers the three stages between a resolved graph and a flag string:
//!
//! - [`collect`] gathers fragments from descriptors in settlement order
//! - [`filter`] applies a [`FilterConfig`] (system paths, kind selection)
//! - [`render`] joins the survivors, dropping repeated fragments
//!
//! Filtering is a pure function of the configuration value; there are no
//! callbacks.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::descriptor::PackageDescriptor;
use crate::error::{Error, Result};
use crate::parser::split_flags;
use crate::path::SearchPath;

/// Which flag family a query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    /// Compiler flags (`Cflags`, `Cflags.private`).
    Cflags,
    /// Linker flags (`Libs`, `Libs.private`).
    Libs,
}

impl FragmentKind {
    /// Whether `t` is a named sub-kind for this family; everything else is "other".
    pub fn is_known_type(self, t: char) -> bool {
        match self {
            Self::Cflags => t == 'I',
            Self::Libs => matches!(t, 'L' | 'l'),
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cflags => "cflags",
            Self::Libs => "libs",
        })
    }
}

/// A single compiler or linker flag.
///
/// Equality and hashing consider only the type and payload; the owner is
/// carried for diagnostics.
#[derive(Debug, Clone)]
pub struct Fragment {
    frag_type: Option<char>,

    /// The payload (path, library name, define, or the whole flag if untyped).
    pub data: String,

    /// Name of the descriptor that contributed this fragment.
    pub owner: String,
}

impl Fragment {
    /// Create a typed fragment.
    ///
    /// # Examples
    ///
    /// ```
    /// use pcsolve::fragment::Fragment;
    ///
    /// let frag = Fragment::new('I', "/usr/include", "zlib");
    /// assert_eq!(frag.frag_type(), Some('I'));
    /// assert_eq!(frag.to_string(), "-I/usr/include");
    /// ```
    pub fn new(frag_type: char, data: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            frag_type: Some(frag_type),
            data: data.into(),
            owner: owner.into(),
        }
    }

    /// Create an untyped fragment.
    pub fn untyped(data: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            frag_type: None,
            data: data.into(),
            owner: owner.into(),
        }
    }

    /// Classify one flag token.
    ///
    /// `-X<payload>` with `X` in `ILlDUFW` and a non-empty payload is typed;
    /// anything else is untyped.
    pub fn from_token(token: &str, owner: &str) -> Self {
        let mut chars = token.chars();
        if chars.next() == Some('-')
            && let Some(t @ ('I' | 'L' | 'l' | 'D' | 'U' | 'F' | 'W')) = chars.next()
            && !chars.as_str().is_empty()
        {
            return Self::new(t, chars.as_str(), owner);
        }
        Self::untyped(token, owner)
    }

    /// Tokenise an expanded field value into fragments.
    pub fn parse_list(input: &str, owner: &str) -> Vec<Self> {
        split_flags(input)
            .iter()
            .filter(|t| !t.is_empty())
            .map(|t| Self::from_token(t, owner))
            .collect()
    }

    /// The type character, or `None` for untyped fragments.
    pub fn frag_type(&self) -> Option<char> {
        self.frag_type
    }

    /// Whether this fragment is an "other" flag for `kind`.
    pub fn is_other(&self, kind: FragmentKind) -> bool {
        !self.frag_type.is_some_and(|t| kind.is_known_type(t))
    }

    /// Render with whitespace and quote characters backslash-escaped.
    pub fn render(&self) -> Result<String> {
        if let Some(bad) = self.data.chars().find(|c| matches!(c, '\0' | '\n' | '\r')) {
            return Err(Error::FragmentRenderFailure {
                fragment: format!("{self:?}"),
                reason: format!("payload contains unescapable character {bad:?}"),
            });
        }

        let mut out = String::with_capacity(self.data.len() + 2);
        if let Some(t) = self.frag_type {
            out.push('-');
            out.push(t);
        }
        for c in self.data.chars() {
            if matches!(c, ' ' | '\t' | '"' | '\'' | '\\') {
                out.push('\\');
            }
            out.push(c);
        }
        Ok(out)
    }
}

impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        self.frag_type == other.frag_type && self.data == other.data
    }
}

impl Eq for Fragment {}

impl Hash for Fragment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.frag_type.hash(state);
        self.data.hash(state);
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.frag_type {
            Some(t) => write!(f, "-{t}{}", self.data),
            None => f.write_str(&self.data),
        }
    }
}

/// Prefix absolute `-I` and `-L` payloads with `sysroot`, unless already under it.
pub fn apply_sysroot(fragments: &mut [Fragment], sysroot: &str) {
    if sysroot.is_empty() {
        return;
    }
    for frag in fragments {
        if matches!(frag.frag_type, Some('I' | 'L'))
            && frag.data.starts_with('/')
            && !frag.data.starts_with(sysroot)
        {
            frag.data = format!("{sysroot}{}", frag.data);
        }
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// Gather fragments of `kind` from `nodes`, in order.
///
/// Each node contributes its public fragments; in static mode its private
/// fragments follow immediately after.
pub fn collect<'a, I>(nodes: I, kind: FragmentKind, static_mode: bool) -> Vec<Fragment>
where
    I: IntoIterator<Item = &'a PackageDescriptor>,
{
    let mut out = Vec::new();
    for node in nodes {
        let (public, private) = match kind {
            FragmentKind::Cflags => (&node.cflags, &node.cflags_private),
            FragmentKind::Libs => (&node.libs, &node.libs_private),
        };
        out.extend(public.iter().cloned());
        if static_mode {
            out.extend(private.iter().cloned());
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// A set of fragment sub-kinds to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KindMask(u8);

impl KindMask {
    /// No restriction.
    pub const NONE: Self = Self(0);
    /// `-I` include paths (cflags).
    pub const INCLUDE_PATH: Self = Self(0x1);
    /// `-L` library paths (libs).
    pub const LIBRARY_PATH: Self = Self(0x2);
    /// `-l` library names (libs).
    pub const LIBRARY_NAME: Self = Self(0x4);
    /// Anything that is not a named sub-kind of the queried family.
    pub const OTHER: Self = Self(0x8);

    /// Check if all bits of `other` are set.
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Add `other`.
    pub fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether no restriction is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    fn for_type(t: char) -> Self {
        match t {
            'I' => Self::INCLUDE_PATH,
            'L' => Self::LIBRARY_PATH,
            'l' => Self::LIBRARY_NAME,
            _ => Self::OTHER,
        }
    }
}

/// System directories whose `-I`/`-L` fragments are dropped by default.
#[derive(Debug, Clone)]
pub struct SystemDirs {
    /// Default library search directories.
    pub libdirs: SearchPath,
    /// Default include directories.
    pub includedirs: SearchPath,
    /// Sysroot that prefixes payloads, if any.
    pub sysroot: Option<String>,
}

impl Default for SystemDirs {
    fn default() -> Self {
        Self {
            libdirs: SearchPath::from_paths(crate::DEFAULT_SYSTEM_LIBDIRS),
            includedirs: SearchPath::from_paths(crate::DEFAULT_SYSTEM_INCLUDEDIRS),
            sysroot: None,
        }
    }
}

impl SystemDirs {
    /// Whether `frag` names a default system path.
    pub fn is_system(&self, frag: &Fragment) -> bool {
        let dirs = match frag.frag_type {
            Some('L') => &self.libdirs,
            Some('I') => &self.includedirs,
            _ => return false,
        };
        let data = self
            .sysroot
            .as_deref()
            .and_then(|root| frag.data.strip_prefix(root))
            .unwrap_or(&frag.data);
        dirs.contains(data)
    }
}

/// Inclusion rules for one flag query.
///
/// # Examples
///
/// ```
/// use pcsolve::fragment::{FilterConfig, FragmentKind};
///
/// let config = FilterConfig::from_options(
///     FragmentKind::Libs,
///     [("only_ldpath", "true"), ("keep_system", "1")],
/// )
/// .unwrap();
/// assert!(config.keep_system_paths);
///
/// assert!(FilterConfig::from_options(FragmentKind::Libs, [("only_I", "true")]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    /// The flag family being filtered.
    pub kind: FragmentKind,
    /// Keep fragments naming default system paths.
    pub keep_system_paths: bool,
    /// Sub-kinds to keep; empty keeps everything.
    pub mask: KindMask,
    /// Type characters a typed fragment must carry, composed with the mask.
    pub custom_types: Option<String>,
}

impl FilterConfig {
    /// A configuration that keeps everything except system paths.
    pub fn new(kind: FragmentKind) -> Self {
        Self {
            kind,
            keep_system_paths: false,
            mask: KindMask::NONE,
            custom_types: None,
        }
    }

    /// Set whether system paths are kept.
    pub fn keep_system_paths(mut self, keep: bool) -> Self {
        self.keep_system_paths = keep;
        self
    }

    /// Add a sub-kind restriction.
    pub fn only(mut self, mask: KindMask) -> Self {
        self.mask = self.mask.with(mask);
        self
    }

    /// Restrict to the given type characters (`--fragment-filter`).
    pub fn fragment_filter(mut self, types: impl Into<String>) -> Self {
        self.custom_types = Some(types.into());
        self
    }

    /// Build a configuration from named options.
    ///
    /// Recognized names are `keep_system`, `fragment_filter`, `only_other`,
    /// plus `only_I` for cflags and `only_ldpath`/`only_libname` for libs.
    pub fn from_options<I, K, V>(kind: FragmentKind, options: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::new(kind);
        for (name, value) in options {
            let (name, value) = (name.as_ref(), value.as_ref());
            let mask = match (kind, name) {
                (_, "keep_system") => {
                    config.keep_system_paths = parse_bool(name, value)?;
                    continue;
                }
                (_, "fragment_filter") => {
                    config.custom_types = Some(value.to_string());
                    continue;
                }
                (_, "only_other") => KindMask::OTHER,
                (FragmentKind::Cflags, "only_I") => KindMask::INCLUDE_PATH,
                (FragmentKind::Libs, "only_ldpath") => KindMask::LIBRARY_PATH,
                (FragmentKind::Libs, "only_libname") => KindMask::LIBRARY_NAME,
                _ => {
                    return Err(Error::ConfigurationError {
                        option: name.to_string(),
                        message: format!("not a recognized option for {kind}"),
                    });
                }
            };
            if parse_bool(name, value)? {
                config.mask = config.mask.with(mask);
            }
        }
        Ok(config)
    }

    /// Reject sub-kind restrictions that do not exist for this family.
    pub fn validate(&self) -> Result<()> {
        let (name, invalid) = match self.kind {
            FragmentKind::Cflags => (
                "only_ldpath/only_libname",
                KindMask::LIBRARY_PATH.with(KindMask::LIBRARY_NAME),
            ),
            FragmentKind::Libs => ("only_I", KindMask::INCLUDE_PATH),
        };
        if self.mask.0 & invalid.0 != 0 {
            return Err(Error::ConfigurationError {
                option: name.to_string(),
                message: format!("does not apply to {}", self.kind),
            });
        }
        Ok(())
    }

    /// Whether `frag` survives this configuration.
    pub fn keeps(&self, frag: &Fragment, system: &SystemDirs) -> bool {
        if !self.keep_system_paths && system.is_system(frag) {
            return false;
        }

        // Untyped fragments are not subject to the type list
        if let (Some(types), Some(t)) = (self.custom_types.as_deref(), frag.frag_type)
            && !types.is_empty()
            && !types.contains(t)
        {
            return false;
        }

        if self.mask.is_empty() {
            return true;
        }

        let sub_kind = match frag.frag_type {
            Some(t) if !frag.is_other(self.kind) => KindMask::for_type(t),
            _ => KindMask::OTHER,
        };
        self.mask.contains(sub_kind)
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(Error::ConfigurationError {
            option: name.to_string(),
            message: format!("expected a boolean, got '{value}'"),
        }),
    }
}

/// Keep the fragments `config` accepts, in order.
pub fn filter(fragments: Vec<Fragment>, config: &FilterConfig, system: &SystemDirs) -> Vec<Fragment> {
    fragments
        .into_iter()
        .filter(|f| config.keeps(f, system))
        .collect()
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render fragments joined by single spaces.
///
/// A fragment equal to one already rendered is dropped; the first occurrence
/// keeps its position.
pub fn render(fragments: &[Fragment]) -> Result<String> {
    let mut seen = HashSet::new();
    let mut parts = Vec::with_capacity(fragments.len());
    for frag in fragments {
        if seen.insert(frag) {
            parts.push(frag.render()?);
        }
    }
    Ok(parts.join(" "))
}

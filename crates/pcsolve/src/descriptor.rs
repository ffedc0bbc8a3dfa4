//! Parsed package descriptors.
//!
//! A [`PackageDescriptor`] is what the resolver and collector work with: the
//! dependency edges and flag fragments of one component, with every variable
//! already expanded. Descriptors are built by the
//! [`Registry`](crate::registry::Registry), which owns them in an arena and
//! hands out [`DescriptorId`]s.
//!
//! # The world
//!
//! Each resolution roots its graph at a synthetic descriptor built by
//! [`PackageDescriptor::world`]. It is virtual (it has no fragments and never
//! appears in the output) and static-only (its private edges, if any, are
//! always followed).

use std::fmt;

use crate::dependency::{self, Dependency};
use crate::error::Result;
use crate::fragment::{self, Fragment};
use crate::parser::{Keyword, RawDescriptor};
use crate::variables::{Environment, ScopeId};

/// The name given to the synthetic root of every resolution.
pub const WORLD_NAME: &str = "virtual:world";

/// Index of a descriptor inside a registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorId(pub(crate) usize);

impl DescriptorId {
    /// The raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Flags describing the origin of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DescriptorFlags(u32);

impl DescriptorFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);

    /// Synthetic descriptor with no backing text.
    pub const VIRTUAL: Self = Self(1 << 0);

    /// Private edges are followed even outside static mode.
    pub const STATIC_ONLY: Self = Self(1 << 1);

    /// Check if a specific flag is set.
    pub fn contains(self, flag: Self) -> bool {
        (self.0 & flag.0) == flag.0
    }

    /// Set a flag, returning the new flags value.
    pub fn set(self, flag: Self) -> Self {
        Self(self.0 | flag.0)
    }
}

/// An immutable, fully-expanded package descriptor.
#[derive(Debug, Clone)]
pub struct PackageDescriptor {
    /// The lookup name (`.pc` file stem).
    pub name: String,

    /// The `Name` field, if present.
    pub display_name: Option<String>,

    /// The `Version` field.
    pub version: Option<String>,

    /// The `Description` field.
    pub description: Option<String>,

    /// The `URL` field.
    pub url: Option<String>,

    /// `Requires` edges, in declared order.
    pub requires: Vec<Dependency>,

    /// `Requires.private` edges, followed only in static mode.
    pub requires_private: Vec<Dependency>,

    /// `Cflags` fragments.
    pub cflags: Vec<Fragment>,

    /// `Cflags.private` fragments.
    pub cflags_private: Vec<Fragment>,

    /// `Libs` fragments.
    pub libs: Vec<Fragment>,

    /// `Libs.private` fragments.
    pub libs_private: Vec<Fragment>,

    /// The local variable scope, absent for synthetic descriptors.
    pub scope: Option<ScopeId>,

    /// Origin flags.
    pub flags: DescriptorFlags,
}

impl PackageDescriptor {
    /// A descriptor with no fields, edges, or scope.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            version: None,
            description: None,
            url: None,
            requires: Vec::new(),
            requires_private: Vec::new(),
            cflags: Vec::new(),
            cflags_private: Vec::new(),
            libs: Vec::new(),
            libs_private: Vec::new(),
            scope: None,
            flags: DescriptorFlags::NONE,
        }
    }

    /// The synthetic root requiring `requests`, in order and with duplicates kept.
    pub fn world(requests: Vec<Dependency>) -> Self {
        let mut world = Self::empty(WORLD_NAME);
        world.requires = requests;
        world.flags = DescriptorFlags::VIRTUAL.set(DescriptorFlags::STATIC_ONLY);
        world
    }

    /// Build a descriptor from parsed text whose variables are already
    /// defined in `scope`.
    ///
    /// Every field is expanded through `env`. Absolute `-I` and `-L` payloads
    /// are prefixed with `sysroot` when one is given.
    pub fn from_raw(
        name: &str,
        raw: &RawDescriptor,
        env: &Environment,
        scope: ScopeId,
        sysroot: Option<&str>,
    ) -> Result<Self> {
        let field = |kw: Keyword| -> Result<Option<String>> {
            raw.field(kw).map(|value| env.expand(scope, value)).transpose()
        };

        let fragments = |kw: Keyword| -> Result<Vec<Fragment>> {
            let mut list = field(kw)?
                .map(|value| Fragment::parse_list(&value, name))
                .unwrap_or_default();
            if let Some(root) = sysroot {
                fragment::apply_sysroot(&mut list, root);
            }
            Ok(list)
        };

        let edges = |kw: Keyword| -> Result<Vec<Dependency>> {
            match field(kw)? {
                Some(value) => dependency::parse_list(&value),
                None => Ok(Vec::new()),
            }
        };

        Ok(Self {
            name: name.to_string(),
            display_name: field(Keyword::Name)?,
            version: field(Keyword::Version)?,
            description: field(Keyword::Description)?,
            url: field(Keyword::URL)?,
            requires: edges(Keyword::Requires)?,
            requires_private: edges(Keyword::RequiresPrivate)?,
            cflags: fragments(Keyword::Cflags)?,
            cflags_private: fragments(Keyword::CflagsPrivate)?,
            libs: fragments(Keyword::Libs)?,
            libs_private: fragments(Keyword::LibsPrivate)?,
            scope: Some(scope),
            flags: DescriptorFlags::NONE,
        })
    }

    /// Whether this is a synthetic descriptor.
    pub fn is_virtual(&self) -> bool {
        self.flags.contains(DescriptorFlags::VIRTUAL)
    }

    /// Whether private edges are followed regardless of static mode.
    pub fn is_static_only(&self) -> bool {
        self.flags.contains(DescriptorFlags::STATIC_ONLY)
    }

    /// The edges traversed from this descriptor: `Requires`, then
    /// `Requires.private` when linking statically.
    pub fn children(&self, static_mode: bool) -> impl Iterator<Item = &Dependency> {
        let private = static_mode || self.is_static_only();
        self.requires
            .iter()
            .chain(self.requires_private.iter().filter(move |_| private))
    }
}

impl fmt::Display for PackageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{} {v}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

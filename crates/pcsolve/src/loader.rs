//! Where descriptor text comes from.
//!
//! The registry never touches the filesystem itself; it asks a
//! [`DescriptorSource`] for the raw text of a component. [`FsSource`] walks a
//! [`SearchPath`], [`MemorySource`] serves text registered in memory.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::path::SearchPath;

/// Raw descriptor text plus where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedText {
    /// The descriptor text.
    pub text: String,

    /// The directory the descriptor lives in, if it came from disk.
    /// Becomes the `pcfiledir` variable.
    pub dir: Option<PathBuf>,
}

/// Produces descriptor text for a component name.
pub trait DescriptorSource: fmt::Debug + Send + Sync {
    /// Load the text for `name`.
    ///
    /// Returns `Ok(None)` when no descriptor exists; errors are reserved for
    /// descriptors that exist but cannot be read.
    fn load(&self, name: &str) -> Result<Option<LoadedText>>;
}

/// Loads `.pc` files from an ordered list of directories.
#[derive(Debug, Clone, Default)]
pub struct FsSource {
    search_path: SearchPath,
}

impl FsSource {
    /// Create a source searching the given directories.
    pub fn new(search_path: SearchPath) -> Self {
        Self { search_path }
    }

    /// The directories searched, in priority order.
    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    fn read(path: &Path) -> Result<Option<LoadedText>> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(LoadedText {
                text,
                dir: path.parent().map(Path::to_path_buf),
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl DescriptorSource for FsSource {
    fn load(&self, name: &str) -> Result<Option<LoadedText>> {
        // A name that looks like a path is loaded directly
        if name.contains('/') || name.ends_with(".pc") {
            return Self::read(Path::new(name));
        }

        match self.search_path.find_pc_file(name) {
            Some(path) => {
                log::debug!("found {name} at {}", path.display());
                Self::read(&path)
            }
            None => Ok(None),
        }
    }
}

/// Serves descriptor text registered in memory.
///
/// # Examples
///
/// ```
/// use pcsolve::loader::{DescriptorSource, MemorySource};
///
/// let source = MemorySource::new().with("foo", "Name: foo\nLibs: -lfoo\n");
/// assert!(source.load("foo").unwrap().is_some());
/// assert!(source.load("bar").unwrap().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entries: HashMap<String, String>,
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the text for `name`.
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.entries.insert(name.into(), text.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }
}

impl DescriptorSource for MemorySource {
    fn load(&self, name: &str) -> Result<Option<LoadedText>> {
        Ok(self.entries.get(name).map(|text| LoadedText {
            text: text.clone(),
            dir: None,
        }))
    }
}

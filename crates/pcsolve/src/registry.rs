//! The descriptor registry.
//!
//! [`Registry`] owns every loaded [`PackageDescriptor`] in an arena and
//! indexes them by `(name, variable fingerprint)`. Descriptors are expanded
//! once, at load time, under the global bindings in effect; when those
//! bindings change the whole arena is dropped, so a descriptor expanded under
//! `prefix=/usr` is never served to a request running under `prefix=/opt`.
//!
//! The registry also owns the [`Environment`]: local scopes live as long as
//! the descriptors that use them and are released with them.

use std::collections::HashMap;
use std::ops::Index;
use std::path::Path;

use crate::descriptor::{DescriptorId, PackageDescriptor};
use crate::error::{Error, Result};
use crate::loader::DescriptorSource;
use crate::parser::RawDescriptor;
use crate::variables::{Environment, SavedGlobals};

/// The builtin variable holding the sysroot.
pub const SYSROOT_VARIABLE: &str = "pc_sysrootdir";

/// The per-descriptor variable holding the directory of its `.pc` file.
pub const PCFILEDIR_VARIABLE: &str = "pcfiledir";

/// Arena of descriptors, cached by name and variable fingerprint.
#[derive(Debug)]
pub struct Registry {
    env: Environment,
    source: Box<dyn DescriptorSource>,
    sysroot: Option<String>,
    arena: Vec<PackageDescriptor>,
    index: HashMap<(String, u64), DescriptorId>,
    fingerprint: u64,
}

impl Registry {
    /// Create a registry reading descriptors from `source`.
    pub fn new(source: impl DescriptorSource + 'static) -> Self {
        Self::from_boxed(Box::new(source))
    }

    /// Create a registry from an already boxed source.
    pub fn from_boxed(source: Box<dyn DescriptorSource>) -> Self {
        let mut env = Environment::new();
        env.define_builtin(SYSROOT_VARIABLE, "");
        let fingerprint = env.fingerprint();
        Self {
            env,
            source,
            sysroot: None,
            arena: Vec::new(),
            index: HashMap::new(),
            fingerprint,
        }
    }

    /// The variable environment.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Define a global variable. Cached descriptors are dropped.
    pub fn define_global(&mut self, key: &str, value: &str) {
        self.env.define(key, value);
        self.refresh();
    }

    /// The sysroot, if one is set.
    pub fn sysroot(&self) -> Option<&str> {
        self.sysroot.as_deref()
    }

    /// Set or clear the sysroot. Cached descriptors are dropped.
    pub fn set_sysroot(&mut self, sysroot: Option<&str>) {
        let sysroot = sysroot.filter(|s| !s.is_empty()).map(|s| s.trim_end_matches('/'));
        self.env.define_builtin(SYSROOT_VARIABLE, sysroot.unwrap_or(""));
        self.sysroot = sysroot.map(str::to_string);
        self.invalidate();
        self.fingerprint = self.env.fingerprint();
    }

    /// Run `f` with temporary global bindings.
    ///
    /// The previous bindings are restored afterwards, whatever `f` returns, and
    /// anything loaded under the temporary bindings is dropped.
    pub fn with_overrides<I, K, V, R>(&mut self, bindings: I, f: impl FnOnce(&mut Self) -> R) -> R
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let saved = self.push_overrides(bindings);
        let result = f(self);
        self.restore(saved);
        result
    }

    /// Apply temporary global bindings; undo with [`restore`](Self::restore).
    pub fn push_overrides<I, K, V>(&mut self, bindings: I) -> SavedGlobals
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.env.push_overrides(bindings)
    }

    /// Restore the bindings captured by [`push_overrides`](Self::push_overrides).
    pub fn restore(&mut self, saved: SavedGlobals) {
        self.env.restore(saved);
        self.refresh();
    }

    /// Drop every cached descriptor and its variable scope.
    pub fn invalidate(&mut self) {
        if !self.arena.is_empty() {
            log::debug!("invalidating {} cached descriptors", self.arena.len());
        }
        self.arena.clear();
        self.index.clear();
        self.env.clear_scopes();
    }

    /// Invalidate if the global bindings changed since the last load.
    fn refresh(&mut self) {
        let current = self.env.fingerprint();
        if current != self.fingerprint {
            self.invalidate();
            self.fingerprint = current;
        }
    }

    /// Look up `name`, loading it on first reference.
    ///
    /// Returns `Ok(None)` if no descriptor exists for `name`.
    pub fn find(&mut self, name: &str) -> Result<Option<DescriptorId>> {
        self.refresh();

        let key = (name.to_string(), self.fingerprint);
        if let Some(&id) = self.index.get(&key) {
            return Ok(Some(id));
        }

        let Some(loaded) = self.source.load(name)? else {
            log::debug!("no descriptor for '{name}'");
            return Ok(None);
        };

        let raw = RawDescriptor::parse(&loaded.text);
        let scope = self.env.new_scope();
        if let Some(dir) = &loaded.dir
            && !raw.variables.iter().any(|(k, _)| k == PCFILEDIR_VARIABLE)
        {
            self.env
                .define_scoped(scope, PCFILEDIR_VARIABLE, &dir.to_string_lossy());
        }
        for (k, v) in &raw.variables {
            self.env.define_scoped(scope, k, v);
        }

        let desc = PackageDescriptor::from_raw(
            descriptor_name(name),
            &raw,
            &self.env,
            scope,
            self.sysroot.as_deref(),
        )?;

        let id = DescriptorId(self.arena.len());
        log::debug!("loaded '{name}' as descriptor #{}", id.0);
        self.arena.push(desc);
        self.index.insert(key, id);
        Ok(Some(id))
    }

    /// Like [`find`](Self::find), but a missing descriptor is an error.
    pub fn load(&mut self, name: &str) -> Result<DescriptorId> {
        self.find(name)?.ok_or_else(|| Error::ComponentNotFound {
            name: name.to_string(),
        })
    }

    /// The descriptor behind `id`, if it is still cached.
    pub fn get(&self, id: DescriptorId) -> Option<&PackageDescriptor> {
        self.arena.get(id.0)
    }

    /// The expanded value of `key` as seen from descriptor `id`.
    pub fn variable(&self, id: DescriptorId, key: &str) -> Result<Option<String>> {
        match self.get(id).and_then(|d| d.scope) {
            Some(scope) => self.env.lookup(scope, key),
            None => Ok(None),
        }
    }

    /// Variables declared by descriptor `id`, in declaration order.
    pub fn variables(&self, id: DescriptorId) -> Vec<&str> {
        self.get(id)
            .and_then(|d| d.scope)
            .map(|scope| self.env.enumerate(scope))
            .unwrap_or_default()
    }

    /// The number of cached descriptors.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }
}

impl Index<DescriptorId> for Registry {
    type Output = PackageDescriptor;

    fn index(&self, id: DescriptorId) -> &PackageDescriptor {
        &self.arena[id.0]
    }
}

/// The descriptor name for a lookup: the file stem for path-like lookups.
fn descriptor_name(name: &str) -> &str {
    if name.contains('/') || name.ends_with(".pc") {
        Path::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(name)
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{FsSource, MemorySource};
    use crate::path::SearchPath;
    use std::fs;

    fn registry() -> Registry {
        Registry::new(
            MemorySource::new()
                .with(
                    "simple",
                    "prefix=/usr\nlibdir=${prefix}/lib\nVersion: 1.0\nLibs: -L${libdir} -lsimple\n",
                )
                .with("bare", "Name: bare\n"),
        )
    }

    #[test]
    fn load_caches_by_name() {
        let mut reg = registry();
        let a = reg.load("simple").unwrap();
        let b = reg.load("simple").unwrap();
        assert_eq!(a, b);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg[a].version.as_deref(), Some("1.0"));
    }

    #[test]
    fn load_missing_is_not_found() {
        let mut reg = registry();
        let err = reg.load("nope").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(reg.find("nope").unwrap(), None);
        assert!(reg.is_empty());
    }

    #[test]
    fn define_global_invalidates() {
        let mut reg = registry();
        let id = reg.load("simple").unwrap();
        assert_eq!(reg[id].libs[0].data, "/usr/lib");

        reg.define_global("prefix", "/opt");
        assert!(reg.is_empty());
        let id = reg.load("simple").unwrap();
        assert_eq!(reg[id].libs[0].data, "/opt/lib");
    }

    #[test]
    fn overrides_are_scoped() {
        let mut reg = registry();
        let inside = reg.with_overrides([("prefix", "/opt")], |reg| {
            let id = reg.load("simple").unwrap();
            reg.variable(id, "libdir").unwrap()
        });
        assert_eq!(inside.as_deref(), Some("/opt/lib"));

        let id = reg.load("simple").unwrap();
        assert_eq!(reg.variable(id, "libdir").unwrap().as_deref(), Some("/usr/lib"));
        assert_eq!(reg[id].libs[0].data, "/usr/lib");
    }

    #[test]
    fn overrides_restore_after_error() {
        let mut reg = registry();
        let result = reg.with_overrides([("prefix", "/opt")], |reg| reg.load("missing"));
        assert!(result.is_err());
        assert!(reg.env().globals().is_empty());
    }

    #[test]
    fn sysroot_prefixes_paths_and_sets_builtin() {
        let mut reg = registry();
        reg.set_sysroot(Some("/cross/"));
        assert_eq!(reg.sysroot(), Some("/cross"));

        let id = reg.load("simple").unwrap();
        assert_eq!(reg[id].libs[0].data, "/cross/usr/lib");
        assert_eq!(
            reg.variable(id, SYSROOT_VARIABLE).unwrap().as_deref(),
            Some("/cross")
        );

        reg.set_sysroot(None);
        let id = reg.load("simple").unwrap();
        assert_eq!(reg[id].libs[0].data, "/usr/lib");
    }

    #[test]
    fn variables_in_declaration_order() {
        let mut reg = registry();
        let id = reg.load("simple").unwrap();
        assert_eq!(reg.variables(id), ["prefix", "libdir"]);

        let bare = reg.load("bare").unwrap();
        assert!(reg.variables(bare).is_empty());
    }

    #[test]
    fn pcfiledir_defined_for_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ondisk.pc"), "Cflags: -I${pcfiledir}/inc\n").unwrap();
        fs::write(dir.path().join("own.pc"), "pcfiledir=/mine\nx=1\n").unwrap();

        let source = FsSource::new(SearchPath::from_paths(&[dir.path().to_str().unwrap()]));
        let mut reg = Registry::new(source);

        let id = reg.load("ondisk").unwrap();
        assert_eq!(reg.variables(id), ["pcfiledir"]);
        assert_eq!(
            reg[id].cflags[0].data,
            format!("{}/inc", dir.path().display())
        );

        let own = reg.load("own").unwrap();
        assert_eq!(reg.variables(own), ["pcfiledir", "x"]);
        assert_eq!(reg.variable(own, "pcfiledir").unwrap().as_deref(), Some("/mine"));
    }

    #[test]
    fn path_lookup_uses_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("direct.pc");
        fs::write(&path, "Version: 2\n").unwrap();

        let mut reg = Registry::new(FsSource::default());
        let id = reg.load(path.to_str().unwrap()).unwrap();
        assert_eq!(reg[id].name, "direct");
    }

    #[test]
    fn circular_variables_fail_to_load() {
        let mut reg = Registry::new(MemorySource::new().with("loop", "a=${b}\nb=${a}\nLibs: ${a}\n"));
        let err = reg.load("loop").unwrap_err();
        assert!(matches!(err, Error::CircularVariableReference { .. }));
    }
}

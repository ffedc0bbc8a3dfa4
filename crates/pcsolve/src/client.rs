//! The public facade.
//!
//! A [`Client`] owns one [`Registry`] plus the settings that shape a query:
//! static mode, the traversal depth bound, the system directories whose
//! flags are suppressed, and whether that suppression applies per kind.
//! Clients share nothing; run concurrent resolutions on separate clients.
//!
//! # Example
//!
//! ```
//! use pcsolve::client::Client;
//! use pcsolve::fragment::FragmentKind;
//! use pcsolve::loader::MemorySource;
//!
//! let source = MemorySource::new().with(
//!     "simple",
//!     "prefix=/usr\nlibdir=${prefix}/lib\nVersion: 1.0.0\nLibs: -L${libdir} -lsimple\nLibs.private: -lm\n",
//! );
//! let mut client = Client::builder().skip_env(true).source(source).build();
//!
//! let filter = client.filter_config(FragmentKind::Libs);
//! assert_eq!(client.libs(&["simple"], &filter).unwrap(), "-lsimple");
//!
//! client.set_static(true);
//! assert_eq!(client.libs(&["simple"], &filter).unwrap(), "-lsimple -lm");
//! assert_eq!(client.get_version("simple").as_deref(), Some("1.0.0"));
//! ```

use std::path::PathBuf;

use crate::dependency::{self, Dependency};
use crate::descriptor::DescriptorId;
use crate::error::{Error, Result};
use crate::fragment::{self, FilterConfig, FragmentKind, SystemDirs};
use crate::loader::{DescriptorSource, FsSource};
use crate::path::{PATH_SEPARATOR, SearchPath};
use crate::registry::Registry;
use crate::resolver;

/// A resolver instance with its own descriptor cache and variable environment.
#[derive(Debug)]
pub struct Client {
    registry: Registry,
    search_path: SearchPath,
    system: SystemDirs,
    keep_system_cflags: bool,
    keep_system_libs: bool,
    static_mode: bool,
    max_traversal_depth: usize,
}

impl Client {
    /// Create a client with default settings, honouring the environment.
    pub fn new() -> Self {
        ClientBuilder::new().build()
    }

    /// Create a builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    // -------------------------------------------------------------------------
    // Settings
    // -------------------------------------------------------------------------

    /// The descriptor registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The directories searched for `.pc` files.
    ///
    /// Empty when the client was built with a custom source.
    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    /// The system directories whose `-I`/`-L` flags are suppressed.
    pub fn system_dirs(&self) -> &SystemDirs {
        &self.system
    }

    /// Whether private requirements and fragments are included by default.
    pub fn is_static(&self) -> bool {
        self.static_mode
    }

    /// Set the default static mode.
    pub fn set_static(&mut self, static_mode: bool) {
        self.static_mode = static_mode;
    }

    /// The default maximum traversal depth.
    pub fn max_traversal_depth(&self) -> usize {
        self.max_traversal_depth
    }

    /// Set the default maximum traversal depth.
    pub fn set_max_traversal_depth(&mut self, depth: usize) {
        self.max_traversal_depth = depth;
    }

    /// Whether system include directories are kept by default.
    pub fn keep_system_cflags(&self) -> bool {
        self.keep_system_cflags
    }

    /// Whether system library directories are kept by default.
    pub fn keep_system_libs(&self) -> bool {
        self.keep_system_libs
    }

    /// The sysroot, if one is set.
    pub fn sysroot(&self) -> Option<&str> {
        self.registry.sysroot()
    }

    /// Set or clear the sysroot.
    pub fn set_sysroot(&mut self, sysroot: Option<&str>) {
        self.registry.set_sysroot(sysroot);
        self.system.sysroot = self.registry.sysroot().map(str::to_string);
    }

    /// Define a global variable, overriding descriptor-local definitions.
    pub fn define_variable(&mut self, key: &str, value: &str) {
        self.registry.define_global(key, value);
    }

    /// Define a global variable from a `key=value` string.
    pub fn define_variable_from_str(&mut self, definition: &str) -> Result<()> {
        let (key, value) = parse_definition(definition)?;
        self.define_variable(key, value);
        Ok(())
    }

    /// Run `f` with temporary global variables.
    ///
    /// The prior bindings are restored afterwards, including when `f` fails.
    pub fn with_overrides<I, K, V, R>(&mut self, bindings: I, f: impl FnOnce(&mut Self) -> R) -> R
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let saved = self.registry.push_overrides(bindings);
        let result = f(self);
        self.registry.restore(saved);
        result
    }

    /// A default filter for `kind`, keeping system paths if this client does.
    pub fn filter_config(&self, kind: FragmentKind) -> FilterConfig {
        let keep = match kind {
            FragmentKind::Cflags => self.keep_system_cflags,
            FragmentKind::Libs => self.keep_system_libs,
        };
        FilterConfig::new(kind).keep_system_paths(keep)
    }

    // -------------------------------------------------------------------------
    // Flag queries
    // -------------------------------------------------------------------------

    /// Resolve `names` and render the flags of `kind`.
    ///
    /// Each name may carry a version constraint (`"zlib >= 1.2"`). Any
    /// failure aborts the whole query; there is no partial result.
    pub fn resolve_and_render<S: AsRef<str>>(
        &mut self,
        names: &[S],
        kind: FragmentKind,
        filter: &FilterConfig,
        static_mode: bool,
        max_depth: usize,
    ) -> Result<String> {
        self.render(names, kind, filter, static_mode, max_depth)
            .inspect_err(|e| log::error!("{kind} query failed: {e}"))
    }

    fn render<S: AsRef<str>>(
        &mut self,
        names: &[S],
        kind: FragmentKind,
        filter: &FilterConfig,
        static_mode: bool,
        max_depth: usize,
    ) -> Result<String> {
        if filter.kind != kind {
            return Err(Error::ConfigurationError {
                option: "kind".to_string(),
                message: format!("{} filter used for a {kind} query", filter.kind),
            });
        }
        filter.validate()?;

        let requests = parse_requests(names)?;
        let order = resolver::resolve(&mut self.registry, &requests, static_mode, max_depth)?;

        let collected = fragment::collect(
            order.iter().map(|&id| &self.registry[id]),
            kind,
            static_mode,
        );
        let kept = fragment::filter(collected, filter, &self.system);
        fragment::render(&kept)
    }

    /// Compiler flags for `names` with this client's static mode and depth bound.
    pub fn cflags<S: AsRef<str>>(&mut self, names: &[S], filter: &FilterConfig) -> Result<String> {
        let (static_mode, depth) = (self.static_mode, self.max_traversal_depth);
        self.resolve_and_render(names, FragmentKind::Cflags, filter, static_mode, depth)
    }

    /// Linker flags for `names` with this client's static mode and depth bound.
    pub fn libs<S: AsRef<str>>(&mut self, names: &[S], filter: &FilterConfig) -> Result<String> {
        let (static_mode, depth) = (self.static_mode, self.max_traversal_depth);
        self.resolve_and_render(names, FragmentKind::Libs, filter, static_mode, depth)
    }

    // -------------------------------------------------------------------------
    // Direct queries
    //
    // These look only at the named components, never their dependencies, and
    // report "no value" rather than failing.
    // -------------------------------------------------------------------------

    /// The value of `variable` in each named component that defines it,
    /// joined by spaces.
    pub fn get_variable<S: AsRef<str>>(&mut self, names: &[S], variable: &str) -> Option<String> {
        let ids = self.direct(names);
        let values: Vec<String> = ids
            .into_iter()
            .filter_map(|id| match self.registry.variable(id, variable) {
                Ok(value) => value,
                Err(e) => {
                    log::error!("cannot expand '{variable}': {e}");
                    None
                }
            })
            .collect();
        (!values.is_empty()).then(|| values.join(" "))
    }

    /// The variables declared by `name`, in declaration order.
    pub fn list_variables(&mut self, name: &str) -> Option<Vec<String>> {
        let id = self.direct(&[name]).into_iter().next()?;
        let vars: Vec<String> = self
            .registry
            .variables(id)
            .into_iter()
            .map(str::to_string)
            .collect();
        (!vars.is_empty()).then_some(vars)
    }

    /// The version of `name`.
    pub fn get_version(&mut self, name: &str) -> Option<String> {
        let id = self.direct(&[name]).into_iter().next()?;
        self.registry[id].version.clone()
    }

    /// The versions of each named component, one per line.
    pub fn modversion<S: AsRef<str>>(&mut self, names: &[S]) -> Option<String> {
        let versions: Vec<String> = self
            .direct(names)
            .into_iter()
            .filter_map(|id| self.registry[id].version.clone())
            .collect();
        (!versions.is_empty()).then(|| versions.join("\n"))
    }

    /// Load each named component that exists and satisfies its constraint.
    fn direct<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<DescriptorId> {
        let requests = match parse_requests(names) {
            Ok(requests) => requests,
            Err(e) => {
                log::error!("{e}");
                return Vec::new();
            }
        };

        let mut ids = Vec::with_capacity(requests.len());
        for dep in &requests {
            match self.registry.find(&dep.name) {
                Ok(Some(id)) if dep.is_satisfied_by(self.registry[id].version.as_deref()) => {
                    ids.push(id);
                }
                Ok(Some(_)) => log::error!("'{dep}' is not satisfied"),
                Ok(None) => log::debug!("'{}' not found", dep.name),
                Err(e) => log::error!("cannot load '{}': {e}", dep.name),
            }
        }
        ids
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse every request string into dependency edges, preserving order.
fn parse_requests<S: AsRef<str>>(names: &[S]) -> Result<Vec<Dependency>> {
    let mut requests = Vec::with_capacity(names.len());
    for name in names {
        requests.extend(dependency::parse_list(name.as_ref())?);
    }
    Ok(requests)
}

fn parse_definition(definition: &str) -> Result<(&str, &str)> {
    match definition.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => Err(Error::ConfigurationError {
            option: "define-variable".to_string(),
            message: format!("expected key=value, got '{definition}'"),
        }),
    }
}

/// Builder for [`Client`].
#[derive(Debug, Default)]
pub struct ClientBuilder {
    with_paths: Vec<PathBuf>,
    global_vars: Vec<(String, String)>,
    sysroot_dir: Option<String>,
    filter_libdirs: Option<Vec<String>>,
    filter_includedirs: Option<Vec<String>>,
    keep_system_cflags: bool,
    keep_system_libs: bool,
    static_mode: bool,
    max_traversal_depth: Option<usize>,
    source: Option<Box<dyn DescriptorSource>>,
    skip_env: bool,
    skip_default_paths: bool,
}

impl ClientBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Search `path` before any environment or default directory.
    pub fn with_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.with_paths.push(path.into());
        self
    }

    /// Search each of `paths`, in order.
    pub fn with_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.with_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Define a global variable.
    pub fn define_variable(mut self, key: &str, value: &str) -> Self {
        self.global_vars.push((key.to_string(), value.to_string()));
        self
    }

    /// Set the sysroot.
    pub fn sysroot_dir(mut self, sysroot: &str) -> Self {
        self.sysroot_dir = Some(sysroot.to_string());
        self
    }

    /// Replace the system library directories.
    pub fn filter_libdirs(mut self, dirs: Vec<String>) -> Self {
        self.filter_libdirs = Some(dirs);
        self
    }

    /// Replace the system include directories.
    pub fn filter_includedirs(mut self, dirs: Vec<String>) -> Self {
        self.filter_includedirs = Some(dirs);
        self
    }

    /// Keep `-I` flags naming system include directories.
    pub fn keep_system_cflags(mut self, keep: bool) -> Self {
        self.keep_system_cflags = keep;
        self
    }

    /// Keep `-L` flags naming system library directories.
    pub fn keep_system_libs(mut self, keep: bool) -> Self {
        self.keep_system_libs = keep;
        self
    }

    /// Include private requirements and fragments by default.
    pub fn enable_static(mut self, enable: bool) -> Self {
        self.static_mode = enable;
        self
    }

    /// Set the default maximum traversal depth.
    pub fn max_traversal_depth(mut self, depth: usize) -> Self {
        self.max_traversal_depth = Some(depth);
        self
    }

    /// Read descriptors from `source` instead of the search path.
    pub fn source(mut self, source: impl DescriptorSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Ignore `PKG_CONFIG_*` environment variables.
    pub fn skip_env(mut self, skip: bool) -> Self {
        self.skip_env = skip;
        self
    }

    /// Do not search the built-in default directories.
    pub fn skip_default_paths(mut self, skip: bool) -> Self {
        self.skip_default_paths = skip;
        self
    }

    /// Build the client.
    pub fn build(mut self) -> Client {
        if !self.skip_env {
            self.apply_env();
        }

        let search_path = self.build_search_path();
        let source = self
            .source
            .take()
            .unwrap_or_else(|| Box::new(FsSource::new(search_path.clone())));

        let mut registry = Registry::from_boxed(source);
        for (key, value) in &self.global_vars {
            registry.define_global(key, value);
        }
        registry.set_sysroot(self.sysroot_dir.as_deref());

        let system = SystemDirs {
            libdirs: dirs_or(self.filter_libdirs.as_deref(), crate::DEFAULT_SYSTEM_LIBDIRS),
            includedirs: dirs_or(
                self.filter_includedirs.as_deref(),
                crate::DEFAULT_SYSTEM_INCLUDEDIRS,
            ),
            sysroot: registry.sysroot().map(str::to_string),
        };

        log::debug!("search path: {search_path}");

        Client {
            registry,
            search_path,
            system,
            keep_system_cflags: self.keep_system_cflags,
            keep_system_libs: self.keep_system_libs,
            static_mode: self.static_mode,
            max_traversal_depth: self
                .max_traversal_depth
                .unwrap_or(crate::DEFAULT_MAX_TRAVERSAL_DEPTH),
        }
    }

    /// Fill unset options from `PKG_CONFIG_*` variables.
    fn apply_env(&mut self) {
        // PKG_CONFIG_SYSROOT_DIR
        if self.sysroot_dir.is_none()
            && let Ok(sysroot) = std::env::var(crate::ENV_PKG_CONFIG_SYSROOT_DIR)
            && !sysroot.is_empty()
        {
            self.sysroot_dir = Some(sysroot);
        }

        // PKG_CONFIG_ALLOW_SYSTEM_CFLAGS
        if std::env::var_os(crate::ENV_PKG_CONFIG_ALLOW_SYSTEM_CFLAGS).is_some() {
            self.keep_system_cflags = true;
        }

        // PKG_CONFIG_ALLOW_SYSTEM_LIBS
        if std::env::var_os(crate::ENV_PKG_CONFIG_ALLOW_SYSTEM_LIBS).is_some() {
            self.keep_system_libs = true;
        }

        // PKG_CONFIG_MAXIMUM_TRAVERSE_DEPTH
        if self.max_traversal_depth.is_none()
            && let Ok(depth) = std::env::var(crate::ENV_PKG_CONFIG_MAXIMUM_TRAVERSE_DEPTH)
        {
            match depth.trim().parse::<usize>() {
                Ok(depth) => self.max_traversal_depth = Some(depth),
                Err(_) => log::warn!(
                    "ignoring {}={depth}: not a number",
                    crate::ENV_PKG_CONFIG_MAXIMUM_TRAVERSE_DEPTH
                ),
            }
        }
    }

    /// `with_path` entries, then `PKG_CONFIG_PATH`, then `PKG_CONFIG_LIBDIR`
    /// or the defaults.
    fn build_search_path(&self) -> SearchPath {
        let mut search_path = SearchPath::new();
        for p in &self.with_paths {
            search_path.add(p.clone());
        }

        let env = |name: &str| {
            if self.skip_env {
                None
            } else {
                std::env::var(name).ok()
            }
        };

        if let Some(extra) = env(crate::ENV_PKG_CONFIG_PATH) {
            search_path.add_delimited(&extra, PATH_SEPARATOR);
        }

        match env(crate::ENV_PKG_CONFIG_LIBDIR) {
            Some(libdir) => search_path.add_delimited(&libdir, PATH_SEPARATOR),
            None if !self.skip_default_paths => {
                for dir in crate::DEFAULT_PKGCONFIG_PATH {
                    search_path.add(*dir);
                }
            }
            None => {}
        }

        search_path.deduplicate();
        search_path
    }
}

fn dirs_or(dirs: Option<&[String]>, default: &[&str]) -> SearchPath {
    match dirs {
        Some(dirs) => SearchPath::from_paths(dirs),
        None => SearchPath::from_paths(default),
    }
}

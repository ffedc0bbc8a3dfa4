//! Scoped variable storage and `${name}` expansion.
//!
//! An [`Environment`] holds three tiers of bindings, consulted in order:
//!
//! 1. User globals, from [`Environment::define`] and override blocks. These
//!    win over everything so that `prefix=/opt` relocates a descriptor.
//! 2. The local scope of the descriptor being expanded. Each descriptor gets
//!    its own [`ScopeId`] into an arena of scopes.
//! 3. Builtin globals such as `pc_sysrootdir`.
//!
//! Undefined variables expand to the empty string and are logged.

use std::collections::BTreeMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use crate::error::{Error, Result};

/// Expansion nesting beyond this is treated as a reference cycle.
const MAX_EXPANSION_DEPTH: usize = 64;

/// Handle to a local scope inside an [`Environment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// A descriptor's local variables, in declaration order.
#[derive(Debug, Clone, Default)]
struct Scope {
    vars: Vec<(String, String)>,
}

impl Scope {
    fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn set(&mut self, key: &str, value: &str) {
        match self.vars.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.vars.push((key.to_string(), value.to_string())),
        }
    }
}

/// Global bindings captured by [`Environment::push_overrides`].
#[derive(Debug, Clone)]
#[must_use = "pass to Environment::restore to undo the overrides"]
pub struct SavedGlobals(BTreeMap<String, String>);

/// Scoped key/value storage with `${name}` expansion.
///
/// # Examples
///
/// ```
/// use pcsolve::variables::Environment;
///
/// let mut env = Environment::new();
/// let scope = env.new_scope();
/// env.define_scoped(scope, "prefix", "/usr");
/// env.define_scoped(scope, "libdir", "${prefix}/lib");
/// assert_eq!(env.expand(scope, "-L${libdir}").unwrap(), "-L/usr/lib");
///
/// let relocated = env.with_overrides([("prefix", "/opt")], |env| env.lookup(scope, "libdir"));
/// assert_eq!(relocated.unwrap().as_deref(), Some("/opt/lib"));
/// assert_eq!(env.lookup(scope, "libdir").unwrap().as_deref(), Some("/usr/lib"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Environment {
    globals: BTreeMap<String, String>,
    builtins: BTreeMap<String, String>,
    scopes: Vec<Scope>,
}

impl Environment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a user global, overwriting any previous value.
    pub fn define(&mut self, key: &str, value: &str) {
        self.globals.insert(key.to_string(), value.to_string());
    }

    /// Define a builtin global. Builtins are shadowed by local scopes.
    pub fn define_builtin(&mut self, key: &str, value: &str) {
        self.builtins.insert(key.to_string(), value.to_string());
    }

    /// The user globals currently in effect.
    pub fn globals(&self) -> &BTreeMap<String, String> {
        &self.globals
    }

    /// Allocate a new, empty local scope.
    pub fn new_scope(&mut self) -> ScopeId {
        self.scopes.push(Scope::default());
        ScopeId(self.scopes.len() - 1)
    }

    /// Drop every local scope. Outstanding [`ScopeId`]s become dangling and
    /// resolve as empty scopes.
    pub fn clear_scopes(&mut self) {
        self.scopes.clear();
    }

    /// Define `key` in one local scope. Redefinition keeps the original
    /// position and replaces the value.
    pub fn define_scoped(&mut self, scope: ScopeId, key: &str, value: &str) {
        match self.scopes.get_mut(scope.0) {
            Some(s) => s.set(key, value),
            None => log::warn!("define of '{key}' in a released scope ignored"),
        }
    }

    /// The unexpanded value `key` resolves to from `scope`.
    pub fn raw(&self, scope: ScopeId, key: &str) -> Option<&str> {
        self.globals
            .get(key)
            .map(String::as_str)
            .or_else(|| self.scopes.get(scope.0).and_then(|s| s.get(key)))
            .or_else(|| self.builtins.get(key).map(String::as_str))
    }

    /// The expanded value of `key` as seen from `scope`.
    pub fn lookup(&self, scope: ScopeId, key: &str) -> Result<Option<String>> {
        match self.raw(scope, key) {
            Some(raw) => self.expand_depth(scope, raw, key, 1).map(Some),
            None => Ok(None),
        }
    }

    /// Keys declared in `scope`, in declaration order.
    pub fn enumerate(&self, scope: ScopeId) -> Vec<&str> {
        self.scopes
            .get(scope.0)
            .map(|s| s.vars.iter().map(|(k, _)| k.as_str()).collect())
            .unwrap_or_default()
    }

    /// Expand every `${name}` in `raw` as seen from `scope`.
    ///
    /// `$$` produces a literal `$`. An unterminated `${` is kept verbatim.
    pub fn expand(&self, scope: ScopeId, raw: &str) -> Result<String> {
        self.expand_depth(scope, raw, raw, 0)
    }

    fn expand_depth(&self, scope: ScopeId, raw: &str, origin: &str, depth: usize) -> Result<String> {
        if depth > MAX_EXPANSION_DEPTH {
            return Err(Error::CircularVariableReference {
                variable: origin.to_string(),
            });
        }

        let mut out = String::with_capacity(raw.len());
        let mut rest = raw;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if let Some(after) = tail.strip_prefix("$$") {
                out.push('$');
                rest = after;
            } else if let Some(body) = tail.strip_prefix("${") {
                let Some(close) = body.find('}') else {
                    out.push_str(tail);
                    return Ok(out);
                };
                let name = &body[..close];
                match self.raw(scope, name) {
                    Some(value) => {
                        let expanded = self.expand_depth(scope, value, name, depth + 1)?;
                        out.push_str(&expanded);
                    }
                    None => log::warn!("undefined variable '{name}' expands to empty string"),
                }
                rest = &body[close + 1..];
            } else {
                out.push('$');
                rest = &tail[1..];
            }
        }

        out.push_str(rest);
        Ok(out)
    }

    /// Apply temporary user globals, returning what they replaced.
    pub fn push_overrides<I, K, V>(&mut self, bindings: I) -> SavedGlobals
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let saved = SavedGlobals(self.globals.clone());
        for (k, v) in bindings {
            self.define(k.as_ref(), v.as_ref());
        }
        saved
    }

    /// Restore the user globals captured by [`push_overrides`](Self::push_overrides).
    pub fn restore(&mut self, saved: SavedGlobals) {
        self.globals = saved.0;
    }

    /// Run `f` with temporary user globals; the previous globals are restored
    /// afterwards whatever `f` returns.
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

    /// A hash of every global binding. Anything cached from expansions is
    /// only valid while this stays the same.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.globals.hash(&mut hasher);
        self.builtins.hash(&mut hasher);
        hasher.finish()
    }
}

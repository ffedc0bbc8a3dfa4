//! The world solver.
//!
//! [`resolve`] roots the request list at a synthetic world descriptor and
//! produces the settlement order of the transitive dependency graph: each
//! reachable descriptor exactly once, with descriptors referenced from many
//! places settling after those referenced from few.
//!
//! Resolution runs in two passes over one [`ResolutionContext`]:
//!
//! 1. **Discovery.** A depth-first walk from the world loads every reachable
//!    descriptor through the registry, checks version constraints and the
//!    depth bound, records the graph edges, and counts how many edges reach
//!    each descriptor. Edges back to a descriptor on the current path
//!    (cycles) are recorded but neither counted nor followed.
//! 2. **Settlement.** Requests are settled from last to first, each by a
//!    post-order walk of its children in reverse declared order. When a
//!    request names a child that an earlier settlement already placed, that
//!    child moves to the end. The result is then stably ordered by reference
//!    count, so shared dependencies sink below everything that needs them.

use std::collections::{HashMap, HashSet};

use crate::dependency::Dependency;
use crate::descriptor::{DescriptorId, PackageDescriptor};
use crate::error::{Error, Result};
use crate::registry::Registry;

/// Resolve `requests` into settlement order.
///
/// Depth is counted in edges from the world, so requests sit at depth 1; a
/// descriptor deeper than `max_depth` fails with
/// [`DepthExceeded`](Error::DepthExceeded). Private edges are followed when
/// `static_mode` is set.
///
/// # Examples
///
/// ```
/// use pcsolve::dependency::Dependency;
/// use pcsolve::loader::MemorySource;
/// use pcsolve::registry::Registry;
/// use pcsolve::resolver::resolve;
///
/// let source = MemorySource::new()
///     .with("app", "Requires: util\nLibs: -lapp\n")
///     .with("tool", "Requires: util\nLibs: -ltool\n")
///     .with("util", "Libs: -lutil\n");
/// let mut registry = Registry::new(source);
///
/// let requests = [Dependency::new("app"), Dependency::new("tool")];
/// let order = resolve(&mut registry, &requests, false, 10).unwrap();
/// let names: Vec<_> = order.iter().map(|&id| registry[id].name.as_str()).collect();
/// assert_eq!(names, ["tool", "app", "util"]);
/// ```
pub fn resolve(
    registry: &mut Registry,
    requests: &[Dependency],
    static_mode: bool,
    max_depth: usize,
) -> Result<Vec<DescriptorId>> {
    let world = PackageDescriptor::world(requests.to_vec());
    let mut ctx = ResolutionContext::new(registry, static_mode, max_depth);

    let roots = ctx.discover(&world)?;
    let order = ctx.settle(&roots);

    log::trace!(
        "settlement order: {}",
        order
            .iter()
            .map(|&id| ctx.registry[id].name.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    );
    Ok(order)
}

/// Transient state of one resolution.
struct ResolutionContext<'r> {
    registry: &'r mut Registry,
    static_mode: bool,
    max_depth: usize,

    /// Number of counted edges reaching each descriptor.
    hits: HashMap<DescriptorId, usize>,

    /// Descriptors whose subtree has been walked (or is being walked).
    seen: HashSet<DescriptorId>,

    /// The current path from the world, for cycle detection and diagnostics.
    ancestors: Vec<DescriptorId>,

    /// Resolved children of each walked descriptor, in declared order.
    edges: HashMap<DescriptorId, Vec<DescriptorId>>,
}

impl<'r> ResolutionContext<'r> {
    fn new(registry: &'r mut Registry, static_mode: bool, max_depth: usize) -> Self {
        Self {
            registry,
            static_mode,
            max_depth,
            hits: HashMap::new(),
            seen: HashSet::new(),
            ancestors: Vec::new(),
            edges: HashMap::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Discovery
    // -------------------------------------------------------------------------

    /// Walk the graph from the world, returning the resolved requests in order.
    fn discover(&mut self, world: &PackageDescriptor) -> Result<Vec<DescriptorId>> {
        let requests: Vec<Dependency> = world.children(self.static_mode).cloned().collect();
        let mut roots = Vec::with_capacity(requests.len());

        for dep in &requests {
            let id = self.follow(dep)?;
            roots.push(id);
            self.enter(id, 1)?;
        }

        Ok(roots)
    }

    /// Count an edge into `id` at `depth` and walk it if it is new.
    fn enter(&mut self, id: DescriptorId, depth: usize) -> Result<()> {
        *self.hits.entry(id).or_default() += 1;
        if !self.seen.insert(id) {
            return Ok(());
        }

        if depth > self.max_depth {
            let mut chain: Vec<String> = self
                .ancestors
                .iter()
                .map(|&a| self.registry[a].name.clone())
                .collect();
            chain.push(self.registry[id].name.clone());
            return Err(Error::DepthExceeded {
                depth: self.max_depth,
                chain,
            });
        }

        log::trace!("visiting {} at depth {depth}", self.registry[id].name);
        self.ancestors.push(id);
        let result = self.walk(id, depth);
        self.ancestors.pop();
        result
    }

    fn walk(&mut self, id: DescriptorId, depth: usize) -> Result<()> {
        let deps: Vec<Dependency> = self.registry[id]
            .children(self.static_mode)
            .cloned()
            .collect();
        let mut children = Vec::with_capacity(deps.len());

        for dep in &deps {
            let child = self.follow(dep)?;
            children.push(child);

            if self.ancestors.contains(&child) {
                log::trace!(
                    "cycle: {} -> {} skipped",
                    self.registry[id].name,
                    self.registry[child].name
                );
                continue;
            }
            self.enter(child, depth + 1)?;
        }

        self.edges.insert(id, children);
        Ok(())
    }

    /// Resolve one edge to a descriptor and check its version constraint.
    fn follow(&mut self, dep: &Dependency) -> Result<DescriptorId> {
        let id = self.registry.load(&dep.name)?;
        let found = self.registry[id].version.as_deref();

        if !dep.is_satisfied_by(found) {
            return Err(Error::VersionMismatch {
                name: dep.name.clone(),
                found: found.unwrap_or_default().to_string(),
                comparator: dep.comparator.to_string(),
                required: dep.version.clone().unwrap_or_default(),
            });
        }
        Ok(id)
    }

    // -------------------------------------------------------------------------
    // Settlement
    // -------------------------------------------------------------------------

    fn settle(&self, roots: &[DescriptorId]) -> Vec<DescriptorId> {
        let mut done = HashSet::new();
        let mut settled = Vec::with_capacity(self.seen.len());

        for &root in roots.iter().rev() {
            if !done.insert(root) {
                continue;
            }
            self.settle_children(root, true, &mut done, &mut settled);
            settled.push(root);
        }

        settled.sort_by_key(|id| self.hits.get(id).copied().unwrap_or_default());
        settled
    }

    fn settle_children(
        &self,
        id: DescriptorId,
        is_request: bool,
        done: &mut HashSet<DescriptorId>,
        settled: &mut Vec<DescriptorId>,
    ) {
        let Some(children) = self.edges.get(&id) else {
            return;
        };

        for &child in children.iter().rev() {
            if !done.insert(child) {
                // A request pulls its direct children behind everything
                // settled so far.
                if is_request
                    && child != id
                    && let Some(pos) = settled.iter().position(|&s| s == child)
                {
                    settled.remove(pos);
                    settled.push(child);
                }
                continue;
            }

            self.settle_children(child, false, done, settled);
            log::trace!("settled {}", self.registry[child].name);
            settled.push(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemorySource;

    /// Build a registry from `(name, requires, requires_private)` triples.
    fn graph(nodes: &[(&str, &str, &str)]) -> Registry {
        let mut source = MemorySource::new();
        for (name, requires, private) in nodes {
            source.insert(
                *name,
                format!(
                    "Name: {name}\nVersion: 1.0\nRequires: {requires}\nRequires.private: {private}\nLibs: -l{name}\n"
                ),
            );
        }
        Registry::new(source)
    }

    fn dependency_graph() -> Registry {
        graph(&[
            ("a_dep_c", "c_dep", ""),
            ("b_dep_c", "c_dep", ""),
            ("c_dep", "", ""),
            ("d_dep_e_f", "e_dep_g_f f_dep_g", ""),
            ("d_dep_f_e", "f_dep_g e_dep_g_f", ""),
            ("e_dep_g_f", "g_dep f_dep_g", ""),
            ("f_dep_g", "g_dep", ""),
            ("g_dep", "", ""),
            ("h_dep_k_i_j", "k_dep i_dep_k_j j_dep_k", ""),
            ("i_dep_k_j", "k_dep j_dep_k", ""),
            ("j_dep_k", "k_dep", ""),
            ("k_dep", "", ""),
        ])
    }

    fn order_of(reg: &mut Registry, requests: &[&str], static_mode: bool) -> Vec<String> {
        let deps: Vec<_> = requests.iter().map(|&n| Dependency::new(n)).collect();
        let order = resolve(reg, &deps, static_mode, 100).unwrap();
        order.iter().map(|&id| reg[id].name.clone()).collect()
    }

    fn assert_order(requests: &[&str], expected: &[&str]) {
        let mut reg = dependency_graph();
        assert_eq!(order_of(&mut reg, requests, false), expected, "requests {requests:?}");
    }

    // -------------------------------------------------------------------------
    // Settlement order
    // -------------------------------------------------------------------------

    #[test]
    fn shared_dependency() {
        for requests in [
            &["a_dep_c", "b_dep_c"][..],
            &["c_dep", "a_dep_c", "b_dep_c"],
            &["a_dep_c", "c_dep", "b_dep_c"],
            &["a_dep_c", "b_dep_c", "c_dep"],
        ] {
            assert_order(requests, &["b_dep_c", "a_dep_c", "c_dep"]);
        }
    }

    #[test]
    fn redundant_requests() {
        assert_order(&["a_dep_c", "a_dep_c", "b_dep_c"], &["b_dep_c", "c_dep", "a_dep_c"]);
        assert_order(&["b_dep_c", "a_dep_c", "b_dep_c"], &["a_dep_c", "b_dep_c", "c_dep"]);
    }

    #[test]
    fn diamond() {
        assert_order(&["d_dep_e_f"], &["e_dep_g_f", "d_dep_e_f", "g_dep", "f_dep_g"]);
        assert_order(&["d_dep_f_e"], &["e_dep_g_f", "d_dep_f_e", "g_dep", "f_dep_g"]);
    }

    #[test]
    fn nested() {
        assert_order(&["h_dep_k_i_j"], &["i_dep_k_j", "h_dep_k_i_j", "j_dep_k", "k_dep"]);
        assert_order(
            &["h_dep_k_i_j", "i_dep_k_j"],
            &["h_dep_k_i_j", "j_dep_k", "i_dep_k_j", "k_dep"],
        );
        assert_order(
            &["k_dep", "j_dep_k", "i_dep_k_j", "h_dep_k_i_j"],
            &["h_dep_k_i_j", "i_dep_k_j", "j_dep_k", "k_dep"],
        );
    }

    #[test]
    fn order_is_repeatable() {
        let mut reg = dependency_graph();
        let first = order_of(&mut reg, &["h_dep_k_i_j", "d_dep_e_f"], false);
        let second = order_of(&mut reg, &["h_dep_k_i_j", "d_dep_e_f"], false);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_request() {
        let mut reg = dependency_graph();
        assert!(order_of(&mut reg, &[], false).is_empty());
    }

    // -------------------------------------------------------------------------
    // Cycles and depth
    // -------------------------------------------------------------------------

    #[test]
    fn cycle_terminates_with_each_member_once() {
        let mut reg = graph(&[
            ("circular-1", "circular-2", ""),
            ("circular-2", "circular-3", ""),
            ("circular-3", "circular-1", ""),
        ]);
        assert_eq!(
            order_of(&mut reg, &["circular-1"], false),
            ["circular-3", "circular-2", "circular-1"]
        );
    }

    #[test]
    fn self_reference() {
        let mut reg = graph(&[("selfish", "selfish", "")]);
        assert_eq!(order_of(&mut reg, &["selfish"], false), ["selfish"]);
    }

    #[test]
    fn depth_bound_is_inclusive() {
        let mut reg = dependency_graph();
        let deps = [Dependency::new("d_dep_e_f")];
        // g_dep is first reached through d -> e -> g, three levels deep
        assert!(resolve(&mut reg, &deps, false, 3).is_ok());

        let err = resolve(&mut reg, &deps, false, 2).unwrap_err();
        match err {
            Error::DepthExceeded { depth, chain } => {
                assert_eq!(depth, 2);
                assert_eq!(chain, ["d_dep_e_f", "e_dep_g_f", "g_dep"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn depth_is_measured_on_first_visit() {
        let nodes = |top_requires: &str| {
            graph(&[
                ("top", top_requires, ""),
                ("mid", "leaf2", ""),
                ("leaf2", "leaf", ""),
                ("leaf", "", ""),
            ])
        };
        let deps = [Dependency::new("top")];

        // leaf is settled at depth 2 before the deeper path reaches it
        let mut shallow_first = nodes("leaf mid");
        assert!(resolve(&mut shallow_first, &deps, false, 3).is_ok());

        let mut deep_first = nodes("mid leaf");
        let err = resolve(&mut deep_first, &deps, false, 3).unwrap_err();
        assert!(matches!(
            err,
            Error::DepthExceeded { ref chain, .. } if chain == &["top", "mid", "leaf2", "leaf"]
        ));
    }

    #[test]
    fn zero_depth_rejects_any_request() {
        let mut reg = dependency_graph();
        let err = resolve(&mut reg, &[Dependency::new("c_dep")], false, 0).unwrap_err();
        assert!(matches!(err, Error::DepthExceeded { ref chain, .. } if chain == &["c_dep"]));
    }

    // -------------------------------------------------------------------------
    // Private edges, versions, missing descriptors
    // -------------------------------------------------------------------------

    #[test]
    fn private_edges_only_in_static_mode() {
        let mut reg = graph(&[("top", "", "hidden"), ("hidden", "", "")]);
        assert_eq!(order_of(&mut reg, &["top"], false), ["top"]);
        assert_eq!(order_of(&mut reg, &["top"], true), ["hidden", "top"]);
    }

    #[test]
    fn version_mismatch_on_edge() {
        let mut reg = graph(&[("needs", "lib >= 2.0", ""), ("lib", "", "")]);
        let err = resolve(&mut reg, &[Dependency::new("needs")], false, 10).unwrap_err();
        match err {
            Error::VersionMismatch {
                name,
                found,
                comparator,
                required,
            } => {
                assert_eq!(name, "lib");
                assert_eq!(found, "1.0");
                assert_eq!(comparator, ">=");
                assert_eq!(required, "2.0");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn version_checked_on_request() {
        use crate::version::Comparator;

        let mut reg = graph(&[("lib", "", "")]);
        let ok = Dependency::with_version("lib", Comparator::LessThan, "2");
        assert!(resolve(&mut reg, &[ok], false, 10).is_ok());

        let bad = Dependency::with_version("lib", Comparator::Equal, "2");
        assert!(matches!(
            resolve(&mut reg, &[bad], false, 10),
            Err(Error::VersionMismatch { .. })
        ));
    }

    #[test]
    fn missing_transitive_dependency() {
        let mut reg = graph(&[("broken", "ghost", "")]);
        let err = resolve(&mut reg, &[Dependency::new("broken")], false, 10).unwrap_err();
        assert!(matches!(err, Error::ComponentNotFound { ref name } if name == "ghost"));
    }
}

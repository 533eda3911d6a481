//! Module dependency resolution.
//!
//! Enabled modules are ordered depth-first along their `depends_on` edges and
//! emitted in post-order, so every dependency lands before its dependents.
//! Top-level modules are visited in declaration order and dependencies in the
//! order each module lists them; the result is deterministic for a given
//! input but not canonical across reorderings of it.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::info;

use crate::error::{CoreError, CoreResult};
use crate::module::ModuleDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// A module whose dependencies are being walked.
struct Frame<'a> {
    name: &'a str,
    module: &'a ModuleDescriptor,
    next_dep: usize,
}

struct Walk<'a> {
    enabled: IndexMap<&'a str, &'a ModuleDescriptor>,
    marks: HashMap<&'a str, Mark>,
    order: Vec<String>,
}

impl<'a> Walk<'a> {
    /// Walk everything reachable from `root` in post-order.
    ///
    /// The path is kept on an explicit stack, so chain length is bounded by
    /// memory rather than by the thread's stack size.
    fn visit(&mut self, root: &'a str) -> CoreResult<()> {
        let mut path: Vec<Frame<'a>> = Vec::new();
        self.enter(root, None, &mut path)?;

        while let Some(frame) = path.last_mut() {
            let module = frame.module;
            match module.depends_on.get(frame.next_dep) {
                Some(dep) => {
                    frame.next_dep += 1;
                    let referrer = frame.name;
                    self.enter(dep.as_str(), Some(referrer), &mut path)?;
                }
                None => {
                    let name = frame.name;
                    path.pop();
                    self.marks.insert(name, Mark::Done);
                    self.order.push(name.to_string());
                }
            }
        }

        Ok(())
    }

    /// Push `name` onto the path unless it is already finished.
    fn enter(
        &mut self,
        name: &'a str,
        referrer: Option<&str>,
        path: &mut Vec<Frame<'a>>,
    ) -> CoreResult<()> {
        match self.marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                return Err(CoreError::CircularDependency {
                    module: name.to_string(),
                })
            }
            None => {}
        }

        let Some(module) = self.enabled.get(name).copied() else {
            return Err(CoreError::UnresolvedDependency {
                module: referrer.unwrap_or(name).to_string(),
                dependency: name.to_string(),
            });
        };

        self.marks.insert(name, Mark::InProgress);
        path.push(Frame {
            name,
            module,
            next_dep: 0,
        });
        Ok(())
    }
}

/// Order the enabled modules so that dependencies come first.
///
/// Fails with [`CoreError::CircularDependency`] when a module is reached
/// again while its own dependencies are still being walked, and with
/// [`CoreError::UnresolvedDependency`] when a dependency is missing or
/// disabled.
pub fn resolve(modules: &IndexMap<String, ModuleDescriptor>) -> CoreResult<Vec<String>> {
    let enabled: IndexMap<&str, &ModuleDescriptor> = modules
        .iter()
        .filter(|(_, m)| m.enabled)
        .map(|(name, m)| (name.as_str(), m))
        .collect();

    let mut walk = Walk {
        marks: HashMap::with_capacity(enabled.len()),
        order: Vec::with_capacity(enabled.len()),
        enabled,
    };

    let roots: Vec<&str> = walk.enabled.keys().copied().collect();
    for name in roots {
        walk.visit(name)?;
    }

    info!("Validated module dependencies. Order: {}", walk.order.join(" → "));
    Ok(walk.order)
}


#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;
    use proptest::sample::Index;

    use super::*;

    // ===================
    // Strategies
    // ===================

    /// Edges of a random DAG over `n` nodes: node `i` may only depend on
    /// nodes below `i`. Returned with a random declaration order.
    fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = (Vec<Vec<usize>>, Vec<usize>)> {
        (1..=max_nodes).prop_flat_map(|n| {
            let edges = prop::collection::vec(prop::collection::vec(any::<Index>(), 0..4), n);
            let order = Just((0..n).collect::<Vec<_>>()).prop_shuffle();
            (edges, order).prop_map(|(picks, order)| {
                let deps: Vec<Vec<usize>> = picks
                    .into_iter()
                    .enumerate()
                    .map(|(i, picks)| {
                        if i == 0 {
                            Vec::new()
                        } else {
                            picks.into_iter().map(|p| p.index(i)).collect()
                        }
                    })
                    .collect();
                (deps, order)
            })
        })
    }

    fn name(i: usize) -> String {
        format!("m{}", i)
    }

    /// Build modules in `order` with the given dependency lists.
    fn build(deps: &[Vec<usize>], order: &[usize]) -> IndexMap<String, ModuleDescriptor> {
        order
            .iter()
            .map(|&i| {
                let module = ModuleDescriptor::new(name(i), "./m")
                    .depends_on(deps[i].iter().map(|&d| name(d)));
                (name(i), module)
            })
            .collect()
    }

    // ===================
    // Properties
    // ===================

    fn check_acyclic_sets_resolve(deps: &[Vec<usize>], order: &[usize]) -> Result<(), TestCaseError> {
        let modules = build(deps, order);
        let resolved = resolve(&modules).map_err(|e| TestCaseError::fail(e.to_string()))?;

        let mut sorted = resolved.clone();
        sorted.sort();
        let mut expected: Vec<String> = modules.keys().cloned().collect();
        expected.sort();
        prop_assert_eq!(sorted, expected);

        let position: HashMap<&str, usize> = resolved
            .iter()
            .enumerate()
            .map(|(pos, n)| (n.as_str(), pos))
            .collect();
        for (i, module_deps) in deps.iter().enumerate() {
            for &d in module_deps {
                prop_assert!(position[name(d).as_str()] < position[name(i).as_str()]);
            }
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn acyclic_sets_resolve_dependencies_first((deps, order) in dag_strategy(12)) {
            check_acyclic_sets_resolve(&deps, &order)?;
        }

        #[test]
        fn resolution_is_repeatable((deps, order) in dag_strategy(12)) {
            let modules = build(&deps, &order);
            prop_assert_eq!(resolve(&modules).ok(), resolve(&modules).ok());
        }

        #[test]
        fn back_edge_reports_cycle_member(
            (mut deps, order, low, high) in dag_strategy(10).prop_flat_map(|(deps, order)| {
                let n = deps.len();
                (Just(deps), Just(order), 0..n).prop_flat_map(move |(deps, order, low)| {
                    (Just(deps), Just(order), Just(low), low..n)
                })
            })
        ) {
            // Chain every node to its predecessor, then close `low..=high`
            // into a cycle. All other edges point downward, so every cycle
            // lies inside that range.
            for (i, module_deps) in deps.iter_mut().enumerate().skip(1) {
                module_deps.push(i - 1);
            }
            deps[low].push(high);

            match resolve(&build(&deps, &order)) {
                Err(CoreError::CircularDependency { module }) => {
                    let index: usize = module[1..].parse().unwrap();
                    prop_assert!((low..=high).contains(&index), "{} not in {}..={}", module, low, high);
                }
                other => prop_assert!(false, "expected circular dependency, got {:?}", other),
            }
        }

        #[test]
        fn missing_or_disabled_dependency_is_unresolved(
            (mut deps, order) in dag_strategy(10),
            source in any::<Index>(),
            offset in any::<Index>(),
            disable in any::<bool>(),
        ) {
            let n = deps.len();
            let source = source.index(n);
            let mut modules;
            let missing;

            if disable && n > 1 {
                let target = (source + 1 + offset.index(n - 1)) % n;
                deps[source].push(target);
                modules = build(&deps, &order);
                let disabled = modules[&name(target)].clone().disabled();
                modules.insert(name(target), disabled);
                missing = name(target);
            } else {
                modules = build(&deps, &order);
                let module = modules[&name(source)].clone().depends_on(["ghost"]);
                modules.insert(name(source), module);
                missing = "ghost".to_string();
            }

            match resolve(&modules) {
                Err(CoreError::UnresolvedDependency { dependency, .. }) => {
                    prop_assert_eq!(dependency, missing);
                }
                other => prop_assert!(false, "expected unresolved dependency, got {:?}", other),
            }
        }
    }
}

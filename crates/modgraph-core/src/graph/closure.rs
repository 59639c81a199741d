//! Generic topological closure.
//!
//! Given a set of roots and an edge function, collects every node reachable
//! from the roots and orders them so that each node comes after all of its
//! dependencies.

use std::collections::VecDeque;
use std::hash::Hash;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

use crate::error::Error;

/// Why a closure could not be computed.
#[derive(Debug)]
pub enum ClosureError<T> {
    /// A dependency cycle, as a closed walk: the first and last elements are
    /// the same node and each element depends on the next.
    Cycle(Vec<T>),
    /// The edge function failed.
    Edges(Error),
}

/// Order `roots` and everything they transitively depend on.
///
/// Nodes are identified by `key`; `deps` returns the direct dependencies of a
/// node. Dependencies always precede their dependents in the result. The
/// tie-break between independent nodes is unspecified.
pub fn top_closure<T, K>(
    roots: &[T],
    key: impl Fn(&T) -> K,
    mut deps: impl FnMut(&T) -> Result<Vec<T>, Error>,
) -> Result<Vec<T>, ClosureError<T>>
where
    T: Clone,
    K: Eq + Hash,
{
    // Edges go from dependency to dependent
    let mut graph: DiGraph<T, ()> = DiGraph::new();
    let mut indices: FxHashMap<K, NodeIndex> = FxHashMap::default();
    let mut queue = VecDeque::new();

    for root in roots {
        intern(&mut graph, &mut indices, &mut queue, key(root), root);
    }

    while let Some(idx) = queue.pop_front() {
        let node = graph[idx].clone();
        for dep in deps(&node).map_err(ClosureError::Edges)? {
            let dep_idx = intern(&mut graph, &mut indices, &mut queue, key(&dep), &dep);
            graph.update_edge(dep_idx, idx, ());
        }
    }

    toposort(&graph, None)
        .map(|order| order.into_iter().map(|idx| graph[idx].clone()).collect())
        .map_err(|cycle| ClosureError::Cycle(cycle_through(&graph, cycle.node_id())))
}

fn intern<T: Clone, K: Eq + Hash>(
    graph: &mut DiGraph<T, ()>,
    indices: &mut FxHashMap<K, NodeIndex>,
    queue: &mut VecDeque<NodeIndex>,
    key: K,
    node: &T,
) -> NodeIndex {
    *indices.entry(key).or_insert_with(|| {
        let idx = graph.add_node(node.clone());
        queue.push_back(idx);
        idx
    })
}

/// Shortest closed walk through `start` following "depends on" edges.
fn cycle_through<T: Clone>(graph: &DiGraph<T, ()>, start: NodeIndex) -> Vec<T> {
    let mut parent: FxHashMap<NodeIndex, NodeIndex> = FxHashMap::default();
    let mut queue = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        for dep in graph.neighbors_directed(node, Direction::Incoming) {
            if dep == start {
                let mut chain = vec![node];
                let mut cur = node;
                while let Some(&prev) = parent.get(&cur) {
                    chain.push(prev);
                    cur = prev;
                }
                chain.reverse();
                chain.push(start);
                return chain.into_iter().map(|idx| graph[idx].clone()).collect();
            }
            if !parent.contains_key(&dep) {
                parent.insert(dep, node);
                queue.push_back(dep);
            }
        }
    }

    // toposort reports a node on a cycle, so the search above always returns
    vec![graph[start].clone()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InternalError;
    use crate::module::ModuleName;

    fn edges<'a>(table: &'a [(&'a str, &'a [&'a str])]) -> impl FnMut(&&'a str) -> Result<Vec<&'a str>, Error> {
        move |node| {
            table
                .iter()
                .find(|(name, _)| name == node)
                .map(|(_, deps)| deps.to_vec())
                .ok_or_else(|| {
                    InternalError::MissingDependencies {
                        dir: None,
                        module: ModuleName::new(node),
                    }
                    .into()
                })
        }
    }

    fn position(order: &[&str], node: &str) -> usize {
        order.iter().position(|n| *n == node).unwrap()
    }

    #[test]
    fn test_linear_closure_pulls_in_dependencies() {
        let table: &[(&str, &[&str])] = &[("a", &[]), ("b", &["a"]), ("c", &["b"])];
        let order = top_closure(&["c"], |n| *n, edges(table)).unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_diamond_respects_precedence() {
        let table: &[(&str, &[&str])] = &[
            ("a", &[]),
            ("b", &["a"]),
            ("c", &["a"]),
            ("d", &["b", "c"]),
        ];
        let order = top_closure(&["d", "b"], |n| *n, edges(table)).unwrap();
        assert_eq!(order.len(), 4);
        for (node, deps) in table {
            for dep in *deps {
                assert!(position(&order, dep) < position(&order, node));
            }
        }
    }

    #[test]
    fn test_repeated_runs_satisfy_precedence() {
        let table: &[(&str, &[&str])] = &[("x", &[]), ("y", &[]), ("z", &["x", "y"])];
        for _ in 0..3 {
            let order = top_closure(&["z", "y", "x"], |n| *n, edges(table)).unwrap();
            assert!(position(&order, "x") < position(&order, "z"));
            assert!(position(&order, "y") < position(&order, "z"));
        }
    }

    #[test]
    fn test_cycle_is_closed_walk_over_real_edges() {
        let table: &[(&str, &[&str])] = &[("a", &["b"]), ("b", &["c"]), ("c", &["a"]), ("d", &[])];
        let Err(ClosureError::Cycle(chain)) = top_closure(&["d", "a"], |n| *n, edges(table)) else {
            panic!("expected a cycle");
        };
        assert!(chain.len() >= 2);
        assert_eq!(chain.first(), chain.last());
        for pair in chain.windows(2) {
            let (_, deps) = table.iter().find(|(n, _)| *n == pair[0]).unwrap();
            assert!(deps.contains(&pair[1]), "{} does not depend on {}", pair[0], pair[1]);
        }
        assert!(!chain.contains(&"d"));
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let table: &[(&str, &[&str])] = &[("a", &["a"])];
        let Err(ClosureError::Cycle(chain)) = top_closure(&["a"], |n| *n, edges(table)) else {
            panic!("expected a cycle");
        };
        assert_eq!(chain, vec!["a", "a"]);
    }

    #[test]
    fn test_edge_failure_is_reported() {
        let table: &[(&str, &[&str])] = &[("a", &["missing"])];
        let result = top_closure(&["a"], |n| *n, edges(table));
        assert!(matches!(result, Err(ClosureError::Edges(Error::Internal(_)))));
    }

    #[test]
    fn test_empty_roots() {
        let table: &[(&str, &[&str])] = &[];
        let order = top_closure(&[], |n: &&str| *n, edges(table)).unwrap();
        assert!(order.is_empty());
    }
}

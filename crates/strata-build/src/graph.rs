//! Dependency ordering using topological sort
//!
//! Shared by module evaluation and task planning. Nodes keep their
//! declaration index, and whenever several nodes are ready at once the one
//! declared first goes next, so the order is a pure function of the input.
use crate::error::{BuildError, BuildResult, GraphKind};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// A validated dependency graph
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    kind: GraphKind,
    /// Node ids in declaration order
    ids: Vec<String>,
    /// Predecessor indices per node, deduplicated, in declaration order
    predecessors: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Build a graph from `(id, predecessors)` pairs in declaration order
    ///
    /// Fails on duplicate ids and on predecessors that name no node.
    pub fn new<I, S>(kind: GraphKind, nodes: I) -> BuildResult<Self>
    where
        I: IntoIterator<Item = (S, Vec<String>)>,
        S: Into<String>,
    {
        let nodes: Vec<(String, Vec<String>)> =
            nodes.into_iter().map(|(id, deps)| (id.into(), deps)).collect();

        let mut index = HashMap::with_capacity(nodes.len());
        for (i, (id, _)) in nodes.iter().enumerate() {
            if index.insert(id.as_str(), i).is_some() {
                return Err(BuildError::Duplicate {
                    kind,
                    id: id.clone(),
                });
            }
        }

        let mut predecessors = Vec::with_capacity(nodes.len());
        for (id, deps) in &nodes {
            let mut resolved: Vec<usize> = Vec::with_capacity(deps.len());
            for dep in deps {
                let &p = index
                    .get(dep.as_str())
                    .ok_or_else(|| BuildError::missing_reference(kind, id, dep))?;
                if !resolved.contains(&p) {
                    resolved.push(p);
                }
            }
            predecessors.push(resolved);
        }

        Ok(Self {
            kind,
            ids: nodes.into_iter().map(|(id, _)| id).collect(),
            predecessors,
        })
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Node id at a declaration index
    pub fn id(&self, index: usize) -> &str {
        &self.ids[index]
    }

    /// Predecessor indices of a node
    pub fn predecessors(&self, index: usize) -> &[usize] {
        &self.predecessors[index]
    }

    /// Compute the topological order using Kahn's algorithm
    ///
    /// Returns declaration indices. Ties go to the lowest index.
    pub fn topological_order(&self) -> BuildResult<Vec<usize>> {
        let n = self.ids.len();
        let mut in_degree: Vec<usize> = self.predecessors.iter().map(Vec::len).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (node, preds) in self.predecessors.iter().enumerate() {
            for &p in preds {
                dependents[p].push(node);
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();
        let mut order = Vec::with_capacity(n);

        while let Some(Reverse(node)) = ready.pop() {
            order.push(node);
            for &dependent in &dependents[node] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.push(Reverse(dependent));
                }
            }
        }

        if order.len() != n {
            return Err(BuildError::cycle(self.kind, self.find_cycle(&in_degree)));
        }

        Ok(order)
    }

    /// Group an order into levels of mutually independent nodes
    ///
    /// A node's level is one more than the highest level among its
    /// predecessors. Within a level, nodes keep their position in `order`.
    pub fn levels(&self, order: &[usize]) -> Vec<Vec<usize>> {
        let mut level_of = vec![0usize; self.ids.len()];
        let mut levels: Vec<Vec<usize>> = Vec::new();

        for &node in order {
            let level = self.predecessors[node]
                .iter()
                .map(|&p| level_of[p] + 1)
                .max()
                .unwrap_or(0);
            level_of[node] = level;
            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            levels[level].push(node);
        }

        levels
    }

    /// Find a cycle among the nodes Kahn's algorithm could not release
    ///
    /// Every unreleased node has an unreleased predecessor, so walking
    /// those edges from the first unreleased node must revisit a node.
    /// The cycle is reported in dependency direction: each member depends
    /// on the next.
    fn find_cycle(&self, in_degree: &[usize]) -> Vec<String> {
        let stuck = |i: usize| in_degree[i] > 0;
        let Some(start) = (0..self.ids.len()).find(|&i| stuck(i)) else {
            return Vec::new();
        };

        let mut path: Vec<usize> = Vec::new();
        let mut position: HashMap<usize, usize> = HashMap::new();
        let mut current = start;

        loop {
            if let Some(&at) = position.get(&current) {
                return path[at..].iter().map(|&i| self.ids[i].clone()).collect();
            }
            position.insert(current, path.len());
            path.push(current);

            match self.predecessors[current].iter().copied().find(|&p| stuck(p)) {
                Some(next) => current = next,
                None => return path.iter().map(|&i| self.ids[i].clone()).collect(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(nodes: &[(&str, &[&str])]) -> BuildResult<DependencyGraph> {
        DependencyGraph::new(
            GraphKind::Task,
            nodes
                .iter()
                .map(|(id, deps)| (*id, deps.iter().map(|d| d.to_string()).collect())),
        )
    }

    fn ids(g: &DependencyGraph, order: &[usize]) -> Vec<String> {
        order.iter().map(|&i| g.id(i).to_string()).collect()
    }

    #[test]
    fn test_empty_graph() {
        let g = graph(&[]).unwrap();
        assert!(g.is_empty());
        assert_eq!(g.topological_order().unwrap(), Vec::<usize>::new());
        assert!(g.levels(&[]).is_empty());
    }

    #[test]
    fn test_linear_dependency_chain() {
        let g = graph(&[("a", &["b"]), ("b", &["c"]), ("c", &[])]).unwrap();
        let order = g.topological_order().unwrap();
        assert_eq!(ids(&g, &order), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_ties_follow_declaration_order() {
        let g = graph(&[("lint", &[]), ("clean", &[]), ("build", &["clean"])]).unwrap();
        let order = g.topological_order().unwrap();
        assert_eq!(ids(&g, &order), vec!["lint", "clean", "build"]);
    }

    #[test]
    fn test_diamond_levels() {
        let g = graph(&[
            ("a", &["b", "c"]),
            ("b", &["d"]),
            ("c", &["d"]),
            ("d", &[]),
        ])
        .unwrap();
        let order = g.topological_order().unwrap();
        assert_eq!(ids(&g, &order), vec!["d", "b", "c", "a"]);

        let levels: Vec<Vec<String>> = g
            .levels(&order)
            .iter()
            .map(|level| ids(&g, level))
            .collect();
        assert_eq!(levels, vec![vec!["d"], vec!["b", "c"], vec!["a"]]);
    }

    #[test]
    fn test_duplicate_predecessor_counted_once() {
        let g = graph(&[("a", &[]), ("b", &["a", "a"])]).unwrap();
        assert_eq!(g.predecessors(1), &[0]);
        assert_eq!(ids(&g, &g.topological_order().unwrap()), vec!["a", "b"]);
    }

    #[test]
    fn test_circular_dependency_detection() {
        let g = graph(&[("ok", &[]), ("a", &["b"]), ("b", &["a"])]).unwrap();
        match g.topological_order() {
            Err(BuildError::CyclicDependency { kind, cycle }) => {
                assert_eq!(kind, GraphKind::Task);
                assert_eq!(cycle, vec!["a", "b"]);
            }
            other => panic!("Expected CyclicDependency error, got {:?}", other),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let g = graph(&[("a", &["a"])]).unwrap();
        assert!(matches!(
            g.topological_order(),
            Err(BuildError::CyclicDependency { cycle, .. }) if cycle == vec!["a"]
        ));
    }

    #[test]
    fn test_cycle_excludes_nodes_hanging_off_it() {
        // c depends on the cycle but is not part of it
        let g = graph(&[("c", &["a"]), ("a", &["b"]), ("b", &["a"])]).unwrap();
        match g.topological_order() {
            Err(BuildError::CyclicDependency { cycle, .. }) => {
                assert_eq!(cycle, vec!["a", "b"]);
            }
            other => panic!("Expected CyclicDependency error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_dependency() {
        let result = graph(&[("a", &["nonexistent"])]);
        match result {
            Err(BuildError::MissingDependencyReference { from, missing, .. }) => {
                assert_eq!(from, "a");
                assert_eq!(missing, "nonexistent");
            }
            other => panic!("Expected MissingDependencyReference error, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_node() {
        let result = graph(&[("a", &[]), ("a", &[])]);
        assert!(matches!(result, Err(BuildError::Duplicate { id, .. }) if id == "a"));
    }
}

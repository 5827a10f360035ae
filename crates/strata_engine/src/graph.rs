//! The module import graph.

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, DfsPostOrder};
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet};
use strata_common::{Fingerprint, SourcePath, StrataResult};

/// Import edges between files, from importer to imported.
///
/// Built once per evaluation of the module-graph rule and never mutated
/// afterwards. Every file named by an edge is a node, including imported
/// files that were never scanned themselves.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    graph: DiGraph<SourcePath, ()>,
    indices: BTreeMap<SourcePath, NodeIndex>,
    edges: BTreeMap<SourcePath, Vec<SourcePath>>,
}

impl ModuleGraph {
    /// Builds the graph from each file's direct imports.
    pub fn from_edges(edges: impl IntoIterator<Item = (SourcePath, Vec<SourcePath>)>) -> Self {
        let mut this = Self::default();
        for (file, imports) in edges {
            let from = this.add_node(&file);
            for import in &imports {
                let to = this.add_node(import);
                if !this.graph.contains_edge(from, to) {
                    this.graph.add_edge(from, to, ());
                }
            }
            let entry = this.edges.entry(file).or_default();
            for import in imports {
                if !entry.contains(&import) {
                    entry.push(import);
                }
            }
        }
        this
    }

    fn add_node(&mut self, path: &SourcePath) -> NodeIndex {
        if let Some(&idx) = self.indices.get(path) {
            return idx;
        }
        let idx = self.graph.add_node(path.clone());
        self.indices.insert(path.clone(), idx);
        self.edges.entry(path.clone()).or_default();
        idx
    }

    /// Direct imports of `file`, in source order.
    pub fn imports_of(&self, file: &SourcePath) -> &[SourcePath] {
        self.edges.get(file).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Files directly importing `file`, sorted.
    pub fn importers_of(&self, file: &SourcePath) -> Vec<SourcePath> {
        let Some(&idx) = self.indices.get(file) else {
            return Vec::new();
        };
        let mut importers: Vec<SourcePath> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|n| self.graph[n].clone())
            .collect();
        importers.sort();
        importers.dedup();
        importers
    }

    /// Returns `true` if `file` is a node of the graph.
    pub fn contains(&self, file: &SourcePath) -> bool {
        self.indices.contains_key(file)
    }

    /// All files, sorted.
    pub fn nodes(&self) -> impl Iterator<Item = &SourcePath> {
        self.edges.keys()
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns `true` if the graph has no files.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    fn is_cyclic_component(&self, component: &[NodeIndex]) -> bool {
        component.len() > 1 || self.graph.contains_edge(component[0], component[0])
    }

    fn paths(&self, component: &[NodeIndex]) -> Vec<SourcePath> {
        let mut paths: Vec<SourcePath> = component.iter().map(|&n| self.graph[n].clone()).collect();
        paths.sort();
        paths
    }

    /// Import cycles reachable from `file`: the strongly connected components
    /// with more than one file, or a file importing itself. Each cycle is
    /// sorted, and the cycles are ordered by their first file.
    pub fn cycles_for(&self, file: &SourcePath) -> Vec<Vec<SourcePath>> {
        let Some(&start) = self.indices.get(file) else {
            return Vec::new();
        };
        let mut reachable = BTreeSet::new();
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(idx) = dfs.next(&self.graph) {
            reachable.insert(idx);
        }

        let mut cycles: Vec<Vec<SourcePath>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| reachable.contains(&component[0]))
            .filter(|component| self.is_cyclic_component(component))
            .map(|component| self.paths(&component))
            .collect();
        cycles.sort();
        cycles
    }

    /// The import cycle `file` itself belongs to, sorted, if any.
    pub fn cycle_containing(&self, file: &SourcePath) -> Option<Vec<SourcePath>> {
        let &idx = self.indices.get(file)?;
        tarjan_scc(&self.graph)
            .into_iter()
            .find(|component| component.contains(&idx))
            .filter(|component| self.is_cyclic_component(component))
            .map(|component| self.paths(&component))
    }

    /// Every file `file` transitively imports, dependencies before the files
    /// importing them. `file` itself is not included.
    pub fn transitive_closure(&self, file: &SourcePath) -> Vec<SourcePath> {
        let Some(&start) = self.indices.get(file) else {
            return Vec::new();
        };
        let mut closure = Vec::new();
        let mut walk = DfsPostOrder::new(&self.graph, start);
        while let Some(idx) = walk.next(&self.graph) {
            if idx != start {
                closure.push(self.graph[idx].clone());
            }
        }
        closure
    }

    /// All files with dependencies first, or an import cycle if there is one.
    pub fn topological_order(&self) -> Result<Vec<SourcePath>, Vec<SourcePath>> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order.into_iter().rev().map(|n| self.graph[n].clone()).collect()),
            Err(cycle) => {
                let file = &self.graph[cycle.node_id()];
                Err(self
                    .cycle_containing(file)
                    .unwrap_or_else(|| vec![file.clone()]))
            }
        }
    }

    /// Fingerprint over the edges. Two graphs with the same edges have the
    /// same fingerprint regardless of construction order.
    pub fn fingerprint(&self) -> StrataResult<Fingerprint> {
        Fingerprint::of(&self.edges)
    }
}

impl PartialEq for ModuleGraph {
    fn eq(&self, other: &Self) -> bool {
        self.edges == other.edges
    }
}

impl Eq for ModuleGraph {}
